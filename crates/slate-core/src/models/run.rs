use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::detection::ColonyDetection;
use super::task::{PickTask, TaskState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunPhase {
    Idle,
    Detecting,
    Mapping,
    Allocating,
    Executing,
    Completed,
    Aborted,
}

/// A detection that never became a task because admission had stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnadmittedColony {
    pub detection: ColonyDetection,
    pub reason: String,
}

/// Aggregate task counts. `pending` includes the in-motion task, so
/// `succeeded + failed + skipped + pending == total` holds at every point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCounters {
    pub total: usize,
    pub pending: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Operator-facing progress snapshot: counts, never raw errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub phase: RunPhase,
    pub counters: RunCounters,
    pub unadmitted: usize,
}

/// Full state of one run: every task in admission order, the cursor
/// marking the next task to execute, and the colonies that were never
/// admitted. Single writer (the orchestrator); persisted after every task
/// transition so an aborted run can resume from the exact boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub run_id: String,
    pub plate_ids: Vec<String>,
    /// Plates whose detections have been admitted as tasks. Resume detects
    /// the remainder.
    pub admitted_plates: Vec<String>,
    pub phase: RunPhase,
    pub tasks: Vec<PickTask>,
    /// Index of the next task to execute.
    pub cursor: usize,
    pub unadmitted: Vec<UnadmittedColony>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(plate_ids: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: format!("run-{}", now.format("%Y-%m-%dT%H-%M-%S%.3f")),
            plate_ids,
            admitted_plates: Vec::new(),
            phase: RunPhase::Idle,
            tasks: Vec::new(),
            cursor: 0,
            unadmitted: Vec::new(),
            started_at: now,
            updated_at: now,
        }
    }

    pub fn counters(&self) -> RunCounters {
        let mut counters = RunCounters {
            total: self.tasks.len(),
            ..RunCounters::default()
        };
        for task in &self.tasks {
            match task.state {
                TaskState::Pending | TaskState::InMotion => counters.pending += 1,
                TaskState::Succeeded => counters.succeeded += 1,
                TaskState::Failed => counters.failed += 1,
                TaskState::Skipped => counters.skipped += 1,
            }
        }
        counters
    }

    /// True once every task is terminal.
    pub fn is_settled(&self) -> bool {
        self.tasks.iter().all(|t| t.state.is_terminal())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            phase: self.phase,
            counters: self.counters(),
            unadmitted: self.unadmitted.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::geometry::VisionPoint;

    fn task_in(state: TaskState) -> PickTask {
        let detection = ColonyDetection {
            id: 1,
            plate_id: "P1".into(),
            position: VisionPoint::new(1.0, 2.0),
            confidence: 0.9,
        };
        let mut task = PickTask::rejected(0, detection, state, "test");
        if !state.is_terminal() {
            task.failure = None;
        }
        task
    }

    #[test]
    fn counters_conserve_total() {
        let mut run = RunState::new(vec!["P1".into()]);
        run.tasks.push(task_in(TaskState::Failed));
        run.tasks.push(task_in(TaskState::Skipped));
        run.tasks.push(task_in(TaskState::Pending));

        let c = run.counters();
        assert_eq!(c.total, 3);
        assert_eq!(c.succeeded + c.failed + c.skipped + c.pending, c.total);
        assert_eq!(c.failed, 1);
        assert_eq!(c.skipped, 1);
        assert_eq!(c.pending, 1);
        assert!(!run.is_settled());
    }

    #[test]
    fn in_motion_counts_as_pending() {
        let mut run = RunState::new(vec!["P1".into()]);
        run.tasks.push(task_in(TaskState::InMotion));

        assert_eq!(run.counters().pending, 1);
        assert!(!run.is_settled());
    }

    #[test]
    fn empty_run_is_settled() {
        let run = RunState::new(vec![]);
        assert!(run.is_settled());
        assert_eq!(run.counters().total, 0);
    }
}
