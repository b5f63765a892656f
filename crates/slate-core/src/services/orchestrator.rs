use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, SlateError};
use crate::models::{
    BaseplateLayout, ColonyDetection, MotionOutcome, PickTask, PlateLocation, RobotPoint,
    RunParams, RunPhase, RunState, RunSummary, TaskState, Transfer, UnadmittedColony,
};

use super::allocator::SlotAllocator;
use super::mapper::CoordinateMapper;
use super::motion::MotionDriver;
use super::planner::MotionPlanner;
use super::state::RunStateStore;
use super::vision::VisionSystem;

/// Operator stop request. Level-triggered; the orchestrator honors it only
/// between motion commands, never mid-command.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum PrepOutcome {
    Mapped(RobotPoint),
    BelowConfidence,
    MapFailed(String),
}

/// One detection with its mapping result, ready for admission.
struct PreparedColony {
    detection: ColonyDetection,
    outcome: PrepOutcome,
}

#[derive(Debug, PartialEq, Eq)]
enum ExecOutcome {
    Ran,
    Aborted,
}

/// The top-level state machine driving a batch from detection results to
/// completion.
///
/// Owns the slot arena and the run state (single writer); the mapper and
/// planner are immutable after construction, so detection and mapping for
/// the next plate can run while the current plate's tasks execute. Task
/// execution itself is strictly sequential: the robot is a single shared
/// actuator.
pub struct RunOrchestrator<V, M> {
    layout: BaseplateLayout,
    params: RunParams,
    mapper: CoordinateMapper,
    planner: MotionPlanner,
    allocator: SlotAllocator,
    store: RunStateStore,
    vision: V,
    driver: M,
    stop: StopHandle,
}

impl<V: VisionSystem, M: MotionDriver> RunOrchestrator<V, M> {
    /// Build an orchestrator for one calibrated baseplate.
    ///
    /// Fails with `SlateError::Calibration` if the layout's reference
    /// points do not produce a usable transform; that is an unresolvable
    /// configuration error, reported before any run starts.
    pub fn new(
        layout: BaseplateLayout,
        params: RunParams,
        vision: V,
        driver: M,
        state_dir: &Path,
    ) -> Result<Self> {
        let mapper = CoordinateMapper::fit(&layout.calibration, layout.vision_envelope)?;
        let planner = MotionPlanner::new(&params);
        let allocator = SlotAllocator::new(&layout);
        Ok(Self {
            layout,
            params,
            mapper,
            planner,
            allocator,
            store: RunStateStore::new(state_dir),
            vision,
            driver,
            stop: StopHandle::default(),
        })
    }

    /// Handle for requesting an operator stop of the active run.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run a full batch over the given source plates.
    pub async fn start_run(&mut self, plate_ids: &[String]) -> Result<RunSummary> {
        self.stop.clear();
        let plates = self.resolve_plates(plate_ids)?;

        let mut run = RunState::new(plate_ids.to_vec());
        self.store.save(&run).await?;
        tracing::info!(run_id = %run.run_id, plates = plates.len(), "run started");

        self.drive(&mut run, &plates).await?;
        Ok(run.summary())
    }

    /// Resume a previously aborted run from its persisted snapshot.
    ///
    /// Pending tasks execute first, from the cursor; plates the aborted
    /// run never admitted are then detected and admitted as usual.
    pub async fn resume_run(&mut self, run_id: &str) -> Result<RunSummary> {
        self.stop.clear();
        let mut run = self.store.load(run_id).await?;
        if run.phase == RunPhase::Completed {
            return Ok(run.summary());
        }

        // Anything caught mid-flight by the abort goes back to Pending.
        for task in &mut run.tasks {
            if task.state == TaskState::InMotion {
                task.state = TaskState::Pending;
            }
        }

        self.allocator = SlotAllocator::new(&self.layout);
        self.allocator.restore(&run.tasks);

        let remaining: Vec<String> = run
            .plate_ids
            .iter()
            .filter(|id| !run.admitted_plates.contains(id))
            .cloned()
            .collect();
        let plates = self.resolve_plates(&remaining)?;

        tracing::info!(run_id = %run.run_id, pending = run.counters().pending, "run resumed");
        run.phase = RunPhase::Executing;
        touch_and_save(&mut run, &self.store).await?;

        let exec = execute_pending(
            &mut self.driver,
            &mut self.allocator,
            &self.planner,
            &self.store,
            &self.params,
            &self.stop,
            &mut run,
        )
        .await?;
        if exec == ExecOutcome::Aborted {
            return Ok(run.summary());
        }

        self.drive(&mut run, &plates).await?;
        Ok(run.summary())
    }

    /// Load the persisted progress summary of a run.
    pub async fn progress(&self, run_id: &str) -> Result<RunSummary> {
        Ok(self.store.load(run_id).await?.summary())
    }

    fn resolve_plates(&self, plate_ids: &[String]) -> Result<Vec<PlateLocation>> {
        plate_ids
            .iter()
            .map(|id| {
                self.layout
                    .plate(id)
                    .cloned()
                    .ok_or_else(|| SlateError::PlateNotFound(id.clone()))
            })
            .collect()
    }

    /// Admit and execute plate batches until every plate is processed or
    /// the run aborts. With lookahead enabled, the next plate's detection
    /// and mapping overlap the current plate's execution, bounded to one
    /// pending batch.
    async fn drive(&mut self, run: &mut RunState, plates: &[PlateLocation]) -> Result<()> {
        let mut upcoming = plates.iter();

        let mut batch = match upcoming.next() {
            Some(plate) => Some((
                plate.id.clone(),
                phased_prepare(&self.vision, &self.mapper, &self.params, &self.store, run, plate)
                    .await?,
            )),
            None => None,
        };

        while let Some((plate_id, prepared)) = batch.take() {
            run.phase = RunPhase::Allocating;
            admit_batch(run, &mut self.allocator, &self.layout, &plate_id, prepared);
            touch_and_save(run, &self.store).await?;

            run.phase = RunPhase::Executing;
            touch_and_save(run, &self.store).await?;

            match upcoming.next() {
                Some(plate) if self.params.lookahead => {
                    let (exec, next) = tokio::join!(
                        execute_pending(
                            &mut self.driver,
                            &mut self.allocator,
                            &self.planner,
                            &self.store,
                            &self.params,
                            &self.stop,
                            run,
                        ),
                        prepare_plate(&self.vision, &self.mapper, &self.params, plate),
                    );
                    if exec? == ExecOutcome::Aborted {
                        return Ok(());
                    }
                    batch = Some((plate.id.clone(), next?));
                }
                Some(plate) => {
                    let exec = execute_pending(
                        &mut self.driver,
                        &mut self.allocator,
                        &self.planner,
                        &self.store,
                        &self.params,
                        &self.stop,
                        run,
                    )
                    .await?;
                    if exec == ExecOutcome::Aborted {
                        return Ok(());
                    }
                    batch = Some((
                        plate.id.clone(),
                        phased_prepare(
                            &self.vision,
                            &self.mapper,
                            &self.params,
                            &self.store,
                            run,
                            plate,
                        )
                        .await?,
                    ));
                }
                None => {
                    let exec = execute_pending(
                        &mut self.driver,
                        &mut self.allocator,
                        &self.planner,
                        &self.store,
                        &self.params,
                        &self.stop,
                        run,
                    )
                    .await?;
                    if exec == ExecOutcome::Aborted {
                        return Ok(());
                    }
                }
            }
        }

        self.finish(run).await
    }

    async fn finish(&mut self, run: &mut RunState) -> Result<()> {
        if let Some(park) = self.planner.park() {
            match self.driver.execute(&park).await {
                MotionOutcome::Success => {}
                MotionOutcome::TaskFailure(reason) | MotionOutcome::FatalFault(reason) => {
                    // The transfer work is done; a park fault is not worth
                    // aborting a completed run over.
                    tracing::warn!(%reason, "park move reported a fault");
                }
            }
        }
        run.phase = RunPhase::Completed;
        touch_and_save(run, &self.store).await?;

        let counters = run.counters();
        tracing::info!(
            run_id = %run.run_id,
            succeeded = counters.succeeded,
            failed = counters.failed,
            skipped = counters.skipped,
            unadmitted = run.unadmitted.len(),
            "run completed"
        );
        Ok(())
    }
}

/// Detect and map one plate, recording the Detecting/Mapping phases in the
/// persisted snapshot.
async fn phased_prepare<V: VisionSystem>(
    vision: &V,
    mapper: &CoordinateMapper,
    params: &RunParams,
    store: &RunStateStore,
    run: &mut RunState,
    plate: &PlateLocation,
) -> Result<Vec<PreparedColony>> {
    run.phase = RunPhase::Detecting;
    touch_and_save(run, store).await?;
    let detections = vision.detect_colonies(plate).await?;

    run.phase = RunPhase::Mapping;
    touch_and_save(run, store).await?;
    Ok(map_batch(mapper, params, detections))
}

/// Detect and map one plate without touching run state. Used by the
/// lookahead path while the current batch executes.
async fn prepare_plate<V: VisionSystem>(
    vision: &V,
    mapper: &CoordinateMapper,
    params: &RunParams,
    plate: &PlateLocation,
) -> Result<Vec<PreparedColony>> {
    let detections = vision.detect_colonies(plate).await?;
    Ok(map_batch(mapper, params, detections))
}

fn map_batch(
    mapper: &CoordinateMapper,
    params: &RunParams,
    detections: Vec<ColonyDetection>,
) -> Vec<PreparedColony> {
    detections
        .into_iter()
        .map(|detection| {
            let outcome = if detection.confidence < params.min_confidence {
                PrepOutcome::BelowConfidence
            } else {
                match mapper.map(detection.position) {
                    Ok(point) => PrepOutcome::Mapped(point),
                    // Calibration failures are systematic, not transient:
                    // the task fails at admission and is never retried.
                    Err(e) => PrepOutcome::MapFailed(e.to_string()),
                }
            };
            PreparedColony { detection, outcome }
        })
        .collect()
}

/// Turn a prepared batch into tasks, reserving slots in detection order.
///
/// Once the baseplate is exhausted, detections that would need a slot are
/// recorded as unadmitted; detections rejected before allocation (mapping
/// failure, below-confidence) still become slotless terminal tasks so
/// every colony stays accounted for exactly once.
fn admit_batch(
    run: &mut RunState,
    allocator: &mut SlotAllocator,
    layout: &BaseplateLayout,
    plate_id: &str,
    prepared: Vec<PreparedColony>,
) {
    let mut exhausted = false;
    let mut admitted = 0usize;
    for PreparedColony { detection, outcome } in prepared {
        let id = run.tasks.len() as u32;
        match outcome {
            PrepOutcome::BelowConfidence => {
                run.tasks.push(PickTask::rejected(
                    id,
                    detection,
                    TaskState::Skipped,
                    "confidence below configured minimum",
                ));
            }
            PrepOutcome::MapFailed(reason) => {
                run.tasks
                    .push(PickTask::rejected(id, detection, TaskState::Failed, reason));
            }
            PrepOutcome::Mapped(pick) => {
                if exhausted {
                    run.unadmitted.push(UnadmittedColony {
                        detection,
                        reason: SlateError::SlotsExhausted.to_string(),
                    });
                    continue;
                }
                match allocator.reserve(detection.id) {
                    Ok(slot) => {
                        let place = layout.slot_position(slot);
                        run.tasks
                            .push(PickTask::admitted(id, detection, Transfer { pick, slot, place }));
                        admitted += 1;
                    }
                    Err(e) => {
                        exhausted = true;
                        tracing::warn!(plate = %plate_id, "baseplate exhausted, stopping admission");
                        run.unadmitted.push(UnadmittedColony {
                            detection,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }
    run.admitted_plates.push(plate_id.to_string());
    tracing::info!(plate = %plate_id, admitted, total = run.tasks.len(), "batch admitted");
}

/// Execute every admissible task from the cursor onward, strictly in
/// order. Returns `Aborted` on a fatal fault or operator stop, with the
/// snapshot already persisted at the exact boundary.
async fn execute_pending<M: MotionDriver>(
    driver: &mut M,
    allocator: &mut SlotAllocator,
    planner: &MotionPlanner,
    store: &RunStateStore,
    params: &RunParams,
    stop: &StopHandle,
    run: &mut RunState,
) -> Result<ExecOutcome> {
    while run.cursor < run.tasks.len() {
        if stop.is_requested() {
            return abort(run, store, "stop requested by operator").await;
        }

        let idx = run.cursor;
        let transfer = match &run.tasks[idx] {
            task if task.state != TaskState::Pending => {
                run.cursor += 1;
                continue;
            }
            task => match task.transfer.clone() {
                Some(transfer) => transfer,
                None => {
                    run.cursor += 1;
                    continue;
                }
            },
        };

        let commands = match planner.plan(std::slice::from_ref(&run.tasks[idx])) {
            Ok(commands) => commands,
            Err(SlateError::Planning(reason)) => {
                // Planning failures are systematic, like calibration:
                // fail this task only and keep going.
                tracing::warn!(task = run.tasks[idx].id, %reason, "planning failed");
                allocator.release(transfer.slot);
                run.tasks[idx].state = TaskState::Failed;
                run.tasks[idx].failure = Some(reason);
                run.cursor += 1;
                touch_and_save(run, store).await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        run.tasks[idx].state = TaskState::InMotion;
        touch_and_save(run, store).await?;

        loop {
            run.tasks[idx].attempts += 1;
            let attempt = run.tasks[idx].attempts;
            let mut task_failure: Option<String> = None;

            for command in &commands {
                if stop.is_requested() {
                    run.tasks[idx].state = TaskState::Pending;
                    return abort(run, store, "stop requested by operator").await;
                }
                match driver.execute(command).await {
                    MotionOutcome::Success => {}
                    MotionOutcome::TaskFailure(reason) => {
                        task_failure = Some(reason);
                        break;
                    }
                    MotionOutcome::FatalFault(reason) => {
                        // A fault is not a task failure: the task reverts
                        // to Pending and its slot stays Reserved so resume
                        // picks up exactly here.
                        run.tasks[idx].state = TaskState::Pending;
                        tracing::error!(task = run.tasks[idx].id, %reason, "fatal fault");
                        return abort(run, store, reason).await;
                    }
                }
            }

            match task_failure {
                None => {
                    allocator.commit(transfer.slot)?;
                    run.tasks[idx].state = TaskState::Succeeded;
                    run.tasks[idx].failure = None;
                    break;
                }
                Some(reason) if attempt > params.retry_limit => {
                    tracing::warn!(
                        task = run.tasks[idx].id,
                        %reason,
                        attempts = attempt,
                        "task failed, releasing slot"
                    );
                    allocator.release(transfer.slot);
                    run.tasks[idx].state = TaskState::Failed;
                    run.tasks[idx].failure = Some(reason);
                    break;
                }
                Some(reason) => {
                    tracing::warn!(task = run.tasks[idx].id, %reason, attempt, "retrying task");
                    run.tasks[idx].failure = Some(reason);
                    touch_and_save(run, store).await?;
                }
            }
        }

        run.cursor += 1;
        touch_and_save(run, store).await?;
    }
    Ok(ExecOutcome::Ran)
}

async fn abort(
    run: &mut RunState,
    store: &RunStateStore,
    reason: impl std::fmt::Display,
) -> Result<ExecOutcome> {
    run.phase = RunPhase::Aborted;
    touch_and_save(run, store).await?;
    tracing::warn!(run_id = %run.run_id, %reason, "run aborted");
    Ok(ExecOutcome::Aborted)
}

async fn touch_and_save(run: &mut RunState, store: &RunStateStore) -> Result<()> {
    run.updated_at = chrono::Utc::now();
    store.save(run).await
}
