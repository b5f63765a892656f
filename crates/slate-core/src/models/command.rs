use serde::{Deserialize, Serialize};

use super::geometry::RobotPoint;

/// One instruction for the motion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MotionCommand {
    /// Travel to `point`, transiting at `safe_height` so the head clears
    /// baseplate fixtures.
    MoveTo { point: RobotPoint, safe_height: f64 },
    /// Descend and pick the colony at `point`.
    Pick(RobotPoint),
    /// Descend and deposit the held colony at `point`.
    Place(RobotPoint),
    /// Sterilize the pick head at `point`: dwell in the sterilizer, then
    /// cool before the next pick.
    Sterilize {
        point: RobotPoint,
        dwell_s: f64,
        cool_s: f64,
    },
}

/// Outcome reported by the motion collaborator for one command.
///
/// `TaskFailure` is retryable/skippable and stays inside the task boundary;
/// `FatalFault` aborts the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MotionOutcome {
    Success,
    TaskFailure(String),
    FatalFault(String),
}
