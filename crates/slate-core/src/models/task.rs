use serde::{Deserialize, Serialize};

use super::detection::ColonyDetection;
use super::geometry::RobotPoint;
use super::slot::SlotAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskState {
    Pending,
    InMotion,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Skipped
        )
    }
}

/// The physical transfer bound to an admitted task: where to pick the
/// colony in robot space and which reserved slot to place it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub pick: RobotPoint,
    pub slot: SlotAddress,
    pub place: RobotPoint,
}

/// One unit of work in a run: a colony detection, its outcome so far, and
/// (for tasks that reached allocation) the transfer to perform.
///
/// `transfer` is `None` only for tasks that were rejected before a slot was
/// reserved (a mapping failure or a below-confidence skip). Those are
/// terminal at admission and never execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickTask {
    pub id: u32,
    pub detection: ColonyDetection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<Transfer>,
    pub state: TaskState,
    /// Execution attempts so far (retries included).
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl PickTask {
    /// An admitted task with a reserved slot, ready to execute.
    pub fn admitted(id: u32, detection: ColonyDetection, transfer: Transfer) -> Self {
        Self {
            id,
            detection,
            transfer: Some(transfer),
            state: TaskState::Pending,
            attempts: 0,
            failure: None,
        }
    }

    /// A task that is terminal at admission and holds no slot.
    pub fn rejected(
        id: u32,
        detection: ColonyDetection,
        state: TaskState,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id,
            detection,
            transfer: None,
            state,
            attempts: 0,
            failure: Some(reason.into()),
        }
    }
}
