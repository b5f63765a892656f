use serde::{Deserialize, Serialize};

/// Identity of one addressable position on the baseplate grid.
///
/// Ordering is row-major (derived from field order), which is also the
/// allocator's scan order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct SlotAddress {
    pub row: u32,
    pub col: u32,
}

impl SlotAddress {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for SlotAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotState {
    Free,
    Reserved,
    Occupied,
    Blocked,
}

/// One slot in the allocator's arena. Only the allocator mutates these;
/// everything else works with [`SlotAddress`] identities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub address: SlotAddress,
    pub state: SlotState,
    /// Colony currently reserving or occupying this slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colony: Option<u32>,
}

impl Slot {
    pub fn free(address: SlotAddress) -> Self {
        Self {
            address,
            state: SlotState::Free,
            colony: None,
        }
    }
}
