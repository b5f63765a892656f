use crate::error::{Result, SlateError};
use crate::models::{BaseplateLayout, PickTask, Slot, SlotAddress, SlotState, TaskState};

/// Owns the baseplate's grid of slots.
///
/// All slot mutation goes through this type; the rest of the engine only
/// handles [`SlotAddress`] identities. Allocation order is a deterministic
/// row-major scan that skips Blocked wells.
pub struct SlotAllocator {
    cols: u32,
    slots: Vec<Slot>,
}

impl SlotAllocator {
    pub fn new(layout: &BaseplateLayout) -> Self {
        let mut slots = Vec::with_capacity(layout.capacity());
        for row in 0..layout.rows {
            for col in 0..layout.cols {
                slots.push(Slot::free(SlotAddress::new(row, col)));
            }
        }
        let mut allocator = Self {
            cols: layout.cols,
            slots,
        };
        for &addr in &layout.blocked {
            if let Some(slot) = allocator.slot_mut(addr) {
                slot.state = SlotState::Blocked;
            }
        }
        allocator
    }

    fn index(&self, addr: SlotAddress) -> Option<usize> {
        if addr.col >= self.cols {
            return None;
        }
        Some((addr.row * self.cols + addr.col) as usize)
    }

    pub fn slot(&self, addr: SlotAddress) -> Option<&Slot> {
        self.index(addr).and_then(|idx| self.slots.get(idx))
    }

    fn slot_mut(&mut self, addr: SlotAddress) -> Option<&mut Slot> {
        self.index(addr).and_then(|idx| self.slots.get_mut(idx))
    }

    pub fn free_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::Free)
            .count()
    }

    /// Reserve the lowest-ordered Free slot for `colony`.
    pub fn reserve(&mut self, colony: u32) -> Result<SlotAddress> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.state == SlotState::Free)
            .ok_or(SlateError::SlotsExhausted)?;
        slot.state = SlotState::Reserved;
        slot.colony = Some(colony);
        Ok(slot.address)
    }

    /// Mark a Reserved slot Occupied after a successful place.
    pub fn commit(&mut self, addr: SlotAddress) -> Result<()> {
        let slot = self
            .slot_mut(addr)
            .ok_or_else(|| SlateError::State(format!("slot {addr} is outside the grid")))?;
        if slot.state != SlotState::Reserved {
            return Err(SlateError::State(format!(
                "cannot commit slot {addr}: not reserved"
            )));
        }
        slot.state = SlotState::Occupied;
        Ok(())
    }

    /// Return a Reserved/Occupied slot to Free. Idempotent on an
    /// already-Free slot; Blocked slots are never released.
    pub fn release(&mut self, addr: SlotAddress) {
        if let Some(slot) = self.slot_mut(addr) {
            if matches!(slot.state, SlotState::Reserved | SlotState::Occupied) {
                slot.state = SlotState::Free;
                slot.colony = None;
            }
        }
    }

    /// Rebuild occupancy from a persisted task list when resuming a run.
    pub fn restore(&mut self, tasks: &[PickTask]) {
        for task in tasks {
            let Some(transfer) = &task.transfer else {
                continue;
            };
            let colony = task.detection.id;
            if let Some(slot) = self.slot_mut(transfer.slot) {
                match task.state {
                    TaskState::Succeeded => {
                        slot.state = SlotState::Occupied;
                        slot.colony = Some(colony);
                    }
                    TaskState::Pending | TaskState::InMotion => {
                        slot.state = SlotState::Reserved;
                        slot.colony = Some(colony);
                    }
                    TaskState::Failed | TaskState::Skipped => {}
                }
            }
        }
    }
}
