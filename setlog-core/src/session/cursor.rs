//! Progression cursor
//!
//! Tracks which slot the user is currently working and derives the
//! "current set" display position from the shell, rather than storing a
//! second counter that could drift.

use super::shell::SessionShell;

/// Current position in the exercise list
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressionCursor {
    pub slot_index: usize,
}

impl ProgressionCursor {
    /// Advance to the next slot; clamps at the last slot
    pub fn advance(&mut self, shell: &SessionShell) -> bool {
        if self.slot_index + 1 < shell.slots.len() {
            self.slot_index += 1;
            true
        } else {
            false
        }
    }

    /// Step back to the previous slot; clamps at the first slot
    pub fn retreat(&mut self) -> bool {
        if self.slot_index > 0 {
            self.slot_index -= 1;
            true
        } else {
            false
        }
    }

    /// Jump directly to a slot. Rejects out-of-range targets.
    pub fn jump(&mut self, shell: &SessionShell, slot_index: usize) -> bool {
        if slot_index < shell.slots.len() {
            self.slot_index = slot_index;
            true
        } else {
            false
        }
    }

    /// Clamp after a structural edit shrank the list. An emptied list
    /// parks the cursor at zero.
    pub fn clamp(&mut self, shell: &SessionShell) {
        if self.slot_index >= shell.slots.len() {
            self.slot_index = shell.slots.len().saturating_sub(1);
        }
    }

    /// 1-based display number of the set being worked: one past the
    /// completed count, capped at the effective plan so the display never
    /// reads "set 4 of 3".
    pub fn current_set_number(&self, shell: &SessionShell) -> u32 {
        let completed = shell.completed_in_slot(self.slot_index);
        let planned = shell.effective_planned_sets(self.slot_index).max(1);
        (completed + 1).min(planned)
    }

    /// True when the set being worked is the last planned set of the slot
    pub fn is_last_set(&self, shell: &SessionShell) -> bool {
        shell.completed_in_slot(self.slot_index) + 1
            >= shell.effective_planned_sets(self.slot_index)
    }

    /// True when positioned on the final slot
    pub fn is_last_exercise(&self, shell: &SessionShell) -> bool {
        self.slot_index + 1 >= shell.slots.len()
    }
}
