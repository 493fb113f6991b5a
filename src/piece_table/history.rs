use super::range::PieceRange;

/// What the last mutating call was, used to decide whether the next one
/// coalesces into it. Folded onto the table's own state (spec.md §9): the
/// original source kept this as static locals inside the insert/delete
/// functions, which an explicit engine handle replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LastAction {
    Insert,
    Delete,
    None,
}

/// Undo/redo stacks plus the coalescing cursors that decide whether a new
/// edit extends the top of the undo stack instead of pushing onto it.
#[derive(Debug)]
pub(crate) struct History {
    undo: Vec<PieceRange>,
    redo: Vec<PieceRange>,
    last_action: LastAction,
    /// End index of the most recent insert; typing at this index again
    /// extends the pending piece instead of starting a new one.
    previous_end_index: Option<usize>,
    /// Start index of the most recent delete; backspacing into this index
    /// extends the pending removed range instead of starting a new one.
    previous_delete_index: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        History {
            undo: Vec::new(),
            redo: Vec::new(),
            last_action: LastAction::None,
            previous_end_index: None,
            previous_delete_index: None,
        }
    }

    /// Any caller-level operation that is not itself a coalescable
    /// insert/delete must call this to stop fusion (spec.md §9).
    pub fn break_coalescing(&mut self) {
        self.last_action = LastAction::None;
    }

    pub fn push_undo(&mut self, range: PieceRange) {
        self.undo.push(range);
    }

    pub fn peek_undo_mut(&mut self) -> Option<&mut PieceRange> {
        self.undo.last_mut()
    }

    pub fn pop_undo(&mut self) -> Option<PieceRange> {
        self.undo.pop()
    }

    pub fn push_redo(&mut self, range: PieceRange) {
        self.redo.push(range);
    }

    pub fn pop_redo(&mut self) -> Option<PieceRange> {
        self.redo.pop()
    }

    /// Any new mutation clears the redo stack (spec.md §4.3/§4.4). Returns
    /// the discarded ranges so the caller can free the pieces they
    /// uniquely owned.
    pub fn drain_redo(&mut self) -> Vec<PieceRange> {
        if self.redo.is_empty() {
            Vec::new()
        } else {
            log::debug!("discarding {} redo record(s)", self.redo.len());
            self.redo.drain(..).collect()
        }
    }

    pub fn note_insert(&mut self, end_index: usize) {
        self.last_action = LastAction::Insert;
        self.previous_end_index = Some(end_index);
    }

    pub fn note_delete(&mut self, start_index: usize) {
        self.last_action = LastAction::Delete;
        self.previous_delete_index = Some(start_index);
    }

    /// True when an insert at `at` should extend the piece the previous
    /// insert grew, instead of splicing in a new one.
    pub fn can_coalesce_insert(&self, at: usize) -> bool {
        self.last_action == LastAction::Insert && self.previous_end_index == Some(at)
    }

    /// True when a delete whose range ends at `end` should extend the
    /// previous delete's undo record instead of pushing a new one.
    pub fn can_coalesce_delete(&self, end: usize) -> bool {
        self.last_action == LastAction::Delete && self.previous_delete_index == Some(end)
    }
}

impl Default for History {
    fn default() -> Self {
        History::new()
    }
}
