use super::chain::Anchor;

/// A saved splice record: spec.md §3's "piece range" plus the sequence
/// length the document had immediately before the splice that produced it.
/// That length is what lets undo/redo walk the length history back and
/// forth without recomputing it from the chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PieceRange {
    pub(crate) anchor: Anchor,
    pub(crate) seq_len_before: usize,
}

impl PieceRange {
    pub fn new(anchor: Anchor, seq_len_before: usize) -> Self {
        PieceRange {
            anchor,
            seq_len_before,
        }
    }
}
