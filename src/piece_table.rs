//! The piece table: an append-only add buffer plus a doubly-linked chain of
//! pieces over it and the original buffer, with bounded-memory undo/redo.

mod buffers;
mod chain;
mod history;
mod piece;
mod range;

use buffers::{AddBuffer, BufferKind, OriginalBuffer};
use chain::{Anchor, Chain, Locate};
use history::History;
use piece::Piece;
use range::PieceRange;

/// An in-memory editable byte sequence backed by a piece table.
///
/// `PieceTable` owns the bytes it is constructed from; there is no fallible
/// boundary on the operations below — out-of-range indices are caller bugs
/// and are caught by `debug_assert!` rather than threaded through `Result`.
#[derive(Debug)]
pub struct PieceTable {
    original: OriginalBuffer,
    add: AddBuffer,
    chain: Chain,
    history: History,
    len: usize,
}

impl PieceTable {
    /// Adopts `original` as the document's initial content. No copy: the
    /// whole buffer becomes the first (and, until the first edit, only)
    /// piece.
    pub fn new(original: Vec<u8>) -> Self {
        let len = original.len();
        let mut chain = Chain::new();
        if len > 0 {
            let id = chain.alloc(Piece::new(BufferKind::Original, 0, len));
            let boundary = Anchor::Boundary {
                left: chain.head(),
                right: chain.tail(),
            };
            chain.splice_replace(boundary, Some((id, id)));
        }

        PieceTable {
            original: OriginalBuffer::new(original),
            add: AddBuffer::new(),
            chain,
            history: History::new(),
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `bytes` at index `at`. `at == len()` appends.
    pub fn insert(&mut self, at: usize, bytes: &[u8]) {
        debug_assert!(at <= self.len, "insert: {at} over length {}", self.len);
        if bytes.is_empty() {
            return;
        }

        self.discard_redo();

        let len = bytes.len();
        let len_before = self.len;
        let locate = self.chain.locate(at, self.len);

        let coalesce_onto = match locate {
            Locate::Boundary { left, .. } if left != self.chain.head() => {
                let lp = self.chain.piece(left);
                let adjoins = lp.kind == BufferKind::Add && self.add.is_tail(lp.offset, lp.len);
                (self.history.can_coalesce_insert(at) && adjoins).then_some(left)
            }
            _ => None,
        };

        let add_offset = self.add.append(bytes);

        if let Some(left) = coalesce_onto {
            let mut grown = self.chain.piece(left);
            grown.len += len;
            self.chain.set_piece(left, grown);
        } else {
            match locate {
                Locate::Inside { piece, offset } => {
                    // The whole piece being split becomes the undo record,
                    // untouched; left/inserted/right are brand new nodes.
                    let old_range = Anchor::NonBoundary {
                        first: piece,
                        last: piece,
                    };
                    self.history
                        .push_undo(PieceRange::new(old_range, len_before));

                    let mut left_piece = self.chain.piece(piece);
                    let right_piece = left_piece.split_left(offset);
                    let left_id = self.chain.alloc(left_piece);
                    let ins_id = self.chain.alloc(Piece::new(BufferKind::Add, add_offset, len));
                    let right_id = self.chain.alloc(right_piece);
                    self.chain.link(left_id, ins_id);
                    self.chain.link(ins_id, right_id);
                    self.chain.splice_replace(old_range, Some((left_id, right_id)));
                }
                Locate::Boundary { left, right } => {
                    let old_range = Anchor::Boundary { left, right };
                    self.history
                        .push_undo(PieceRange::new(old_range, len_before));

                    let ins_id = self.chain.alloc(Piece::new(BufferKind::Add, add_offset, len));
                    self.chain.splice_replace(old_range, Some((ins_id, ins_id)));
                }
            }
        }

        self.len += len;
        self.history.note_insert(at + len);
        log::trace!("insert({at}, {len} bytes) -> length {}", self.len);
    }

    /// Removes the `len` bytes starting at `at`.
    pub fn delete(&mut self, at: usize, len: usize) {
        debug_assert!(
            at + len <= self.len,
            "delete: {at}..{} over length {}",
            at + len,
            self.len
        );
        if len == 0 {
            return;
        }

        self.discard_redo();
        let len_before = self.len;
        let removed = self.delete_general(at, len);

        if self.history.can_coalesce_delete(at + len) {
            // A backspacing run only ever extends further left, so the
            // pieces this call just detached sit immediately in front of
            // the ones the previous (coalesced) delete already saved.
            // Graft them on instead of freeing them — freeing would leave
            // the saved record's own left endpoint pointing at an arena
            // slot that no longer exists.
            let top_anchor = self
                .history
                .peek_undo_mut()
                .expect("can_coalesce_delete implies a prior undo record")
                .anchor;
            let merged = self.chain.prepend(top_anchor, removed);
            self.history.peek_undo_mut().unwrap().anchor = merged;
        } else {
            self.history
                .push_undo(PieceRange::new(removed, len_before));
        }

        self.len -= len;
        self.history.note_delete(at);
        log::trace!("delete({at}, {len}) -> length {}", self.len);
    }

    /// Overwrites the `bytes.len()` bytes starting at `at` with `bytes`, as
    /// one undo unit. Document length is unchanged.
    pub fn replace(&mut self, at: usize, bytes: &[u8]) {
        let len = bytes.len();
        debug_assert!(
            at + len <= self.len,
            "replace: {at}..{} over length {}",
            at + len,
            self.len
        );
        if len == 0 {
            return;
        }

        self.discard_redo();
        let len_before = self.len;

        let removed = self.delete_general(at, len);
        self.len -= len;

        let add_offset = self.add.append(bytes);
        let Locate::Boundary { left, right } = self.chain.locate(at, self.len) else {
            unreachable!("replace: delete_general always leaves a boundary at `at`");
        };
        let ins_id = self.chain.alloc(Piece::new(BufferKind::Add, add_offset, len));
        self.chain
            .splice_replace(Anchor::Boundary { left, right }, Some((ins_id, ins_id)));
        self.len += len;

        self.history
            .push_undo(PieceRange::new(removed, len_before));
        self.history.break_coalescing();
        log::trace!("replace({at}, {len} bytes)");
    }

    /// Copies up to `dest.len()` bytes starting at `at` into `dest`, and
    /// returns how many were actually copied (fewer than `dest.len()` only
    /// when `at + dest.len()` runs past the end of the document).
    pub fn get_chars(&self, dest: &mut [u8], at: usize) -> usize {
        debug_assert!(at <= self.len, "get_chars: {at} over length {}", self.len);
        let to_copy = dest.len().min(self.len.saturating_sub(at));
        if to_copy == 0 {
            return 0;
        }

        let locate = self.chain.locate(at, self.len);
        let (mut cur, mut in_piece_offset) = match locate {
            Locate::Inside { piece, offset } => (piece, offset),
            Locate::Boundary { right, .. } => (right, 0),
        };

        let mut copied = 0;
        while copied < to_copy {
            let piece = self.chain.piece(cur);
            let take = (piece.len - in_piece_offset).min(to_copy - copied);
            let src = self.slice_of(piece, in_piece_offset, take);
            dest[copied..copied + take].copy_from_slice(src);

            copied += take;
            in_piece_offset = 0;
            if copied < to_copy {
                cur = self.chain.next(cur).expect("get_chars ran past tail");
            }
        }
        copied
    }

    /// Writes the whole document to `sink`, piece by piece.
    pub fn write_to<W: std::io::Write>(&self, sink: &mut W) -> std::io::Result<()> {
        let mut cur = self
            .chain
            .next(self.chain.head())
            .expect("chain always has a next after head");
        while cur != self.chain.tail() {
            let piece = self.chain.piece(cur);
            sink.write_all(self.slice_of(piece, 0, piece.len))?;
            cur = self.chain.next(cur).expect("piece has no next");
        }
        Ok(())
    }

    /// Undoes the most recent (possibly coalesced) edit. Returns `false`
    /// with no effect if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(range) = self.history.pop_undo() else {
            return false;
        };
        let len_before = self.len;
        let displaced = self.chain.invert_splice(range.anchor);
        self.len = range.seq_len_before;
        self.history
            .push_redo(PieceRange::new(displaced, len_before));
        self.history.break_coalescing();
        log::debug!("undo -> length {}", self.len);
        true
    }

    /// Redoes the most recently undone edit. Returns `false` with no effect
    /// if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(range) = self.history.pop_redo() else {
            return false;
        };
        let len_before = self.len;
        let displaced = self.chain.invert_splice(range.anchor);
        self.len = range.seq_len_before;
        self.history
            .push_undo(PieceRange::new(displaced, len_before));
        self.history.break_coalescing();
        log::debug!("redo -> length {}", self.len);
        true
    }

    /// The shared core of delete and replace: removes `len` bytes starting
    /// at `at` from the live chain in a single splice and returns an
    /// `Anchor` over the displaced pieces, untouched, for use as an undo
    /// record — the same "detachment doesn't rewrite the range's own
    /// endpoints" property that makes `invert_splice` self-contained means
    /// this can hand back `first`/`last` exactly as they were linked, with
    /// no need to carve out just the removed sub-range.
    fn delete_general(&mut self, at: usize, len: usize) -> Anchor {
        let locate = self.chain.locate(at, self.len);
        let (first, first_offset) = match locate {
            Locate::Inside { piece, offset } => (piece, offset),
            Locate::Boundary { right, .. } => (right, 0),
        };

        let mut remaining = len;
        let mut cur = first;
        loop {
            let piece = self.chain.piece(cur);
            let start_off = if cur == first { first_offset } else { 0 };
            let avail = piece.len - start_off;
            if avail >= remaining {
                break;
            }
            remaining -= avail;
            cur = self
                .chain
                .next(cur)
                .expect("delete range runs past the end of the document");
        }
        let last = cur;
        let last_piece = self.chain.piece(last);
        let last_start_off = if last == first { first_offset } else { 0 };
        let last_end_off = last_start_off + remaining;

        let mut keep_left = None;
        if first_offset > 0 {
            let p = self.chain.piece(first);
            keep_left = Some(
                self.chain
                    .alloc(Piece::new(p.kind, p.offset, first_offset)),
            );
        }
        let mut keep_right = None;
        if last_end_off < last_piece.len {
            let mut p = last_piece;
            p.split_right(last_end_off);
            keep_right = Some(self.chain.alloc(p));
        }

        let old_range = Anchor::NonBoundary { first, last };
        let new_content = match (keep_left, keep_right) {
            (Some(l), Some(r)) => {
                self.chain.link(l, r);
                Some((l, r))
            }
            (Some(l), None) => Some((l, l)),
            (None, Some(r)) => Some((r, r)),
            (None, None) => None,
        };
        self.chain.splice_replace(old_range, new_content);
        old_range
    }

    fn discard_redo(&mut self) {
        for range in self.history.drain_redo() {
            self.chain.free(range.anchor);
        }
    }

    fn slice_of(&self, piece: Piece, offset: usize, len: usize) -> &[u8] {
        match piece.kind {
            BufferKind::Original => self.original.slice(piece.offset + offset, len),
            BufferKind::Add => self.add.slice(piece.offset + offset, len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(table: &PieceTable) -> String {
        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn build_hello_world_from_inserts() {
        let mut t = PieceTable::new(Vec::new());
        t.insert(0, b"Hello");
        t.insert(5, b" world");
        assert_eq!(text(&t), "Hello world");
        assert_eq!(t.len(), 11);
    }

    #[test]
    fn middle_insert_then_undo_redo() {
        let mut t = PieceTable::new(b"Hello world".to_vec());
        t.insert(5, b",");
        assert_eq!(text(&t), "Hello, world");
        assert!(t.undo());
        assert_eq!(text(&t), "Hello world");
        assert!(t.redo());
        assert_eq!(text(&t), "Hello, world");
        assert!(!t.redo());
    }

    #[test]
    fn coalesced_typing_is_one_undo_unit() {
        let mut t = PieceTable::new(Vec::new());
        t.insert(0, b"H");
        t.insert(1, b"i");
        t.insert(2, b"!");
        assert_eq!(text(&t), "Hi!");
        assert!(t.undo());
        assert_eq!(text(&t), "");
        assert!(!t.undo());
    }

    #[test]
    fn coalesced_backspace_is_one_undo_unit() {
        let mut t = PieceTable::new(b"   Helloworlds".to_vec());
        t.delete(2, 1);
        t.delete(1, 1);
        t.delete(0, 1);
        assert_eq!(text(&t), "Helloworlds");
        assert_eq!(t.len(), 11);
        assert!(t.undo());
        assert_eq!(text(&t), "   Helloworlds");
        assert_eq!(t.len(), 14);
        assert!(!t.undo());
    }

    #[test]
    fn delete_then_undo_round_trips() {
        let mut t = PieceTable::new(b"Hello world".to_vec());
        t.delete(5, 6);
        assert_eq!(text(&t), "Hello");
        assert!(t.undo());
        assert_eq!(text(&t), "Hello world");
    }

    #[test]
    fn new_edit_after_undo_clears_redo() {
        let mut t = PieceTable::new(Vec::new());
        t.insert(0, b"A");
        t.insert(1, b"B");
        assert!(t.undo());
        t.insert(1, b"C");
        assert_eq!(text(&t), "AC");
        assert!(!t.redo());
    }

    #[test]
    fn replace_is_a_single_undo_unit() {
        let mut t = PieceTable::new(b"Hello world".to_vec());
        t.replace(6, b"Rust!");
        assert_eq!(text(&t), "Hello Rust!");
        assert!(t.undo());
        assert_eq!(text(&t), "Hello world");
        assert!(t.redo());
        assert_eq!(text(&t), "Hello Rust!");
    }

    #[test]
    fn get_chars_reads_across_piece_boundaries() {
        let mut t = PieceTable::new(b"Hello".to_vec());
        t.insert(5, b" world");
        let mut buf = [0u8; 11];
        let n = t.get_chars(&mut buf, 0);
        assert_eq!(n, 11);
        assert_eq!(&buf, b"Hello world");

        let mut tail = [0u8; 20];
        let n = t.get_chars(&mut tail, 8);
        assert_eq!(n, 3);
        assert_eq!(&tail[..3], b"rld");
    }

    #[test]
    fn delete_spanning_multiple_pieces() {
        let mut t = PieceTable::new(b"Hello".to_vec());
        t.insert(5, b" world");
        t.insert(11, b"!!!");
        // "Hello world!!!" across three pieces; delete across all of them.
        t.delete(3, 10);
        assert_eq!(text(&t), "Hel!");
        assert!(t.undo());
        assert_eq!(text(&t), "Hello world!!!");
    }

    #[test]
    fn coalesced_backspace_across_a_piece_boundary_undoes_without_panicking() {
        // Backspacing across the left edge of the first coalesced delete
        // used to free the pieces it needed to restore later, leaving the
        // saved undo record pointing at a freed arena slot.
        let mut t = PieceTable::new(b"abcdef".to_vec());
        t.insert(3, b"XYZ"); // "abc" | "XYZ"(add) | "def"
        t.delete(6, 1); // remove 'd': undo record = {"def"-piece}
        t.delete(5, 1); // backspace 'Z': coalesces, detaches the "XYZ" piece
        assert_eq!(text(&t), "abcXYef");

        assert!(t.undo());
        assert_eq!(text(&t), "abcXYZdef");

        assert!(t.undo());
        assert_eq!(text(&t), "abcdef");
        assert!(!t.undo());
    }
}
