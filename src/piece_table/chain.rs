//! The doubly-linked piece chain: a sentineled arena of [`Piece`]s.
//!
//! The arena is a `slotmap` rather than raw pointers — free-list reuse for
//! discarded pieces comes for free, and a piece-range record becomes a
//! plain `Copy` pair of keys instead of something that needs unsafe
//! aliasing to express. See catch22.net/tuts/neatpad/piece-chains/ for the
//! structure this is modeling.

use slotmap::{new_key_type, SlotMap};

use super::piece::Piece;

new_key_type! {
    pub(crate) struct PieceId;
}

#[derive(Debug)]
struct Node {
    /// `None` for the two sentinels; always `Some` for a real piece.
    piece: Option<Piece>,
    prev: Option<PieceId>,
    next: Option<PieceId>,
}

/// Either a boundary between two live neighbors, or a live, contiguous
/// subchain from `first` to `last` inclusive. Doubles as the saved
/// "piece range" record spec.md describes: a [`PieceRange`](super::
/// range::PieceRange) is one of these plus the sequence length it was
/// captured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Anchor {
    Boundary { left: PieceId, right: PieceId },
    NonBoundary { first: PieceId, last: PieceId },
}

/// Where an index resolves to, per spec.md §4.3's index-resolution rule.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Locate {
    /// Strictly inside `piece`, `offset` bytes from its start.
    Inside { piece: PieceId, offset: usize },
    /// On the boundary between `left` and `right`.
    Boundary { left: PieceId, right: PieceId },
}

#[derive(Debug)]
pub(crate) struct Chain {
    arena: SlotMap<PieceId, Node>,
    head: PieceId,
    tail: PieceId,
}

impl Chain {
    pub fn new() -> Self {
        let mut arena = SlotMap::with_key();
        let head = arena.insert(Node {
            piece: None,
            prev: None,
            next: None,
        });
        let tail = arena.insert(Node {
            piece: None,
            prev: Some(head),
            next: None,
        });
        arena[head].next = Some(tail);
        Chain { arena, head, tail }
    }

    #[inline(always)]
    pub fn head(&self) -> PieceId {
        self.head
    }

    #[inline(always)]
    pub fn tail(&self) -> PieceId {
        self.tail
    }

    #[inline(always)]
    pub fn piece(&self, id: PieceId) -> Piece {
        self.arena[id].piece.expect("piece(): sentinel has no piece")
    }

    #[inline(always)]
    pub fn next(&self, id: PieceId) -> Option<PieceId> {
        self.arena[id].next
    }

    #[inline(always)]
    pub fn prev(&self, id: PieceId) -> Option<PieceId> {
        self.arena[id].prev
    }

    /// Allocates a new, detached node. Its `prev`/`next` are unset until a
    /// splice links it in.
    pub fn alloc(&mut self, piece: Piece) -> PieceId {
        self.arena.insert(Node {
            piece: Some(piece),
            prev: None,
            next: None,
        })
    }

    /// Overwrites an already-live piece's record in place (used only for
    /// coalescing, which extends a piece without touching the chain's
    /// structure at all).
    pub fn set_piece(&mut self, id: PieceId, piece: Piece) {
        self.arena[id].piece = Some(piece);
    }

    /// Frees every node in a detached, owned `NonBoundary` range. A
    /// `Boundary` range owns no pieces (it names live neighbors) and is a
    /// no-op. Callers must only pass ranges that are not reachable from the
    /// live chain or from the opposite undo/redo stack.
    pub fn free(&mut self, anchor: Anchor) {
        if let Anchor::NonBoundary { first, last } = anchor {
            let mut cur = Some(first);
            while let Some(id) = cur {
                let next = self.arena[id].next;
                self.arena.remove(id);
                if id == last {
                    break;
                }
                cur = next;
            }
        }
    }

    /// The outer neighbors surrounding an anchor: for a boundary, that's
    /// just its two sides; for a live subchain, its outer neighbors are
    /// found through the subchain's own endpoints (which, per the dual
    /// ownership invariant, still point outward correctly even once the
    /// subchain has been detached from the chain — see `invert_splice`).
    fn outer(&self, anchor: Anchor) -> (PieceId, PieceId) {
        match anchor {
            Anchor::Boundary { left, right } => (left, right),
            Anchor::NonBoundary { first, last } => (
                self.arena[first].prev.expect("first piece has no left neighbor"),
                self.arena[last].next.expect("last piece has no right neighbor"),
            ),
        }
    }

    /// Replaces `old` with `new` in the chain. O(1): touches only the four
    /// neighbor links around the endpoints, regardless of subchain length.
    ///
    /// Four cases fall out of whether `old`/`new` are boundaries:
    /// 1. old=boundary, new=non-boundary: stitch `new` between the
    ///    boundary's two neighbors.
    /// 2. old=non-boundary, new=non-boundary: reroute `old`'s outer
    ///    neighbors through `new`.
    /// 3. old=non-boundary, new=boundary: link `old`'s outer neighbors to
    ///    each other directly.
    /// 4. old=boundary, new=boundary: no-op.
    pub fn splice_replace(&mut self, old: Anchor, new: Option<(PieceId, PieceId)>) {
        let (left, right) = self.outer(old);
        match new {
            Some((first, last)) => {
                self.arena[left].next = Some(first);
                self.arena[first].prev = Some(left);
                self.arena[last].next = Some(right);
                self.arena[right].prev = Some(last);
            }
            None => {
                self.arena[left].next = Some(right);
                self.arena[right].prev = Some(left);
            }
        }
    }

    /// The inverse of `splice_replace`, used by undo and redo alike. `saved`
    /// is a range captured before some earlier edit; this restores it into
    /// the chain and returns an `Anchor` describing whatever was just
    /// displaced, so the caller can save *that* for the opposite direction.
    pub fn invert_splice(&mut self, saved: Anchor) -> Anchor {
        let (left, right) = self.outer(saved);
        let live_first = self.arena[left].next.expect("left neighbor has no next");
        let current = if live_first == right {
            Anchor::Boundary { left, right }
        } else {
            let live_last = self.arena[right].prev.expect("right neighbor has no prev");
            Anchor::NonBoundary {
                first: live_first,
                last: live_last,
            }
        };

        let new = match saved {
            Anchor::Boundary { .. } => None,
            Anchor::NonBoundary { first, last } => Some((first, last)),
        };
        self.splice_replace(current, new);
        current
    }

    /// Links a freshly-built node's internal pointers without touching
    /// anything outside it. Used to stitch together a small new subchain
    /// (e.g. insert's left/inserted/right split) before it is handed to
    /// `splice_replace`.
    pub fn link(&mut self, a: PieceId, b: PieceId) {
        self.arena[a].next = Some(b);
        self.arena[b].prev = Some(a);
    }

    /// Grafts `new_first` onto the front of `existing`, both detached,
    /// still-linked `NonBoundary` subchains, and returns the combined
    /// anchor. Used by backward-delete coalescing: a backspacing run always
    /// removes bytes to the *left* of what it already removed, so the
    /// freshly detached subchain becomes the new left end of the saved undo
    /// record instead of being freed. `new_first`'s own `first.prev` and
    /// `existing`'s own `last.next` are left untouched — they already name
    /// the true outer neighbors of the combined range, exactly as
    /// `outer()` requires.
    pub fn prepend(&mut self, existing: Anchor, new_first: Anchor) -> Anchor {
        match (new_first, existing) {
            (
                Anchor::NonBoundary { first: nf, last: nl },
                Anchor::NonBoundary { first: ef, last: el },
            ) => {
                self.link(nl, ef);
                Anchor::NonBoundary { first: nf, last: el }
            }
            _ => unreachable!("prepend: both the graft and the existing record must be non-boundary"),
        }
    }

    /// Resolves `at` to a position in the chain, per spec.md §4.3.
    pub fn locate(&self, at: usize, len: usize) -> Locate {
        if at == 0 {
            return Locate::Boundary {
                left: self.head,
                right: self.arena[self.head].next.expect("empty chain"),
            };
        }
        if at == len {
            return Locate::Boundary {
                left: self.arena[self.tail].prev.expect("empty chain"),
                right: self.tail,
            };
        }

        let mut acc = 0;
        let mut cur = self.arena[self.head].next.expect("empty chain");
        loop {
            debug_assert!(cur != self.tail, "locate: ran off the end of the chain");
            let piece = self.piece(cur);
            if acc + piece.len > at {
                return Locate::Inside {
                    piece: cur,
                    offset: at - acc,
                };
            }
            if acc + piece.len == at {
                let right = self.arena[cur].next.expect("piece has no next");
                return Locate::Boundary { left: cur, right };
            }
            acc += piece.len;
            cur = self.arena[cur].next.expect("piece has no next");
        }
    }

    #[cfg(test)]
    pub(crate) fn to_vec(&self) -> Vec<Piece> {
        let mut out = Vec::new();
        let mut cur = self.arena[self.head].next.expect("empty chain");
        while cur != self.tail {
            out.push(self.piece(cur));
            cur = self.arena[cur].next.expect("piece has no next");
        }
        out
    }
}

impl Default for Chain {
    fn default() -> Self {
        Chain::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::buffers::BufferKind;

    fn seed(chain: &mut Chain, len: usize) -> PieceId {
        let id = chain.alloc(Piece::new(BufferKind::Original, 0, len));
        let boundary = Anchor::Boundary {
            left: chain.head(),
            right: chain.tail(),
        };
        chain.splice_replace(boundary, Some((id, id)));
        id
    }

    #[test]
    fn locate_resolves_edges_and_interior() {
        let mut chain = Chain::new();
        seed(&mut chain, 10);

        assert!(matches!(
            chain.locate(0, 10),
            Locate::Boundary { left, .. } if left == chain.head()
        ));
        assert!(matches!(
            chain.locate(10, 10),
            Locate::Boundary { right, .. } if right == chain.tail()
        ));
        assert!(matches!(chain.locate(4, 10), Locate::Inside { offset: 4, .. }));
    }

    #[test]
    fn splice_replace_then_invert_restores_old_content() {
        let mut chain = Chain::new();
        let whole = seed(&mut chain, 10);

        let old_range = Anchor::NonBoundary {
            first: whole,
            last: whole,
        };
        let replacement = chain.alloc(Piece::new(BufferKind::Add, 0, 3));
        chain.splice_replace(old_range, Some((replacement, replacement)));
        assert_eq!(chain.to_vec(), vec![Piece::new(BufferKind::Add, 0, 3)]);

        let displaced = chain.invert_splice(old_range);
        assert_eq!(chain.to_vec(), vec![Piece::new(BufferKind::Original, 0, 10)]);
        assert_eq!(
            displaced,
            Anchor::NonBoundary {
                first: replacement,
                last: replacement
            }
        );
    }

    #[test]
    fn prepend_grafts_a_second_detachment_onto_the_front_of_the_first() {
        // Models backward-delete coalescing: two adjacent pieces get
        // detached one at a time, right-to-left, and the second detachment
        // is grafted onto the first's saved record instead of being freed.
        let mut chain = Chain::new();
        let left = chain.alloc(Piece::new(BufferKind::Original, 0, 3));
        let right = chain.alloc(Piece::new(BufferKind::Original, 3, 3));
        chain.link(left, right);
        let boundary = Anchor::Boundary {
            left: chain.head(),
            right: chain.tail(),
        };
        chain.splice_replace(boundary, Some((left, right)));

        // First deletion detaches `right`, saved as the undo record.
        let right_range = Anchor::NonBoundary { first: right, last: right };
        chain.splice_replace(right_range, None);
        assert_eq!(chain.to_vec(), vec![Piece::new(BufferKind::Original, 0, 3)]);

        // Coalescing second deletion detaches `left` too.
        let left_range = Anchor::NonBoundary { first: left, last: left };
        chain.splice_replace(left_range, None);
        assert_eq!(chain.to_vec(), Vec::<Piece>::new());

        let merged = chain.prepend(right_range, left_range);
        assert_eq!(merged, Anchor::NonBoundary { first: left, last: right });

        // Undoing the coalesced run restores both pieces, in order, with no
        // dangling reference into either freed or still-live arena slot.
        let displaced = chain.invert_splice(merged);
        assert_eq!(
            chain.to_vec(),
            vec![
                Piece::new(BufferKind::Original, 0, 3),
                Piece::new(BufferKind::Original, 3, 3),
            ]
        );
        assert!(matches!(
            displaced,
            Anchor::Boundary { left: l, right: r } if l == chain.head() && r == chain.tail()
        ));
    }
}
