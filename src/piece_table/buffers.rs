/// Which of the two backing buffers a [`Piece`](super::piece::Piece) indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BufferKind {
    Original,
    Add,
}

/// The immutable buffer adopted at construction. Never grows, never shrinks.
#[derive(Debug)]
pub(crate) struct OriginalBuffer {
    bytes: Vec<u8>,
}

impl OriginalBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        OriginalBuffer { bytes }
    }

    #[inline(always)]
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.bytes[offset..offset + len]
    }
}

/// The append-only buffer. Existing bytes are never overwritten, shrunk or
/// reordered, even across undo — only new pieces stop referencing them.
#[derive(Debug, Default)]
pub(crate) struct AddBuffer {
    bytes: Vec<u8>,
}

impl AddBuffer {
    pub fn new() -> Self {
        AddBuffer { bytes: Vec::new() }
    }

    #[inline(always)]
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.bytes[offset..offset + len]
    }

    /// Appends `bytes` and returns the pre-append length, i.e. the offset a
    /// new [`Piece`](super::piece::Piece) should record.
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let offset = self.bytes.len();
        self.bytes.extend_from_slice(bytes);
        offset
    }

    /// True when the piece at `(offset, len)` ends exactly where the add
    /// buffer currently ends, i.e. it is the most recent append and can be
    /// grown in place instead of being followed by a new piece.
    #[inline(always)]
    pub fn is_tail(&self, offset: usize, len: usize) -> bool {
        offset + len == self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_pre_append_offset() {
        let mut add = AddBuffer::new();
        assert_eq!(add.append(b"foo"), 0);
        assert_eq!(add.append(b"bar"), 3);
        assert_eq!(add.slice(3, 3), b"bar");
    }

    #[test]
    fn is_tail_only_true_for_the_most_recent_append() {
        let mut add = AddBuffer::new();
        add.append(b"foo");
        assert!(add.is_tail(0, 3));
        add.append(b"bar");
        assert!(!add.is_tail(0, 3));
        assert!(add.is_tail(3, 3));
    }
}
