//! Lock-free single-producer/single-consumer ring buffer over a fixed
//! power-of-two byte array.
//!
//! Indices wrap through a bitmask; one slot is always sacrificed so that
//! `head == tail` unambiguously means empty. Within one buffer instance a
//! single owner mutates `head` and a single (possibly different) owner
//! mutates `tail`; both are machine words so index updates do not tear
//! under interrupt preemption.

/// Fixed-capacity circular byte buffer.
pub struct RingBuffer<const N: usize> {
    head: usize,
    tail: usize,
    data: [u8; N],
}

impl<const N: usize> RingBuffer<N> {
    const MASK: usize = N - 1;
    const POWER_OF_TWO: () = assert!(N.is_power_of_two(), "ring size must be a power of two");

    #[must_use]
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::POWER_OF_TWO;
        Self {
            head: 0,
            tail: 0,
            data: [0; N],
        }
    }

    /// Bytes readable between an arbitrary producer position and a consumer
    /// position. This is the same arithmetic the instance methods use; it is
    /// exposed so callers can reason about an external producer (the DMA
    /// write position) before committing it as the new head.
    #[inline]
    #[must_use]
    pub const fn count_between(head: usize, tail: usize) -> usize {
        head.wrapping_sub(tail) & Self::MASK
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        Self::count_between(self.head, self.tail)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Free space; one slot short of the array size when empty.
    #[inline]
    #[must_use]
    pub const fn space(&self) -> usize {
        Self::count_between(self.tail, self.head.wrapping_add(1))
    }

    /// Bytes contiguously readable from `tail` before wraparound.
    #[inline]
    #[must_use]
    pub const fn len_to_end(&self) -> usize {
        let len = self.len();
        let to_end = N - self.tail;
        if len < to_end {
            len
        } else {
            to_end
        }
    }

    /// Bytes contiguously writable at `head` before wraparound.
    #[inline]
    #[must_use]
    pub const fn space_to_end(&self) -> usize {
        let space = self.space();
        let to_end = N - self.head;
        if space < to_end {
            space
        } else {
            to_end
        }
    }

    #[inline]
    #[must_use]
    pub const fn head(&self) -> usize {
        self.head
    }

    #[inline]
    #[must_use]
    pub const fn tail(&self) -> usize {
        self.tail
    }

    /// The contiguous readable span starting at `tail`.
    #[inline]
    #[must_use]
    pub fn read_span(&self) -> &[u8] {
        &self.data[self.tail..self.tail + self.len_to_end()]
    }

    /// The contiguous writable span starting at `head`.
    #[inline]
    pub fn write_span(&mut self) -> &mut [u8] {
        let n = self.space_to_end();
        &mut self.data[self.head..self.head + n]
    }

    /// Producer commit after writing into [`Self::write_span`].
    #[inline]
    pub fn advance_head(&mut self, n: usize) {
        self.head = (self.head + n) & Self::MASK;
    }

    /// Consumer commit after reading from [`Self::read_span`] or [`Self::peek`].
    #[inline]
    pub fn advance_tail(&mut self, n: usize) {
        self.tail = (self.tail + n) & Self::MASK;
    }

    /// Resynchronize the producer index to an externally tracked position.
    #[inline]
    pub fn set_head(&mut self, pos: usize) {
        self.head = pos & Self::MASK;
    }

    /// Empty the buffer at an arbitrary position. Used when handing the
    /// buffer between owners while an external producer keeps its own
    /// position counter.
    #[inline]
    pub fn reset_to(&mut self, pos: usize) {
        self.head = pos & Self::MASK;
        self.tail = self.head;
    }

    #[inline]
    pub fn clear(&mut self) {
        self.reset_to(0);
    }

    /// Copy in as much of `bytes` as fits, advancing `head`. Returns the
    /// number of bytes accepted.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        let mut written = 0;
        while written < bytes.len() {
            let span = self.write_span();
            if span.is_empty() {
                break;
            }
            let n = span.len().min(bytes.len() - written);
            span[..n].copy_from_slice(&bytes[written..written + n]);
            self.advance_head(n);
            written += n;
        }
        written
    }

    /// Copy in all of `bytes`, discarding the oldest data when space runs
    /// out. Lossy by design; used for diagnostic text where the newest
    /// output is the valuable part.
    pub fn push_overwrite(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(N - 1) {
            let short = chunk.len().saturating_sub(self.space());
            if short > 0 {
                self.advance_tail(short);
            }
            self.push(chunk);
        }
    }

    /// Copy up to `out.len()` bytes without consuming them.
    pub fn peek(&self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len());
        let first = n.min(self.len_to_end());
        out[..first].copy_from_slice(&self.data[self.tail..self.tail + first]);
        if n > first {
            out[first..n].copy_from_slice(&self.data[..n - first]);
        }
        n
    }

    /// Copy out and consume up to `out.len()` bytes.
    pub fn pop(&mut self, out: &mut [u8]) -> usize {
        let n = self.peek(out);
        self.advance_tail(n);
        n
    }

    /// Raw write at an absolute position without touching either index —
    /// the DMA writer role. The caller owns position bookkeeping and
    /// resynchronizes `head` separately.
    pub fn deposit(&mut self, pos: usize, bytes: &[u8]) {
        let mut at = pos & Self::MASK;
        for &b in bytes {
            self.data[at] = b;
            at = (at + 1) & Self::MASK;
        }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_full() {
        let mut buf: RingBuffer<8> = RingBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.space(), 7);
        assert_eq!(buf.push(&[0; 16]), 7);
        assert_eq!(buf.len(), 7);
        assert_eq!(buf.space(), 0);
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_len_plus_space_is_invariant() {
        // count(head,tail) + count(tail,head+1) == size-1 for any state
        let mut buf: RingBuffer<16> = RingBuffer::new();
        let mut out = [0u8; 16];
        for step in 0..100 {
            let n = (step * 7) % 5 + 1;
            buf.push(&[step as u8; 8][..n.min(8)]);
            assert_eq!(buf.len() + buf.space(), 15);
            let m = (step * 3) % 4;
            buf.pop(&mut out[..m]);
            assert_eq!(buf.len() + buf.space(), 15);
        }
    }

    #[test]
    fn test_nonempty_push_never_looks_empty() {
        let mut buf: RingBuffer<8> = RingBuffer::new();
        for i in 0..64 {
            buf.push(&[i as u8]);
            assert!(!buf.is_empty());
            let mut b = [0u8; 1];
            buf.pop(&mut b);
        }
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let mut buf: RingBuffer<8> = RingBuffer::new();
        let mut out = [0u8; 8];
        buf.push(&[1, 2, 3, 4, 5]);
        assert_eq!(buf.pop(&mut out[..3]), 3);
        assert_eq!(out[..3], [1, 2, 3]);
        buf.push(&[6, 7, 8, 9]);
        let n = buf.pop(&mut out);
        assert_eq!(out[..n], [4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_contiguous_spans() {
        let mut buf: RingBuffer<8> = RingBuffer::new();
        buf.push(&[1, 2, 3, 4, 5, 6]);
        let mut out = [0u8; 8];
        buf.pop(&mut out[..5]);
        buf.push(&[7, 8, 9]);
        // tail = 5, head = 1: readable span stops at the array end
        assert_eq!(buf.len_to_end(), 3);
        assert_eq!(buf.read_span(), &[6, 7, 8]);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_push_overwrite_keeps_newest() {
        let mut buf: RingBuffer<8> = RingBuffer::new();
        buf.push_overwrite(&[1, 2, 3, 4, 5]);
        buf.push_overwrite(&[6, 7, 8, 9]);
        // 9 bytes through a 7-slot buffer: the oldest two are gone
        let mut out = [0u8; 8];
        let n = buf.pop(&mut out);
        assert_eq!(out[..n], [3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_push_overwrite_larger_than_buffer() {
        let mut buf: RingBuffer<8> = RingBuffer::new();
        let bytes: [u8; 20] = core::array::from_fn(|i| i as u8);
        buf.push_overwrite(&bytes);
        let mut out = [0u8; 8];
        let n = buf.pop(&mut out);
        assert_eq!(n, 7);
        assert_eq!(out[..n], [13, 14, 15, 16, 17, 18, 19]);
    }

    #[test]
    fn test_deposit_then_resync() {
        let mut buf: RingBuffer<8> = RingBuffer::new();
        buf.deposit(6, &[1, 2, 3, 4]);
        assert!(buf.is_empty());
        buf.reset_to(6);
        buf.set_head(2); // producer wrote 6..=7, 0..=1
        let mut out = [0u8; 8];
        let n = buf.pop(&mut out);
        assert_eq!(out[..n], [1, 2, 3, 4]);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut buf: RingBuffer<8> = RingBuffer::new();
        buf.push(&[10, 11, 12]);
        let mut out = [0u8; 3];
        assert_eq!(buf.peek(&mut out), 3);
        assert_eq!(out, [10, 11, 12]);
        assert_eq!(buf.len(), 3);
    }
}
