//! Bounded frame queues.
//!
//! A [`FrameQueue`] is a fixed ring of frame ownership slots with
//! wraparound indices. Exactly one server owns and mutates each queue; the
//! consumer side drains through the owning server's API, so there is no
//! cross-task mutation of queue internals. Depth never exceeds the bound:
//! a full queue applies the configured [`OverflowPolicy`] instead of
//! growing.

use crate::config::OverflowPolicy;

/// Result of offering a frame to a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PushOutcome {
    /// Frame stored in a free slot
    Stored,
    /// Frame stored after evicting the oldest entry
    StoredEvicted,
    /// Queue full and the policy rejected the incoming frame
    Rejected,
}

/// One frame ownership slot: length-prefixed byte storage.
#[derive(Debug)]
struct FrameSlot<const BUF: usize> {
    len: usize,
    data: [u8; BUF],
}

impl<const BUF: usize> FrameSlot<BUF> {
    fn new() -> Self {
        Self {
            len: 0,
            data: [0; BUF],
        }
    }
}

/// Bounded, ordered ring of frame slots.
///
/// `DEPTH` is the queue bound, `BUF` the per-slot byte capacity.
#[derive(Debug)]
pub struct FrameQueue<const DEPTH: usize, const BUF: usize> {
    slots: [FrameSlot<BUF>; DEPTH],
    read: usize,
    len: usize,
}

impl<const DEPTH: usize, const BUF: usize> FrameQueue<DEPTH, BUF> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| FrameSlot::new()),
            read: 0,
            len: 0,
        }
    }

    /// Number of queued frames.
    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no frames are queued.
    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the depth bound is reached.
    #[inline(always)]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == DEPTH
    }

    /// The configured depth bound.
    #[inline(always)]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        DEPTH
    }

    /// Per-slot byte capacity.
    #[inline(always)]
    #[must_use]
    pub const fn buf_size(&self) -> usize {
        BUF
    }

    /// Offer a frame, applying `policy` when full.
    ///
    /// `bytes` must fit in a slot; callers validate length beforehand.
    pub fn push_frame(&mut self, bytes: &[u8], policy: OverflowPolicy) -> PushOutcome {
        debug_assert!(bytes.len() <= BUF);

        let evicted = if self.is_full() {
            match policy {
                OverflowPolicy::DropNew => return PushOutcome::Rejected,
                OverflowPolicy::EvictOldest => {
                    self.pop();
                    true
                }
            }
        } else {
            false
        };

        let write = (self.read + self.len) % DEPTH;
        let slot = &mut self.slots[write];
        slot.data[..bytes.len()].copy_from_slice(bytes);
        slot.len = bytes.len();
        self.len += 1;

        if evicted {
            PushOutcome::StoredEvicted
        } else {
            PushOutcome::Stored
        }
    }

    /// Borrow the oldest queued frame, if any.
    #[must_use]
    pub fn front(&self) -> Option<&[u8]> {
        if self.is_empty() {
            return None;
        }
        let slot = &self.slots[self.read];
        Some(&slot.data[..slot.len])
    }

    /// Discard the oldest queued frame. Returns `false` when empty.
    pub fn pop(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.read = (self.read + 1) % DEPTH;
        self.len -= 1;
        true
    }
}

impl<const DEPTH: usize, const BUF: usize> Default for FrameQueue<DEPTH, BUF> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
