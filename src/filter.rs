//! Destination MAC address filtering.
//!
//! Each receive queue binds one [`FilterRule`] through an [`AddressFilter`]
//! that taps the shared symbol stream. The filter inspects only the first
//! six bytes of a frame (the destination address) and produces an early
//! accept/reject verdict before the body has arrived, so rejected frames
//! cost no per-queue buffering. Acceptance is evaluated in order:
//!
//! 1. Exact match against the rule's unicast address
//! 2. Broadcast (all-ones), if enabled
//! 3. The multicast acceptance list
//!
//! First match wins; no match rejects. Rules are fixed at construction:
//! changing a rule set means quiescing the receive server and rebuilding it.

use heapless::Vec;

use crate::constants::{BROADCAST_ADDR, MAC_ADDR_LEN, MAX_MULTICAST_ENTRIES};
use crate::error::ConfigError;

/// Check for the all-ones broadcast address.
#[must_use]
pub const fn is_broadcast(addr: &[u8; 6]) -> bool {
    addr[0] == 0xFF
        && addr[1] == 0xFF
        && addr[2] == 0xFF
        && addr[3] == 0xFF
        && addr[4] == 0xFF
        && addr[5] == 0xFF
}

/// Check the group bit (bit 0 of the first byte) of an address.
#[must_use]
pub const fn is_multicast(addr: &[u8; 6]) -> bool {
    addr[0] & 0x01 != 0
}

// =============================================================================
// Filter Rules
// =============================================================================

/// One consumer's address acceptance rule set.
///
/// The unicast address is either explicit or left defaulted, in which
/// case the receive server substitutes the interface's configured MAC
/// address at construction. Mutated only before the receive server is
/// built; read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRule {
    unicast: Option<[u8; MAC_ADDR_LEN]>,
    broadcast: bool,
    multicast: Vec<[u8; MAC_ADDR_LEN], MAX_MULTICAST_ENTRIES>,
}

impl FilterRule {
    /// Rule accepting the interface's own MAC address.
    ///
    /// The address is resolved from the configuration when the receive
    /// server is built.
    #[must_use]
    pub fn own() -> Self {
        Self {
            unicast: None,
            broadcast: false,
            multicast: Vec::new(),
        }
    }

    /// Rule accepting exactly one explicit unicast address.
    #[must_use]
    pub fn unicast(addr: [u8; 6]) -> Self {
        Self {
            unicast: Some(addr),
            broadcast: false,
            multicast: Vec::new(),
        }
    }

    /// Substitute the interface MAC for a defaulted unicast address.
    pub(crate) fn resolve(mut self, own_mac: [u8; 6]) -> Self {
        if self.unicast.is_none() {
            self.unicast = Some(own_mac);
        }
        self
    }

    /// Enable or disable broadcast acceptance.
    #[must_use]
    pub fn with_broadcast(mut self, accept: bool) -> Self {
        self.broadcast = accept;
        self
    }

    /// Add a multicast group address to the acceptance list.
    ///
    /// # Errors
    /// - `MulticastListFull` - the bounded list has no free entries
    pub fn add_multicast(&mut self, addr: [u8; 6]) -> Result<(), ConfigError> {
        self.multicast
            .push(addr)
            .map_err(|_| ConfigError::MulticastListFull)
    }

    /// The rule's unicast address, or `None` while still defaulted.
    #[must_use]
    pub fn unicast_addr(&self) -> Option<[u8; 6]> {
        self.unicast
    }

    /// Whether broadcast frames are accepted.
    #[must_use]
    pub fn accepts_broadcast(&self) -> bool {
        self.broadcast
    }

    /// Number of multicast entries configured.
    #[must_use]
    pub fn multicast_count(&self) -> usize {
        self.multicast.len()
    }

    /// Evaluate the rule against a destination address.
    ///
    /// Order: unicast exact match, broadcast, multicast list. First match
    /// wins.
    #[must_use]
    pub fn matches(&self, dest: &[u8; 6]) -> bool {
        if self.unicast == Some(*dest) {
            return true;
        }
        if self.broadcast && is_broadcast(dest) {
            return true;
        }
        self.multicast.iter().any(|m| m == dest)
    }
}

// =============================================================================
// Per-Frame Filter State
// =============================================================================

/// Filtering decision for the frame in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// Destination address not yet complete
    Undecided,
    /// Frame is addressed to this consumer
    Accept,
    /// Frame is not for this consumer; drain without copying
    Reject,
}

/// Streaming address filter bound to one queue's tap.
///
/// Holds O(1) state per frame: the six destination bytes and the verdict.
#[derive(Debug, Clone)]
pub struct AddressFilter {
    rule: FilterRule,
    dest: [u8; MAC_ADDR_LEN],
    seen: usize,
    verdict: Verdict,
}

impl AddressFilter {
    /// Bind a rule set to a new filter instance.
    #[must_use]
    pub fn new(rule: FilterRule) -> Self {
        Self {
            rule,
            dest: [0; MAC_ADDR_LEN],
            seen: 0,
            verdict: Verdict::Undecided,
        }
    }

    /// Reset per-frame state at a frame boundary.
    pub fn start_frame(&mut self) {
        self.seen = 0;
        self.verdict = Verdict::Undecided;
    }

    /// Offer the next frame byte; returns the current verdict.
    ///
    /// Bytes past the destination field are ignored, so offering the whole
    /// stream is cheap for already-decided frames.
    pub fn offer(&mut self, byte: u8) -> Verdict {
        if self.verdict == Verdict::Undecided {
            self.dest[self.seen] = byte;
            self.seen += 1;
            if self.seen == MAC_ADDR_LEN {
                self.verdict = if self.rule.matches(&self.dest) {
                    Verdict::Accept
                } else {
                    Verdict::Reject
                };
            }
        }
        self.verdict
    }

    /// The verdict for the frame in flight.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// The bound rule set.
    #[must_use]
    pub fn rule(&self) -> &FilterRule {
        &self.rule
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
