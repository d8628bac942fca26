//! Configuration types for the MII MAC layer

use crate::constants::{
    DEFAULT_MAX_FRAME_NANOS, DEFAULT_TX_RETRY_LIMIT, DEFAULT_WRITE_TIMEOUT_NANOS, IFG_NANOS_100M,
};
use crate::hal::Duration;

/// Transmit queue arbitration policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArbitrationPolicy {
    /// Strict priority by queue index; queue 0 is highest
    #[default]
    Priority,
    /// Round-robin among non-empty queues
    RoundRobin,
}

/// Receive queue overflow policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverflowPolicy {
    /// Reject the incoming frame when the queue is full
    #[default]
    DropNew,
    /// Discard the oldest queued frame to make room
    EvictOldest,
}

/// Lifecycle state of a pollable task
///
/// Quiescing tasks drain in-flight state to the end of the current frame
/// before stopping; no task is killed mid-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunState {
    /// Processing traffic
    #[default]
    Running,
    /// Quiesce requested; finishing the current frame
    Quiescing,
    /// Stopped; no further traffic is processed
    Stopped,
}

/// Complete MAC-layer configuration
///
/// Fixed at startup; servers copy what they need at construction. Built
/// with `const` chaining methods:
///
/// ```ignore
/// let config = MacConfig::new()
///     .with_mac_address([0x02, 0x00, 0x00, 0x12, 0x34, 0x56])
///     .with_arbitration(ArbitrationPolicy::RoundRobin)
///     .with_overflow(OverflowPolicy::EvictOldest);
/// ```
#[derive(Debug, Clone)]
pub struct MacConfig {
    /// This interface's unicast MAC address (6 bytes)
    pub mac_address: [u8; 6],
    /// Transmit arbitration policy
    pub arbitration: ArbitrationPolicy,
    /// Receive queue overflow policy
    pub overflow: OverflowPolicy,
    /// Mandated idle time between consecutive transmitted frames
    pub inter_frame_gap: Duration,
    /// Bounded retry count for failed transmit attempts
    pub tx_retry_limit: u8,
    /// Timeout for a single stalled transmit port write
    pub write_timeout: Duration,
    /// Malformed-frame timeout: a receive frame lasting longer is discarded
    pub max_frame_time: Duration,
    /// Suspend starting new transmissions while the link is down.
    ///
    /// The in-flight frame always completes; submissions are still queued.
    pub suspend_on_link_down: bool,
}

impl Default for MacConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MacConfig {
    /// Create a configuration with 100 Mbit/s defaults.
    ///
    /// Default MAC address is the locally administered 02:00:00:00:00:01.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mac_address: [0x02, 0x00, 0x00, 0x00, 0x00, 0x01],
            arbitration: ArbitrationPolicy::Priority,
            overflow: OverflowPolicy::DropNew,
            inter_frame_gap: Duration::nanos(IFG_NANOS_100M),
            tx_retry_limit: DEFAULT_TX_RETRY_LIMIT,
            write_timeout: Duration::nanos(DEFAULT_WRITE_TIMEOUT_NANOS),
            max_frame_time: Duration::nanos(DEFAULT_MAX_FRAME_NANOS),
            suspend_on_link_down: false,
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the interface MAC address
    #[must_use]
    pub const fn with_mac_address(mut self, addr: [u8; 6]) -> Self {
        self.mac_address = addr;
        self
    }

    /// Set the transmit arbitration policy
    #[must_use]
    pub const fn with_arbitration(mut self, policy: ArbitrationPolicy) -> Self {
        self.arbitration = policy;
        self
    }

    /// Set the receive overflow policy
    #[must_use]
    pub const fn with_overflow(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = policy;
        self
    }

    /// Set the inter-frame gap
    #[must_use]
    pub const fn with_inter_frame_gap(mut self, gap: Duration) -> Self {
        self.inter_frame_gap = gap;
        self
    }

    /// Set the transmit retry limit
    #[must_use]
    pub const fn with_tx_retry_limit(mut self, limit: u8) -> Self {
        self.tx_retry_limit = limit;
        self
    }

    /// Set the stalled-write timeout
    #[must_use]
    pub const fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the malformed-frame timeout
    #[must_use]
    pub const fn with_max_frame_time(mut self, timeout: Duration) -> Self {
        self.max_frame_time = timeout;
        self
    }

    /// Suspend new transmissions while the link is down
    #[must_use]
    pub const fn with_suspend_on_link_down(mut self, suspend: bool) -> Self {
        self.suspend_on_link_down = suspend;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
