//! Hardware port contracts
//!
//! The MAC core never touches pins directly; it is generic over these thin
//! port traits. Implementations wrap the target's MII receive/transmit
//! machinery (or a software loopback in tests). A port handle is a move-only
//! ownership token: it is consumed by the sampler or transmit server at
//! construction, so exclusive access is enforced at compile time.
//!
//! Both traits are non-blocking and use [`nb`] results: `WouldBlock` means
//! "no symbol yet" / "port cannot take another byte yet", and the polling
//! task decides how to schedule around it.

/// Timestamp with nanosecond ticks.
///
/// Callers supply `now` to the pollable tasks; the crate never reads a
/// clock itself. Any monotonic nanosecond counter works.
pub type Instant = fugit::TimerInstantU64<1_000_000_000>;

/// Duration with nanosecond ticks.
pub type Duration = fugit::TimerDurationU64<1_000_000_000>;

/// Hardware port failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortError {
    /// The port's internal buffering was overrun or underrun
    Underrun,
    /// The port reported a hardware fault
    Fault,
}

impl core::fmt::Display for PortError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            PortError::Underrun => "port underrun",
            PortError::Fault => "port fault",
        })
    }
}

/// One sample taken from the receive data port.
///
/// The receive-data-valid signal is folded into the sample: `Data` carries
/// a nibble observed while valid was asserted, `Idle` is a sample taken
/// while valid was deasserted (marking end-of-frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxSample {
    /// A 4-bit symbol (low 4 bits) sampled while receive-valid was asserted
    Data(u8),
    /// Receive-valid was deasserted
    Idle,
}

/// Receive data port synchronized to the receive-data-valid signal.
///
/// `sample` returns `WouldBlock` when no new sample is available yet; the
/// sampler suspends (returns from `poll`) on that. Implementations are
/// expected to buffer enough symbols to ride out polling latency.
pub trait RxPort {
    /// Take the next symbol sample.
    fn sample(&mut self) -> nb::Result<RxSample, PortError>;
}

/// Transmit data port.
///
/// Bytes are accepted in wire order; the port shifts them out at line rate.
/// `WouldBlock` means the port's buffer is full (port busy).
pub trait TxPort {
    /// Queue one byte for transmission.
    fn try_write(&mut self, byte: u8) -> nb::Result<(), PortError>;
}

// =============================================================================
// Unit Tests
// =============================================================================
