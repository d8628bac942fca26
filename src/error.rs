//! Error types for the MII MAC layer
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Construction-time failures
//! - [`RxError`]: Receive-path failures (all non-fatal to the pipeline)
//! - [`TxError`]: Transmit-path failures reported back to producers
//!
//! The unified [`Error`] enum wraps all domain errors. Frame-integrity and
//! resource-exhaustion conditions on the receive path are counted rather
//! than returned; `RxError` covers the consumer-facing queue API.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Construction and configuration errors
///
/// These occur when building servers or filter rules, before any traffic
/// flows. A failed construction leaves nothing partially started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Queue index out of range
    InvalidQueue,
    /// Multicast acceptance list is full
    MulticastListFull,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidQueue => "queue index out of range",
            ConfigError::MulticastListFull => "multicast list full",
        }
    }
}

// =============================================================================
// Receive Errors
// =============================================================================

/// Receive-path errors on the consumer queue API
///
/// Frame-integrity and overflow conditions never surface here: the
/// offending frame is discarded before any queue sees it, a counter
/// increments, and reception continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxError {
    /// No frame available in the queue
    Empty,
    /// Caller's buffer is smaller than the queued frame
    BufferTooSmall,
}

impl core::fmt::Display for RxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RxError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RxError::Empty => "no frame available",
            RxError::BufferTooSmall => "buffer too small for frame",
        }
    }
}

// =============================================================================
// Transmit Errors
// =============================================================================

/// Transmit-path errors
///
/// Submission errors are returned synchronously; wire errors are reported
/// through the per-queue completion queue after the bounded retries are
/// exhausted. Failures are never silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxError {
    /// Transmit queue is full
    QueueFull,
    /// Zero-length frame
    InvalidLength,
    /// Frame exceeds the queue's buffer capacity
    FrameTooLarge,
    /// Queue index out of range
    InvalidQueue,
    /// Port stalled past the write timeout on every retry
    PortTimeout,
    /// Port reported a hardware fault
    PortFault,
    /// Server has been quiesced and accepts no new frames
    Stopped,
}

impl core::fmt::Display for TxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TxError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TxError::QueueFull => "transmit queue full",
            TxError::InvalidLength => "zero-length frame",
            TxError::FrameTooLarge => "frame too large for queue buffers",
            TxError::InvalidQueue => "queue index out of range",
            TxError::PortTimeout => "transmit port timed out",
            TxError::PortFault => "transmit port fault",
            TxError::Stopped => "server stopped",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match result {
///     Err(Error::Rx(RxError::Empty)) => { /* ... */ }
///     Err(Error::Tx(TxError::QueueFull)) => { /* ... */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// Receive error
    Rx(RxError),
    /// Transmit error
    Tx(TxError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Rx(e) => write!(f, "rx: {}", e.as_str()),
            Error::Tx(e) => write!(f, "tx: {}", e.as_str()),
        }
    }
}

// From impls for automatic conversion
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<RxError> for Error {
    fn from(e: RxError) -> Self {
        Error::Rx(e)
    }
}

impl From<TxError> for Error {
    fn from(e: TxError) -> Self {
        Error::Tx(e)
    }
}

/// Result type alias for MAC-layer operations
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// Unit Tests
// =============================================================================
