//! Symbol sampler: raw MII nibbles to a delimited byte stream.
//!
//! The [`Sampler`] owns the receive data port and the producer half of a
//! bounded SPSC event channel. Each `poll` drains whatever symbols the port
//! has buffered: it hunts for the preamble/SFD nibble sequence, reassembles
//! nibble pairs (low nibble first) into bytes, and emits
//! [`StreamEvent`]s. Receive-valid deassertion marks end-of-frame.
//!
//! Failure handling is never fatal: a port error, an odd nibble count, a
//! frame outliving the malformed-frame timeout, or a full event channel
//! aborts the current frame with `FrameEnd { good: false }` and sampling
//! resumes with the next frame.

use heapless::spsc::{Consumer, Producer, Queue};

use crate::config::{MacConfig, RunState};
use crate::hal::{Duration, Instant, RxPort, RxSample};

/// Preamble nibble (both halves of 0x55)
const PREAMBLE_NIBBLE: u8 = 0x5;

/// Nibble completing the SFD after a run of preamble nibbles
const SFD_NIBBLE: u8 = 0xD;

// =============================================================================
// Stream Events
// =============================================================================

/// One event on the sampler's outbound channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamEvent {
    /// SFD detected; frame bytes follow
    FrameStart,
    /// One reassembled frame byte
    Byte(u8),
    /// Frame boundary. `good` is false when the frame was aborted and
    /// anything received for it must be discarded.
    FrameEnd {
        /// Whether the frame completed cleanly at the symbol level
        good: bool,
    },
}

/// Bounded SPSC channel carrying [`StreamEvent`]s from sampler to filters.
pub type StreamChannel<const CAP: usize> = Queue<StreamEvent, CAP>;

/// Producer half of a [`StreamChannel`], owned by the sampler.
pub type StreamProducer<'a, const CAP: usize> = Producer<'a, StreamEvent, CAP>;

/// Consumer half of a [`StreamChannel`], owned by the receive server.
pub type StreamConsumer<'a, const CAP: usize> = Consumer<'a, StreamEvent, CAP>;

// =============================================================================
// Sampler
// =============================================================================

/// Observable sampler statistics. All conditions counted here are
/// transient; none stop the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplerCounters {
    /// Frames delimited cleanly
    pub frames: u32,
    /// Port errors and non-preamble garbage on the wire
    pub symbol_errors: u32,
    /// Frames aborted by odd nibble count or the malformed-frame timeout
    pub truncated: u32,
    /// Frames lost because the event channel was full
    pub overruns: u32,
}

/// Where the sampler is within the symbol stream.
#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Waiting for preamble/SFD
    Hunt {
        /// A preamble nibble has been seen since the last idle/garbage
        preamble_seen: bool,
    },
    /// Inside a frame, pairing nibbles into bytes
    Payload {
        /// Low nibble waiting for its high half
        pending: Option<u8>,
        /// When the frame started, for the malformed-frame timeout
        started: Instant,
    },
    /// Discarding symbols until the line goes idle
    Drain,
}

/// Symbol sampler task.
///
/// Owns the receive port exclusively (the handle moves in at construction)
/// and suspends - returns from `poll` - whenever the port has no sample
/// ready.
pub struct Sampler<'a, P: RxPort, const CAP: usize> {
    port: P,
    events: StreamProducer<'a, CAP>,
    phase: Phase,
    max_frame_time: Duration,
    counters: SamplerCounters,
    state: RunState,
    /// FrameEnd that could not be enqueued yet; flushed before new events
    end_pending: Option<bool>,
}

impl<'a, P: RxPort, const CAP: usize> Sampler<'a, P, CAP> {
    /// Bind a receive port to the producer half of an event channel.
    pub fn new(port: P, events: StreamProducer<'a, CAP>, config: &MacConfig) -> Self {
        Self {
            port,
            events,
            phase: Phase::Hunt {
                preamble_seen: false,
            },
            max_frame_time: config.max_frame_time,
            counters: SamplerCounters::default(),
            state: RunState::Running,
            end_pending: None,
        }
    }

    /// Drain all symbols the port currently has buffered.
    ///
    /// `now` is used for the malformed-frame timeout; the sampler never
    /// reads a clock itself.
    pub fn poll(&mut self, now: Instant) {
        if self.state == RunState::Stopped {
            return;
        }
        self.flush_pending_end();

        loop {
            // Frame outlived the malformed-frame timeout: abort and resync.
            if let Phase::Payload { started, .. } = self.phase {
                if now
                    .checked_duration_since(started)
                    .is_some_and(|d| d > self.max_frame_time)
                {
                    self.counters.truncated += 1;
                    self.emit_end(false);
                    self.phase = Phase::Drain;
                }
            }

            match self.port.sample() {
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => {
                    self.counters.symbol_errors += 1;
                    if matches!(self.phase, Phase::Payload { .. }) {
                        self.emit_end(false);
                    }
                    self.phase = Phase::Drain;
                }
                Ok(RxSample::Idle) => {
                    if self.on_idle() {
                        break;
                    }
                }
                Ok(RxSample::Data(nibble)) => self.on_data(nibble & 0x0F, now),
            }
        }

        // Hunting with nothing in flight is a safe quiesce boundary.
        if self.state == RunState::Quiescing && matches!(self.phase, Phase::Hunt { .. }) {
            self.state = RunState::Stopped;
        }
    }

    /// Handle an idle sample. Returns true when polling should stop.
    fn on_idle(&mut self) -> bool {
        match self.phase {
            Phase::Hunt { .. } => {
                self.phase = Phase::Hunt {
                    preamble_seen: false,
                };
            }
            Phase::Payload { pending, .. } => {
                if pending.is_some() {
                    // Odd nibble count: misaligned frame
                    self.counters.truncated += 1;
                    self.emit_end(false);
                } else {
                    self.counters.frames += 1;
                    self.emit_end(true);
                }
                self.phase = Phase::Hunt {
                    preamble_seen: false,
                };
            }
            Phase::Drain => {
                self.phase = Phase::Hunt {
                    preamble_seen: false,
                };
            }
        }

        if self.state == RunState::Quiescing {
            self.state = RunState::Stopped;
            return true;
        }
        false
    }

    /// Handle a data nibble.
    fn on_data(&mut self, nibble: u8, now: Instant) {
        match self.phase {
            Phase::Hunt { preamble_seen } => {
                if self.state == RunState::Quiescing {
                    // Don't start a new frame while quiescing
                    self.phase = Phase::Drain;
                } else if nibble == PREAMBLE_NIBBLE {
                    self.phase = Phase::Hunt {
                        preamble_seen: true,
                    };
                } else if nibble == SFD_NIBBLE && preamble_seen {
                    if self.end_pending.is_some() || !self.emit(StreamEvent::FrameStart) {
                        // Channel jammed: the whole frame is lost
                        self.counters.overruns += 1;
                        self.phase = Phase::Drain;
                    } else {
                        self.phase = Phase::Payload {
                            pending: None,
                            started: now,
                        };
                    }
                } else {
                    // Not a preamble sequence: wait for the line to go idle
                    self.counters.symbol_errors += 1;
                    self.phase = Phase::Drain;
                }
            }
            Phase::Payload { pending, started } => match pending {
                None => {
                    self.phase = Phase::Payload {
                        pending: Some(nibble),
                        started,
                    };
                }
                Some(low) => {
                    let byte = low | (nibble << 4);
                    if self.emit(StreamEvent::Byte(byte)) {
                        self.phase = Phase::Payload {
                            pending: None,
                            started,
                        };
                    } else {
                        self.counters.overruns += 1;
                        self.emit_end(false);
                        self.phase = Phase::Drain;
                    }
                }
            },
            Phase::Drain => {}
        }
    }

    fn emit(&mut self, event: StreamEvent) -> bool {
        self.events.enqueue(event).is_ok()
    }

    /// Emit a FrameEnd, parking it if the channel is full so the consumer
    /// always sees a boundary for every FrameStart.
    fn emit_end(&mut self, good: bool) {
        if !self.emit(StreamEvent::FrameEnd { good }) {
            self.end_pending = Some(good);
        }
    }

    fn flush_pending_end(&mut self) {
        if let Some(good) = self.end_pending {
            if self.emit(StreamEvent::FrameEnd { good }) {
                self.end_pending = None;
            }
        }
    }

    // =========================================================================
    // Lifecycle / Observability
    // =========================================================================

    /// Request a quiesce: the in-flight frame finishes, then sampling stops.
    pub fn request_stop(&mut self) {
        if self.state == RunState::Running {
            self.state = RunState::Quiescing;
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// True once the sampler has reached a safe boundary and stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state == RunState::Stopped
    }

    /// Sampler statistics.
    #[must_use]
    pub fn counters(&self) -> SamplerCounters {
        self.counters
    }

    /// Reclaim the port handle, consuming the sampler.
    #[must_use]
    pub fn into_port(self) -> P {
        self.port
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
