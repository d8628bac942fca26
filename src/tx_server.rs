//! Transmit server: M submission queues arbitrated onto one transmit port.
//!
//! Producers [`submit`](TxServer::submit) complete frames (destination
//! through payload, no preamble and no FCS) into bounded per-queue rings
//! and get back a token. The server arbitrates across non-empty queues,
//! prepends preamble and start delimiter, zero-pads short frames to the
//! minimum size, appends the computed FCS, and shifts the bytes into the
//! port. Wire frames are atomic: arbitration decisions happen only at
//! frame boundaries, and the configured inter-frame gap is enforced
//! between any two of them.
//!
//! A port that stops accepting bytes for longer than the write timeout, or
//! reports a fault, aborts the attempt; the frame is retried from the
//! start up to the configured limit, then reported failed through its
//! completion record. Per-frame outcomes are collected with
//! [`take_completion`](TxServer::take_completion).

use heapless::Deque;

use crate::config::{ArbitrationPolicy, MacConfig, OverflowPolicy, RunState};
use crate::constants::{FCS_SIZE, MAX_FRAME_SIZE, MIN_FRAME_SIZE, PREAMBLE_BYTE, PREAMBLE_LEN, SFD_BYTE};
use crate::error::TxError;
use crate::fcs::Fcs;
use crate::hal::{Duration, Instant, PortError, TxPort};
use crate::queue::{FrameQueue, PushOutcome};
use crate::smi::LinkState;

/// Largest frame a producer may submit: maximum wire size minus the FCS
/// the server appends itself.
pub const MAX_SUBMIT_SIZE: usize = MAX_FRAME_SIZE - FCS_SIZE;

/// Preamble plus start-of-frame delimiter, in bytes.
const WIRE_PREFIX: usize = PREAMBLE_LEN + 1;

// =============================================================================
// Completions and Counters
// =============================================================================

/// Outcome record for one submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxCompletion {
    /// Token returned by [`TxServer::submit`]
    pub token: u32,
    /// `Ok` once the last byte reached the port, or the terminal error
    pub result: Result<(), TxError>,
}

/// Server-wide transmit statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxCounters {
    /// Frames fully shifted into the port
    pub frames_sent: u32,
    /// Transmission attempts restarted after a port timeout or fault
    pub retries: u32,
    /// Frames abandoned after the retry limit
    pub failures: u32,
}

/// Per-queue transmit statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxQueueCounters {
    /// Frames accepted by `submit`
    pub submitted: u32,
    /// Frames sent successfully
    pub sent: u32,
    /// Frames that exhausted their retries
    pub failed: u32,
}

// =============================================================================
// Transmit Server
// =============================================================================

/// One submission queue with its token and completion books.
struct TxBin<const DEPTH: usize, const BUF: usize> {
    queue: FrameQueue<DEPTH, BUF>,
    tokens: Deque<u32, DEPTH>,
    completions: Deque<TxCompletion, DEPTH>,
    counters: TxQueueCounters,
}

/// The frame currently being shifted out. The frame bytes stay in their
/// queue slot until the job completes; the job only tracks position.
#[derive(Clone, Copy)]
struct TxJob {
    queue: usize,
    token: u32,
    /// Next wire byte index (preamble through FCS)
    pos: usize,
    /// Frame length after zero-padding to the minimum
    padded_len: usize,
    fcs: [u8; 4],
    retries: u8,
    /// Last instant the port accepted a byte of this attempt
    last_progress: Instant,
}

/// Gap bookkeeping between wire frames.
#[derive(Clone, Copy)]
enum TxPhase {
    Ready,
    Gap { until: Instant },
}

/// Transmit server task.
///
/// # Type Parameters
/// * `M` - Number of submission queues
/// * `DEPTH` - Queue depth bound
/// * `BUF` - Per-slot byte capacity
pub struct TxServer<P: TxPort, const M: usize, const DEPTH: usize, const BUF: usize> {
    port: P,
    bins: [TxBin<DEPTH, BUF>; M],
    job: Option<TxJob>,
    phase: TxPhase,
    arbitration: ArbitrationPolicy,
    /// Next queue to consider first under round-robin
    rr_next: usize,
    gap: Duration,
    write_timeout: Duration,
    retry_limit: u8,
    suspend_on_link_down: bool,
    link: LinkState,
    next_token: u32,
    counters: TxCounters,
    state: RunState,
}

impl<P: TxPort, const M: usize, const DEPTH: usize, const BUF: usize> TxServer<P, M, DEPTH, BUF> {
    /// Take ownership of the transmit port and build an idle server.
    pub fn new(port: P, config: &MacConfig) -> Self {
        #[cfg(feature = "defmt")]
        defmt::debug!("tx server: {} queues, depth {}, slot {} bytes", M, DEPTH, BUF);

        Self {
            port,
            bins: core::array::from_fn(|_| TxBin {
                queue: FrameQueue::new(),
                tokens: Deque::new(),
                completions: Deque::new(),
                counters: TxQueueCounters::default(),
            }),
            job: None,
            phase: TxPhase::Ready,
            arbitration: config.arbitration,
            rr_next: 0,
            gap: config.inter_frame_gap,
            write_timeout: config.write_timeout,
            retry_limit: config.tx_retry_limit,
            suspend_on_link_down: config.suspend_on_link_down,
            link: LinkState::Up,
            next_token: 1,
            counters: TxCounters::default(),
            state: RunState::Running,
        }
    }

    // =========================================================================
    // Producer API
    // =========================================================================

    /// Queue a frame for transmission and return its completion token.
    ///
    /// `frame` runs from the destination address through the payload; the
    /// server adds preamble, padding, and FCS itself.
    ///
    /// # Errors
    /// - `InvalidQueue` - `q` out of range
    /// - `InvalidLength` - empty frame
    /// - `FrameTooLarge` - frame exceeds the wire maximum or the slot size
    /// - `QueueFull` - depth bound reached; the frame is not stored
    /// - `Stopped` - the server is quiescing or stopped
    pub fn submit(&mut self, q: usize, frame: &[u8]) -> Result<u32, TxError> {
        if self.state != RunState::Running {
            return Err(TxError::Stopped);
        }
        let bin = self.bins.get_mut(q).ok_or(TxError::InvalidQueue)?;
        if frame.is_empty() {
            return Err(TxError::InvalidLength);
        }
        if frame.len() > MAX_SUBMIT_SIZE || frame.len() > BUF {
            return Err(TxError::FrameTooLarge);
        }
        if bin.queue.is_full() {
            return Err(TxError::QueueFull);
        }

        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1);

        // Full queue was ruled out above, so both pushes succeed.
        let outcome = bin.queue.push_frame(frame, OverflowPolicy::DropNew);
        debug_assert_eq!(outcome, PushOutcome::Stored);
        let _ = bin.tokens.push_back(token);
        bin.counters.submitted += 1;
        Ok(token)
    }

    /// Number of frames waiting (or in flight) on queue `q`.
    #[must_use]
    pub fn tx_pending(&self, q: usize) -> usize {
        self.bins.get(q).map_or(0, |bin| bin.queue.len())
    }

    /// Pop the oldest unread completion record for queue `q`.
    pub fn take_completion(&mut self, q: usize) -> Option<TxCompletion> {
        self.bins.get_mut(q)?.completions.pop_front()
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Advance transmission as far as the port allows.
    ///
    /// `now` drives the inter-frame gap and the write timeout; the server
    /// never reads a clock itself.
    pub fn poll(&mut self, now: Instant) {
        if self.state == RunState::Stopped {
            return;
        }

        if let TxPhase::Gap { until } = self.phase {
            if now < until {
                return;
            }
            self.phase = TxPhase::Ready;
            // A retry attempt starts its timeout window fresh.
            if let Some(job) = self.job.as_mut() {
                job.last_progress = now;
            }
        }

        if self.job.is_none() {
            // Frame boundary: the only place quiesce, link state, and
            // arbitration decisions are taken.
            if self.state == RunState::Quiescing {
                self.state = RunState::Stopped;
                return;
            }
            if self.link == LinkState::Down && self.suspend_on_link_down {
                return;
            }
            self.start_next(now);
        }

        self.drive(now);
    }

    /// Pick the next queue under the configured arbitration policy and
    /// stage its front frame as the in-flight job.
    fn start_next(&mut self, now: Instant) {
        let picked = match self.arbitration {
            ArbitrationPolicy::Priority => (0..M).find(|&q| !self.bins[q].queue.is_empty()),
            ArbitrationPolicy::RoundRobin => (0..M)
                .map(|i| (self.rr_next + i) % M)
                .find(|&q| !self.bins[q].queue.is_empty()),
        };
        let Some(q) = picked else { return };
        if self.arbitration == ArbitrationPolicy::RoundRobin {
            self.rr_next = (q + 1) % M;
        }

        let bin = &self.bins[q];
        let (Some(frame), Some(&token)) = (bin.queue.front(), bin.tokens.front()) else {
            return;
        };
        let padded_len = frame.len().max(MIN_FRAME_SIZE);

        // FCS covers the zero-padded frame.
        let mut fcs = Fcs::new();
        fcs.update(frame);
        for _ in frame.len()..padded_len {
            fcs.update_byte(0);
        }

        self.job = Some(TxJob {
            queue: q,
            token,
            pos: 0,
            padded_len,
            fcs: fcs.finalize().to_le_bytes(),
            retries: 0,
            last_progress: now,
        });
    }

    /// Shift wire bytes of the in-flight job into the port.
    fn drive(&mut self, now: Instant) {
        let Some(mut job) = self.job else { return };
        let total = WIRE_PREFIX + job.padded_len + FCS_SIZE;

        loop {
            let Some(frame) = self.bins[job.queue].queue.front() else {
                // In-flight frame vanished from its queue; drop the job.
                self.job = None;
                return;
            };

            let byte = if job.pos < PREAMBLE_LEN {
                PREAMBLE_BYTE
            } else if job.pos == PREAMBLE_LEN {
                SFD_BYTE
            } else if job.pos < WIRE_PREFIX + job.padded_len {
                let i = job.pos - WIRE_PREFIX;
                if i < frame.len() { frame[i] } else { 0 }
            } else {
                job.fcs[job.pos - WIRE_PREFIX - job.padded_len]
            };

            match self.port.try_write(byte) {
                Ok(()) => {
                    job.pos += 1;
                    job.last_progress = now;
                    if job.pos == total {
                        self.finish(job, Ok(()), now);
                        return;
                    }
                    self.job = Some(job);
                }
                Err(nb::Error::WouldBlock) => {
                    if now
                        .checked_duration_since(job.last_progress)
                        .is_some_and(|d| d > self.write_timeout)
                    {
                        self.attempt_failed(job, TxError::PortTimeout, now);
                    } else {
                        // Port busy: suspend until the next poll.
                        self.job = Some(job);
                    }
                    return;
                }
                Err(nb::Error::Other(err)) => {
                    let terminal = match err {
                        PortError::Underrun | PortError::Fault => TxError::PortFault,
                    };
                    self.attempt_failed(job, terminal, now);
                    return;
                }
            }
        }
    }

    /// One transmission attempt failed. Retry from the start of the frame
    /// after a gap, or give up once the limit is reached.
    fn attempt_failed(&mut self, mut job: TxJob, terminal: TxError, now: Instant) {
        if job.retries >= self.retry_limit {
            self.counters.failures += 1;
            self.bins[job.queue].counters.failed += 1;

            #[cfg(feature = "defmt")]
            defmt::warn!("tx: giving up on token {} after {} retries", job.token, job.retries);

            self.finish(job, Err(terminal), now);
            return;
        }
        job.retries += 1;
        job.pos = 0;
        self.counters.retries += 1;
        self.job = Some(job);
        self.phase = TxPhase::Gap {
            until: now + self.gap,
        };
    }

    /// Retire the in-flight frame with its outcome and start the gap.
    fn finish(&mut self, job: TxJob, result: Result<(), TxError>, now: Instant) {
        let bin = &mut self.bins[job.queue];
        bin.queue.pop();
        let _ = bin.tokens.pop_front();

        if result.is_ok() {
            self.counters.frames_sent += 1;
            bin.counters.sent += 1;
        }
        if bin.completions.is_full() {
            // Unread completions age out oldest-first.
            let _ = bin.completions.pop_front();
        }
        let _ = bin.completions.push_back(TxCompletion {
            token: job.token,
            result,
        });

        self.job = None;
        self.phase = TxPhase::Gap {
            until: now + self.gap,
        };
    }

    // =========================================================================
    // Lifecycle / Observability
    // =========================================================================

    /// Report a link transition observed by the PHY watcher.
    ///
    /// With `suspend_on_link_down` set, a down link stops new frames from
    /// starting; the in-flight frame still completes, and submissions are
    /// still accepted.
    pub fn set_link_state(&mut self, link: LinkState) {
        self.link = link;
    }

    /// The most recently reported link state.
    #[must_use]
    pub fn link_state(&self) -> LinkState {
        self.link
    }

    /// Request a quiesce: the in-flight frame finishes, then the server
    /// stops. Queued frames stay queued.
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

    /// True once the server has stopped at a frame boundary.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state == RunState::Stopped
    }

    /// Server-wide statistics.
    #[must_use]
    pub fn counters(&self) -> TxCounters {
        self.counters
    }

    /// Statistics for queue `q`.
    #[must_use]
    pub fn queue_counters(&self, q: usize) -> Option<TxQueueCounters> {
        self.bins.get(q).map(|bin| bin.counters)
    }

    /// Reclaim the port handle, consuming the server.
    #[must_use]
    pub fn into_port(self) -> P {
        self.port
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
