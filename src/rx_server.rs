//! Receive server: stream events to address-filtered consumer queues.
//!
//! The [`RxServer`] owns the consumer half of the sampler's event channel
//! and N receive queues, each bound to one [`AddressFilter`]. All filters
//! tap the same stream and decide independently, so a frame can land in
//! zero, one, or many queues (broadcast fan-out).
//!
//! Incoming bytes are staged once in a single shared buffer while every
//! filter watches the destination field; at a good end-of-frame the server
//! validates length and FCS, then commits one copy per accepting queue
//! under the configured overflow policy. A frame is never visible to a
//! consumer before its FCS validates, and the server never blocks the
//! sampler: every error path discards and counts.

use crate::config::{MacConfig, OverflowPolicy, RunState};
use crate::constants::{FCS_SIZE, MAX_FRAME_SIZE, MIN_WIRE_FRAME};
use crate::error::{ConfigError, Error, Result, RxError};
use crate::fcs::{FCS_RESIDUE, Fcs};
use crate::filter::{AddressFilter, FilterRule, Verdict};
use crate::queue::{FrameQueue, PushOutcome};
use crate::sampler::{StreamConsumer, StreamEvent};

// =============================================================================
// Counters
// =============================================================================

/// Server-wide receive statistics. All error classes here are non-fatal
/// and policy-driven; nothing in them stops the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxCounters {
    /// Frames rejected by FCS validation
    pub crc_errors: u32,
    /// Frames under the minimum or over the maximum wire size
    pub length_errors: u32,
    /// Frames the sampler aborted at the symbol level
    pub aborted_frames: u32,
}

/// Per-queue receive statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxQueueCounters {
    /// Frames committed to the queue
    pub delivered: u32,
    /// Incoming frames rejected because the queue was full (drop-new)
    pub dropped: u32,
    /// Queued frames discarded to make room (evict-oldest)
    pub evicted: u32,
    /// Frames too large for this queue's slot buffers
    pub oversized: u32,
}

// =============================================================================
// Receive Server
// =============================================================================

/// One queue with its filter tap.
struct RxBin<const DEPTH: usize, const BUF: usize> {
    filter: AddressFilter,
    queue: FrameQueue<DEPTH, BUF>,
    counters: RxQueueCounters,
}

/// Receive server task.
///
/// # Type Parameters
/// * `N` - Number of receive queues (one filter rule each)
/// * `DEPTH` - Queue depth bound
/// * `BUF` - Per-slot byte capacity (1514 holds any untagged frame)
/// * `CAP` - Event channel capacity (matches the sampler's)
pub struct RxServer<'a, const N: usize, const DEPTH: usize, const BUF: usize, const CAP: usize> {
    events: StreamConsumer<'a, CAP>,
    bins: [RxBin<DEPTH, BUF>; N],
    staging: [u8; MAX_FRAME_SIZE],
    staged_len: usize,
    in_frame: bool,
    overlong: bool,
    fcs: Fcs,
    overflow: OverflowPolicy,
    counters: RxCounters,
    state: RunState,
}

impl<'a, const N: usize, const DEPTH: usize, const BUF: usize, const CAP: usize>
    RxServer<'a, N, DEPTH, BUF, CAP>
{
    /// Build a server from the channel consumer and one rule per queue.
    ///
    /// Rules with a defaulted unicast address are resolved against the
    /// configured interface MAC. Rules are fixed for the server's
    /// lifetime; reconfiguring means quiescing and constructing a new
    /// server.
    pub fn new(
        events: StreamConsumer<'a, CAP>,
        config: &MacConfig,
        rules: [FilterRule; N],
    ) -> Self {
        #[cfg(feature = "defmt")]
        defmt::debug!("rx server: {} queues, depth {}, slot {} bytes", N, DEPTH, BUF);

        let own_mac = config.mac_address;
        Self {
            events,
            bins: rules.map(|rule| RxBin {
                filter: AddressFilter::new(rule.resolve(own_mac)),
                queue: FrameQueue::new(),
                counters: RxQueueCounters::default(),
            }),
            staging: [0; MAX_FRAME_SIZE],
            staged_len: 0,
            in_frame: false,
            overlong: false,
            fcs: Fcs::new(),
            overflow: config.overflow,
            counters: RxCounters::default(),
            state: RunState::Running,
        }
    }

    /// Process all pending stream events.
    pub fn poll(&mut self) {
        if self.state == RunState::Stopped {
            return;
        }

        while let Some(event) = self.events.dequeue() {
            match event {
                StreamEvent::FrameStart => self.begin_frame(),
                StreamEvent::Byte(byte) => self.on_byte(byte),
                StreamEvent::FrameEnd { good } => {
                    self.finish_frame(good);
                    // End of frame is a safe quiesce boundary
                    if self.state == RunState::Quiescing {
                        self.state = RunState::Stopped;
                        return;
                    }
                }
            }
        }

        if self.state == RunState::Quiescing && !self.in_frame {
            self.state = RunState::Stopped;
        }
    }

    fn begin_frame(&mut self) {
        self.in_frame = true;
        self.staged_len = 0;
        self.overlong = false;
        self.fcs.reset();
        for bin in &mut self.bins {
            bin.filter.start_frame();
        }
    }

    fn on_byte(&mut self, byte: u8) {
        if !self.in_frame {
            return;
        }
        if self.staged_len < MAX_FRAME_SIZE {
            self.staging[self.staged_len] = byte;
            self.staged_len += 1;
            self.fcs.update_byte(byte);
        } else {
            self.overlong = true;
        }
        for bin in &mut self.bins {
            bin.filter.offer(byte);
        }
    }

    fn finish_frame(&mut self, good: bool) {
        if !self.in_frame {
            return;
        }
        self.in_frame = false;

        if !good {
            self.counters.aborted_frames += 1;
            return;
        }
        if self.overlong || self.staged_len < MIN_WIRE_FRAME {
            self.counters.length_errors += 1;
            return;
        }

        // The accumulator ran over payload *and* FCS: a correct frame
        // always leaves the residue constant.
        if self.fcs.finalize() != FCS_RESIDUE {
            self.counters.crc_errors += 1;

            #[cfg(feature = "defmt")]
            defmt::warn!("rx: FCS mismatch on {} byte frame", self.staged_len);
            return;
        }

        let frame = &self.staging[..self.staged_len - FCS_SIZE];
        for bin in &mut self.bins {
            if bin.filter.verdict() != Verdict::Accept {
                continue;
            }
            if frame.len() > BUF {
                bin.counters.oversized += 1;
                continue;
            }
            match bin.queue.push_frame(frame, self.overflow) {
                PushOutcome::Stored => bin.counters.delivered += 1,
                PushOutcome::StoredEvicted => {
                    bin.counters.delivered += 1;
                    bin.counters.evicted += 1;
                }
                PushOutcome::Rejected => bin.counters.dropped += 1,
            }
        }
    }

    // =========================================================================
    // Consumer API
    // =========================================================================

    /// True when queue `q` holds at least one frame.
    #[must_use]
    pub fn rx_available(&self, q: usize) -> bool {
        self.bins.get(q).is_some_and(|bin| !bin.queue.is_empty())
    }

    /// Number of frames waiting in queue `q`.
    #[must_use]
    pub fn queue_len(&self, q: usize) -> usize {
        self.bins.get(q).map_or(0, |bin| bin.queue.len())
    }

    /// Length of the next frame in queue `q`, if any.
    #[must_use]
    pub fn peek_len(&self, q: usize) -> Option<usize> {
        self.bins.get(q)?.queue.front().map(<[u8]>::len)
    }

    /// Copy the oldest frame in queue `q` into `buf` and release its slot.
    ///
    /// The frame excludes the FCS (already validated and stripped).
    ///
    /// # Errors
    /// - `InvalidQueue` - `q` out of range
    /// - `Empty` - no frame waiting
    /// - `BufferTooSmall` - `buf` shorter than the frame
    pub fn receive(&mut self, q: usize, buf: &mut [u8]) -> Result<usize> {
        let bin = self
            .bins
            .get_mut(q)
            .ok_or(Error::Config(ConfigError::InvalidQueue))?;
        let frame = bin.queue.front().ok_or(Error::Rx(RxError::Empty))?;
        if buf.len() < frame.len() {
            return Err(RxError::BufferTooSmall.into());
        }
        let len = frame.len();
        buf[..len].copy_from_slice(frame);
        bin.queue.pop();
        Ok(len)
    }

    // =========================================================================
    // Lifecycle / Observability
    // =========================================================================

    /// Request a quiesce: drain to the end of the current frame, then stop.
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
    pub fn counters(&self) -> RxCounters {
        self.counters
    }

    /// Statistics for queue `q`.
    #[must_use]
    pub fn queue_counters(&self, q: usize) -> Option<RxQueueCounters> {
        self.bins.get(q).map(|bin| bin.counters)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use crate::hal::Instant;
    use crate::sampler::{Sampler, StreamChannel};
    use crate::testing::{MockRxPort, wire_frame, with_fcs};

    const OWN: [u8; 6] = [0x02, 0x00, 0x00, 0x12, 0x34, 0x56];
    const OTHER: [u8; 6] = [0x02, 0x00, 0x00, 0x65, 0x43, 0x21];
    const SRC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x99];
    const MCAST: [u8; 6] = [0x01, 0x00, 0x5E, 0x00, 0x00, 0x01];

    /// Run a set of wire frames through sampler + server.
    fn run_pipeline<const N: usize, const DEPTH: usize>(
        config: &MacConfig,
        rules: [FilterRule; N],
        frames: &[Vec<u8>],
    ) -> RxServer<'static, N, DEPTH, 1514, 8192> {
        // Tests leak the channel to get a 'static consumer; each test
        // builds its own pipeline so the leak is bounded.
        let ch: &'static mut StreamChannel<8192> =
            std::boxed::Box::leak(std::boxed::Box::new(StreamChannel::new()));
        let (tx, rx) = ch.split();

        let mut port = MockRxPort::new();
        for frame in frames {
            port.push_frame(frame);
        }

        let mut sampler = Sampler::new(port, tx, config);
        let mut server = RxServer::new(rx, config, rules);
        sampler.poll(Instant::from_ticks(0));
        server.poll();
        server
    }

    fn received(server: &mut RxServer<'_, 2, 4, 1514, 8192>, q: usize) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut buf = [0u8; 1514];
        while let Ok(len) = server.receive(q, &mut buf) {
            frames.push(buf[..len].to_vec());
        }
        frames
    }

    #[test]
    fn delivers_to_matching_queue_only() {
        let config = MacConfig::new().with_mac_address(OWN);
        let frame = wire_frame(OWN, SRC, 0x0800, &[0x11, 0x22, 0x33]);

        let mut server = run_pipeline::<2, 4>(
            &config,
            [FilterRule::unicast(OWN), FilterRule::unicast(OTHER)],
            &[with_fcs(&frame)],
        );

        // Byte-for-byte delivery to queue 0, nothing to queue 1
        assert_eq!(received(&mut server, 0), std::vec![frame.clone()]);
        assert!(!server.rx_available(1));
        assert_eq!(server.queue_counters(0).unwrap().delivered, 1);
        assert_eq!(server.queue_counters(1).unwrap().delivered, 0);
    }

    #[test]
    fn default_rule_accepts_configured_interface_mac() {
        let config = MacConfig::new().with_mac_address(OWN);
        let frame = wire_frame(OWN, SRC, 0x0800, &[0x44; 20]);

        let mut server = run_pipeline::<2, 4>(
            &config,
            [FilterRule::own(), FilterRule::unicast(OTHER)],
            &[with_fcs(&frame)],
        );

        assert_eq!(received(&mut server, 0), std::vec![frame]);
        assert!(!server.rx_available(1));
    }

    #[test]
    fn broadcast_fans_out_to_all_accepting_queues() {
        let config = MacConfig::new().with_mac_address(OWN);
        let frame = wire_frame([0xFF; 6], SRC, 0x0806, &[0xAA; 32]);

        let mut server = run_pipeline::<2, 4>(
            &config,
            [
                FilterRule::unicast(OWN).with_broadcast(true),
                FilterRule::unicast(OTHER).with_broadcast(true),
            ],
            &[with_fcs(&frame)],
        );

        assert_eq!(received(&mut server, 0), std::vec![frame.clone()]);
        assert_eq!(received(&mut server, 1), std::vec![frame]);
    }

    #[test]
    fn multicast_list_routes_frames() {
        let config = MacConfig::new().with_mac_address(OWN);
        let mut rule = FilterRule::unicast(OWN);
        rule.add_multicast(MCAST).unwrap();
        let frame = wire_frame(MCAST, SRC, 0x0800, &[0x01]);

        let mut server = run_pipeline::<2, 4>(
            &config,
            [rule, FilterRule::unicast(OTHER)],
            &[with_fcs(&frame)],
        );

        assert_eq!(received(&mut server, 0).len(), 1);
        assert!(!server.rx_available(1));
    }

    #[test]
    fn corrupted_fcs_reaches_no_queue_and_counts_once() {
        let config = MacConfig::new().with_mac_address(OWN);
        let frame = wire_frame(OWN, SRC, 0x0800, &[0x55; 16]);
        let mut bad = with_fcs(&frame);
        *bad.last_mut().unwrap() ^= 0x01;

        let mut server = run_pipeline::<2, 4>(
            &config,
            [FilterRule::unicast(OWN), FilterRule::unicast(OTHER)],
            &[bad],
        );

        assert!(!server.rx_available(0));
        assert!(!server.rx_available(1));
        assert_eq!(server.counters().crc_errors, 1);
    }

    #[test]
    fn each_corrupt_frame_counts_exactly_one() {
        let config = MacConfig::new().with_mac_address(OWN);
        let mut frames = Vec::new();
        for i in 0..3u8 {
            let mut bad = with_fcs(&wire_frame(OWN, SRC, 0x0800, &[i; 8]));
            bad[0] ^= 0x80; // corrupt the destination, FCS now mismatches
            frames.push(bad);
        }
        frames.push(with_fcs(&wire_frame(OWN, SRC, 0x0800, &[9; 8])));

        let mut server = run_pipeline::<2, 4>(
            &config,
            [FilterRule::unicast(OWN), FilterRule::unicast(OTHER)],
            &frames,
        );

        assert_eq!(server.counters().crc_errors, 3);
        assert_eq!(received(&mut server, 0).len(), 1);
    }

    #[test]
    fn short_frame_rejected_with_length_counter() {
        let config = MacConfig::new().with_mac_address(OWN);
        // 20 bytes + FCS is far below the 64-byte minimum
        let mut short = std::vec![0u8; 20];
        short[..6].copy_from_slice(&OWN);
        let wire = with_fcs(&short);

        let server = run_pipeline::<2, 4>(
            &config,
            [FilterRule::unicast(OWN), FilterRule::unicast(OTHER)],
            &[wire],
        );

        assert!(!server.rx_available(0));
        assert_eq!(server.counters().length_errors, 1);
    }

    #[test]
    fn oversized_frame_rejected_with_length_counter() {
        let config = MacConfig::new().with_mac_address(OWN);
        // 1550 bytes before FCS, well past the 1518-byte wire maximum
        let oversized = wire_frame(OWN, SRC, 0x0800, &[0x5A; 1536]);
        let good = wire_frame(OWN, SRC, 0x0800, &[0x06; 46]);

        let mut server = run_pipeline::<2, 4>(
            &config,
            [FilterRule::unicast(OWN), FilterRule::unicast(OTHER)],
            &[with_fcs(&oversized), with_fcs(&good)],
        );

        assert_eq!(server.counters().length_errors, 1);
        assert_eq!(server.counters().crc_errors, 0);
        // The oversized frame reached no queue; the next frame still flows
        assert_eq!(received(&mut server, 0), std::vec![good]);
        assert!(!server.rx_available(1));
    }

    #[test]
    fn drop_new_policy_keeps_first_k() {
        let config = MacConfig::new()
            .with_mac_address(OWN)
            .with_overflow(OverflowPolicy::DropNew);

        let mut frames = Vec::new();
        for i in 0..5u8 {
            frames.push(with_fcs(&wire_frame(OWN, SRC, 0x0800, &[i; 46])));
        }

        // DEPTH = 4: the fifth frame is dropped
        let mut server = run_pipeline::<2, 4>(
            &config,
            [FilterRule::unicast(OWN), FilterRule::unicast(OTHER)],
            &frames,
        );

        let got = received(&mut server, 0);
        assert_eq!(got.len(), 4);
        for (i, frame) in got.iter().enumerate() {
            assert_eq!(frame[14], i as u8);
        }
        let counters = server.queue_counters(0).unwrap();
        assert_eq!(counters.dropped, 1);
        assert_eq!(counters.evicted, 0);
    }

    #[test]
    fn evict_oldest_policy_keeps_most_recent_k() {
        let config = MacConfig::new()
            .with_mac_address(OWN)
            .with_overflow(OverflowPolicy::EvictOldest);

        let mut frames = Vec::new();
        for i in 0..5u8 {
            frames.push(with_fcs(&wire_frame(OWN, SRC, 0x0800, &[i; 46])));
        }

        let mut server = run_pipeline::<2, 4>(
            &config,
            [FilterRule::unicast(OWN), FilterRule::unicast(OTHER)],
            &frames,
        );

        // Frame 0 evicted; 1..=4 remain in order
        let got = received(&mut server, 0);
        assert_eq!(got.len(), 4);
        for (i, frame) in got.iter().enumerate() {
            assert_eq!(frame[14], i as u8 + 1);
        }
        let counters = server.queue_counters(0).unwrap();
        assert_eq!(counters.evicted, 1);
        assert_eq!(counters.delivered, 5);
    }

    #[test]
    fn aborted_frames_are_counted_not_delivered() {
        let config = MacConfig::new().with_mac_address(OWN);

        let ch: &'static mut StreamChannel<8192> =
            std::boxed::Box::leak(std::boxed::Box::new(StreamChannel::new()));
        let (mut tx, rx) = ch.split();

        // Hand-built aborted frame
        tx.enqueue(StreamEvent::FrameStart).unwrap();
        for &b in &OWN {
            tx.enqueue(StreamEvent::Byte(b)).unwrap();
        }
        tx.enqueue(StreamEvent::FrameEnd { good: false }).unwrap();

        let mut server: RxServer<'_, 1, 4, 1514, 8192> =
            RxServer::new(rx, &config, [FilterRule::unicast(OWN)]);
        server.poll();

        assert!(!server.rx_available(0));
        assert_eq!(server.counters().aborted_frames, 1);
    }

    #[test]
    fn receive_error_paths() {
        let config = MacConfig::new().with_mac_address(OWN);
        let frame = wire_frame(OWN, SRC, 0x0800, &[0u8; 46]);

        let mut server = run_pipeline::<2, 4>(
            &config,
            [FilterRule::unicast(OWN), FilterRule::unicast(OTHER)],
            &[with_fcs(&frame)],
        );

        let mut tiny = [0u8; 8];
        assert_eq!(
            server.receive(0, &mut tiny),
            Err(Error::Rx(RxError::BufferTooSmall))
        );

        let mut buf = [0u8; 1514];
        assert_eq!(
            server.receive(7, &mut buf),
            Err(Error::Config(ConfigError::InvalidQueue))
        );
        assert_eq!(server.receive(1, &mut buf), Err(Error::Rx(RxError::Empty)));

        // Frame still intact after the failed attempts
        assert_eq!(server.receive(0, &mut buf), Ok(frame.len()));
        assert_eq!(&buf[..frame.len()], &frame[..]);
        assert_eq!(server.receive(0, &mut buf), Err(Error::Rx(RxError::Empty)));
    }

    #[test]
    fn peek_and_len_accessors() {
        let config = MacConfig::new().with_mac_address(OWN);
        let frame = wire_frame(OWN, SRC, 0x0800, &[0u8; 50]);

        let server = run_pipeline::<2, 4>(
            &config,
            [FilterRule::unicast(OWN), FilterRule::unicast(OTHER)],
            &[with_fcs(&frame)],
        );

        assert_eq!(server.queue_len(0), 1);
        assert_eq!(server.peek_len(0), Some(frame.len()));
        assert_eq!(server.peek_len(1), None);
        assert_eq!(server.peek_len(9), None);
    }

    #[test]
    fn quiesce_stops_at_frame_boundary() {
        let config = MacConfig::new().with_mac_address(OWN);
        let ch: &'static mut StreamChannel<8192> =
            std::boxed::Box::leak(std::boxed::Box::new(StreamChannel::new()));
        let (_tx, rx) = ch.split();

        let mut server: RxServer<'_, 1, 4, 1514, 8192> =
            RxServer::new(rx, &config, [FilterRule::unicast(OWN)]);

        server.request_stop();
        assert_eq!(server.state(), RunState::Quiescing);
        server.poll();
        assert!(server.is_stopped());
    }
}
