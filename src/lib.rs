//! Channel-based MII Ethernet MAC layer for `no_std` targets.
//!
//! This crate implements the MAC sublayer between raw MII symbol ports and
//! frame-level consumers, with no heap and no busy-waiting:
//!
//! - **Symbol sampler** ([`Sampler`]): owns the receive port, hunts for
//!   preamble/SFD, reassembles nibbles into bytes, and emits delimited
//!   frame events onto a bounded SPSC channel.
//! - **Receive server** ([`RxServer`]): drains the event channel through N
//!   per-queue destination-address filters, validates length and FCS, and
//!   commits accepted frames to bounded queues under a configurable
//!   overflow policy.
//! - **Transmit server** ([`TxServer`]): arbitrates M submission queues
//!   onto the transmit port, adding preamble, minimum-size padding, FCS,
//!   and the mandatory inter-frame gap, with bounded retries and per-frame
//!   completion reporting.
//! - **Link watcher** ([`LinkWatcher`]): supervises the PHY over the
//!   station management interface and reports link transitions.
//!
//! All tasks are pollable state machines: the application calls `poll`
//! with the current [`Instant`] from its scheduler loop, and the crate
//! never reads a clock or spins. Ports and bus handles are move-only
//! tokens consumed at construction, so exclusive hardware access is
//! enforced at compile time.
//!
//! ```ignore
//! let config = MacConfig::new().with_mac_address(MAC);
//! let mut channel: StreamChannel<2048> = StreamChannel::new();
//! let (producer, consumer) = channel.split();
//!
//! let mut sampler = Sampler::new(rx_port, producer, &config);
//! let mut rx: RxServer<2, 8, 1514, 2048> = RxServer::new(
//!     consumer,
//!     &config,
//!     [FilterRule::unicast(MAC).with_broadcast(true), FilterRule::unicast(MAC2)],
//! );
//! let mut tx: TxServer<_, 2, 8, 1514> = TxServer::new(tx_port, &config);
//!
//! loop {
//!     let now = timer.now();
//!     sampler.poll(now);
//!     rx.poll();
//!     tx.poll(now);
//! }
//! ```
//!
//! # Features
//!
//! - `defmt`: derive `defmt::Format` on public types and log receive and
//!   transmit error paths.

#![no_std]

pub mod config;
pub mod constants;
pub mod error;
pub mod fcs;
pub mod filter;
pub mod hal;
pub mod queue;
pub mod rx_server;
pub mod sampler;
pub mod smi;
pub mod tx_server;

#[cfg(test)]
pub mod testing;

pub use config::{ArbitrationPolicy, MacConfig, OverflowPolicy, RunState};
pub use error::{ConfigError, Error, Result, RxError, TxError};
pub use filter::{AddressFilter, FilterRule, Verdict};
pub use hal::{Duration, Instant, PortError, RxPort, RxSample, TxPort};
pub use queue::{FrameQueue, PushOutcome};
pub use rx_server::{RxCounters, RxQueueCounters, RxServer};
pub use sampler::{
    Sampler, SamplerCounters, StreamChannel, StreamConsumer, StreamEvent, StreamProducer,
};
pub use smi::{LinkState, LinkWatcher, SmiBus, SmiError};
pub use tx_server::{MAX_SUBMIT_SIZE, TxCompletion, TxCounters, TxQueueCounters, TxServer};
