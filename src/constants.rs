//! IEEE 802.3 framing and timing constants shared across the crate.
//!
//! Frame size constants count bytes on the wire unless stated otherwise.
//! `MAX_FRAME_SIZE` and `MIN_WIRE_FRAME` include the 4-byte FCS;
//! `MIN_FRAME_SIZE` and `MTU` do not.

// =============================================================================
// Frame Layout
// =============================================================================

/// Preamble byte pattern (alternating 1/0 bits, 0x55 on the wire)
pub const PREAMBLE_BYTE: u8 = 0x55;

/// Number of preamble bytes preceding the SFD
pub const PREAMBLE_LEN: usize = 7;

/// Start Frame Delimiter byte
pub const SFD_BYTE: u8 = 0xD5;

/// MAC address length in bytes
pub const MAC_ADDR_LEN: usize = 6;

/// Ethernet header size: destination + source + length/type
pub const ETH_HEADER_SIZE: usize = 14;

/// Frame Check Sequence (CRC-32) size in bytes
pub const FCS_SIZE: usize = 4;

/// Minimum frame size excluding FCS; shorter transmit frames are padded
pub const MIN_FRAME_SIZE: usize = 60;

/// Minimum valid frame size on the wire, including FCS
pub const MIN_WIRE_FRAME: usize = MIN_FRAME_SIZE + FCS_SIZE;

/// Maximum frame size on the wire, including FCS (untagged)
pub const MAX_FRAME_SIZE: usize = 1518;

/// Maximum transmission unit (payload bytes)
pub const MTU: usize = 1500;

/// The all-ones broadcast destination address
pub const BROADCAST_ADDR: [u8; MAC_ADDR_LEN] = [0xFF; MAC_ADDR_LEN];

// =============================================================================
// Timing
// =============================================================================

/// Mandated inter-frame gap in bit times
pub const IFG_BIT_TIMES: u32 = 96;

/// Inter-frame gap at 100 Mbit/s, in nanoseconds (96 bit times)
pub const IFG_NANOS_100M: u64 = 960;

/// Inter-frame gap at 10 Mbit/s, in nanoseconds (96 bit times)
pub const IFG_NANOS_10M: u64 = 9_600;

/// Default malformed-frame timeout in nanoseconds.
///
/// A maximum-size frame takes ~1.26 ms at 10 Mbit/s; a frame lasting
/// longer than this is considered malformed and discarded.
pub const DEFAULT_MAX_FRAME_NANOS: u64 = 2_000_000;

/// Default timeout for a single stalled port write, in nanoseconds
pub const DEFAULT_WRITE_TIMEOUT_NANOS: u64 = 100_000;

// =============================================================================
// Policies
// =============================================================================

/// Default bounded retry count for failed transmit attempts
pub const DEFAULT_TX_RETRY_LIMIT: u8 = 3;

/// Maximum number of multicast acceptance entries per filter rule
pub const MAX_MULTICAST_ENTRIES: usize = 8;

// =============================================================================
// Unit Tests
// =============================================================================
