//! Ethernet Frame Check Sequence (CRC-32).
//!
//! IEEE 802.3 uses the reflected CRC-32 polynomial 0xEDB88320 with initial
//! value and final XOR of 0xFFFFFFFF; the resulting checksum is transmitted
//! least-significant byte first. The implementation is table-driven with a
//! 256-entry lookup table generated at compile time.

/// CRC-32 polynomial (IEEE 802.3) - reversed representation.
const CRC32_POLY: u32 = 0xEDB8_8320;

/// Precomputed CRC-32 lookup table (256 entries).
const CRC32_TABLE: [u32; 256] = generate_crc32_table();

/// Residue of a correct frame: CRC-32 computed over a message followed by
/// its own little-endian FCS always yields this constant.
pub const FCS_RESIDUE: u32 = 0x2144_DF1C;

/// Generate the CRC-32 lookup table at compile time.
const fn generate_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC32_POLY
            } else {
                crc >> 1
            };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the CRC-32 of a byte slice in one shot.
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    let mut fcs = Fcs::new();
    fcs.update(data);
    fcs.finalize()
}

/// Compute the 4-byte FCS for a frame, in wire (little-endian) order.
#[must_use]
pub fn frame_fcs(frame: &[u8]) -> [u8; 4] {
    crc32(frame).to_le_bytes()
}

/// Verify a complete wire frame (payload followed by its 4-byte FCS).
///
/// Uses the residue property: running the CRC over the frame *including*
/// the trailing FCS yields [`FCS_RESIDUE`] exactly when the FCS is correct.
#[must_use]
pub fn verify_wire_frame(frame_with_fcs: &[u8]) -> bool {
    if frame_with_fcs.len() < 4 {
        return false;
    }
    let mut fcs = Fcs::new();
    fcs.update(frame_with_fcs);
    fcs.finalize() == FCS_RESIDUE
}

// =============================================================================
// Streaming Accumulator
// =============================================================================

/// Streaming CRC-32 accumulator for byte-at-a-time frame validation.
///
/// The receive server feeds bytes as they arrive so no second pass over
/// the staged frame is needed at end-of-frame.
#[derive(Debug, Clone, Copy)]
pub struct Fcs {
    state: u32,
}

impl Fcs {
    /// Create a fresh accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    /// Reset to the initial state for a new frame.
    pub fn reset(&mut self) {
        self.state = 0xFFFF_FFFF;
    }

    /// Feed a single byte.
    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        let index = ((self.state ^ u32::from(byte)) & 0xFF) as usize;
        self.state = (self.state >> 8) ^ CRC32_TABLE[index];
    }

    /// Feed a byte slice.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.update_byte(byte);
        }
    }

    /// Final checksum value (does not consume the accumulator).
    #[must_use]
    pub const fn finalize(&self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

impl Default for Fcs {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
