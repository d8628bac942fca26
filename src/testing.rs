//! Shared test fixtures: scripted port mocks and frame builders.
//!
//! Only compiled for tests. The mocks implement the port and bus traits
//! over pre-loaded scripts, so every pipeline test runs deterministically
//! without hardware.

extern crate std;
use std::vec::Vec;

use crate::constants::{MIN_FRAME_SIZE, PREAMBLE_BYTE, SFD_BYTE};
use crate::fcs::{Fcs, frame_fcs};
use crate::hal::{PortError, RxPort, RxSample, TxPort};
use crate::smi::{SmiBus, SmiError, bmcr, phy_reg};

// =============================================================================
// Frame Builders
// =============================================================================

/// Build a frame (no FCS) from its header fields, zero-padded to the
/// minimum frame size.
pub fn wire_frame(dest: [u8; 6], src: [u8; 6], ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(MIN_FRAME_SIZE.max(14 + payload.len()));
    frame.extend_from_slice(&dest);
    frame.extend_from_slice(&src);
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(payload);
    frame.resize(frame.len().max(MIN_FRAME_SIZE), 0);
    frame
}

/// Append the correct FCS to a frame.
pub fn with_fcs(frame: &[u8]) -> Vec<u8> {
    let mut wire = frame.to_vec();
    wire.extend_from_slice(&frame_fcs(frame));
    wire
}

/// The exact byte stream the transmit server produces for `frame`:
/// preamble, SFD, the frame zero-padded to the minimum size, FCS.
pub fn tx_wire_image(frame: &[u8]) -> Vec<u8> {
    let padded_len = frame.len().max(MIN_FRAME_SIZE);

    let mut fcs = Fcs::new();
    fcs.update(frame);
    for _ in frame.len()..padded_len {
        fcs.update_byte(0);
    }

    let mut wire = Vec::with_capacity(8 + padded_len + 4);
    wire.extend_from_slice(&[PREAMBLE_BYTE; 7]);
    wire.push(SFD_BYTE);
    wire.extend_from_slice(frame);
    wire.resize(8 + padded_len, 0);
    wire.extend_from_slice(&fcs.finalize().to_le_bytes());
    wire
}

// =============================================================================
// Receive Port Mock
// =============================================================================

/// Receive port playing back a pre-loaded sample script.
///
/// Returns `WouldBlock` once the script runs out.
pub struct MockRxPort {
    script: Vec<nb::Result<RxSample, PortError>>,
    pos: usize,
}

impl MockRxPort {
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            pos: 0,
        }
    }

    /// Append one raw sample.
    pub fn push_sample(&mut self, sample: RxSample) {
        self.script.push(Ok(sample));
    }

    /// Append a port error.
    pub fn push_error(&mut self) {
        self.script.push(Err(nb::Error::Other(PortError::Underrun)));
    }

    /// Append preamble nibbles followed by the start-of-frame delimiter.
    pub fn push_preamble(&mut self) {
        // 0x55 bytes then 0xD5, as nibbles low-first: a run of 0x5
        // ending in 0xD
        for _ in 0..15 {
            self.push_sample(RxSample::Data(0x5));
        }
        self.push_sample(RxSample::Data(0xD));
    }

    /// Append a complete frame: preamble, SFD, `frame` as nibbles
    /// (low first), then an idle sample marking end-of-frame.
    pub fn push_frame(&mut self, frame: &[u8]) {
        self.push_preamble();
        for &byte in frame {
            self.push_sample(RxSample::Data(byte & 0x0F));
            self.push_sample(RxSample::Data(byte >> 4));
        }
        self.push_sample(RxSample::Idle);
    }
}

impl Default for MockRxPort {
    fn default() -> Self {
        Self::new()
    }
}

impl RxPort for MockRxPort {
    fn sample(&mut self) -> nb::Result<RxSample, PortError> {
        let Some(&entry) = self.script.get(self.pos) else {
            return Err(nb::Error::WouldBlock);
        };
        self.pos += 1;
        entry
    }
}

// =============================================================================
// Transmit Port Mock
// =============================================================================

/// Transmit port recording every accepted byte.
///
/// By default it never blocks. `stall_after` makes it return `WouldBlock`
/// forever once it has accepted that many bytes; `fault_after` makes it
/// report a hard fault instead.
pub struct MockTxPort {
    /// Every byte the port accepted, in order
    pub written: Vec<u8>,
    stall_after: Option<usize>,
    fault_after: Option<usize>,
}

impl MockTxPort {
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            stall_after: None,
            fault_after: None,
        }
    }

    /// Accept `n` bytes, then block forever.
    #[must_use]
    pub fn stall_after(mut self, n: usize) -> Self {
        self.stall_after = Some(n);
        self
    }

    /// Accept `n` bytes, then fault on every write.
    #[must_use]
    pub fn fault_after(mut self, n: usize) -> Self {
        self.fault_after = Some(n);
        self
    }
}

impl Default for MockTxPort {
    fn default() -> Self {
        Self::new()
    }
}

impl TxPort for MockTxPort {
    fn try_write(&mut self, byte: u8) -> nb::Result<(), PortError> {
        if self.fault_after.is_some_and(|n| self.written.len() >= n) {
            return Err(nb::Error::Other(PortError::Fault));
        }
        if self.stall_after.is_some_and(|n| self.written.len() >= n) {
            return Err(nb::Error::WouldBlock);
        }
        self.written.push(byte);
        Ok(())
    }
}

// =============================================================================
// Management Bus Mock
// =============================================================================

/// Management bus over a scripted register file.
pub struct MockSmiBus {
    regs: [u16; 32],
    /// BMSR values handed out in order; the last one repeats
    bmsr_seq: Vec<u16>,
    bmsr_pos: usize,
    bmcr_reads: usize,
    bmcr_clear_after: Option<usize>,
    fail: bool,
    /// Every write as (register, value)
    pub writes: Vec<(u8, u16)>,
}

impl MockSmiBus {
    pub fn new() -> Self {
        Self {
            regs: [0; 32],
            bmsr_seq: Vec::new(),
            bmsr_pos: 0,
            bmcr_reads: 0,
            bmcr_clear_after: None,
            fail: false,
            writes: Vec::new(),
        }
    }

    /// Set a register's backing value.
    pub fn set_reg(&mut self, reg: u8, value: u16) {
        self.regs[reg as usize] = value;
    }

    /// Script the next BMSR read.
    pub fn push_bmsr(&mut self, value: u16) {
        self.bmsr_seq.push(value);
    }

    /// Read the BMCR reset bit as cleared from the `n`-th read onwards.
    pub fn clear_bmcr_after(&mut self, n: usize) {
        self.bmcr_clear_after = Some(n);
    }

    /// Fail every transaction from now on.
    pub fn fail_bus(&mut self) {
        self.fail = true;
    }
}

impl Default for MockSmiBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SmiBus for MockSmiBus {
    fn read(&mut self, _phy_addr: u8, reg: u8) -> Result<u16, SmiError> {
        if self.fail {
            return Err(SmiError::Bus);
        }
        if reg == phy_reg::BMSR && !self.bmsr_seq.is_empty() {
            let idx = self.bmsr_pos.min(self.bmsr_seq.len() - 1);
            self.bmsr_pos += 1;
            return Ok(self.bmsr_seq[idx]);
        }
        let mut value = self.regs[reg as usize];
        if reg == phy_reg::BMCR {
            if self.bmcr_clear_after.is_some_and(|n| self.bmcr_reads >= n) {
                value &= !bmcr::RESET;
            }
            self.bmcr_reads += 1;
        }
        Ok(value)
    }

    fn write(&mut self, _phy_addr: u8, reg: u8, value: u16) -> Result<(), SmiError> {
        if self.fail {
            return Err(SmiError::Bus);
        }
        self.regs[reg as usize] = value;
        self.writes.push((reg, value));
        Ok(())
    }
}

// =============================================================================
// Delay Mock
// =============================================================================

/// Delay provider that only accumulates the requested time.
pub struct MockDelay {
    /// Total nanoseconds of delay requested
    pub total_ns: u64,
}

impl MockDelay {
    pub fn new() -> Self {
        Self { total_ns: 0 }
    }
}

impl Default for MockDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

// =============================================================================
// Fixture Self-Checks
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fcs::verify_wire_frame;

    #[test]
    fn wire_frame_pads_to_minimum() {
        let frame = wire_frame([0xFF; 6], [2, 0, 0, 0, 0, 1], 0x0800, &[1, 2, 3]);
        assert_eq!(frame.len(), MIN_FRAME_SIZE);
        assert_eq!(&frame[..6], &[0xFF; 6]);
        assert_eq!(&frame[12..14], &[0x08, 0x00]);
        assert_eq!(&frame[14..17], &[1, 2, 3]);
    }

    #[test]
    fn with_fcs_validates() {
        let frame = wire_frame([0xFF; 6], [2, 0, 0, 0, 0, 1], 0x0800, &[9; 50]);
        assert!(verify_wire_frame(&with_fcs(&frame)));
    }

    #[test]
    fn tx_wire_image_matches_with_fcs() {
        let frame = wire_frame([0xFF; 6], [2, 0, 0, 0, 0, 1], 0x0800, &[7; 46]);
        let image = tx_wire_image(&frame);
        assert_eq!(&image[..8], &[0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0xD5]);
        assert_eq!(&image[8..], &with_fcs(&frame)[..]);
    }

    #[test]
    fn mock_rx_port_exhausts_to_would_block() {
        let mut port = MockRxPort::new();
        port.push_sample(RxSample::Idle);
        assert_eq!(port.sample(), Ok(RxSample::Idle));
        assert_eq!(port.sample(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn mock_tx_port_stalls() {
        let mut port = MockTxPort::new().stall_after(2);
        assert_eq!(port.try_write(1), Ok(()));
        assert_eq!(port.try_write(2), Ok(()));
        assert_eq!(port.try_write(3), Err(nb::Error::WouldBlock));
        assert_eq!(port.written, std::vec![1, 2]);
    }
}
