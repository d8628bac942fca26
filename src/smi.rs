//! Station management interface: PHY register access and link supervision.
//!
//! The MAC core itself never talks to the PHY; a [`LinkWatcher`] owns the
//! management bus handle, tracks link state across polls, and the
//! application forwards transitions to the transmit server with
//! [`set_link_state`](crate::tx_server::TxServer::set_link_state).

use embedded_hal::delay::DelayNs;

/// IEEE 802.3 clause 22 register addresses.
pub mod phy_reg {
    /// Basic Mode Control Register
    pub const BMCR: u8 = 0x00;
    /// Basic Mode Status Register
    pub const BMSR: u8 = 0x01;
}

/// BMCR bit masks.
pub mod bmcr {
    /// Software reset; self-clearing
    pub const RESET: u16 = 1 << 15;
    /// Auto-negotiation enable
    pub const AUTONEG_ENABLE: u16 = 1 << 12;
    /// Restart auto-negotiation; self-clearing
    pub const RESTART_AUTONEG: u16 = 1 << 9;
}

/// BMSR bit masks.
pub mod bmsr {
    /// Auto-negotiation process completed
    pub const AUTONEG_COMPLETE: u16 = 1 << 5;
    /// Link is up. Latched low by the PHY: a clear bit means the link
    /// dropped at least once since the last read.
    pub const LINK_STATUS: u16 = 1 << 2;
}

// =============================================================================
// Errors
// =============================================================================

/// Management interface failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmiError {
    /// The bus transaction itself failed
    Bus,
    /// The PHY did not reach the expected state within the allotted time
    Timeout,
}

impl SmiError {
    /// Error description string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SmiError::Bus => "management bus transaction failed",
            SmiError::Timeout => "PHY state change timed out",
        }
    }
}

impl core::fmt::Display for SmiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Bus Contract
// =============================================================================

/// Clause 22 management bus (MDC/MDIO pair or equivalent).
pub trait SmiBus {
    /// Read a 16-bit PHY register.
    fn read(&mut self, phy_addr: u8, reg: u8) -> Result<u16, SmiError>;

    /// Write a 16-bit PHY register.
    fn write(&mut self, phy_addr: u8, reg: u8, value: u16) -> Result<(), SmiError>;
}

/// Physical link state as reported by the PHY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Carrier present
    Up,
    /// No carrier
    #[default]
    Down,
}

// =============================================================================
// Link Watcher
// =============================================================================

/// Polls one PHY's status register and reports link transitions.
pub struct LinkWatcher<S: SmiBus> {
    bus: S,
    phy_addr: u8,
    last: LinkState,
}

impl<S: SmiBus> LinkWatcher<S> {
    /// Bind a management bus handle to a PHY address. The link starts
    /// reported as down until the first poll says otherwise.
    pub fn new(bus: S, phy_addr: u8) -> Self {
        Self {
            bus,
            phy_addr,
            last: LinkState::Down,
        }
    }

    /// Software-reset the PHY and wait for the reset bit to self-clear.
    ///
    /// # Errors
    /// - `Bus` - a register access failed
    /// - `Timeout` - the reset bit stayed set
    pub fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), SmiError> {
        self.bus.write(self.phy_addr, phy_reg::BMCR, bmcr::RESET)?;
        for _ in 0..100 {
            if self.bus.read(self.phy_addr, phy_reg::BMCR)? & bmcr::RESET == 0 {
                return Ok(());
            }
            delay.delay_ms(1);
        }
        Err(SmiError::Timeout)
    }

    /// Enable and restart auto-negotiation.
    pub fn restart_autoneg(&mut self) -> Result<(), SmiError> {
        self.bus.write(
            self.phy_addr,
            phy_reg::BMCR,
            bmcr::AUTONEG_ENABLE | bmcr::RESTART_AUTONEG,
        )
    }

    /// Read the status register once and report a transition, if any.
    ///
    /// Returns `Some(state)` only when the link changed since the previous
    /// poll. The status bit is latched low, so a single read is enough to
    /// catch a drop that happened between polls.
    pub fn poll_link(&mut self) -> Result<Option<LinkState>, SmiError> {
        let status = self.bus.read(self.phy_addr, phy_reg::BMSR)?;
        let current = if status & bmsr::LINK_STATUS != 0 {
            LinkState::Up
        } else {
            LinkState::Down
        };
        if current == self.last {
            return Ok(None);
        }
        self.last = current;

        #[cfg(feature = "defmt")]
        defmt::info!("phy {}: link {}", self.phy_addr, current);

        Ok(Some(current))
    }

    /// The state reported by the most recent poll.
    #[must_use]
    pub fn link(&self) -> LinkState {
        self.last
    }

    /// Block until the link comes up, polling at `interval_us` for at most
    /// `attempts` reads.
    ///
    /// # Errors
    /// - `Bus` - a register access failed
    /// - `Timeout` - the link stayed down for all attempts
    pub fn wait_link_up<D: DelayNs>(
        &mut self,
        delay: &mut D,
        attempts: u32,
        interval_us: u32,
    ) -> Result<(), SmiError> {
        for _ in 0..attempts {
            if self.bus.read(self.phy_addr, phy_reg::BMSR)? & bmsr::LINK_STATUS != 0 {
                self.last = LinkState::Up;
                return Ok(());
            }
            delay.delay_us(interval_us);
        }
        Err(SmiError::Timeout)
    }

    /// Reclaim the bus handle, consuming the watcher.
    #[must_use]
    pub fn into_bus(self) -> S {
        self.bus
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
