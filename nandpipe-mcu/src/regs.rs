//! Register map of the PDMA MCU peripherals.
//!
//! Offsets below are placeholders for the controller layout; the block
//! bases are supplied by the board through [`RegisterMap`].

use bitflags::bitflags;

/// Peripheral block bases as seen by the MCU
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterMap {
    pub dmac_base: u32,
    pub bch_base: u32,
    /// NEMC control registers
    pub nemc_base: u32,
    pub gpio_base: u32,
    /// Ready/Busy input
    pub rb_pin: u8,
    pub mailbox_base: u32,
    /// TCSM, MCU view
    pub tcsm_base: u32,
}

/* DMAC, per channel */

pub const DMAC_CHANNEL_STRIDE: u32 = 0x20;
/// Source address
pub const DMAC_DSA: u32 = 0x00;
/// Target address
pub const DMAC_DTA: u32 = 0x04;
/// Transfer count
pub const DMAC_DTC: u32 = 0x08;
/// Request type
pub const DMAC_DRT: u32 = 0x0c;
/// Channel control/status
pub const DMAC_DCS: u32 = 0x10;
/// Channel command
pub const DMAC_DCM: u32 = 0x14;
/// Pending channel interrupts (write 1 to clear)
pub const DMAC_DIRQP: u32 = 0x104;

/// DCS: channel transfer enable
pub const DCS_CTE: usize = 0;
/// DCS: transfer terminated
pub const DCS_TT: usize = 3;
/// DCM: transfer interrupt enable
pub const DCM_TIE: usize = 1;

/* BCH */

/// Control: enable, encode, level
pub const BCH_CR: u32 = 0x00;
/// Unit and parity byte counts
pub const BCH_CNT: u32 = 0x04;
/// Status, same layout as `CodecStatus`
pub const BCH_INT: u32 = 0x08;
/// Write to clear status and readback FIFO
pub const BCH_CLR: u32 = 0x0c;

pub const BCH_CR_ENABLE: usize = 0;
pub const BCH_CR_ENCODE: usize = 2;
pub const BCH_CR_LEVEL_SHIFT: u32 = 8;
pub const BCH_CNT_PARITY_SHIFT: u32 = 16;

/* NEMC */

/// NAND chip enables
pub const NEMC_NFCSR: u32 = 0x50;
/// Data phase direction
pub const NEMC_DIR: u32 = 0x58;
/// Toggle-mode strobes
pub const NEMC_TGCR: u32 = 0x5c;

bitflags! {
    /// Toggle-mode strobe enables
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct TgcrFlags: u32 {
        const RE = 1 << 0;
        const DQS = 1 << 1;
    }
}

/// NFCSR: NAND function enable of `bank`
pub fn nfcsr_enable(bank: u8) -> u32 {
    1 << (bank as u32 * 2)
}

/// NFCSR: chip enable of `bank`
pub fn nfcsr_select(bank: u8) -> u32 {
    1 << (bank as u32 * 2 + 1)
}

/* GPIO */

pub const GPIO_PIN: u32 = 0x00;

/* Mailbox */

/// Doorbell, non-zero when the host posted a message
pub const MBOX_DOORBELL: u32 = 0x00;
/// Status word to the host
pub const MBOX_STATUS: u32 = 0x04;
