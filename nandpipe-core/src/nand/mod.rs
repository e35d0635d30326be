//! NAND bus protocols
//!
//! The sequencer is generic over [`NandBusProtocol`]. Both variants issue the
//! same command set and differ in timing delays, strobe handling and the
//! extra checks they support.

pub mod common;
pub mod toggle;

use bitflags::bitflags;
use nandpipe_nandio::address::{AddressCycles, NandAddress};
use nandpipe_nandio::cmd::{NandCommandId, NandStatus};

use crate::chip::NandChip;
use crate::common::hal::PdmaHal;
use crate::constant::READY_POLL_LIMIT;
use crate::error::PdmaError;

bitflags! {
    /// Optional behaviour of a bus protocol
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// Status check before WRITE
        const WRITE_PROTECT_CHECK = 1 << 0;
        /// Report MoveBlockHint on reads close to the correction limit
        const MOVE_BLOCK_HINT = 1 << 1;
        /// Legacy 512 byte page command sequences
        const SMALL_PAGE = 1 << 2;
        /// INIT carries timing words, delays are inserted
        const TIMING = 1 << 3;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Capabilities {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Capabilities({=u8:#04x})", self.bits())
    }
}

/// Read control stages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadStage {
    /// Page load, spare area first
    Oob,
    /// Rewind to column 0
    Data,
}

/// Program control stages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteStage {
    /// Sequential input at column 0
    Data,
    /// Move to the spare area
    Oob,
    /// Program and check status
    Confirm,
}

/// Command/address sequences of one NAND bus flavour.
///
/// Every method leaves the bus selected (except `erase`, which selects and
/// releases the bank itself). The data phases are done by the bus channel
/// after `read_control`/`write_control` armed it.
pub trait NandBusProtocol {
    fn capabilities(&self) -> Capabilities;

    fn read_control<H: PdmaHal>(
        &mut self,
        hal: &mut H,
        chip: &NandChip,
        page: u32,
        stage: ReadStage,
    ) -> Result<(), PdmaError>;

    fn write_control<H: PdmaHal>(
        &mut self,
        hal: &mut H,
        chip: &NandChip,
        page: u32,
        stage: WriteStage,
    ) -> Result<(), PdmaError>;

    /// Read status of the selected bank
    fn status<H: PdmaHal>(&mut self, hal: &mut H, chip: &NandChip) -> NandStatus;

    /// Erase the block containing `page` on `chip.bank`
    fn erase<H: PdmaHal>(&mut self, hal: &mut H, chip: &NandChip, page: u32)
        -> Result<(), PdmaError>;

    /// End of a page operation
    fn release<H: PdmaHal>(&mut self, hal: &mut H) {
        hal.bus_release();
    }
}

pub(crate) fn send_command<H: PdmaHal>(hal: &mut H, id: NandCommandId) {
    hal.bus_cmd(id.opcode());
}

pub(crate) fn send_address<H: PdmaHal>(hal: &mut H, cycles: &AddressCycles) {
    for byte in cycles.as_slice() {
        hal.bus_addr(*byte);
    }
}

/// Full column + row address of `page`
pub(crate) fn page_address(chip: &NandChip, column: u32, page: u32) -> AddressCycles {
    NandAddress::new(column as u16, page).to_cycles(
        chip.geometry.page_size,
        chip.geometry.row_cycles as usize,
    )
}

/// Column only (random data in/out)
pub(crate) fn column_address(chip: &NandChip, column: u32) -> AddressCycles {
    NandAddress::new(column as u16, 0).to_column_cycles(chip.geometry.page_size)
}

/// Row only (block erase)
pub(crate) fn row_address(chip: &NandChip, page: u32) -> AddressCycles {
    NandAddress::new(0, page).to_row_cycles(chip.geometry.row_cycles as usize)
}

/// Poll Ready/Busy
pub(crate) fn wait_ready<H: PdmaHal>(hal: &mut H) -> Result<(), PdmaError> {
    for _ in 0..READY_POLL_LIMIT {
        if hal.ready() {
            return Ok(());
        }
    }
    warn!("ready/busy timeout");
    Err(PdmaError::Timeout)
}
