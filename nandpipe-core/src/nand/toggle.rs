//! Toggle-mode DDR NAND
//!
//! No delay loops: the controller paces the DQS interface. Data phases are
//! bracketed by the explicit RE/DQS enables.

use nandpipe_nandio::cmd::{NandCommandId, NandStatus};

use super::{
    column_address, page_address, row_address, send_address, send_command, wait_ready,
    Capabilities, NandBusProtocol, ReadStage, WriteStage,
};
use crate::chip::NandChip;
use crate::common::hal::{BusDirection, BusStrobe, PdmaHal};
use crate::error::PdmaError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ToggleNand;

impl ToggleNand {
    pub fn new() -> Self {
        Self
    }

    fn strobes_off<H: PdmaHal>(hal: &mut H) {
        hal.set_strobe(BusStrobe::ReadEnable, false);
        hal.set_strobe(BusStrobe::DataStrobe, false);
    }

    fn open_read<H: PdmaHal>(hal: &mut H) {
        hal.set_strobe(BusStrobe::ReadEnable, true);
        hal.bus_arm(BusDirection::Read);
    }

    fn open_write<H: PdmaHal>(hal: &mut H) {
        hal.set_strobe(BusStrobe::DataStrobe, true);
        hal.bus_arm(BusDirection::Write);
    }
}

impl NandBusProtocol for ToggleNand {
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    fn read_control<H: PdmaHal>(
        &mut self,
        hal: &mut H,
        chip: &NandChip,
        page: u32,
        stage: ReadStage,
    ) -> Result<(), PdmaError> {
        Self::strobes_off(hal);
        match stage {
            ReadStage::Oob => {
                send_command(hal, NandCommandId::ReadFirst);
                send_address(hal, &page_address(chip, chip.geometry.page_size, page));
                send_command(hal, NandCommandId::ReadSecond);
                wait_ready(hal)?;
            }
            ReadStage::Data => {
                send_command(hal, NandCommandId::RandomDataOut);
                send_address(hal, &column_address(chip, 0));
                send_command(hal, NandCommandId::RandomDataOutSecond);
            }
        }
        Self::open_read(hal);
        Ok(())
    }

    fn write_control<H: PdmaHal>(
        &mut self,
        hal: &mut H,
        chip: &NandChip,
        page: u32,
        stage: WriteStage,
    ) -> Result<(), PdmaError> {
        Self::strobes_off(hal);
        match stage {
            WriteStage::Data => {
                send_command(hal, NandCommandId::SequentialInput);
                send_address(hal, &page_address(chip, 0, page));
                Self::open_write(hal);
            }
            WriteStage::Oob => {
                send_command(hal, NandCommandId::RandomDataIn);
                send_address(hal, &column_address(chip, chip.geometry.page_size));
                Self::open_write(hal);
            }
            WriteStage::Confirm => {
                send_command(hal, NandCommandId::PageProgram);
                wait_ready(hal)?;
                let status = self.status(hal, chip);
                if status.is_failed() {
                    warn!("program failed: page={:#x} status={:?}", page, status);
                    return Err(PdmaError::ProgramFailed);
                }
            }
        }
        Ok(())
    }

    fn status<H: PdmaHal>(&mut self, hal: &mut H, _chip: &NandChip) -> NandStatus {
        send_command(hal, NandCommandId::StatusRead);
        hal.set_strobe(BusStrobe::ReadEnable, true);
        // first byte out of the DDR interface is stale
        let _ = hal.bus_read_status();
        let status = NandStatus::from_raw(hal.bus_read_status());
        hal.set_strobe(BusStrobe::ReadEnable, false);
        status
    }

    fn erase<H: PdmaHal>(
        &mut self,
        hal: &mut H,
        chip: &NandChip,
        page: u32,
    ) -> Result<(), PdmaError> {
        hal.bus_select(chip.bank);
        send_command(hal, NandCommandId::BlockEraseFirst);
        send_address(hal, &row_address(chip, page));
        send_command(hal, NandCommandId::BlockEraseSecond);
        let result = wait_ready(hal).and_then(|_| {
            let status = self.status(hal, chip);
            if status.is_failed() {
                warn!("erase failed: page={:#x} status={:?}", page, status);
                Err(PdmaError::EraseFailed)
            } else {
                Ok(())
            }
        });
        hal.bus_release();
        result
    }

    fn release<H: PdmaHal>(&mut self, hal: &mut H) {
        Self::strobes_off(hal);
        hal.bus_release();
    }
}
