//! Asynchronous-interface ("common") NAND

use nandpipe_nandio::cmd::{NandCommandId, NandStatus};

use super::{
    column_address, page_address, row_address, send_address, send_command, wait_ready,
    Capabilities, NandBusProtocol, ReadStage, WriteStage,
};
use crate::chip::{NandChip, NandTiming};
use crate::common::hal::{BusDirection, PdmaHal};
use crate::error::PdmaError;

/// Legacy-capable NAND with calibrated delays
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommonNand;

impl CommonNand {
    pub fn new() -> Self {
        Self
    }
}

fn delay<H: PdmaHal>(hal: &mut H, ns: u32) {
    let cycles = NandTiming::cycles(ns);
    if cycles > 0 {
        hal.delay_cycles(cycles);
    }
}

impl NandBusProtocol for CommonNand {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn read_control<H: PdmaHal>(
        &mut self,
        hal: &mut H,
        chip: &NandChip,
        page: u32,
        stage: ReadStage,
    ) -> Result<(), PdmaError> {
        let timing = &chip.timing;
        let small = chip.geometry.is_small_page();
        match stage {
            ReadStage::Oob if small => {
                send_command(hal, NandCommandId::ReadOob);
                send_address(hal, &page_address(chip, 0, page));
                delay(hal, timing.twb);
                wait_ready(hal)?;
                delay(hal, timing.trr);
            }
            ReadStage::Oob => {
                send_command(hal, NandCommandId::ReadFirst);
                send_address(hal, &page_address(chip, chip.geometry.page_size, page));
                send_command(hal, NandCommandId::ReadSecond);
                delay(hal, timing.twb);
                wait_ready(hal)?;
                delay(hal, timing.trr);
            }
            ReadStage::Data if small => {
                // page register is not kept across READOOB, load again
                send_command(hal, NandCommandId::ReadFirst);
                send_address(hal, &page_address(chip, 0, page));
                delay(hal, timing.twb);
                wait_ready(hal)?;
                delay(hal, timing.trr);
            }
            ReadStage::Data => {
                send_command(hal, NandCommandId::RandomDataOut);
                send_address(hal, &column_address(chip, 0));
                send_command(hal, NandCommandId::RandomDataOutSecond);
                delay(hal, timing.twhr2);
            }
        }
        hal.bus_arm(BusDirection::Read);
        Ok(())
    }

    fn write_control<H: PdmaHal>(
        &mut self,
        hal: &mut H,
        chip: &NandChip,
        page: u32,
        stage: WriteStage,
    ) -> Result<(), PdmaError> {
        let timing = &chip.timing;
        match stage {
            WriteStage::Data => {
                send_command(hal, NandCommandId::SequentialInput);
                send_address(hal, &page_address(chip, 0, page));
                delay(hal, timing.tadl);
                hal.bus_arm(BusDirection::Write);
            }
            WriteStage::Oob if chip.geometry.is_small_page() => {
                // data port runs on into the spare area
                hal.bus_arm(BusDirection::Write);
            }
            WriteStage::Oob => {
                send_command(hal, NandCommandId::RandomDataIn);
                delay(hal, timing.tcwaw);
                send_address(hal, &column_address(chip, chip.geometry.page_size));
                delay(hal, timing.tadl);
                hal.bus_arm(BusDirection::Write);
            }
            WriteStage::Confirm => {
                send_command(hal, NandCommandId::PageProgram);
                delay(hal, timing.twb);
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

    fn status<H: PdmaHal>(&mut self, hal: &mut H, chip: &NandChip) -> NandStatus {
        send_command(hal, NandCommandId::StatusRead);
        delay(hal, chip.timing.twhr);
        NandStatus::from_raw(hal.bus_read_status())
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
        delay(hal, chip.timing.twb);
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
}
