//! Write pipeline: per unit fetch -> encode -> bus, then spare area and program

use super::Sequencer;
use crate::channel::{self, nand_data_port, Direction, Notify};
use crate::chip::{CtrlStage, PipeMode};
use crate::codec;
use crate::common::hal::{ChannelId, PdmaHal};
use crate::constant::{MAX_ECC_BYTES, MAX_OOB_SIZE};
use crate::error::PdmaError;
use crate::mailbox::message::StatusCode;
use crate::nand::{Capabilities, NandBusProtocol, WriteStage};

impl<H: PdmaHal, P: NandBusProtocol> Sequencer<H, P> {
    /// WRITE: check write protection, then start fetching units
    pub(crate) fn start_write(&mut self, bank: u8, ddr_addr: u32, page: u32) {
        self.reset_channels();
        if self.write_protected(bank) {
            warn!("write: bank={} is write protected", bank);
            self.hal.mailbox_send(StatusCode::WriteProtected);
            return;
        }

        let oob_size = self.chip.geometry.oob_size as usize;
        let blank = [0xffu8; MAX_OOB_SIZE as usize];
        self.hal.scratch_write(self.layout.oob, &blank[..oob_size]);

        self.chip.begin(bank, ddr_addr, page, CtrlStage::WriteData);
        debug!("write: bank={} page={:#x} ddr={:#x}", bank, page, ddr_addr);

        self.hal.bus_select(bank);
        let result = self
            .protocol
            .write_control(&mut self.hal, &self.chip, page, WriteStage::Data)
            .and_then(|_| self.write_step());
        if let Err(err) = result {
            self.halt(err.into());
        }
    }

    /// Status probe on `bank`, the session state is left alone
    fn write_protected(&mut self, bank: u8) -> bool {
        if !self
            .protocol
            .capabilities()
            .contains(Capabilities::WRITE_PROTECT_CHECK)
        {
            return false;
        }
        let probe = self.chip.with_bank(bank);
        self.hal.bus_select(bank);
        let status = self.protocol.status(&mut self.hal, &probe);
        self.protocol.release(&mut self.hal);
        status.is_write_protected()
    }

    pub(super) fn write_unit_done(&mut self, channel: ChannelId) -> Result<(), PdmaError> {
        match channel {
            // unit is in its pipe buffer, encoded on the next step
            ChannelId::Ddr => Ok(()),
            ChannelId::Bch => {
                let unit = self.chip.retired;
                let bytes = self.chip.ecc.bytes as usize;
                let mut parity = [0u8; MAX_ECC_BYTES as usize];
                codec::encode_complete(
                    &mut self.hal,
                    &self.chip,
                    &self.layout,
                    unit,
                    &mut parity[..bytes],
                )?;
                self.hal.scratch_write(
                    self.layout.oob + self.chip.ecc.parity_offset(unit),
                    &parity[..bytes],
                );
                self.program(unit);
                Ok(())
            }
            ChannelId::Bus => {
                self.chip.retired += 1;
                Ok(())
            }
        }
    }

    /// One step with nothing in flight: encode the oldest fetched unit
    /// while the next one is fetched into the other pipe buffer
    pub(super) fn write_step(&mut self) -> Result<(), PdmaError> {
        if self.chip.pipeline > self.chip.retired {
            codec::encode(&mut self.hal, &self.chip, &self.layout, self.chip.retired);
            self.chip.mode.insert(PipeMode::BCH_ENCODE);
        }
        if self.chip.pipeline < self.chip.ecc.steps {
            self.fetch(self.chip.pipeline);
        }
        if self.chip.mode.is_settled() {
            return self.start_write_oob();
        }
        Ok(())
    }

    /// System memory -> pipe buffer of `unit`
    fn fetch(&mut self, unit: u32) {
        let pipe = self.layout.pipe(unit);
        channel::configure(
            &mut self.hal,
            ChannelId::Ddr,
            self.chip.unit_addr(unit),
            pipe.data as u32,
            self.chip.ecc.size,
            Direction::MemoryToScratch,
        );
        channel::launch(&mut self.hal, ChannelId::Ddr, Notify::Interrupt);
        self.chip.pipeline += 1;
        self.chip.mode.insert(PipeMode::DDR_PENDING);
    }

    /// Pipe buffer of `unit` -> bus
    fn program(&mut self, unit: u32) {
        let pipe = self.layout.pipe(unit);
        channel::configure(
            &mut self.hal,
            ChannelId::Bus,
            pipe.data as u32,
            nand_data_port(self.chip.bank),
            self.chip.ecc.size,
            Direction::ScratchToBus,
        );
        channel::launch(&mut self.hal, ChannelId::Bus, Notify::Interrupt);
        self.chip.mode.insert(PipeMode::BUS_PENDING);
    }

    fn start_write_oob(&mut self) -> Result<(), PdmaError> {
        self.chip.ctrl = CtrlStage::WriteOob;
        let page = self.chip.page;
        self.protocol
            .write_control(&mut self.hal, &self.chip, page, WriteStage::Oob)?;
        channel::configure(
            &mut self.hal,
            ChannelId::Bus,
            self.layout.oob as u32,
            nand_data_port(self.chip.bank),
            self.chip.geometry.oob_size,
            Direction::ScratchToBus,
        );
        channel::launch(&mut self.hal, ChannelId::Bus, Notify::Interrupt);
        self.chip.mode.insert(PipeMode::BUS_PENDING);
        Ok(())
    }

    pub(super) fn write_oob_done(&mut self) -> Result<(), PdmaError> {
        self.chip.ctrl = CtrlStage::WriteConfirm;
        let page = self.chip.page;
        self.protocol
            .write_control(&mut self.hal, &self.chip, page, WriteStage::Confirm)?;
        self.halt(StatusCode::WriteDone);
        Ok(())
    }
}
