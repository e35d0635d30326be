//! Read pipeline: spare area first, then per unit bus -> decode -> drain

use super::Sequencer;
use crate::channel::{self, nand_data_port, Direction, Notify};
use crate::chip::{CtrlStage, EccReport, PipeMode};
use crate::codec;
use crate::common::hal::{ChannelId, PdmaHal};
use crate::constant::{MAX_ECC_BYTES, MOVE_BLOCK_MARGIN};
use crate::error::PdmaError;
use crate::mailbox::message::StatusCode;
use crate::nand::{Capabilities, NandBusProtocol, ReadStage};

impl<H: PdmaHal, P: NandBusProtocol> Sequencer<H, P> {
    /// READ: load the page and pull the spare area into the OOB staging buffer
    pub(crate) fn start_read(&mut self, bank: u8, ddr_addr: u32, page: u32) {
        self.reset_channels();
        self.chip.begin(bank, ddr_addr, page, CtrlStage::ReadOob);
        debug!("read: bank={} page={:#x} ddr={:#x}", bank, page, ddr_addr);

        self.hal.bus_select(bank);
        if let Err(err) = self
            .protocol
            .read_control(&mut self.hal, &self.chip, page, ReadStage::Oob)
        {
            self.halt(err.into());
            return;
        }
        channel::configure(
            &mut self.hal,
            ChannelId::Bus,
            nand_data_port(bank),
            self.layout.oob as u32,
            self.chip.geometry.oob_size,
            Direction::BusToScratch,
        );
        channel::launch(&mut self.hal, ChannelId::Bus, Notify::Interrupt);
        self.chip.mode.insert(PipeMode::BUS_PENDING);
    }

    pub(super) fn read_oob_done(&mut self) -> Result<(), PdmaError> {
        self.chip.ctrl = CtrlStage::ReadData;
        self.chip.pipeline = 0;
        self.chip.retired = 0;
        let page = self.chip.page;
        self.protocol
            .read_control(&mut self.hal, &self.chip, page, ReadStage::Data)
    }

    pub(super) fn read_unit_done(&mut self, channel: ChannelId) -> Result<(), PdmaError> {
        match channel {
            // unit sits in its pipe buffer, decoded on the next step
            ChannelId::Bus => Ok(()),
            ChannelId::Bch => {
                let unit = self.chip.retired;
                let report = codec::decode_complete(&mut self.hal, &self.chip, &self.layout, unit)?;
                self.chip.report = self.chip.report.merge(report);
                if report.is_uncorrectable() {
                    warn!("unit {} uncorrectable, page={:#x}", unit, self.chip.page);
                    self.chip.retired += 1;
                } else {
                    self.drain(unit);
                }
                Ok(())
            }
            ChannelId::Ddr => {
                self.chip.retired += 1;
                Ok(())
            }
        }
    }

    /// One step with nothing in flight: decode the oldest staged unit while
    /// the bus fills the other pipe buffer
    pub(super) fn read_step(&mut self) -> Result<(), PdmaError> {
        let steps = self.chip.ecc.steps;
        if self.chip.pipeline > self.chip.retired {
            self.decode(self.chip.retired);
        }
        if self.chip.pipeline < steps && !self.chip.report.is_uncorrectable() {
            self.stage(self.chip.pipeline);
        }
        if self.chip.mode.is_settled() {
            self.finish_read();
        }
        Ok(())
    }

    /// Bus -> pipe buffer of `unit`
    fn stage(&mut self, unit: u32) {
        let pipe = self.layout.pipe(unit);
        channel::configure(
            &mut self.hal,
            ChannelId::Bus,
            nand_data_port(self.chip.bank),
            pipe.data as u32,
            self.chip.ecc.size,
            Direction::BusToScratch,
        );
        channel::launch(&mut self.hal, ChannelId::Bus, Notify::Interrupt);
        self.chip.pipeline += 1;
        self.chip.mode.insert(PipeMode::BUS_PENDING);
    }

    fn decode(&mut self, unit: u32) {
        let bytes = self.chip.ecc.bytes as usize;
        let mut parity = [0u8; MAX_ECC_BYTES as usize];
        self.hal.scratch_read(
            self.layout.oob + self.chip.ecc.parity_offset(unit),
            &mut parity[..bytes],
        );
        codec::decode(&mut self.hal, &self.chip, &self.layout, unit, &parity[..bytes]);
        self.chip.mode.insert(PipeMode::BCH_DECODE);
    }

    /// Pipe buffer of `unit` -> system memory
    fn drain(&mut self, unit: u32) {
        let pipe = self.layout.pipe(unit);
        channel::configure(
            &mut self.hal,
            ChannelId::Ddr,
            pipe.data as u32,
            self.chip.unit_addr(unit),
            self.chip.ecc.size,
            Direction::ScratchToMemory,
        );
        channel::launch(&mut self.hal, ChannelId::Ddr, Notify::Interrupt);
        self.chip.mode.insert(PipeMode::DDR_PENDING);
    }

    fn finish_read(&mut self) {
        let status = match self.chip.report {
            EccReport::Uncorrectable => StatusCode::UncorrectableEcc,
            EccReport::AllOnes => StatusCode::AllOnesBlock,
            EccReport::Corrected(n) if self.near_limit(n) => StatusCode::MoveBlockHint,
            EccReport::Corrected(_) | EccReport::Clean => StatusCode::ReadDone,
        };
        self.halt(status);
    }

    /// A unit needed almost every correctable bit
    fn near_limit(&self, corrected: u32) -> bool {
        let threshold = self.chip.ecc.level.saturating_sub(MOVE_BLOCK_MARGIN).max(1);
        self.protocol
            .capabilities()
            .contains(Capabilities::MOVE_BLOCK_HINT)
            && corrected >= threshold
    }
}
