//! Pipeline sequencer
//!
//! Owns the hardware, the bus protocol and the chip state. Channel
//! completions come in through [`Sequencer::interrupt_entry`] and are
//! consumed one by one in [`Sequencer::handle_pipeline`]; each completion
//! performs one pipeline action, and once nothing is in flight the next
//! unit is started.

mod read;
mod write;

use heapless::spsc::Queue;

use crate::chip::{CtrlStage, NandChip, PipeMode, ScratchLayout};
use crate::common::hal::{ChannelId, PdmaHal};
use crate::constant::EVENT_QUEUE_DEPTH;
use crate::mailbox::message::StatusCode;
use crate::nand::NandBusProtocol;

pub struct Sequencer<H: PdmaHal, P: NandBusProtocol> {
    pub(crate) hal: H,
    pub(crate) protocol: P,
    pub(crate) chip: NandChip,
    pub(crate) layout: ScratchLayout,
    /// INIT accepted at least once
    pub(crate) initialized: bool,
    events: Queue<ChannelId, EVENT_QUEUE_DEPTH>,
}

impl<H: PdmaHal, P: NandBusProtocol> Sequencer<H, P> {
    pub fn new(hal: H, protocol: P) -> Self {
        let chip = NandChip::default();
        Self {
            hal,
            protocol,
            layout: ScratchLayout::new(&chip.ecc),
            chip,
            initialized: false,
            events: Queue::new(),
        }
    }

    pub fn chip(&self) -> &NandChip {
        &self.chip
    }

    pub fn layout(&self) -> &ScratchLayout {
        &self.layout
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Completions waiting for `handle_pipeline`
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Turn pending channel interrupts into events
    pub fn interrupt_entry(&mut self) {
        let pending = self.hal.take_interrupts();
        for channel in ChannelId::ALL {
            if pending.contains(channel.mask()) && self.events.enqueue(channel).is_err() {
                error!("event queue full, ch{:?} completion lost", channel);
            }
        }
    }

    /// Consume every queued completion
    pub fn handle_pipeline(&mut self) {
        while let Some(channel) = self.events.dequeue() {
            self.on_complete(channel);
        }
    }

    fn on_complete(&mut self, channel: ChannelId) {
        let bits = self.chip.mode & pending_bits(channel);
        if bits.is_empty() || self.chip.is_halted() {
            warn!("spurious ch{:?} completion, mode={:?}", channel, self.chip.mode);
            self.hal.clear_channel(channel);
            return;
        }
        self.hal.clear_channel(channel);
        self.chip.mode.remove(bits);

        let result = match (self.chip.ctrl, channel) {
            (CtrlStage::ReadOob, ChannelId::Bus) => self.read_oob_done(),
            (CtrlStage::ReadData, _) => self.read_unit_done(channel),
            (CtrlStage::WriteData, _) => self.write_unit_done(channel),
            (CtrlStage::WriteOob, ChannelId::Bus) => self.write_oob_done(),
            (stage, _) => {
                warn!("ch{:?} completion in {:?}", channel, stage);
                Ok(())
            }
        };
        if let Err(err) = result {
            self.halt(err.into());
            return;
        }

        if !self.chip.is_halted() && self.chip.mode.is_settled() {
            let result = match self.chip.ctrl {
                CtrlStage::ReadData => self.read_step(),
                CtrlStage::WriteData => self.write_step(),
                _ => Ok(()),
            };
            if let Err(err) = result {
                self.halt(err.into());
            }
        }
    }

    /// Drop stale completions before a new page operation
    pub(crate) fn reset_channels(&mut self) {
        for channel in ChannelId::ALL {
            self.hal.clear_channel(channel);
        }
        while self.events.dequeue().is_some() {}
    }

    /// Stop the pipeline and report `status` to the host
    pub(crate) fn halt(&mut self, status: StatusCode) {
        self.chip.mode = PipeMode::HALT;
        self.chip.ctrl = CtrlStage::Idle;
        self.protocol.release(&mut self.hal);
        info!(
            "halt: {:?} bank={} page={:#x} units={}/{}",
            status,
            self.chip.bank,
            self.chip.page,
            self.chip.retired,
            self.chip.ecc.steps
        );
        self.hal.mailbox_send(status);
    }
}

/// Mode bits a channel completion retires
fn pending_bits(channel: ChannelId) -> PipeMode {
    match channel {
        ChannelId::Bus => PipeMode::BUS_PENDING,
        ChannelId::Ddr => PipeMode::DDR_PENDING,
        ChannelId::Bch => PipeMode::BCH_ENCODE | PipeMode::BCH_DECODE,
    }
}
