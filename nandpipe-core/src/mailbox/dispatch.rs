//! Host command dispatch

use crate::chip::{NandChip, ScratchLayout};
use crate::common::hal::PdmaHal;
use crate::constant::MAX_BANKS;
use crate::error::PdmaError;
use crate::mailbox::message::{param, InitParams, Message, MessageCommand, StatusCode};
use crate::nand::{Capabilities, NandBusProtocol};
use crate::sequencer::Sequencer;

impl<H: PdmaHal, P: NandBusProtocol> Sequencer<H, P> {
    /// Take at most one message from the mailbox
    pub fn handle_message(&mut self) {
        if let Some(msg) = self.hal.mailbox_recv() {
            self.dispatch(&msg);
        }
    }

    /// Run one host command. READ and WRITE report later, from the pipeline.
    pub fn dispatch(&mut self, msg: &Message) {
        let Some(cmd) = msg.command() else {
            debug!("unknown command {:#x} ignored", msg.cmd);
            return;
        };
        if cmd != MessageCommand::Init && !self.initialized {
            warn!("{:?} before INIT ignored", cmd);
            return;
        }

        match cmd {
            MessageCommand::Init => self.init(msg),
            MessageCommand::Read => {
                if let Some(bank) = checked_bank(msg.param(param::RW_BANK)) {
                    self.start_read(
                        bank,
                        msg.param(param::RW_DDR_ADDR),
                        msg.param(param::RW_PAGE),
                    );
                }
            }
            MessageCommand::Write => {
                if let Some(bank) = checked_bank(msg.param(param::RW_BANK)) {
                    self.start_write(
                        bank,
                        msg.param(param::RW_DDR_ADDR),
                        msg.param(param::RW_PAGE),
                    );
                }
            }
            MessageCommand::Erase => {
                if let Some(bank) = checked_bank(msg.param(param::ERASE_BANK)) {
                    self.erase(bank, msg.param(param::ERASE_PAGE));
                }
            }
        }
    }

    fn init(&mut self, msg: &Message) {
        let caps = self.protocol.capabilities();
        let parsed = InitParams::parse(msg, caps.contains(Capabilities::TIMING)).and_then(|p| {
            if p.geometry.is_small_page() && !caps.contains(Capabilities::SMALL_PAGE) {
                Err(PdmaError::InvalidConfig)
            } else {
                Ok(p)
            }
        });
        match parsed {
            Ok(params) => {
                self.reset_channels();
                self.chip = NandChip::new(params.geometry, params.ecc, params.timing);
                self.layout = ScratchLayout::new(&params.ecc);
                self.initialized = true;
                info!(
                    "init: page={} oob={} ecc {}x{}+{} level={}",
                    params.geometry.page_size,
                    params.geometry.oob_size,
                    params.ecc.steps,
                    params.ecc.size,
                    params.ecc.bytes,
                    params.ecc.level
                );
                self.hal.mailbox_send(StatusCode::InitDone);
            }
            Err(err) => {
                warn!("init rejected: {:?}", err);
                self.hal.mailbox_send(StatusCode::InitInvalid);
            }
        }
    }

    /// Synchronous erase, the page pipeline state is not touched
    fn erase(&mut self, bank: u8, page: u32) {
        let probe = self.chip.with_bank(bank);
        let status = match self.protocol.erase(&mut self.hal, &probe, page) {
            Ok(()) => StatusCode::EraseDone,
            Err(err) => err.into(),
        };
        debug!("erase: bank={} page={:#x} -> {:?}", bank, page, status);
        self.hal.mailbox_send(status);
    }
}

fn checked_bank(bank: u32) -> Option<u8> {
    if bank < MAX_BANKS {
        Some(bank as u8)
    } else {
        warn!("bank {} out of range", bank);
        None
    }
}
