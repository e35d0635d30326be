#![cfg_attr(not(test), no_std)]

// must go first so the logging macros are visible to the other modules
#[macro_use]
mod fmt;

pub mod channel;
pub mod chip;
pub mod codec;
pub mod common;
pub mod constant;
pub mod error;
pub mod event_loop;
pub mod mailbox;
pub mod nand;
pub mod sequencer;

pub use chip::{CtrlStage, EccReport, NandChip, PipeMode, ScratchLayout};
pub use common::hal::PdmaHal;
pub use error::PdmaError;
pub use event_loop::EventLoop;
pub use mailbox::message::{Message, MessageCommand, StatusCode};
pub use nand::{common::CommonNand, toggle::ToggleNand, NandBusProtocol};
pub use sequencer::Sequencer;
