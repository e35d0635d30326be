//! Host mailbox: wire format and command dispatch

pub mod dispatch;
pub mod message;
