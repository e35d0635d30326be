//! DMA channel descriptor programming

use crate::common::hal::{
    ChannelCommand, ChannelDescriptor, ChannelId, PdmaHal, RequestType, TransferSize,
};
use crate::constant::{
    BCH_DATA_PORT_PHYS, KSEG_PHYS_MASK, NEMC_BANK_PHYS_BASE, NEMC_BANK_STRIDE, NEMC_DATA_OFFSET,
    TCSM_PHYS_BASE,
};
#[cfg(feature = "debug-timeout")]
use crate::constant::BCH_POLL_LIMIT;
use crate::error::PdmaError;

/// Transfer direction. The first endpoint is the source.
///
/// | Direction        | Source            | Destination       |
/// | ---------------- | ----------------- | ----------------- |
/// | BusToScratch     | NAND data port    | TCSM offset       |
/// | ScratchToBus     | TCSM offset       | NAND data port    |
/// | ScratchToCodec   | TCSM offset       | BCH data port     |
/// | CodecToScratch   | BCH data port     | TCSM offset       |
/// | MemoryToScratch  | kseg address      | TCSM offset       |
/// | ScratchToMemory  | TCSM offset       | kseg address      |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    BusToScratch,
    ScratchToBus,
    ScratchToCodec,
    CodecToScratch,
    MemoryToScratch,
    ScratchToMemory,
}

/// Completion signalling of a launched transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notify {
    /// Raise the channel interrupt
    Interrupt,
    /// Caller polls `channel_complete`
    Polled,
}

/// One end of a transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Endpoint {
    /// Fixed hardware port (physical)
    Port(u32),
    /// TCSM offset
    Scratch(u32),
    /// kseg0/kseg1 system memory address
    Memory(u32),
}

impl Endpoint {
    fn phys(self) -> u32 {
        match self {
            Endpoint::Port(addr) => addr,
            Endpoint::Scratch(offset) => scratch_to_phys(offset),
            Endpoint::Memory(addr) => virt_to_phys(addr),
        }
    }

    /// Linear buffers advance, ports stay put
    fn increments(self) -> bool {
        !matches!(self, Endpoint::Port(_))
    }
}

/// kseg address to physical
pub fn virt_to_phys(addr: u32) -> u32 {
    addr & KSEG_PHYS_MASK
}

/// TCSM offset as seen by the channels
pub fn scratch_to_phys(offset: u32) -> u32 {
    TCSM_PHYS_BASE + offset
}

/// Data port of the bank's NEMC window
pub fn nand_data_port(bank: u8) -> u32 {
    NEMC_BANK_PHYS_BASE + bank as u32 * NEMC_BANK_STRIDE + NEMC_DATA_OFFSET
}

/// Program `channel` to move `count` bytes.
///
/// `src`/`dst` are interpreted per `direction`: scratch ends are TCSM
/// offsets, memory ends are kseg addresses and port ends are physical port
/// addresses (see [`nand_data_port`], [`crate::constant::BCH_DATA_PORT_PHYS`]).
/// The channel must not have a transfer outstanding.
pub fn configure<H: PdmaHal>(
    hal: &mut H,
    channel: ChannelId,
    src: u32,
    dst: u32,
    count: u32,
    direction: Direction,
) {
    let (src, dst) = match direction {
        Direction::BusToScratch => (Endpoint::Port(src), Endpoint::Scratch(dst)),
        Direction::ScratchToBus => (Endpoint::Scratch(src), Endpoint::Port(dst)),
        Direction::ScratchToCodec => (Endpoint::Scratch(src), Endpoint::Port(BCH_DATA_PORT_PHYS)),
        Direction::CodecToScratch => (Endpoint::Port(BCH_DATA_PORT_PHYS), Endpoint::Scratch(dst)),
        Direction::MemoryToScratch => (Endpoint::Memory(src), Endpoint::Scratch(dst)),
        Direction::ScratchToMemory => (Endpoint::Scratch(src), Endpoint::Memory(dst)),
    };
    let (src_phys, dst_phys) = (src.phys(), dst.phys());

    let size = if count % 4 == 0 && src_phys % 4 == 0 && dst_phys % 4 == 0 {
        TransferSize::Word
    } else {
        TransferSize::Byte
    };

    let mut command = ChannelCommand::default();
    command.set_src_inc(src.increments());
    command.set_dst_inc(dst.increments());
    command.set_transfer_size(size);

    let descriptor = ChannelDescriptor {
        src: src_phys,
        dst: dst_phys,
        count: count / size.bytes(),
        request: RequestType::Auto,
        command,
    };
    trace!(
        "ch{:?} {:?} src={:#x} dst={:#x} len={:#x}",
        channel,
        direction,
        descriptor.src,
        descriptor.dst,
        count
    );
    hal.configure_channel(channel, &descriptor);
}

/// Clear the stale completion bit and start the programmed transfer
pub fn launch<H: PdmaHal>(hal: &mut H, channel: ChannelId, notify: Notify) {
    hal.clear_channel(channel);
    hal.launch_channel(channel, notify == Notify::Interrupt);
}

/// Busy-poll a `Notify::Polled` transfer, then clear its completion bit
#[cfg(not(feature = "debug-timeout"))]
pub fn wait_complete<H: PdmaHal>(hal: &mut H, channel: ChannelId) -> Result<(), PdmaError> {
    while !hal.channel_complete(channel) {}
    hal.clear_channel(channel);
    Ok(())
}

/// Busy-poll a `Notify::Polled` transfer, then clear its completion bit
#[cfg(feature = "debug-timeout")]
pub fn wait_complete<H: PdmaHal>(hal: &mut H, channel: ChannelId) -> Result<(), PdmaError> {
    for _ in 0..BCH_POLL_LIMIT {
        if hal.channel_complete(channel) {
            hal.clear_channel(channel);
            return Ok(());
        }
    }
    error!("ch{:?} poll timeout", channel);
    Err(PdmaError::Timeout)
}
