use bitfield::bitfield;
use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[cfg(test)]
use mockall::automock;

use crate::mailbox::message::{Message, StatusCode};

/// PDMA channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ChannelId {
    /// NAND bus <-> scratch
    Bus = 0,
    /// System memory <-> scratch
    Ddr = 1,
    /// BCH codec <-> scratch
    Bch = 2,
}

impl ChannelId {
    pub const ALL: [ChannelId; 3] = [ChannelId::Bus, ChannelId::Ddr, ChannelId::Bch];

    /// Interrupt bit of the channel
    pub fn mask(self) -> ChannelMask {
        ChannelMask::from_bits_truncate(1 << u8::from(self))
    }
}

bitflags! {
    /// Pending interrupt word
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelMask: u32 {
        const BUS = 1 << 0;
        const DDR = 1 << 1;
        const BCH = 1 << 2;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ChannelMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ChannelMask({=u32:#x})", self.bits())
    }
}

/// DMA request type
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RequestType {
    /// Hardware paced, no peripheral handshake
    Auto = 8,
}

/// Transfer unit width
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferSize {
    Word = 0,
    Byte = 1,
}

impl TransferSize {
    /// Bytes moved per transfer unit
    pub fn bytes(self) -> u32 {
        match self {
            TransferSize::Word => 4,
            TransferSize::Byte => 1,
        }
    }
}

bitfield! {
    /// Channel command word
    ///
    /// | Bit   | Description                 |
    /// | ----- | --------------------------- |
    /// | 23    | Source address increment    |
    /// | 22    | Destination address increment |
    /// | 10:8  | Transfer size               |
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelCommand(u32);
    impl Debug;
    pub src_inc, set_src_inc: 23;
    pub dst_inc, set_dst_inc: 22;
    pub u8, transfer_size_raw, set_transfer_size_raw: 10, 8;
}

impl ChannelCommand {
    /// Raw command word
    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn transfer_size(&self) -> TransferSize {
        TransferSize::try_from(self.transfer_size_raw()).unwrap_or(TransferSize::Byte)
    }

    pub fn set_transfer_size(&mut self, size: TransferSize) {
        self.set_transfer_size_raw(size.into());
    }
}

/// Programmed channel state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// Physical source address
    pub src: u32,
    /// Physical destination address
    pub dst: u32,
    /// Transfer units (not bytes)
    pub count: u32,
    pub request: RequestType,
    pub command: ChannelCommand,
}

impl ChannelDescriptor {
    /// Bytes the descriptor moves
    pub fn byte_len(&self) -> usize {
        (self.count * self.command.transfer_size().bytes()) as usize
    }
}

/// BCH codec operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecOp {
    Encode,
    Decode,
}

/// BCH codec setup written before every operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CodecSetup {
    pub op: CodecOp,
    /// Correctable bits per unit
    pub level: u32,
    /// Data bytes per unit
    pub unit_size: u32,
    /// Parity bytes per unit
    pub parity_bytes: u32,
}

bitfield! {
    /// BCH codec status
    ///
    /// | Bit   | Description              |
    /// | ----- | ------------------------ |
    /// | 0     | Error(s) found           |
    /// | 1     | Uncorrectable            |
    /// | 2     | Encode done              |
    /// | 3     | Decode done              |
    /// | 4     | Input was all 0xFF       |
    /// | 31:25 | Error count              |
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct CodecStatus(u32);
    impl Debug;
    pub errors, set_errors: 0;
    pub uncorrectable, set_uncorrectable: 1;
    pub encode_done, set_encode_done: 2;
    pub decode_done, set_decode_done: 3;
    pub all_ones, set_all_ones: 4;
    pub u8, error_count, set_error_count: 31, 25;
}

impl CodecStatus {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// Bus data phase direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusDirection {
    Read,
    Write,
}

/// Explicit strobe lines (toggle-mode devices)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusStrobe {
    ReadEnable,
    DataStrobe,
}

/// Hardware the sequencer drives.
///
/// Every register access of the firmware goes through this trait, so the
/// pipeline can run against a simulated backend.
#[cfg_attr(test, automock)]
pub trait PdmaHal {
    /// Program a channel. The channel must be idle.
    fn configure_channel(&mut self, channel: ChannelId, descriptor: &ChannelDescriptor);
    /// Start the programmed transfer
    fn launch_channel(&mut self, channel: ChannelId, irq_enable: bool);
    /// Transfer-terminated bit
    fn channel_complete(&mut self, channel: ChannelId) -> bool;
    /// Clear the transfer-terminated bit
    fn clear_channel(&mut self, channel: ChannelId);
    /// Read and acknowledge the pending channel interrupts
    fn take_interrupts(&mut self) -> ChannelMask;
    /// Sleep until any unmasked interrupt
    fn wait_for_interrupt(&mut self);

    /// Copy out of TCSM
    fn scratch_read(&mut self, offset: usize, buf: &mut [u8]);
    /// Copy into TCSM
    fn scratch_write(&mut self, offset: usize, data: &[u8]);

    /// Arm the codec for the next channel transfer
    fn codec_setup(&mut self, setup: CodecSetup);
    fn codec_status(&mut self) -> CodecStatus;
    /// Clear codec done/error state
    fn codec_clear(&mut self);

    /// Assert chip enable of the bank
    fn bus_select(&mut self, bank: u8);
    /// Deassert every chip enable
    fn bus_release(&mut self);
    /// Command latch cycle
    fn bus_cmd(&mut self, cmd: u8);
    /// Address latch cycle
    fn bus_addr(&mut self, addr: u8);
    /// One data-out cycle (status byte)
    fn bus_read_status(&mut self) -> u8;
    /// Prepare the data phase for the bus channel
    fn bus_arm(&mut self, direction: BusDirection);
    fn set_strobe(&mut self, strobe: BusStrobe, enable: bool);
    /// Ready/Busy pin level
    fn ready(&mut self) -> bool;
    fn delay_cycles(&mut self, cycles: u32);

    fn mailbox_recv(&mut self) -> Option<Message>;
    fn mailbox_send(&mut self, status: StatusCode);
}
