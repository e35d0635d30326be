use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// NAND IC Command ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NandCommandId {
    ReadFirst = 0x00,
    ReadSecond = 0x30,
    /// Small-page (512 byte) read starting in the spare area
    ReadOob = 0x50,
    RandomDataOut = 0x05,
    RandomDataOutSecond = 0xe0,
    SequentialInput = 0x80,
    RandomDataIn = 0x85,
    PageProgram = 0x10,
    BlockEraseFirst = 0x60,
    BlockEraseSecond = 0xd0,
    StatusRead = 0x70,
    Reset = 0xff,
}

impl NandCommandId {
    /// Raw opcode as driven on the bus
    pub fn opcode(self) -> u8 {
        self.into()
    }
}

/// NAND IC Status Output
///
/// | Bit | Description            | Value                      |
/// | --- | ---------------------- | -------------------------- |
/// | 0   | Chip Status            | Pass:0 , Fail: 1           |
/// | 1   | Previous Chip Status   | Pass:0 , Fail: 1           |
/// | 2   | -                      | -                          |
/// | 3   | -                      | -                          |
/// | 4   | -                      | -                          |
/// | 5   | Array Ready/Busy       | Ready: 1, Busy: 0          |
/// | 6   | Ready/Busy             | Ready: 1, Busy: 0          |
/// | 7   | Write Protect          | Not Protect: 1, Protect: 0 |
bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct NandStatus: u8 {
        const FAIL = 0b0000_0001;
        const FAIL_PREVIOUS = 0b0000_0010;
        const ARRAY_READY = 0b0010_0000;
        const READY = 0b0100_0000;
        const WRITE_PROTECT_DISABLE = 0b1000_0000;
    }
}

impl NandStatus {
    /// Build from the raw status byte. Reserved bits are dropped.
    pub fn from_raw(raw: u8) -> Self {
        Self::from_bits_truncate(raw)
    }

    /// Check if the last program/erase failed
    pub fn is_failed(&self) -> bool {
        self.contains(NandStatus::FAIL)
    }

    /// Check if the device accepts the next command
    pub fn is_ready(&self) -> bool {
        self.contains(NandStatus::READY)
    }

    /// Check if write protect is asserted (WP# low)
    pub fn is_write_protected(&self) -> bool {
        !self.contains(NandStatus::WRITE_PROTECT_DISABLE)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for NandStatus {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "NandStatus({=u8:#04x})", self.bits())
    }
}
