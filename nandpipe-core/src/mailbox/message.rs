use byteorder::{ByteOrder, LittleEndian};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::chip::{EccConfig, NandGeometry, NandTiming, NandType};
use crate::constant::{
    ECC_UNIT_SIZES, MAX_ECC_BYTES, MAX_ECC_STEPS, MAX_OOB_SIZE, MAX_ROW_CYCLES, MAX_TIMING_NS,
    MIN_ECC_STEPS, MIN_ROW_CYCLES, MSG_PARAM_WORDS,
};
use crate::error::PdmaError;

/// Host to MCU command
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum MessageCommand {
    Init = 0,
    Read = 1,
    Write = 2,
    Erase = 3,
}

/// MCU to host status
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum StatusCode {
    InitDone = 0x1,
    ReadDone = 0x2,
    UncorrectableEcc = 0x3,
    AllOnesBlock = 0x4,
    MoveBlockHint = 0x5,
    WriteDone = 0x6,
    WriteFail = 0x7,
    WriteProtected = 0x8,
    EraseDone = 0x9,
    EraseFail = 0xa,
    /// Ready/busy or codec poll gave up
    Timeout = 0xb,
    /// INIT parameters rejected, previous configuration kept
    InitInvalid = 0xc,
}

impl From<PdmaError> for StatusCode {
    fn from(err: PdmaError) -> Self {
        match err {
            PdmaError::ProgramFailed => StatusCode::WriteFail,
            PdmaError::EraseFailed => StatusCode::EraseFail,
            PdmaError::InvalidConfig => StatusCode::InitInvalid,
            PdmaError::Timeout | PdmaError::CodecNotReady => StatusCode::Timeout,
        }
    }
}

/// Parameter word indices
pub mod param {
    // INIT
    pub const NAND_TYPE: usize = 0;
    pub const PAGE_SIZE: usize = 1;
    pub const OOB_SIZE: usize = 2;
    pub const ROW_CYCLE: usize = 3;
    pub const ECC_LEVEL: usize = 4;
    pub const ECC_SIZE: usize = 5;
    pub const ECC_BYTES: usize = 6;
    pub const ECC_STEPS: usize = 7;
    pub const ECC_TOTAL: usize = 8;
    pub const ECC_POS: usize = 9;
    pub const TWHR: usize = 10;
    pub const TWHR2: usize = 11;
    pub const TRR: usize = 12;
    pub const TWB: usize = 13;
    pub const TADL: usize = 14;
    pub const TCWAW: usize = 15;

    // READ / WRITE
    pub const RW_BANK: usize = 0;
    pub const RW_DDR_ADDR: usize = 1;
    pub const RW_PAGE: usize = 2;

    // ERASE
    pub const ERASE_BANK: usize = 0;
    pub const ERASE_PAGE: usize = 1;
}

/// Mailbox message
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    pub cmd: u32,
    pub params: [u32; MSG_PARAM_WORDS],
}

impl Message {
    /// Size on the wire
    pub const WIRE_BYTES: usize = (1 + MSG_PARAM_WORDS) * 4;

    pub fn new(cmd: MessageCommand, params: &[u32]) -> Self {
        let mut msg = Self {
            cmd: cmd.into(),
            ..Default::default()
        };
        let n = params.len().min(MSG_PARAM_WORDS);
        msg.params[..n].copy_from_slice(&params[..n]);
        msg
    }

    /// Command word followed by the parameter words
    pub fn from_words(words: &[u32]) -> Self {
        let mut msg = Self::default();
        if let Some((cmd, params)) = words.split_first() {
            msg.cmd = *cmd;
            let n = params.len().min(MSG_PARAM_WORDS);
            msg.params[..n].copy_from_slice(&params[..n]);
        }
        msg
    }

    /// Little-endian wire image, short input is zero padded
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut words = [0u32; 1 + MSG_PARAM_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = LittleEndian::read_u32(chunk);
        }
        Self::from_words(&words)
    }

    pub fn to_bytes(&self) -> [u8; Self::WIRE_BYTES] {
        let mut bytes = [0u8; Self::WIRE_BYTES];
        LittleEndian::write_u32(&mut bytes[..4], self.cmd);
        LittleEndian::write_u32_into(&self.params, &mut bytes[4..]);
        bytes
    }

    /// Decoded command, `None` for unknown codes
    pub fn command(&self) -> Option<MessageCommand> {
        MessageCommand::try_from(self.cmd).ok()
    }

    pub fn param(&self, index: usize) -> u32 {
        self.params.get(index).copied().unwrap_or(0)
    }
}

/// Validated INIT payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InitParams {
    pub geometry: NandGeometry,
    pub ecc: EccConfig,
    pub timing: NandTiming,
}

impl InitParams {
    /// Decode and check an INIT message. Timing words are only read when
    /// the bus protocol uses them.
    pub fn parse(msg: &Message, with_timing: bool) -> Result<Self, PdmaError> {
        let nand_type = NandType::try_from(msg.param(param::NAND_TYPE))
            .map_err(|_| PdmaError::InvalidConfig)?;
        let geometry = NandGeometry {
            nand_type,
            page_size: msg.param(param::PAGE_SIZE),
            oob_size: msg.param(param::OOB_SIZE),
            row_cycles: msg.param(param::ROW_CYCLE),
        };
        let ecc = EccConfig {
            level: msg.param(param::ECC_LEVEL),
            size: msg.param(param::ECC_SIZE),
            bytes: msg.param(param::ECC_BYTES),
            steps: msg.param(param::ECC_STEPS),
            total: msg.param(param::ECC_TOTAL),
            pos: msg.param(param::ECC_POS),
        };
        let timing = if with_timing {
            NandTiming {
                twhr: msg.param(param::TWHR),
                twhr2: msg.param(param::TWHR2),
                trr: msg.param(param::TRR),
                twb: msg.param(param::TWB),
                tadl: msg.param(param::TADL),
                tcwaw: msg.param(param::TCWAW),
            }
        } else {
            NandTiming::default()
        };

        let valid = (MIN_ECC_STEPS..=MAX_ECC_STEPS).contains(&ecc.steps)
            && ECC_UNIT_SIZES.contains(&ecc.size)
            && (1..=MAX_ECC_BYTES).contains(&ecc.bytes)
            && ecc.level >= 1
            && ecc.total == ecc.steps * ecc.bytes
            && ecc
                .pos
                .checked_add(ecc.total)
                .is_some_and(|end| end <= geometry.oob_size)
            && geometry.oob_size <= MAX_OOB_SIZE
            && (MIN_ROW_CYCLES..=MAX_ROW_CYCLES).contains(&geometry.row_cycles)
            && ecc.size * ecc.steps == geometry.page_size
            && timing.iter().all(|ns| ns <= MAX_TIMING_NS);
        if !valid {
            return Err(PdmaError::InvalidConfig);
        }

        Ok(Self {
            geometry,
            ecc,
            timing,
        })
    }
}
