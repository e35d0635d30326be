use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::constant::{
    CODEC_READBACK_OFFSET, OOB_STAGING_OFFSET, PDMA_CLOCK_MHZ, PIPE_BUFFER_N, PIPE_STRIDE,
};
use nandpipe_nandio::address::SMALL_PAGE_SIZE;

/// Bus flavour announced by INIT
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum NandType {
    #[default]
    Common = 0,
    Toggle = 1,
}

/// Page geometry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NandGeometry {
    pub nand_type: NandType,
    pub page_size: u32,
    pub oob_size: u32,
    pub row_cycles: u32,
}

impl NandGeometry {
    /// Legacy 512 byte page device
    pub fn is_small_page(&self) -> bool {
        self.page_size == SMALL_PAGE_SIZE
    }
}

/// BCH layout of a page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EccConfig {
    /// Correctable bits per unit
    pub level: u32,
    /// Data bytes per unit
    pub size: u32,
    /// Parity bytes per unit
    pub bytes: u32,
    /// Units per page
    pub steps: u32,
    /// Parity bytes per page
    pub total: u32,
    /// Parity offset inside the spare area
    pub pos: u32,
}

impl EccConfig {
    /// Spare-area offset of the parity of `unit`
    pub fn parity_offset(&self, unit: u32) -> usize {
        (self.pos + unit * self.bytes) as usize
    }

    /// System memory offset of `unit`
    pub fn unit_offset(&self, unit: u32) -> u32 {
        unit * self.size
    }
}

/// NAND AC timings in ns (common bus only)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NandTiming {
    /// WE# high to RE# low (status read)
    pub twhr: u32,
    /// WE# high to RE# low (random data out)
    pub twhr2: u32,
    /// Ready to RE# low
    pub trr: u32,
    /// WE# high to busy
    pub twb: u32,
    /// Address to data loading
    pub tadl: u32,
    /// Command to data input for random data in
    pub tcwaw: u32,
}

impl NandTiming {
    /// Delay loop cycles for `ns`, rounded up
    pub fn cycles(ns: u32) -> u32 {
        ns.saturating_mul(PDMA_CLOCK_MHZ).div_ceil(1000)
    }

    /// All timing words
    pub fn iter(&self) -> impl Iterator<Item = u32> {
        [
            self.twhr, self.twhr2, self.trr, self.twb, self.tadl, self.tcwaw,
        ]
        .into_iter()
    }
}

bitflags! {
    /// Sub-transfers in flight
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct PipeMode: u8 {
        const BUS_PENDING = 1 << 0;
        const DDR_PENDING = 1 << 1;
        const BCH_ENCODE = 1 << 2;
        const BCH_DECODE = 1 << 3;
        const HALT = 1 << 7;

        const PENDING = Self::BUS_PENDING.bits()
            | Self::DDR_PENDING.bits()
            | Self::BCH_ENCODE.bits()
            | Self::BCH_DECODE.bits();
    }
}

impl PipeMode {
    /// Nothing in flight
    pub fn is_settled(&self) -> bool {
        !self.intersects(PipeMode::PENDING)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PipeMode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "PipeMode({=u8:#04x})", self.bits())
    }
}

/// Control stage of the page operation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CtrlStage {
    #[default]
    Idle,
    ReadOob,
    ReadData,
    WriteData,
    WriteOob,
    WriteConfirm,
}

/// BCH decode outcome
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EccReport {
    #[default]
    Clean,
    /// Bits corrected in one unit
    Corrected(u32),
    Uncorrectable,
    /// Unit and parity were all 0xFF (erased page)
    AllOnes,
}

impl EccReport {
    /// Fold the outcome of one more unit into the page outcome.
    /// Uncorrectable > AllOnes > Corrected (largest count) > Clean
    pub fn merge(self, unit: EccReport) -> EccReport {
        use EccReport::*;
        match (self, unit) {
            (Uncorrectable, _) | (_, Uncorrectable) => Uncorrectable,
            (AllOnes, _) | (_, AllOnes) => AllOnes,
            (Corrected(a), Corrected(b)) => Corrected(a.max(b)),
            (Corrected(n), Clean) | (Clean, Corrected(n)) => Corrected(n),
            (Clean, Clean) => Clean,
        }
    }

    pub fn is_uncorrectable(&self) -> bool {
        matches!(self, EccReport::Uncorrectable)
    }
}

/// Device/session state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NandChip {
    /// Chip select
    pub bank: u8,
    /// System memory address of the page buffer (virtual)
    pub ddr_addr: u32,
    /// Row address of the page
    pub page: u32,
    pub geometry: NandGeometry,
    pub ecc: EccConfig,
    pub timing: NandTiming,
    /// Units staged onto the bus
    pub pipeline: u32,
    /// Units through every stage
    pub retired: u32,
    pub mode: PipeMode,
    pub ctrl: CtrlStage,
    /// Accumulated decode outcome of the page
    pub report: EccReport,
}

impl Default for NandChip {
    fn default() -> Self {
        Self::new(NandGeometry::default(), EccConfig::default(), NandTiming::default())
    }
}

impl NandChip {
    /// Fresh halted state
    pub fn new(geometry: NandGeometry, ecc: EccConfig, timing: NandTiming) -> Self {
        Self {
            bank: 0,
            ddr_addr: 0,
            page: 0,
            geometry,
            ecc,
            timing,
            pipeline: 0,
            retired: 0,
            mode: PipeMode::HALT,
            ctrl: CtrlStage::Idle,
            report: EccReport::Clean,
        }
    }

    /// Same chip, other bank (probe without touching the session)
    pub fn with_bank(&self, bank: u8) -> Self {
        Self { bank, ..*self }
    }

    /// Reset the per-page pipeline state
    pub fn begin(&mut self, bank: u8, ddr_addr: u32, page: u32, ctrl: CtrlStage) {
        self.bank = bank;
        self.ddr_addr = ddr_addr;
        self.page = page;
        self.pipeline = 0;
        self.retired = 0;
        self.mode = PipeMode::empty();
        self.ctrl = ctrl;
        self.report = EccReport::Clean;
    }

    pub fn is_halted(&self) -> bool {
        self.mode.contains(PipeMode::HALT)
    }

    /// System memory address of `unit`, wraps like the 32-bit bus does
    pub fn unit_addr(&self, unit: u32) -> u32 {
        self.ddr_addr.wrapping_add(self.ecc.unit_offset(unit))
    }
}

/// Ping-pong buffer selected for `unit`
pub fn pipe_index(unit: u32) -> usize {
    (unit & 1) as usize
}

/// One pipe buffer in TCSM
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipeRegion {
    pub data: usize,
    /// Directly behind the data so the codec sees data + parity in one transfer
    pub parity: usize,
}

/// TCSM layout derived at INIT
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScratchLayout {
    pub pipes: [PipeRegion; PIPE_BUFFER_N],
    /// Spare area staging (read: parity source, write: parity sink)
    pub oob: usize,
    /// Codec readback (parity, error records)
    pub readback: usize,
}

impl ScratchLayout {
    pub fn new(ecc: &EccConfig) -> Self {
        let mut pipes = [PipeRegion::default(); PIPE_BUFFER_N];
        for (i, pipe) in pipes.iter_mut().enumerate() {
            pipe.data = i * PIPE_STRIDE;
            pipe.parity = pipe.data + ecc.size as usize;
        }
        Self {
            pipes,
            oob: OOB_STAGING_OFFSET,
            readback: CODEC_READBACK_OFFSET,
        }
    }

    /// Buffer owned by `unit`
    pub fn pipe(&self, unit: u32) -> PipeRegion {
        self.pipes[pipe_index(unit)]
    }
}
