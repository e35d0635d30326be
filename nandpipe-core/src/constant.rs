/* Core Setup */

/// PDMA MCU core clock, used to turn NAND timings (ns) into delay cycles
pub const PDMA_CLOCK_MHZ: u32 = 200;
/// Channel completion events that may be queued between two handler runs
pub const EVENT_QUEUE_DEPTH: usize = 8;

/* Mailbox */

/// Parameter words carried by every host message
pub const MSG_PARAM_WORDS: usize = 16;
/// Host message location inside TCSM (written by the host before the doorbell)
pub const MAILBOX_MSG_OFFSET: usize = 0x3f00;

/* Scratch memory (TCSM) */

/// TCSM base as seen by the DMA channels
pub const TCSM_PHYS_BASE: u32 = 0x134c_0000;
/// TCSM size
pub const TCSM_SIZE: usize = 0x4000;
/// Number of ping-pong pipe buffers
pub const PIPE_BUFFER_N: usize = 2;
/// Distance between the two pipe buffers (data unit + parity)
pub const PIPE_STRIDE: usize = (MAX_ECC_SIZE + MAX_ECC_BYTES) as usize;
/// OOB staging region, directly behind the pipe buffers
pub const OOB_STAGING_OFFSET: usize = PIPE_STRIDE * PIPE_BUFFER_N;
/// Codec readback region (error records)
pub const CODEC_READBACK_OFFSET: usize = OOB_STAGING_OFFSET + MAX_OOB_SIZE as usize;
/// Size of one packed BCH error record
pub const ERROR_RECORD_BYTES: usize = 4;
/// Error records the readback region holds
pub const MAX_ERROR_RECORDS: usize = 64;

/* NAND / ECC limits */

/// Supported BCH data unit sizes
pub const ECC_UNIT_SIZES: [u32; 2] = [512, 1024];
/// Largest BCH data unit
pub const MAX_ECC_SIZE: u32 = 1024;
/// Largest parity size per unit (BCH64 on 1024 byte units)
pub const MAX_ECC_BYTES: u32 = 128;
/// Units per page
pub const MIN_ECC_STEPS: u32 = 1;
pub const MAX_ECC_STEPS: u32 = 16;
/// Largest spare area
pub const MAX_OOB_SIZE: u32 = 1024;
/// Row address cycles
pub const MIN_ROW_CYCLES: u32 = 2;
pub const MAX_ROW_CYCLES: u32 = 3;
/// Chip selects wired to the NAND controller
pub const MAX_BANKS: u32 = 6;
/// Longest accepted NAND timing word (ns)
pub const MAX_TIMING_NS: u32 = 1_000_000;
/// MoveBlockHint once a unit needed `ecclevel - MOVE_BLOCK_MARGIN` corrections
pub const MOVE_BLOCK_MARGIN: u32 = 1;

/* Ports / address translation */

/// BCH codec data port
pub const BCH_DATA_PORT_PHYS: u32 = 0x134d_0000;
/// NEMC static bank windows
pub const NEMC_BANK_PHYS_BASE: u32 = 0x1b00_0000;
pub const NEMC_BANK_STRIDE: u32 = 0x0100_0000;
/// Offsets of the NAND data/command/address ports inside a bank window
pub const NEMC_DATA_OFFSET: u32 = 0x0000_0000;
pub const NEMC_CMD_OFFSET: u32 = 0x0040_0000;
pub const NEMC_ADDR_OFFSET: u32 = 0x0080_0000;
/// kseg0/kseg1 to physical
pub const KSEG_PHYS_MASK: u32 = 0x1fff_ffff;

/* Timeouts */

/// Ready/Busy polls before giving up (both bus variants)
pub const READY_POLL_LIMIT: u32 = 1_000_000;
/// BCH channel/codec polls before giving up (`debug-timeout` only)
pub const BCH_POLL_LIMIT: u32 = 100_000;
