//! BCH codec driver
//!
//! Encode and decode are started with the codec channel interrupt enabled.
//! Parity and error records are read back synchronously on the same channel.

use bitfield::bitfield;
use byteorder::{ByteOrder, LittleEndian};

use crate::channel::{self, Direction, Notify};
use crate::chip::{EccReport, NandChip, ScratchLayout};
use crate::common::hal::{ChannelId, CodecOp, CodecSetup, PdmaHal};
use crate::constant::{ERROR_RECORD_BYTES, MAX_ERROR_RECORDS};
use crate::error::PdmaError;

bitfield! {
    /// Packed correction record
    ///
    /// | Bit   | Description                      |
    /// | ----- | -------------------------------- |
    /// | 28:16 | Half-word index inside the unit  |
    /// | 15:0  | Bits to flip                     |
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct ErrorRecord(u32);
    impl Debug;
    pub u16, mask, set_mask: 15, 0;
    pub u16, index, set_index: 28, 16;
}

impl ErrorRecord {
    pub fn new(index: u16, mask: u16) -> Self {
        let mut record = Self(0);
        record.set_index(index);
        record.set_mask(mask);
        record
    }

    /// Byte offset of the half-word inside the unit
    pub fn byte_offset(&self) -> usize {
        self.index() as usize * 2
    }
}

fn setup(chip: &NandChip, op: CodecOp) -> CodecSetup {
    CodecSetup {
        op,
        level: chip.ecc.level,
        unit_size: chip.ecc.size,
        parity_bytes: chip.ecc.bytes,
    }
}

/// Start computing the parity of `unit`
pub fn encode<H: PdmaHal>(hal: &mut H, chip: &NandChip, layout: &ScratchLayout, unit: u32) {
    let pipe = layout.pipe(unit);
    hal.codec_setup(setup(chip, CodecOp::Encode));
    channel::configure(
        hal,
        ChannelId::Bch,
        pipe.data as u32,
        0,
        chip.ecc.size,
        Direction::ScratchToCodec,
    );
    channel::launch(hal, ChannelId::Bch, Notify::Interrupt);
}

/// Fetch the parity of an encode, into the unit's parity region and `parity_out`
pub fn encode_complete<H: PdmaHal>(
    hal: &mut H,
    chip: &NandChip,
    layout: &ScratchLayout,
    unit: u32,
    parity_out: &mut [u8],
) -> Result<(), PdmaError> {
    let pipe = layout.pipe(unit);
    let bytes = chip.ecc.bytes as usize;

    let status = hal.codec_status();
    if !status.encode_done() {
        warn!("encode of unit {} not done: {:?}", unit, status);
        hal.codec_clear();
        return Err(PdmaError::CodecNotReady);
    }

    channel::configure(
        hal,
        ChannelId::Bch,
        0,
        pipe.parity as u32,
        chip.ecc.bytes,
        Direction::CodecToScratch,
    );
    channel::launch(hal, ChannelId::Bch, Notify::Polled);
    let polled = channel::wait_complete(hal, ChannelId::Bch);
    hal.codec_clear();
    polled?;

    hal.scratch_read(pipe.parity, &mut parity_out[..bytes]);
    Ok(())
}

/// Start checking `unit` against `parity_in`
pub fn decode<H: PdmaHal>(
    hal: &mut H,
    chip: &NandChip,
    layout: &ScratchLayout,
    unit: u32,
    parity_in: &[u8],
) {
    let pipe = layout.pipe(unit);
    hal.scratch_write(pipe.parity, &parity_in[..chip.ecc.bytes as usize]);
    hal.codec_setup(setup(chip, CodecOp::Decode));
    channel::configure(
        hal,
        ChannelId::Bch,
        pipe.data as u32,
        0,
        chip.ecc.size + chip.ecc.bytes,
        Direction::ScratchToCodec,
    );
    channel::launch(hal, ChannelId::Bch, Notify::Interrupt);
}

/// Evaluate a finished decode and correct the unit in place
pub fn decode_complete<H: PdmaHal>(
    hal: &mut H,
    chip: &NandChip,
    layout: &ScratchLayout,
    unit: u32,
) -> Result<EccReport, PdmaError> {
    let status = hal.codec_status();
    let report = if !status.decode_done() {
        warn!("decode of unit {} not done: {:?}", unit, status);
        Err(PdmaError::CodecNotReady)
    } else if status.uncorrectable() {
        Ok(EccReport::Uncorrectable)
    } else if status.all_ones() {
        Ok(EccReport::AllOnes)
    } else if status.errors() && status.error_count() > 0 {
        correct(hal, chip, layout, unit, status.error_count() as usize)
    } else {
        Ok(EccReport::Clean)
    };
    hal.codec_clear();
    report
}

fn correct<H: PdmaHal>(
    hal: &mut H,
    chip: &NandChip,
    layout: &ScratchLayout,
    unit: u32,
    count: usize,
) -> Result<EccReport, PdmaError> {
    let count = count.min(MAX_ERROR_RECORDS);
    channel::configure(
        hal,
        ChannelId::Bch,
        0,
        layout.readback as u32,
        (count * ERROR_RECORD_BYTES) as u32,
        Direction::CodecToScratch,
    );
    channel::launch(hal, ChannelId::Bch, Notify::Polled);
    channel::wait_complete(hal, ChannelId::Bch)?;

    let data = layout.pipe(unit).data;
    let unit_size = chip.ecc.size as usize;
    for i in 0..count {
        let mut raw = [0u8; ERROR_RECORD_BYTES];
        hal.scratch_read(layout.readback + i * ERROR_RECORD_BYTES, &mut raw);
        let record = ErrorRecord(LittleEndian::read_u32(&raw));

        let offset = record.byte_offset();
        if offset + 2 > unit_size {
            // flip lands in the parity bytes
            continue;
        }
        let mut half = [0u8; 2];
        hal.scratch_read(data + offset, &mut half);
        let fixed = LittleEndian::read_u16(&half) ^ record.mask();
        LittleEndian::write_u16(&mut half, fixed);
        hal.scratch_write(data + offset, &half);
    }
    debug!("unit {} corrected {} bit(s)", unit, count);
    Ok(EccReport::Corrected(count as u32))
}
