#![allow(dead_code)]

//! Simulated PDMA backend: TCSM, DDR, a NAND array behind the bus state
//! machine and a BCH codec doing real arithmetic. By default channel
//! transfers run to completion when launched and raise their interrupt if
//! asked to; [`Delivery`] holds interrupt-driven transfers back instead.

pub mod bch;

use std::collections::{HashMap, VecDeque};

use nandpipe_core::common::hal::{
    BusDirection, BusStrobe, ChannelDescriptor, ChannelId, ChannelMask, CodecOp, CodecSetup,
    CodecStatus, PdmaHal,
};
use nandpipe_core::constant::{
    BCH_DATA_PORT_PHYS, KSEG_PHYS_MASK, MAX_BANKS, NEMC_BANK_PHYS_BASE, NEMC_BANK_STRIDE,
    TCSM_PHYS_BASE, TCSM_SIZE,
};
use nandpipe_core::nand::NandBusProtocol;
use nandpipe_core::{EventLoop, Message, MessageCommand, StatusCode};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

use bch::{Bch, Decoded};

pub const DDR_SIZE: usize = 4 << 20;
/// kseg0 view of DDR
pub const DDR_VIRT_BASE: u32 = 0x8000_0000;
pub const PAGES_PER_BLOCK: u32 = 64;

/// Geometry programmed by INIT
#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    pub page_size: u32,
    pub oob_size: u32,
    pub row_cycles: u32,
    pub ecc_level: u32,
    pub ecc_size: u32,
    pub ecc_steps: u32,
    pub ecc_pos: u32,
}

impl SimConfig {
    /// `steps` units of `size` bytes, spare area sized to fit the parity
    pub fn with_units(size: u32, steps: u32) -> Self {
        let mut cfg = Self {
            page_size: size * steps,
            oob_size: 0,
            row_cycles: 3,
            ecc_level: 4,
            ecc_size: size,
            ecc_steps: steps,
            ecc_pos: 2,
        };
        cfg.oob_size = (cfg.ecc_pos + cfg.ecc_total()).next_multiple_of(16).max(16);
        cfg
    }

    /// 2048 byte page, 64 byte spare area, 4 x 512 byte units
    pub fn large_page() -> Self {
        Self {
            page_size: 2048,
            oob_size: 64,
            row_cycles: 3,
            ecc_level: 4,
            ecc_size: 512,
            ecc_steps: 4,
            ecc_pos: 24,
        }
    }

    pub fn ecc_bytes(&self) -> u32 {
        Bch::new(self.ecc_size as usize, self.ecc_level as usize).parity_bytes() as u32
    }

    pub fn ecc_total(&self) -> u32 {
        self.ecc_bytes() * self.ecc_steps
    }

    pub fn init_message(&self, nand_type: u32) -> Message {
        Message::new(
            MessageCommand::Init,
            &[
                nand_type,
                self.page_size,
                self.oob_size,
                self.row_cycles,
                self.ecc_level,
                self.ecc_size,
                self.ecc_bytes(),
                self.ecc_steps,
                self.ecc_total(),
                self.ecc_pos,
                // twhr twhr2 trr twb tadl tcwaw
                60,
                300,
                20,
                100,
                70,
                300,
            ],
        )
    }
}

/// Call counts
#[derive(Debug, Default, Clone)]
pub struct SimStats {
    pub launches: [usize; 3],
    pub encodes: usize,
    pub decodes: usize,
    pub programs: usize,
    pub erases: usize,
    pub delay_cycles: u64,
    pub strobes: usize,
    pub waits: usize,
    pub selects: usize,
}

impl SimStats {
    pub fn launches(&self, channel: ChannelId) -> usize {
        self.launches[u8::from(channel) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Read,
    ReadOob,
    RandomOut,
    SeqIn,
    RandomIn,
    Erase,
}

/// NAND array plus the page register state machine
struct SimNand {
    page_size: usize,
    oob_size: usize,
    row_cycles: usize,
    pages: HashMap<(u8, u32), Vec<u8>>,
    selected: Option<u8>,
    pending: Pending,
    addr: Vec<u8>,
    row: u32,
    column: usize,
    register: Vec<u8>,
    status_mode: bool,
    failed: bool,
}

impl SimNand {
    fn new(cfg: &SimConfig) -> Self {
        let raw = (cfg.page_size + cfg.oob_size) as usize;
        Self {
            page_size: cfg.page_size as usize,
            oob_size: cfg.oob_size as usize,
            row_cycles: cfg.row_cycles as usize,
            pages: HashMap::new(),
            selected: None,
            pending: Pending::None,
            addr: Vec::new(),
            row: 0,
            column: 0,
            register: vec![0xff; raw],
            status_mode: false,
            failed: false,
        }
    }

    fn raw_size(&self) -> usize {
        self.page_size + self.oob_size
    }

    fn column_cycles(&self) -> usize {
        if self.page_size <= 512 {
            1
        } else {
            2
        }
    }

    fn small(&self) -> bool {
        self.page_size == 512
    }

    fn bank(&self) -> u8 {
        self.selected.expect("bus cycle without chip select")
    }

    fn page(&self, bank: u8, row: u32) -> Vec<u8> {
        self.pages
            .get(&(bank, row))
            .cloned()
            .unwrap_or_else(|| vec![0xff; self.raw_size()])
    }

    fn decode_column(&self) -> usize {
        self.addr
            .iter()
            .take(self.column_cycles())
            .enumerate()
            .fold(0, |acc, (i, b)| acc | (*b as usize) << (8 * i))
    }

    fn decode_row(&self, skip: usize) -> u32 {
        self.addr
            .iter()
            .skip(skip)
            .take(self.row_cycles)
            .enumerate()
            .fold(0, |acc, (i, b)| acc | (*b as u32) << (8 * i))
    }

    fn load(&mut self, column: usize) {
        self.row = self.decode_row(self.column_cycles());
        self.register = self.page(self.bank(), self.row);
        self.column = column;
        self.status_mode = false;
    }

    fn cmd(&mut self, cmd: u8, stats: &mut SimStats, faults: &Faults) {
        let bank = self.bank();
        match cmd {
            0x00 => self.begin(Pending::Read),
            0x50 => self.begin(Pending::ReadOob),
            0x05 => self.begin(Pending::RandomOut),
            0x80 => {
                self.begin(Pending::SeqIn);
                self.register = vec![0xff; self.raw_size()];
            }
            0x85 => self.begin(Pending::RandomIn),
            0x60 => self.begin(Pending::Erase),
            0x30 => {
                let column = self.decode_column();
                self.load(column);
                self.pending = Pending::None;
            }
            0xe0 => {
                self.column = self.decode_column();
                self.status_mode = false;
                self.pending = Pending::None;
            }
            0x10 => {
                stats.programs += 1;
                self.failed = faults.program_fail;
                if !self.failed {
                    let mut page = self.page(bank, self.row);
                    for (cell, value) in page.iter_mut().zip(self.register.iter()) {
                        *cell &= *value;
                    }
                    self.pages.insert((bank, self.row), page);
                }
                self.pending = Pending::None;
            }
            0xd0 => {
                stats.erases += 1;
                self.failed = faults.erase_fail;
                if !self.failed {
                    let first = self.row - self.row % PAGES_PER_BLOCK;
                    for row in first..first + PAGES_PER_BLOCK {
                        self.pages.remove(&(bank, row));
                    }
                }
                self.pending = Pending::None;
            }
            0x70 => self.status_mode = true,
            0xff => {
                self.pending = Pending::None;
                self.status_mode = false;
                self.failed = false;
            }
            other => panic!("unexpected NAND command {other:#x}"),
        }
    }

    fn begin(&mut self, pending: Pending) {
        self.pending = pending;
        self.addr.clear();
        self.status_mode = false;
    }

    fn addr(&mut self, byte: u8) {
        self.addr.push(byte);
        let full = self.column_cycles() + self.row_cycles;
        match self.pending {
            // legacy 512: the page loads after the last address cycle
            Pending::Read if self.small() && self.addr.len() == full => {
                let column = self.decode_column();
                self.load(column);
            }
            Pending::ReadOob if self.addr.len() == full => {
                let column = self.page_size + self.decode_column();
                self.load(column);
            }
            Pending::SeqIn if self.addr.len() == full => {
                self.row = self.decode_row(self.column_cycles());
                self.column = self.decode_column();
            }
            Pending::RandomIn if self.addr.len() == self.column_cycles() => {
                self.column = self.decode_column();
            }
            Pending::Erase if self.addr.len() == self.row_cycles => {
                self.row = self.decode_row(0);
            }
            _ => {}
        }
    }

    fn status(&self, faults: &Faults) -> u8 {
        let mut status = 0x60;
        if !faults.write_protected {
            status |= 0x80;
        }
        if self.failed {
            status |= 0x01;
        }
        status
    }

    fn read_data(&mut self, out: &mut [u8]) {
        for byte in out.iter_mut() {
            *byte = self.register.get(self.column).copied().unwrap_or(0xff);
            self.column += 1;
        }
    }

    fn write_data(&mut self, data: &[u8]) {
        for byte in data {
            if let Some(cell) = self.register.get_mut(self.column) {
                *cell = *byte;
            }
            self.column += 1;
        }
    }
}

/// BCH engine fed through the codec data port
#[derive(Default)]
struct SimCodec {
    setup: Option<CodecSetup>,
    input: Vec<u8>,
    output: VecDeque<u8>,
    status: CodecStatus,
    codes: HashMap<(u32, u32), Bch>,
}

impl SimCodec {
    fn push(&mut self, data: &[u8], stats: &mut SimStats) {
        let setup = self.setup.expect("codec fed before setup");
        self.input.extend_from_slice(data);
        let size = setup.unit_size as usize;
        let expect = match setup.op {
            CodecOp::Encode => size,
            CodecOp::Decode => size + setup.parity_bytes as usize,
        };
        assert_eq!(self.input.len(), expect, "codec fed a partial unit");

        let bch = self
            .codes
            .entry((setup.unit_size, setup.level))
            .or_insert_with(|| Bch::new(size, setup.level as usize));
        assert_eq!(bch.parity_bytes(), setup.parity_bytes as usize);

        let mut status = CodecStatus::default();
        self.output.clear();
        match setup.op {
            CodecOp::Encode => {
                stats.encodes += 1;
                self.output.extend(bch.encode(&self.input));
                status.set_encode_done(true);
            }
            CodecOp::Decode => {
                stats.decodes += 1;
                status.set_decode_done(true);
                if self.input.iter().all(|b| *b == 0xff) {
                    status.set_all_ones(true);
                } else {
                    let (data, parity) = self.input.split_at(size);
                    match bch.decode(data, parity) {
                        Decoded::Clean => {}
                        Decoded::Uncorrectable => {
                            status.set_errors(true);
                            status.set_uncorrectable(true);
                        }
                        Decoded::Errors(errors) => {
                            status.set_errors(true);
                            status.set_error_count(errors.len() as u8);
                            for (byte, bit) in errors {
                                let index = (byte / 2) as u32;
                                let mask = 1u32 << ((byte % 2) * 8 + bit as usize);
                                let record = (index << 16) | mask;
                                self.output.extend(record.to_le_bytes());
                            }
                        }
                    }
                }
            }
        }
        self.input.clear();
        self.status = status;
    }
}

/// When interrupt-driven transfers move their data and complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// At launch, interrupt raised at once
    Immediate,
    /// Held, one completion per wake, earliest launch first
    OldestFirst,
    /// Held, one completion per wake, latest launch first
    NewestFirst,
    /// Held, random batches in random order from a seeded generator
    Shuffled(u64),
}

/// Fault knobs
#[derive(Debug, Default, Clone)]
pub struct Faults {
    pub write_protected: bool,
    pub program_fail: bool,
    pub erase_fail: bool,
    pub stuck_busy: bool,
}

pub struct SimHal {
    pub scratch: Vec<u8>,
    pub ddr: Vec<u8>,
    pub faults: Faults,
    pub stats: SimStats,
    /// Every launch in order
    pub launch_log: Vec<(ChannelId, ChannelDescriptor)>,
    pub inbox: VecDeque<Message>,
    pub outbox: Vec<StatusCode>,
    pub armed: Vec<BusDirection>,
    nand: SimNand,
    codec: SimCodec,
    descriptors: [Option<ChannelDescriptor>; 3],
    complete: [bool; 3],
    irq: ChannelMask,
    delivery: Delivery,
    /// Interrupt-driven transfers not yet run, in launch order
    held: Vec<(ChannelId, ChannelDescriptor)>,
    rng: SmallRng,
}

enum Target {
    Scratch(usize),
    Ddr(usize),
    Codec,
    Nand(u8),
}

fn target(phys: u32) -> Target {
    let nemc_end = NEMC_BANK_PHYS_BASE + MAX_BANKS * NEMC_BANK_STRIDE;
    if (TCSM_PHYS_BASE..TCSM_PHYS_BASE + TCSM_SIZE as u32).contains(&phys) {
        Target::Scratch((phys - TCSM_PHYS_BASE) as usize)
    } else if phys == BCH_DATA_PORT_PHYS {
        Target::Codec
    } else if (NEMC_BANK_PHYS_BASE..nemc_end).contains(&phys) {
        Target::Nand(((phys - NEMC_BANK_PHYS_BASE) / NEMC_BANK_STRIDE) as u8)
    } else if (phys as usize) < DDR_SIZE {
        Target::Ddr(phys as usize)
    } else {
        panic!("transfer to unmapped address {phys:#x}")
    }
}

impl SimHal {
    pub fn new(cfg: &SimConfig) -> Self {
        Self {
            scratch: vec![0; TCSM_SIZE],
            ddr: vec![0; DDR_SIZE],
            faults: Faults::default(),
            stats: SimStats::default(),
            launch_log: Vec::new(),
            inbox: VecDeque::new(),
            outbox: Vec::new(),
            armed: Vec::new(),
            nand: SimNand::new(cfg),
            codec: SimCodec::default(),
            descriptors: [None; 3],
            complete: [false; 3],
            irq: ChannelMask::empty(),
            delivery: Delivery::Immediate,
            held: Vec::new(),
            rng: SmallRng::seed_from_u64(0),
        }
    }

    pub fn set_delivery(&mut self, delivery: Delivery) {
        if let Delivery::Shuffled(seed) = delivery {
            self.rng = SmallRng::seed_from_u64(seed);
        }
        self.delivery = delivery;
    }

    /// Transfers launched with interrupt and not completed yet
    pub fn in_flight(&self) -> usize {
        self.held.len()
    }

    fn finish(&mut self, channel: ChannelId, desc: ChannelDescriptor, irq_enable: bool) {
        let data = self.read_from(desc.src, desc.byte_len());
        self.write_to(desc.dst, &data);

        self.complete[u8::from(channel) as usize] = true;
        if irq_enable {
            self.irq |= channel.mask();
        }
    }

    /// Run some held transfers, as picked by the delivery mode
    fn release(&mut self) {
        if self.held.is_empty() {
            return;
        }
        let count = match self.delivery {
            Delivery::Immediate => 0,
            Delivery::OldestFirst | Delivery::NewestFirst => 1,
            Delivery::Shuffled(_) => self.rng.gen_range(1..=self.held.len()),
        };
        for _ in 0..count {
            let index = match self.delivery {
                Delivery::OldestFirst => 0,
                Delivery::Shuffled(_) => self.rng.gen_range(0..self.held.len()),
                _ => self.held.len() - 1,
            };
            let (channel, desc) = self.held.remove(index);
            self.finish(channel, desc, true);
        }
    }

    pub fn post(&mut self, msg: Message) {
        self.inbox.push_back(msg);
    }

    /// Work left for the event loop
    pub fn busy(&self) -> bool {
        !self.inbox.is_empty() || !self.irq.is_empty() || !self.held.is_empty()
    }

    pub fn ddr_write(&mut self, virt: u32, data: &[u8]) {
        let phys = (virt & KSEG_PHYS_MASK) as usize;
        self.ddr[phys..phys + data.len()].copy_from_slice(data);
    }

    pub fn ddr_read(&self, virt: u32, len: usize) -> &[u8] {
        let phys = (virt & KSEG_PHYS_MASK) as usize;
        &self.ddr[phys..phys + len]
    }

    /// Raw page + spare area as stored in the array
    pub fn nand_page(&self, bank: u8, page: u32) -> Vec<u8> {
        self.nand.page(bank, page)
    }

    pub fn set_nand_page(&mut self, bank: u8, page: u32, raw: Vec<u8>) {
        assert_eq!(raw.len(), self.nand.raw_size());
        self.nand.pages.insert((bank, page), raw);
    }

    /// Flip one stored bit
    pub fn corrupt(&mut self, bank: u8, page: u32, byte: usize, bit: u8) {
        let mut raw = self.nand.page(bank, page);
        raw[byte] ^= 1 << bit;
        self.nand.pages.insert((bank, page), raw);
    }

    pub fn bus_selected(&self) -> Option<u8> {
        self.nand.selected
    }

    fn read_from(&mut self, phys: u32, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        match target(phys) {
            Target::Scratch(offset) => buf.copy_from_slice(&self.scratch[offset..offset + len]),
            Target::Ddr(offset) => buf.copy_from_slice(&self.ddr[offset..offset + len]),
            Target::Codec => {
                for byte in buf.iter_mut() {
                    *byte = self.codec.output.pop_front().expect("codec readback underrun");
                }
            }
            Target::Nand(bank) => {
                assert_eq!(self.nand.selected, Some(bank), "bus read from deselected bank");
                self.nand.read_data(&mut buf);
            }
        }
        buf
    }

    fn write_to(&mut self, phys: u32, data: &[u8]) {
        match target(phys) {
            Target::Scratch(offset) => {
                self.scratch[offset..offset + data.len()].copy_from_slice(data)
            }
            Target::Ddr(offset) => self.ddr[offset..offset + data.len()].copy_from_slice(data),
            Target::Codec => self.codec.push(data, &mut self.stats),
            Target::Nand(bank) => {
                assert_eq!(self.nand.selected, Some(bank), "bus write to deselected bank");
                self.nand.write_data(data);
            }
        }
    }
}

impl PdmaHal for SimHal {
    fn configure_channel(&mut self, channel: ChannelId, descriptor: &ChannelDescriptor) {
        self.descriptors[u8::from(channel) as usize] = Some(*descriptor);
    }

    fn launch_channel(&mut self, channel: ChannelId, irq_enable: bool) {
        let ch = u8::from(channel) as usize;
        assert!(!self.complete[ch], "ch{channel:?} launched with completion bit set");
        assert!(
            self.held.iter().all(|(held, _)| *held != channel),
            "ch{channel:?} relaunched while in flight"
        );
        let desc = self.descriptors[ch].take().expect("launch without configure");
        self.stats.launches[ch] += 1;
        self.launch_log.push((channel, desc));

        if irq_enable && self.delivery != Delivery::Immediate {
            self.held.push((channel, desc));
        } else {
            self.finish(channel, desc, irq_enable);
        }
    }

    fn channel_complete(&mut self, channel: ChannelId) -> bool {
        self.complete[u8::from(channel) as usize]
    }

    fn clear_channel(&mut self, channel: ChannelId) {
        self.complete[u8::from(channel) as usize] = false;
    }

    fn take_interrupts(&mut self) -> ChannelMask {
        self.release();
        core::mem::take(&mut self.irq)
    }

    fn wait_for_interrupt(&mut self) {
        self.stats.waits += 1;
    }

    fn scratch_read(&mut self, offset: usize, buf: &mut [u8]) {
        buf.copy_from_slice(&self.scratch[offset..offset + buf.len()]);
    }

    fn scratch_write(&mut self, offset: usize, data: &[u8]) {
        self.scratch[offset..offset + data.len()].copy_from_slice(data);
    }

    fn codec_setup(&mut self, setup: CodecSetup) {
        self.codec.setup = Some(setup);
        self.codec.input.clear();
    }

    fn codec_status(&mut self) -> CodecStatus {
        self.codec.status
    }

    fn codec_clear(&mut self) {
        self.codec.status = CodecStatus::default();
        self.codec.output.clear();
    }

    fn bus_select(&mut self, bank: u8) {
        self.stats.selects += 1;
        self.nand.selected = Some(bank);
    }

    fn bus_release(&mut self) {
        self.nand.selected = None;
    }

    fn bus_cmd(&mut self, cmd: u8) {
        let faults = self.faults.clone();
        self.nand.cmd(cmd, &mut self.stats, &faults);
    }

    fn bus_addr(&mut self, addr: u8) {
        self.nand.addr(addr);
    }

    fn bus_read_status(&mut self) -> u8 {
        if self.nand.status_mode {
            self.nand.status(&self.faults)
        } else {
            let mut byte = [0u8];
            self.nand.read_data(&mut byte);
            byte[0]
        }
    }

    fn bus_arm(&mut self, direction: BusDirection) {
        self.armed.push(direction);
    }

    fn set_strobe(&mut self, _strobe: BusStrobe, _enable: bool) {
        self.stats.strobes += 1;
    }

    fn ready(&mut self) -> bool {
        !self.faults.stuck_busy
    }

    fn delay_cycles(&mut self, cycles: u32) {
        self.stats.delay_cycles += cycles as u64;
    }

    fn mailbox_recv(&mut self) -> Option<Message> {
        self.inbox.pop_front()
    }

    fn mailbox_send(&mut self, status: StatusCode) {
        self.outbox.push(status);
    }
}

/// Poll until the mailbox is empty and no interrupt is pending
pub fn run<P: NandBusProtocol>(event_loop: &mut EventLoop<SimHal, P>) {
    for _ in 0..100_000 {
        if !event_loop.sequencer().hal().busy() && !event_loop.sequencer().has_events() {
            return;
        }
        event_loop.poll();
    }
    panic!("event loop did not go idle");
}

/// Event loop with INIT accepted
pub fn boot<P: NandBusProtocol>(
    cfg: &SimConfig,
    protocol: P,
    nand_type: u32,
) -> EventLoop<SimHal, P> {
    let mut event_loop = EventLoop::new(SimHal::new(cfg), protocol);
    event_loop.sequencer_mut().hal_mut().post(cfg.init_message(nand_type));
    run(&mut event_loop);
    assert_eq!(take_outbox(&mut event_loop), vec![StatusCode::InitDone]);
    event_loop
}

pub fn take_outbox<P: NandBusProtocol>(event_loop: &mut EventLoop<SimHal, P>) -> Vec<StatusCode> {
    core::mem::take(&mut event_loop.sequencer_mut().hal_mut().outbox)
}

pub fn hal<P: NandBusProtocol>(event_loop: &mut EventLoop<SimHal, P>) -> &mut SimHal {
    event_loop.sequencer_mut().hal_mut()
}

/// Seeded payload
pub fn payload(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

pub fn read_msg(bank: u32, ddr: u32, page: u32) -> Message {
    Message::new(MessageCommand::Read, &[bank, ddr, page])
}

pub fn write_msg(bank: u32, ddr: u32, page: u32) -> Message {
    Message::new(MessageCommand::Write, &[bank, ddr, page])
}

pub fn erase_msg(bank: u32, page: u32) -> Message {
    Message::new(MessageCommand::Erase, &[bank, page])
}

/// Store `data` with correct parity, the way a WRITE would leave it
pub fn program_page(hal: &mut SimHal, cfg: &SimConfig, bank: u8, page: u32, data: &[u8]) {
    let size = cfg.ecc_size as usize;
    let bytes = cfg.ecc_bytes() as usize;
    let bch = Bch::new(size, cfg.ecc_level as usize);
    let mut raw = vec![0xff; (cfg.page_size + cfg.oob_size) as usize];
    raw[..data.len()].copy_from_slice(data);
    for unit in 0..cfg.ecc_steps as usize {
        let parity = bch.encode(&data[unit * size..(unit + 1) * size]);
        let at = (cfg.page_size + cfg.ecc_pos) as usize + unit * bytes;
        raw[at..at + bytes].copy_from_slice(&parity);
    }
    hal.set_nand_page(bank, page, raw);
}
