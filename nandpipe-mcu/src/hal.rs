//! `PdmaHal` over the MCU registers

use bit_field::BitField;

use nandpipe_core::common::hal::{
    BusDirection, BusStrobe, ChannelDescriptor, ChannelId, ChannelMask, CodecOp, CodecSetup,
    CodecStatus, PdmaHal,
};
use nandpipe_core::constant::{
    MAILBOX_MSG_OFFSET, MSG_PARAM_WORDS, NEMC_ADDR_OFFSET, NEMC_BANK_PHYS_BASE, NEMC_BANK_STRIDE,
    NEMC_CMD_OFFSET, NEMC_DATA_OFFSET,
};
use nandpipe_core::{Message, StatusCode};

use crate::bus::RegisterBus;
use crate::regs::*;

pub struct McuHal<B: RegisterBus> {
    bus: B,
    map: RegisterMap,
    selected: Option<u8>,
}

impl<B: RegisterBus> McuHal<B> {
    pub fn new(bus: B, map: RegisterMap) -> Self {
        Self {
            bus,
            map,
            selected: None,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn channel_reg(&self, channel: ChannelId, reg: u32) -> u32 {
        self.map.dmac_base + u8::from(channel) as u32 * DMAC_CHANNEL_STRIDE + reg
    }

    fn modify32(&mut self, addr: u32, f: impl FnOnce(&mut u32)) {
        let mut value = self.bus.read32(addr);
        f(&mut value);
        self.bus.write32(addr, value);
    }

    /// NAND port of the selected bank
    fn port(&self, offset: u32) -> u32 {
        let bank = self.selected.unwrap_or(0) as u32;
        NEMC_BANK_PHYS_BASE + bank * NEMC_BANK_STRIDE + offset
    }
}

impl<B: RegisterBus> PdmaHal for McuHal<B> {
    fn configure_channel(&mut self, channel: ChannelId, descriptor: &ChannelDescriptor) {
        let base = self.channel_reg(channel, 0);
        self.bus.write32(base + DMAC_DCS, 0);
        self.bus.write32(base + DMAC_DSA, descriptor.src);
        self.bus.write32(base + DMAC_DTA, descriptor.dst);
        self.bus.write32(base + DMAC_DTC, descriptor.count);
        self.bus.write32(base + DMAC_DRT, u8::from(descriptor.request) as u32);
        self.bus.write32(base + DMAC_DCM, descriptor.command.bits());
    }

    fn launch_channel(&mut self, channel: ChannelId, irq_enable: bool) {
        let base = self.channel_reg(channel, 0);
        self.modify32(base + DMAC_DCM, |dcm| {
            dcm.set_bit(DCM_TIE, irq_enable);
        });
        self.modify32(base + DMAC_DCS, |dcs| {
            dcs.set_bit(DCS_CTE, true);
        });
    }

    fn channel_complete(&mut self, channel: ChannelId) -> bool {
        let dcs = self.channel_reg(channel, DMAC_DCS);
        self.bus.read32(dcs).get_bit(DCS_TT)
    }

    fn clear_channel(&mut self, channel: ChannelId) {
        let dcs = self.channel_reg(channel, DMAC_DCS);
        self.modify32(dcs, |dcs| {
            dcs.set_bit(DCS_TT, false);
            dcs.set_bit(DCS_CTE, false);
        });
    }

    fn take_interrupts(&mut self) -> ChannelMask {
        let addr = self.map.dmac_base + DMAC_DIRQP;
        let pending = self.bus.read32(addr);
        self.bus.write32(addr, pending);
        ChannelMask::from_bits_truncate(pending)
    }

    /// Spins on the pending word and the doorbell. Stands in for the MCU's
    /// wait instruction, which would sleep the core until an interrupt.
    fn wait_for_interrupt(&mut self) {
        loop {
            let irq = self.bus.read32(self.map.dmac_base + DMAC_DIRQP);
            let doorbell = self.bus.read32(self.map.mailbox_base + MBOX_DOORBELL);
            if irq != 0 || doorbell != 0 {
                return;
            }
            core::hint::spin_loop();
        }
    }

    fn scratch_read(&mut self, offset: usize, buf: &mut [u8]) {
        let base = self.map.tcsm_base + offset as u32;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.bus.read8(base + i as u32);
        }
    }

    fn scratch_write(&mut self, offset: usize, data: &[u8]) {
        let base = self.map.tcsm_base + offset as u32;
        for (i, byte) in data.iter().enumerate() {
            self.bus.write8(base + i as u32, *byte);
        }
    }

    fn codec_setup(&mut self, setup: CodecSetup) {
        self.bus.write32(self.map.bch_base + BCH_CLR, 1);
        self.bus.write32(
            self.map.bch_base + BCH_CNT,
            setup.unit_size | setup.parity_bytes << BCH_CNT_PARITY_SHIFT,
        );
        let mut cr = setup.level << BCH_CR_LEVEL_SHIFT;
        cr.set_bit(BCH_CR_ENABLE, true);
        cr.set_bit(BCH_CR_ENCODE, setup.op == CodecOp::Encode);
        self.bus.write32(self.map.bch_base + BCH_CR, cr);
    }

    fn codec_status(&mut self) -> CodecStatus {
        CodecStatus::from_raw(self.bus.read32(self.map.bch_base + BCH_INT))
    }

    fn codec_clear(&mut self) {
        self.bus.write32(self.map.bch_base + BCH_CLR, 1);
    }

    fn bus_select(&mut self, bank: u8) {
        self.bus.write32(
            self.map.nemc_base + NEMC_NFCSR,
            nfcsr_enable(bank) | nfcsr_select(bank),
        );
        self.selected = Some(bank);
    }

    fn bus_release(&mut self) {
        self.bus.write32(self.map.nemc_base + NEMC_NFCSR, 0);
        self.selected = None;
    }

    fn bus_cmd(&mut self, cmd: u8) {
        let port = self.port(NEMC_CMD_OFFSET);
        self.bus.write8(port, cmd);
    }

    fn bus_addr(&mut self, addr: u8) {
        let port = self.port(NEMC_ADDR_OFFSET);
        self.bus.write8(port, addr);
    }

    fn bus_read_status(&mut self) -> u8 {
        let port = self.port(NEMC_DATA_OFFSET);
        self.bus.read8(port)
    }

    fn bus_arm(&mut self, direction: BusDirection) {
        let write = matches!(direction, BusDirection::Write);
        self.bus.write32(self.map.nemc_base + NEMC_DIR, write as u32);
    }

    fn set_strobe(&mut self, strobe: BusStrobe, enable: bool) {
        let flag = match strobe {
            BusStrobe::ReadEnable => TgcrFlags::RE,
            BusStrobe::DataStrobe => TgcrFlags::DQS,
        };
        let addr = self.map.nemc_base + NEMC_TGCR;
        let mut tgcr = TgcrFlags::from_bits_truncate(self.bus.read32(addr));
        tgcr.set(flag, enable);
        self.bus.write32(addr, tgcr.bits());
    }

    fn ready(&mut self) -> bool {
        self.bus
            .read32(self.map.gpio_base + GPIO_PIN)
            .get_bit(self.map.rb_pin as usize)
    }

    fn delay_cycles(&mut self, cycles: u32) {
        for _ in 0..cycles {
            core::hint::spin_loop();
        }
    }

    fn mailbox_recv(&mut self) -> Option<Message> {
        let doorbell = self.map.mailbox_base + MBOX_DOORBELL;
        if self.bus.read32(doorbell) == 0 {
            return None;
        }
        let mut words = [0u32; 1 + MSG_PARAM_WORDS];
        let base = self.map.tcsm_base + MAILBOX_MSG_OFFSET as u32;
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.bus.read32(base + 4 * i as u32);
        }
        self.bus.write32(doorbell, 0);
        Some(Message::from_words(&words))
    }

    fn mailbox_send(&mut self, status: StatusCode) {
        self.bus.write32(self.map.mailbox_base + MBOX_STATUS, status.into());
    }
}
