use core::ptr::{read_volatile, write_volatile};

/// Register access used by [`crate::hal::McuHal`]
pub trait RegisterBus {
    fn read32(&mut self, addr: u32) -> u32;
    fn write32(&mut self, addr: u32, value: u32);
    fn read8(&mut self, addr: u32) -> u8;
    fn write8(&mut self, addr: u32, value: u8);
}

/// Memory-mapped I/O of the MCU (flat, uncached address space)
#[derive(Clone, Copy, Debug, Default)]
pub struct VolatileBus;

impl RegisterBus for VolatileBus {
    fn read32(&mut self, addr: u32) -> u32 {
        unsafe { read_volatile(addr as usize as *const u32) }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        unsafe { write_volatile(addr as usize as *mut u32, value) }
    }

    fn read8(&mut self, addr: u32) -> u8 {
        unsafe { read_volatile(addr as usize as *const u8) }
    }

    fn write8(&mut self, addr: u32, value: u8) {
        unsafe { write_volatile(addr as usize as *mut u8, value) }
    }
}
