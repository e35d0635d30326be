#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod hal;
pub mod regs;

use nandpipe_core::nand::NandBusProtocol;
use nandpipe_core::EventLoop;

use crate::bus::VolatileBus;
use crate::hal::McuHal;
use crate::regs::RegisterMap;

/// Firmware entry: build the hardware layer and run the event loop forever
pub fn firmware_main<P: NandBusProtocol>(map: RegisterMap, protocol: P) -> ! {
    let hal = McuHal::new(VolatileBus, map);
    EventLoop::new(hal, protocol).run()
}
