use crate::common::hal::PdmaHal;
use crate::nand::NandBusProtocol;
use crate::sequencer::Sequencer;

/// Firmware main loop: sleep, then run the pipeline and message handlers
pub struct EventLoop<H: PdmaHal, P: NandBusProtocol> {
    sequencer: Sequencer<H, P>,
}

impl<H: PdmaHal, P: NandBusProtocol> EventLoop<H, P> {
    pub fn new(hal: H, protocol: P) -> Self {
        Self {
            sequencer: Sequencer::new(hal, protocol),
        }
    }

    pub fn sequencer(&self) -> &Sequencer<H, P> {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer<H, P> {
        &mut self.sequencer
    }

    /// One wake of the loop
    pub fn poll(&mut self) {
        if !self.sequencer.has_events() {
            self.sequencer.hal_mut().wait_for_interrupt();
        }
        self.sequencer.interrupt_entry();
        self.sequencer.handle_pipeline();
        self.sequencer.handle_message();
    }

    pub fn run(&mut self) -> ! {
        info!("pdma event loop start");
        loop {
            self.poll();
        }
    }
}
