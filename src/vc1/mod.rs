// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! VC-1 decoding on the video engine.

pub mod params;
pub mod regs;
pub mod setup;

use std::ops::RangeInclusive;

use log::info;

use crate::bus::RegisterBus;
use crate::bus::RegisterOffset;
use crate::config::VpuConfig;
use crate::dma::DmaAllocator;
use crate::engine::DecodeJob;
use crate::engine::DecodeOps;
use crate::engine::IrqOps;
use crate::engine::IrqStatus;
use crate::error::Error;
use crate::error::Result;
use crate::refs::lookup_reference;
use crate::scratch::ScratchBuffers;
use regs::status;
use regs::trigger_type;
use regs::ve_mode;
use regs::Ctrl;
use regs::RegisterLayout;
use regs::VC1_CTRL;
use regs::VC1_HEADER_WINDOW;
use regs::VC1_STATUS;
use regs::VC1_TRIGGER_TYPE;
use setup::output_attributes;
use setup::FrameInputs;

/// Interrupt handling of the VC-1 engine.
pub struct Vc1Irq;

impl IrqOps for Vc1Irq {
    fn irq_status(&self, bus: &dyn RegisterBus) -> IrqStatus {
        let reg = bus.read(VC1_STATUS) & status::INT_MASK;
        // The bitstream is handed over whole, so a data request means the picture is truncated.
        if reg & (status::ERROR | status::VLD_DATA_REQ) != 0 {
            IrqStatus::Error(reg)
        } else if reg & status::SUCCESS != 0 {
            IrqStatus::Ok
        } else {
            IrqStatus::None
        }
    }

    fn irq_clear(&self, bus: &mut dyn RegisterBus) {
        bus.write(VC1_STATUS, status::INT_MASK);
    }

    fn irq_disable(&self, bus: &mut dyn RegisterBus) {
        let mut reg = Ctrl::from_bits(bus.read(VC1_CTRL));
        reg.set_irqs(false);
        bus.write(VC1_CTRL, reg.bits());
    }
}

/// VC-1 decode session: owns the scratch buffers between `start` and `stop`.
pub struct Vc1Decoder<A: DmaAllocator> {
    alloc: A,
    scratch: Option<ScratchBuffers<A::Region>>,
}

impl<A: DmaAllocator> Vc1Decoder<A> {
    pub fn new(alloc: A) -> Self {
        Vc1Decoder {
            alloc,
            scratch: None,
        }
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn is_started(&self) -> bool {
        self.scratch.is_some()
    }

    pub fn scratch_mut(&mut self) -> Option<&mut ScratchBuffers<A::Region>> {
        self.scratch.as_mut()
    }
}

impl<A: DmaAllocator> DecodeOps for Vc1Decoder<A> {
    fn engine_mode(&self) -> u32 {
        ve_mode::DEC_VC1
    }

    fn start(&mut self) -> Result<()> {
        if self.scratch.is_none() {
            self.scratch = Some(ScratchBuffers::start_session(&mut self.alloc)?);
            info!("vc1 session started");
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            scratch.stop_session(&mut self.alloc);
            info!("vc1 session stopped");
        }
    }

    fn setup(
        &mut self,
        bus: &mut dyn RegisterBus,
        job: &mut DecodeJob,
        config: &VpuConfig,
    ) -> Result<()> {
        let scratch = self.scratch.as_mut().ok_or(Error::NoSession)?;
        let slice = job.slice;
        let forward = lookup_reference(&*job.capture, slice.forward_ref_ts);
        let backward = lookup_reference(&*job.capture, slice.backward_ref_ts);
        let destination = (
            job.capture.dma_address(job.destination, 0),
            job.capture.dma_address(job.destination, 1),
        );
        let frame = FrameInputs {
            slice,
            bitplanes: job.bitplanes,
            forward: forward.as_ref(),
            backward: backward.as_ref(),
            source: job.source,
            destination,
            width: job.width,
            height: job.height,
            mcri_cache: config.mcri_cache,
        };

        let previous = job.capture.attributes(job.destination);
        let attrs = output_attributes(&slice.picture, previous, frame.intensity_comp());
        job.capture.set_attributes(job.destination, attrs);

        frame.program(bus, scratch);
        Ok(())
    }

    fn trigger(&self, bus: &mut dyn RegisterBus) {
        bus.write(VC1_TRIGGER_TYPE, trigger_type::DECODE);
    }

    fn irq(&self) -> &'static dyn IrqOps {
        &Vc1Irq
    }

    fn header_window(&self) -> RangeInclusive<RegisterOffset> {
        VC1_HEADER_WINDOW
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::vc1_register_space;
    use crate::mock::MockDmaAllocator;

    #[test]
    fn irq_status_decoding() {
        let mut regs = vc1_register_space();
        assert_eq!(Vc1Irq.irq_status(&regs), IrqStatus::None);
        regs.set_bits(VC1_STATUS, status::SUCCESS);
        assert_eq!(Vc1Irq.irq_status(&regs), IrqStatus::Ok);
        regs.set_bits(VC1_STATUS, status::VLD_DATA_REQ);
        assert_eq!(Vc1Irq.irq_status(&regs), IrqStatus::Error(0x5));
        Vc1Irq.irq_clear(&mut regs);
        assert_eq!(regs.read(VC1_STATUS), 0);
        regs.set_bits(VC1_STATUS, status::ERROR);
        assert_eq!(Vc1Irq.irq_status(&regs), IrqStatus::Error(0x2));
    }

    #[test]
    fn irq_disable_keeps_other_ctrl_bits() {
        let mut regs = vc1_register_space();
        let mut ctrl = Ctrl::new();
        ctrl.set_irqs(true);
        ctrl.set_mcri_cache_en(true);
        regs.write(VC1_CTRL, ctrl.bits());
        Vc1Irq.irq_disable(&mut regs);
        let ctrl = Ctrl::from_bits(regs.read(VC1_CTRL));
        assert!(!ctrl.get_finish_irq_en());
        assert!(!ctrl.get_error_irq_en());
        assert!(!ctrl.get_vld_data_req_irq_en());
        assert!(ctrl.get_mcri_cache_en());
    }

    #[test]
    fn start_is_idempotent() {
        let mut decoder = Vc1Decoder::new(MockDmaAllocator::new());
        decoder.start().unwrap();
        decoder.start().unwrap();
        assert_eq!(decoder.allocator().live(), 3);
        decoder.stop();
        decoder.stop();
        assert_eq!(decoder.allocator().live(), 0);
        assert!(!decoder.is_started());
    }

    #[test]
    fn trigger_writes_decode() {
        let mut regs = vc1_register_space();
        let decoder = Vc1Decoder::new(MockDmaAllocator::new());
        decoder.trigger(&mut regs);
        assert_eq!(
            regs.writes(),
            &[(VC1_TRIGGER_TYPE, trigger_type::DECODE)]
        );
    }
}
