// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Run state machine of one video engine instance.
//!
//! A run goes `Idle -> Armed -> Triggered -> Completed | Faulted -> Idle`. Arming programs the
//! picture through the codec's `DecodeOps`, triggering starts the hardware and hands out a
//! `RunHandle` the caller waits on. The run ends when the interrupt path observes a status bit
//! through `Accelerator::handle_irq`, or when the watchdog gives up through
//! `Accelerator::watchdog_expired`. Either way the status bits are cleared and the engine
//! interrupts are masked exactly once, and the handle is resolved with the outcome.

use std::ops::RangeInclusive;
use std::time::Duration;

use log::debug;
use log::error;
use log::warn;
use sync::create_promise_and_waitable;
use sync::Mutex;
use sync::Promise;
use sync::Waitable;

use crate::bus::RegisterBus;
use crate::bus::RegisterOffset;
use crate::config::VpuConfig;
use crate::dma::DmaAddr;
use crate::error::Error;
use crate::error::Result;
use crate::refs::BufferIndex;
use crate::refs::BufferQueue;
use crate::vc1::params::Bitplanes;
use crate::vc1::params::SliceParams;
use crate::vc1::regs::ve_mode;
use crate::vc1::regs::VE_MODE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Armed,
    Triggered,
    Completed,
    Faulted,
}

/// Decoded view of the engine status register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrqStatus {
    /// No status bit is set; the interrupt was not ours.
    None,
    Ok,
    /// Error or data request bits, with the raw status.
    Error(u32),
}

/// What a run ended with.
pub type RunOutcome = Result<()>;

/// Bitstream of the picture to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceBuffer {
    pub addr: DmaAddr,
    /// Bytes of bitstream in the buffer.
    pub payload: usize,
}

impl SourceBuffer {
    /// The first plane of the buffer at `index` in `queue`.
    pub fn from_queue(queue: &dyn BufferQueue, index: BufferIndex) -> Self {
        SourceBuffer {
            addr: queue.dma_address(index, 0),
            payload: queue.payload_length(index, 0),
        }
    }
}

/// One picture to decode.
pub struct DecodeJob<'a> {
    pub slice: &'a SliceParams,
    pub bitplanes: Option<&'a Bitplanes>,
    pub source: SourceBuffer,
    /// Buffer in `capture` receiving the decoded picture.
    pub destination: BufferIndex,
    /// Queue of decoded pictures, holding the references and the destination.
    pub capture: &'a mut dyn BufferQueue,
    /// Dimensions of the source format.
    pub width: u32,
    pub height: u32,
}

/// Interrupt side operations of a codec. They only touch registers and can run from any thread.
pub trait IrqOps: Sync {
    fn irq_status(&self, bus: &dyn RegisterBus) -> IrqStatus;

    /// Acknowledge every status bit.
    fn irq_clear(&self, bus: &mut dyn RegisterBus);

    /// Mask the engine interrupts.
    fn irq_disable(&self, bus: &mut dyn RegisterBus);
}

/// Per-codec operations driven by the `Accelerator`.
pub trait DecodeOps {
    /// VE_MODE decoder selection of the codec.
    fn engine_mode(&self) -> u32;

    /// Allocate per-session resources.
    fn start(&mut self) -> Result<()>;

    /// Release per-session resources.
    fn stop(&mut self);

    /// Program the registers for `job`.
    fn setup(
        &mut self,
        bus: &mut dyn RegisterBus,
        job: &mut DecodeJob,
        config: &VpuConfig,
    ) -> Result<()>;

    /// Start decoding the programmed picture.
    fn trigger(&self, bus: &mut dyn RegisterBus);

    fn irq(&self) -> &'static dyn IrqOps;

    /// Registers worth dumping before a trigger.
    fn header_window(&self) -> RangeInclusive<RegisterOffset>;
}

/// Caller side of a triggered run.
pub struct RunHandle(Waitable<RunOutcome>);

impl RunHandle {
    /// Block until the run ends. Dropping the accelerator ends a run still in flight.
    pub fn wait(self) -> RunOutcome {
        self.0.wait(None).unwrap_or(Err(Error::WatchdogTimeout))
    }

    /// Block until the run ends or `timeout` elapses. `None` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<RunOutcome> {
        self.0.wait(Some(timeout))
    }
}

/// One video engine instance: its registers, its configuration and the state of its current run.
pub struct Accelerator<B: RegisterBus> {
    bus: B,
    config: VpuConfig,
    state: RunState,
    irq: Option<&'static dyn IrqOps>,
    completion: Option<Promise<RunOutcome>>,
}

impl<B: RegisterBus> Accelerator<B> {
    pub fn new(bus: B, config: VpuConfig) -> Self {
        Accelerator {
            bus,
            config,
            state: RunState::Idle,
            irq: None,
            completion: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &VpuConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Route the engine clock to the decoder `dec`. Writing the same mode again has no effect.
    pub fn enable_engine(&mut self, dec: u32) {
        let mode = self.config.ve_mode(dec);
        self.bus.write(VE_MODE, mode);
    }

    pub fn disable_engine(&mut self) {
        self.bus.write(VE_MODE, ve_mode::DISABLED);
    }

    /// Program `job` through `ops`. Only valid while idle.
    ///
    /// The destination buffer's attributes are recorded here, before the outcome is known.
    pub fn arm<D: DecodeOps + ?Sized>(&mut self, ops: &mut D, job: &mut DecodeJob) -> Result<()> {
        if self.state != RunState::Idle {
            return Err(Error::InvalidState {
                op: "arm",
                state: self.state,
            });
        }
        self.enable_engine(ops.engine_mode());
        if let Err(e) = ops.setup(&mut self.bus, job, &self.config) {
            self.disable_engine();
            return Err(e);
        }
        self.irq = Some(ops.irq());
        self.state = RunState::Armed;
        Ok(())
    }

    /// Start the armed run. The trigger is the last register write of the run's arm phase.
    pub fn trigger<D: DecodeOps + ?Sized>(&mut self, ops: &D) -> Result<RunHandle> {
        if self.state != RunState::Armed {
            return Err(Error::InvalidState {
                op: "trigger",
                state: self.state,
            });
        }
        if self.config.debug_register_dump {
            self.dump_registers(ops.header_window());
        }
        let (promise, waitable) = create_promise_and_waitable();
        self.completion = Some(promise);
        self.state = RunState::Triggered;
        ops.trigger(&mut self.bus);
        Ok(RunHandle(waitable))
    }

    /// Abandon an armed run that was never triggered.
    pub fn cancel(&mut self) -> Result<()> {
        if self.state != RunState::Armed {
            return Err(Error::InvalidState {
                op: "cancel",
                state: self.state,
            });
        }
        self.release();
        self.state = RunState::Idle;
        Ok(())
    }

    /// Interrupt path: look at the status register and end the run if it reports an outcome.
    ///
    /// Returns what was observed; `IrqStatus::None` leaves the run untouched.
    pub fn handle_irq(&mut self) -> IrqStatus {
        let irq = match (self.state, self.irq) {
            (RunState::Triggered, Some(irq)) => irq,
            (state, _) => {
                debug!("interrupt while {:?}, ignoring", state);
                return IrqStatus::None;
            }
        };
        let status = irq.irq_status(&self.bus);
        match status {
            IrqStatus::None => {
                warn!("spurious interrupt, no status bit set");
            }
            IrqStatus::Ok => self.finish(Ok(())),
            IrqStatus::Error(status) => {
                error!("decode failed, status {:#x}", status);
                self.finish(Err(Error::HardwareFault { status }));
            }
        }
        status
    }

    /// Force a run that was never answered to fault.
    ///
    /// Returns false when no run was in flight, e.g. because the interrupt won the race.
    pub fn watchdog_expired(&mut self) -> bool {
        if self.state != RunState::Triggered {
            return false;
        }
        warn!("decode watchdog expired");
        self.finish(Err(Error::WatchdogTimeout));
        true
    }

    /// Wait for the run of `handle` on the accelerator behind `accel`, forcing it to fault once
    /// the configured watchdog interval has passed.
    ///
    /// The lock is not held while waiting so the interrupt path can get to the accelerator.
    pub fn wait_for_completion(accel: &Mutex<Self>, handle: RunHandle) -> RunOutcome {
        let timeout = accel.lock().config.watchdog_timeout();
        if let Some(outcome) = handle.wait_timeout(timeout) {
            return outcome;
        }
        accel.lock().watchdog_expired();
        handle
            .wait_timeout(Duration::ZERO)
            .unwrap_or(Err(Error::WatchdogTimeout))
    }

    fn finish(&mut self, outcome: RunOutcome) {
        self.state = if outcome.is_ok() {
            RunState::Completed
        } else {
            RunState::Faulted
        };
        debug!("run {:?}", self.state);
        self.release();
        if let Some(promise) = self.completion.take() {
            promise.resolve(outcome);
        }
        self.state = RunState::Idle;
    }

    // Masks and acknowledges the engine interrupts and parks the engine.
    fn release(&mut self) {
        if let Some(irq) = self.irq.take() {
            irq.irq_disable(&mut self.bus);
            irq.irq_clear(&mut self.bus);
        }
        self.disable_engine();
    }

    fn dump_registers(&self, window: RangeInclusive<RegisterOffset>) {
        for offset in window.step_by(4) {
            debug!("reg {:#05x}: {:#010x}", offset, self.bus.read(offset));
        }
    }
}

impl<B: RegisterBus> Drop for Accelerator<B> {
    // A run still in flight ends as if its watchdog fired.
    fn drop(&mut self) {
        if self.state == RunState::Triggered {
            warn!("accelerator dropped with a run in flight");
            self.finish(Err(Error::WatchdogTimeout));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::register_space::RegisterSpace;
    use crate::register_space::RegisterSpec;

    const STATUS: RegisterOffset = 0x10;
    const CTRL: RegisterOffset = 0x14;
    const TRIGGER: RegisterOffset = 0x18;

    struct TestIrq;

    impl IrqOps for TestIrq {
        fn irq_status(&self, bus: &dyn RegisterBus) -> IrqStatus {
            match bus.read(STATUS) {
                0 => IrqStatus::None,
                1 => IrqStatus::Ok,
                s => IrqStatus::Error(s),
            }
        }

        fn irq_clear(&self, bus: &mut dyn RegisterBus) {
            bus.write(STATUS, 0x7);
        }

        fn irq_disable(&self, bus: &mut dyn RegisterBus) {
            let ctrl = bus.read(CTRL);
            bus.write(CTRL, ctrl & !0x7);
        }
    }

    #[derive(Default)]
    struct TestOps {
        setups: usize,
        fail_setup: bool,
    }

    impl DecodeOps for TestOps {
        fn engine_mode(&self) -> u32 {
            ve_mode::DEC_VC1
        }

        fn start(&mut self) -> Result<()> {
            Ok(())
        }

        fn stop(&mut self) {}

        fn setup(
            &mut self,
            bus: &mut dyn RegisterBus,
            _job: &mut DecodeJob,
            _config: &VpuConfig,
        ) -> Result<()> {
            self.setups += 1;
            if self.fail_setup {
                return Err(Error::NoSession);
            }
            bus.write(CTRL, 0x7);
            Ok(())
        }

        fn trigger(&self, bus: &mut dyn RegisterBus) {
            bus.write(TRIGGER, 1);
        }

        fn irq(&self) -> &'static dyn IrqOps {
            &TestIrq
        }

        fn header_window(&self) -> RangeInclusive<RegisterOffset> {
            STATUS..=CTRL
        }
    }

    fn test_bus() -> RegisterSpace {
        let mut regs = RegisterSpace::new();
        regs.add_register(RegisterSpec::read_write("mode", VE_MODE));
        regs.add_register(RegisterSpec::write_1_to_clear("status", STATUS, 0x7));
        regs.add_register(RegisterSpec::read_write("ctrl", CTRL));
        regs.add_register(RegisterSpec::read_write("trigger", TRIGGER));
        regs
    }

    fn with_job<T>(f: impl FnOnce(&mut DecodeJob) -> T) -> T {
        let slice = SliceParams::default();
        let mut capture = crate::mock::MockBufferQueue::new(0x1000_0000, 1, 16, 16);
        let mut job = DecodeJob {
            slice: &slice,
            bitplanes: None,
            source: SourceBuffer {
                addr: 0x2000_0000,
                payload: 16,
            },
            destination: BufferIndex(0),
            capture: &mut capture,
            width: 16,
            height: 16,
        };
        f(&mut job)
    }

    fn armed() -> (Accelerator<RegisterSpace>, TestOps) {
        let mut accel = Accelerator::new(test_bus(), VpuConfig::default());
        let mut ops = TestOps::default();
        with_job(|job| accel.arm(&mut ops, job)).unwrap();
        (accel, ops)
    }

    #[test]
    fn success_path() {
        let (mut accel, ops) = armed();
        assert_eq!(accel.state(), RunState::Armed);
        let handle = accel.trigger(&ops).unwrap();
        assert_eq!(accel.state(), RunState::Triggered);
        assert_eq!(accel.bus().writes().last(), Some(&(TRIGGER, 1)));

        accel.bus_mut().set_bits(STATUS, 1);
        assert_eq!(accel.handle_irq(), IrqStatus::Ok);
        assert_eq!(accel.state(), RunState::Idle);
        assert!(handle.wait().is_ok());
        assert_eq!(accel.bus().read(STATUS), 0);
        assert_eq!(accel.bus().read(CTRL), 0);
        assert_eq!(accel.bus().writes_to(VE_MODE).last(), Some(&ve_mode::DISABLED));
    }

    #[test]
    fn spurious_interrupt_keeps_run() {
        let (mut accel, ops) = armed();
        let handle = accel.trigger(&ops).unwrap();
        assert_eq!(accel.handle_irq(), IrqStatus::None);
        assert_eq!(accel.state(), RunState::Triggered);
        assert!(handle.wait_timeout(Duration::ZERO).is_none());
    }

    #[test]
    fn error_status_faults() {
        let (mut accel, ops) = armed();
        let handle = accel.trigger(&ops).unwrap();
        accel.bus_mut().set_bits(STATUS, 0x4);
        assert_eq!(accel.handle_irq(), IrqStatus::Error(0x4));
        match handle.wait() {
            Err(Error::HardwareFault { status }) => assert_eq!(status, 0x4),
            r => panic!("unexpected outcome {:?}", r),
        }
        assert_eq!(accel.bus().writes_to(STATUS), vec![0x7]);
        assert_eq!(accel.bus().writes_to(CTRL), vec![0x7, 0x0]);
    }

    #[test]
    fn watchdog_faults_once() {
        let (mut accel, ops) = armed();
        let handle = accel.trigger(&ops).unwrap();
        assert!(accel.watchdog_expired());
        assert!(!accel.watchdog_expired());
        assert!(matches!(handle.wait(), Err(Error::WatchdogTimeout)));
        assert_eq!(accel.bus().writes_to(STATUS), vec![0x7]);
        // Late interrupt after the watchdog fired.
        accel.bus_mut().set_bits(STATUS, 1);
        assert_eq!(accel.handle_irq(), IrqStatus::None);
    }

    #[test]
    fn wrong_state_rejected() {
        let mut accel = Accelerator::new(test_bus(), VpuConfig::default());
        let mut ops = TestOps::default();
        assert!(matches!(
            accel.trigger(&ops),
            Err(Error::InvalidState {
                state: RunState::Idle,
                ..
            })
        ));
        assert!(accel.cancel().is_err());
        with_job(|job| accel.arm(&mut ops, job)).unwrap();
        let second = with_job(|job| accel.arm(&mut ops, job));
        assert!(matches!(
            second,
            Err(Error::InvalidState {
                op: "arm",
                state: RunState::Armed,
            })
        ));
        assert_eq!(ops.setups, 1);
    }

    #[test]
    fn failed_setup_stays_idle() {
        let mut accel = Accelerator::new(test_bus(), VpuConfig::default());
        let mut ops = TestOps {
            fail_setup: true,
            ..Default::default()
        };
        assert!(with_job(|job| accel.arm(&mut ops, job)).is_err());
        assert_eq!(accel.state(), RunState::Idle);
        assert_eq!(accel.bus().read(VE_MODE), ve_mode::DISABLED);
    }

    #[test]
    fn cancel_releases_armed_run() {
        let (mut accel, _ops) = armed();
        accel.cancel().unwrap();
        assert_eq!(accel.state(), RunState::Idle);
        assert_eq!(accel.bus().writes_to(STATUS), vec![0x7]);
        assert_eq!(accel.bus().read(CTRL), 0);
    }

    #[test]
    fn wait_for_completion_times_out() {
        let (mut accel, ops) = armed();
        accel.config.watchdog_timeout_ms = 1;
        let handle = accel.trigger(&ops).unwrap();
        let accel = Mutex::new(accel);
        assert!(matches!(
            Accelerator::wait_for_completion(&accel, handle),
            Err(Error::WatchdogTimeout)
        ));
        assert_eq!(accel.lock().state(), RunState::Idle);
    }

    #[test]
    fn drop_ends_run_in_flight() {
        let (mut accel, ops) = armed();
        let handle = accel.trigger(&ops).unwrap();
        let waiter = thread::spawn(move || handle.wait());
        drop(accel);
        assert!(matches!(waiter.join().unwrap(), Err(Error::WatchdogTimeout)));
    }

    #[test]
    fn drop_after_completion_keeps_outcome() {
        let (mut accel, ops) = armed();
        let handle = accel.trigger(&ops).unwrap();
        accel.bus_mut().set_bits(STATUS, 1);
        accel.handle_irq();
        drop(accel);
        assert!(handle.wait().is_ok());
    }
}
