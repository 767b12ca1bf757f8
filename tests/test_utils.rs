//! Shared fakes for sequencer tests.
//!
//! A recording register driver, an enable pin and a delay source that all
//! append to one shared timeline, so tests can assert the exact order of
//! register writes, pin edges and delays.

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use tmc5160_bringup::{Driver, RampMode};

/// One observable action of the bring-up rig.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(dead_code)]
pub enum Event {
    Begin,
    Recalibrate(bool),
    FastStandstill(bool),
    SilentStep(bool),
    MultistepFilter(bool),
    ShaftReversed(bool),
    SmallHysteresis(bool),
    StopInputs(bool),
    DirectMode(bool),
    RmsCurrent(u32, f32),
    ShortToSupply(bool, u8),
    ShortToGround(bool, u8),
    BlankingTime(u8),
    OffTime(u8),
    PwmFrequency(u8),
    RampMode(RampMode),
    StartVelocity(u32),
    StopVelocity(u32),
    MidpointVelocity(u32),
    MaxVelocity(u32),
    InitialAcceleration(u16),
    MaxAcceleration(u16),
    MaxDeceleration(u16),
    MidpointDeceleration(u16),
    ClearStatus(u32),
    TargetPosition(i32),
    PollPosition(bool),
    EnableLineLow,
    EnableLineHigh,
    DelayMs(u32),
}

pub type Timeline = Rc<RefCell<Vec<Event>>>;

#[allow(dead_code)]
pub fn timeline() -> Timeline {
    Rc::new(RefCell::new(Vec::new()))
}

/// Register driver that logs every call and answers position polls from a
/// script. When the script runs out the last value repeats.
pub struct RecordingDriver {
    log: Timeline,
    reached_script: Vec<bool>,
    next_poll: usize,
}

#[allow(dead_code)]
impl RecordingDriver {
    pub fn new(log: Timeline, reached_script: &[bool]) -> Self {
        Self {
            log,
            reached_script: reached_script.to_vec(),
            next_poll: 0,
        }
    }

    fn push(&self, event: Event) {
        self.log.borrow_mut().push(event);
    }
}

impl Driver for RecordingDriver {
    type Error = core::convert::Infallible;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.push(Event::Begin);
        Ok(())
    }

    fn set_recalibrate(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.push(Event::Recalibrate(enabled));
        Ok(())
    }

    fn set_fast_standstill(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.push(Event::FastStandstill(enabled));
        Ok(())
    }

    fn set_silent_step(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.push(Event::SilentStep(enabled));
        Ok(())
    }

    fn set_multistep_filter(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.push(Event::MultistepFilter(enabled));
        Ok(())
    }

    fn set_shaft_reversed(&mut self, reversed: bool) -> Result<(), Self::Error> {
        self.push(Event::ShaftReversed(reversed));
        Ok(())
    }

    fn set_small_hysteresis(&mut self, small: bool) -> Result<(), Self::Error> {
        self.push(Event::SmallHysteresis(small));
        Ok(())
    }

    fn set_stop_inputs(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.push(Event::StopInputs(enabled));
        Ok(())
    }

    fn set_direct_mode(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.push(Event::DirectMode(enabled));
        Ok(())
    }

    fn set_rms_current(&mut self, milliamps: u32, hold_scale: f32) -> Result<(), Self::Error> {
        self.push(Event::RmsCurrent(milliamps, hold_scale));
        Ok(())
    }

    fn set_short_to_supply(&mut self, monitor: bool, level: u8) -> Result<(), Self::Error> {
        self.push(Event::ShortToSupply(monitor, level));
        Ok(())
    }

    fn set_short_to_ground(&mut self, monitor: bool, level: u8) -> Result<(), Self::Error> {
        self.push(Event::ShortToGround(monitor, level));
        Ok(())
    }

    fn set_blanking_time(&mut self, selector: u8) -> Result<(), Self::Error> {
        self.push(Event::BlankingTime(selector));
        Ok(())
    }

    fn set_off_time(&mut self, off_time: u8) -> Result<(), Self::Error> {
        self.push(Event::OffTime(off_time));
        Ok(())
    }

    fn set_pwm_frequency(&mut self, selector: u8) -> Result<(), Self::Error> {
        self.push(Event::PwmFrequency(selector));
        Ok(())
    }

    fn set_ramp_mode(&mut self, mode: RampMode) -> Result<(), Self::Error> {
        self.push(Event::RampMode(mode));
        Ok(())
    }

    fn set_start_velocity(&mut self, velocity: u32) -> Result<(), Self::Error> {
        self.push(Event::StartVelocity(velocity));
        Ok(())
    }

    fn set_stop_velocity(&mut self, velocity: u32) -> Result<(), Self::Error> {
        self.push(Event::StopVelocity(velocity));
        Ok(())
    }

    fn set_midpoint_velocity(&mut self, velocity: u32) -> Result<(), Self::Error> {
        self.push(Event::MidpointVelocity(velocity));
        Ok(())
    }

    fn set_max_velocity(&mut self, velocity: u32) -> Result<(), Self::Error> {
        self.push(Event::MaxVelocity(velocity));
        Ok(())
    }

    fn set_initial_acceleration(&mut self, accel: u16) -> Result<(), Self::Error> {
        self.push(Event::InitialAcceleration(accel));
        Ok(())
    }

    fn set_max_acceleration(&mut self, accel: u16) -> Result<(), Self::Error> {
        self.push(Event::MaxAcceleration(accel));
        Ok(())
    }

    fn set_max_deceleration(&mut self, decel: u16) -> Result<(), Self::Error> {
        self.push(Event::MaxDeceleration(decel));
        Ok(())
    }

    fn set_midpoint_deceleration(&mut self, decel: u16) -> Result<(), Self::Error> {
        self.push(Event::MidpointDeceleration(decel));
        Ok(())
    }

    fn clear_status_flags(&mut self, mask: u32) -> Result<(), Self::Error> {
        self.push(Event::ClearStatus(mask));
        Ok(())
    }

    fn set_target_position(&mut self, target: i32) -> Result<(), Self::Error> {
        self.push(Event::TargetPosition(target));
        Ok(())
    }

    fn position_reached(&mut self) -> Result<bool, Self::Error> {
        let reached = match self.reached_script.get(self.next_poll) {
            Some(&value) => {
                self.next_poll += 1;
                value
            }
            None => self.reached_script.last().copied().unwrap_or(false),
        };
        self.push(Event::PollPosition(reached));
        Ok(reached)
    }
}

/// Enable pin fake. Logs the electrical level, not its interpretation.
pub struct FakeEnablePin {
    log: Timeline,
}

#[allow(dead_code)]
impl FakeEnablePin {
    pub fn new(log: Timeline) -> Self {
        Self { log }
    }
}

impl ErrorType for FakeEnablePin {
    type Error = core::convert::Infallible;
}

impl OutputPin for FakeEnablePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::EnableLineLow);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Event::EnableLineHigh);
        Ok(())
    }
}

/// Delay fake that records the requested durations instead of sleeping.
pub struct FakeDelay {
    log: Timeline,
}

#[allow(dead_code)]
impl FakeDelay {
    pub fn new(log: Timeline) -> Self {
        Self { log }
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::DelayMs(ms));
    }
}
