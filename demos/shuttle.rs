//! Shuttle bring-up demonstration against a simulated motor.
//!
//! Runs the full configuration phase and three shuttle laps, printing what
//! would hit the hardware. Run with `cargo run --example shuttle`.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use tmc5160_bringup::{
    BringupSequencer, DriveConfig, DriveSetup, Driver, Error, MotionProfile, MotorProfile,
    PollLimit, RampMode, ShuttleTargets,
};

/// A motor model just good enough for the shuttle loop: arrives a fixed
/// number of polls after each target command.
struct SimulatedMotor {
    polls_until_arrival: u32,
}

impl SimulatedMotor {
    const POLLS_PER_MOVE: u32 = 4;

    fn new() -> Self {
        Self {
            polls_until_arrival: 0,
        }
    }
}

impl Driver for SimulatedMotor {
    type Error = Infallible;

    fn begin(&mut self) -> Result<(), Self::Error> {
        println!("driver: initial register images pushed");
        Ok(())
    }

    fn set_recalibrate(&mut self, _: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_fast_standstill(&mut self, _: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_silent_step(&mut self, _: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_multistep_filter(&mut self, _: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_shaft_reversed(&mut self, _: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_small_hysteresis(&mut self, _: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_stop_inputs(&mut self, _: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_direct_mode(&mut self, _: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_rms_current(&mut self, milliamps: u32, hold_scale: f32) -> Result<(), Self::Error> {
        println!("driver: run current {milliamps} mA, hold scale {hold_scale}");
        Ok(())
    }

    fn set_short_to_supply(&mut self, monitor: bool, level: u8) -> Result<(), Self::Error> {
        println!("driver: short-to-supply monitor={monitor} level={level}");
        Ok(())
    }

    fn set_short_to_ground(&mut self, monitor: bool, level: u8) -> Result<(), Self::Error> {
        println!("driver: short-to-ground monitor={monitor} level={level}");
        Ok(())
    }

    fn set_blanking_time(&mut self, selector: u8) -> Result<(), Self::Error> {
        println!("driver: blanking time selector {selector}");
        Ok(())
    }

    fn set_off_time(&mut self, off_time: u8) -> Result<(), Self::Error> {
        println!("driver: chopper off time {off_time}");
        Ok(())
    }

    fn set_pwm_frequency(&mut self, selector: u8) -> Result<(), Self::Error> {
        println!("driver: pwm frequency selector {selector}");
        Ok(())
    }

    fn set_ramp_mode(&mut self, mode: RampMode) -> Result<(), Self::Error> {
        println!("driver: ramp mode {mode:?}");
        Ok(())
    }

    fn set_start_velocity(&mut self, _: u32) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_stop_velocity(&mut self, _: u32) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_midpoint_velocity(&mut self, _: u32) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_max_velocity(&mut self, velocity: u32) -> Result<(), Self::Error> {
        println!("driver: cruise velocity {velocity}");
        Ok(())
    }

    fn set_initial_acceleration(&mut self, _: u16) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_max_acceleration(&mut self, _: u16) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_max_deceleration(&mut self, _: u16) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_midpoint_deceleration(&mut self, _: u16) -> Result<(), Self::Error> {
        Ok(())
    }

    fn clear_status_flags(&mut self, mask: u32) -> Result<(), Self::Error> {
        println!("driver: status flags cleared (mask {mask:#05b})");
        Ok(())
    }

    fn set_target_position(&mut self, target: i32) -> Result<(), Self::Error> {
        println!("driver: target position {target}");
        self.polls_until_arrival = Self::POLLS_PER_MOVE;
        Ok(())
    }

    fn position_reached(&mut self) -> Result<bool, Self::Error> {
        if self.polls_until_arrival > 0 {
            self.polls_until_arrival -= 1;
            return Ok(false);
        }
        Ok(true)
    }
}

struct SimulatedEnablePin;

impl ErrorType for SimulatedEnablePin {
    type Error = Infallible;
}

impl OutputPin for SimulatedEnablePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        println!("enable line: low (power stage on)");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        println!("enable line: high (power stage off)");
        Ok(())
    }
}

struct InstantDelay;

impl DelayNs for InstantDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        println!("delay: {ms} ms");
    }
}

fn main() -> Result<(), Error<Infallible>> {
    let setup = DriveSetup::new(MotorProfile::KYSAN_1040118, DriveConfig::default());
    println!(
        "setup: {} mA nominal, suggested off time {}",
        setup.nominal_current_ma(),
        setup.suggested_off_time()
    );

    let mut sequencer =
        BringupSequencer::new(SimulatedMotor::new(), SimulatedEnablePin, InstantDelay, setup)?;
    sequencer.bring_up(&MotionProfile::default())?;

    let targets = ShuttleTargets::default();
    for lap in 1..=3 {
        sequencer.shuttle_step(targets.outbound, PollLimit::Bounded(100))?;
        println!("lap {lap}: reached {}", targets.outbound);
        sequencer.shuttle_step(targets.home, PollLimit::Bounded(100))?;
        println!("lap {lap}: back at {}", targets.home);
    }
    Ok(())
}
