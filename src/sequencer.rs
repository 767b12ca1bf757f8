//! Startup configuration and motion-command sequencing.
//!
//! [`BringupSequencer`] owns the driver capability, the enable line and a
//! delay source. Bring-up runs in two phases: a configuration phase executed
//! with the power stage off (base register block, motion profile, fault
//! clear), then the run phase that shuttles the motor between two absolute
//! targets.
//!
//! The power stage must stay disabled until configuration is complete;
//! register loading with live outputs can latch spurious faults or move the
//! motor.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{ChopperTiming, DriveSetup, MotionProfile};
use crate::driver::Driver;
use crate::enums::RampMode;
use crate::errors::Error;

/// Upper bound for a position wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollLimit {
    /// Block until the chip reports the target reached, however long that
    /// takes. A stalled motor blocks forever.
    Unbounded,
    /// Give up with [`Error::WaitExpired`] after this many status polls.
    Bounded(u32),
}

/// The two absolute targets the shuttle loop alternates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShuttleTargets {
    /// Target of the outbound leg, in microsteps.
    pub outbound: i32,
    /// Target of the return leg, in microsteps.
    pub home: i32,
}

impl Default for ShuttleTargets {
    fn default() -> Self {
        Self {
            outbound: crate::SHUTTLE_OUTBOUND,
            home: crate::SHUTTLE_HOME,
        }
    }
}

/// The DRV_ENN line. Active low: driving the pin high switches the power
/// stage off.
struct EnableLine<P> {
    pin: P,
}

impl<P: OutputPin> EnableLine<P> {
    fn disable_outputs(&mut self) -> Result<(), P::Error> {
        self.pin.set_high()
    }

    fn enable_outputs(&mut self) -> Result<(), P::Error> {
        self.pin.set_low()
    }
}

fn comm<T, E>(result: Result<T, E>) -> Result<T, Error<E>> {
    result.map_err(Error::Comm)
}

/// Brings a TMC5160 from power-on to commanded motion.
pub struct BringupSequencer<D, EN, DELAY> {
    driver: D,
    enable: EnableLine<EN>,
    delay: DELAY,
    setup: DriveSetup,
    timing: ChopperTiming,
}

impl<D, EN, DELAY> fmt::Debug for BringupSequencer<D, EN, DELAY> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BringupSequencer")
            .field("setup", &self.setup)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl<D, EN, DELAY> BringupSequencer<D, EN, DELAY>
where
    D: Driver,
    EN: OutputPin,
    DELAY: DelayNs,
{
    /// Binds the sequencer to a driver, the enable line and a delay source.
    ///
    /// Switches the power stage off and starts the driver; no configuration
    /// register is touched yet.
    ///
    /// # Errors
    /// `Error::InvalidValue` for an unusable setup (zero supply voltage or
    /// sense resistance), `Error::Pin`/`Error::Comm` when the hardware does
    /// not respond.
    pub fn new(
        driver: D,
        enable_pin: EN,
        delay: DELAY,
        setup: DriveSetup,
    ) -> Result<Self, Error<D::Error>> {
        setup.validate()?;
        let timing = ChopperTiming::for_setup(&setup);
        timing.validate()?;
        let mut sequencer = Self {
            driver,
            enable: EnableLine { pin: enable_pin },
            delay,
            setup,
            timing,
        };
        sequencer
            .enable
            .disable_outputs()
            .map_err(|_| Error::Pin)?;
        comm(sequencer.driver.begin())?;
        Ok(sequencer)
    }

    /// Replaces the derived chopper timing, for boards where the derived
    /// off time does not produce the expected chop frequency.
    ///
    /// # Errors
    /// `Error::InvalidValue` when a field does not fit its register.
    pub fn with_chopper_timing(mut self, timing: ChopperTiming) -> Result<Self, Error<D::Error>> {
        timing.validate()?;
        self.timing = timing;
        Ok(self)
    }

    /// The base configuration block: GCONF flags for plain SPI-commanded
    /// operation, run/hold current, short-circuit protection, chopper timing.
    ///
    /// Register writes are independent and idempotent. Does not command
    /// motion and does not touch the enable line.
    ///
    /// # Errors
    /// `Error::Comm` when a register write fails.
    pub fn apply_base_config(&mut self) -> Result<(), Error<D::Error>> {
        comm(self.driver.set_recalibrate(false))?;
        comm(self.driver.set_fast_standstill(false))?;
        comm(self.driver.set_silent_step(false))?;
        comm(self.driver.set_multistep_filter(false))?;
        comm(self.driver.set_shaft_reversed(false))?;
        comm(self.driver.set_small_hysteresis(false))?;
        comm(self.driver.set_stop_inputs(false))?;
        comm(self.driver.set_direct_mode(false))?;

        comm(self
            .driver
            .set_rms_current(self.setup.nominal_current_ma(), crate::HOLD_CURRENT_SCALE))?;

        comm(self
            .driver
            .set_short_to_supply(true, crate::SHORT_SENSE_LEVEL))?;
        comm(self
            .driver
            .set_short_to_ground(true, crate::SHORT_SENSE_LEVEL))?;

        comm(self.driver.set_blanking_time(self.timing.blanking_time))?;
        comm(self.driver.set_off_time(self.timing.off_time))?;
        comm(self.driver.set_pwm_frequency(self.timing.pwm_frequency))
    }

    /// Loads the ramp generator: positioning mode plus the velocity and
    /// acceleration profile.
    ///
    /// # Errors
    /// `Error::Comm` when a register write fails.
    pub fn apply_motion_profile(&mut self, profile: &MotionProfile) -> Result<(), Error<D::Error>> {
        comm(self.driver.set_ramp_mode(RampMode::Positioning))?;
        comm(self.driver.set_stop_velocity(profile.stop_velocity))?;
        comm(self.driver.set_start_velocity(profile.start_velocity))?;
        comm(self.driver.set_midpoint_velocity(profile.midpoint_velocity))?;
        comm(self.driver.set_max_velocity(profile.max_velocity))?;
        comm(self
            .driver
            .set_initial_acceleration(profile.initial_acceleration))?;
        comm(self.driver.set_max_acceleration(profile.max_acceleration))?;
        comm(self.driver.set_max_deceleration(profile.max_deceleration))?;
        comm(self
            .driver
            .set_midpoint_deceleration(profile.midpoint_deceleration))
    }

    /// Drains faults latched while the registers were loading: power stage
    /// off, a fixed settle delay, power stage on, clear all status flags.
    ///
    /// Runs exactly once per call; a fault that re-latches afterwards is not
    /// observed here.
    ///
    /// # Errors
    /// `Error::Pin` when the enable line fails, `Error::Comm` when the
    /// status-clear write fails.
    pub fn clear_faults_and_enable(&mut self) -> Result<(), Error<D::Error>> {
        self.enable.disable_outputs().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(crate::FAULT_SETTLE_MS);
        self.enable.enable_outputs().map_err(|_| Error::Pin)?;
        comm(self.driver.clear_status_flags(crate::CLEAR_ALL_FAULTS))
    }

    /// The whole configuration phase in order: base config, motion profile,
    /// fault clear and enable. After this the chip accepts motion commands.
    ///
    /// # Errors
    /// Propagates the first failing step.
    pub fn bring_up(&mut self, profile: &MotionProfile) -> Result<(), Error<D::Error>> {
        self.apply_base_config()?;
        self.apply_motion_profile(profile)?;
        self.clear_faults_and_enable()
    }

    /// Busy-polls the position-reached flag.
    ///
    /// With [`PollLimit::Unbounded`] this reproduces the blocking wait of the
    /// original bring-up: no timeout, no yielding, returns only when the chip
    /// reports arrival or a poll fails on the bus.
    ///
    /// # Errors
    /// `Error::WaitExpired` when a bounded budget runs out, `Error::Comm`
    /// when a status read fails.
    pub fn wait_position_reached(&mut self, limit: PollLimit) -> Result<(), Error<D::Error>> {
        match limit {
            PollLimit::Unbounded => loop {
                if comm(self.driver.position_reached())? {
                    return Ok(());
                }
            },
            PollLimit::Bounded(max_polls) => {
                for _ in 0..max_polls {
                    if comm(self.driver.position_reached())? {
                        return Ok(());
                    }
                }
                Err(Error::WaitExpired)
            }
        }
    }

    /// One leg of the shuttle: command `target` only if the previous move
    /// has finished, then wait for arrival.
    ///
    /// Never issues a duplicate command while a move is still in flight.
    ///
    /// # Errors
    /// See [`wait_position_reached`](Self::wait_position_reached).
    pub fn shuttle_step(&mut self, target: i32, limit: PollLimit) -> Result<(), Error<D::Error>> {
        if comm(self.driver.position_reached())? {
            comm(self.driver.set_target_position(target))?;
        }
        self.wait_position_reached(limit)
    }

    /// Alternates between the two targets forever.
    ///
    /// Each leg blocks until the chip reports arrival; a motor that never
    /// arrives blocks this call permanently. Returns only when a bus
    /// transaction fails.
    ///
    /// # Errors
    /// `Error::Comm` from the failing transaction.
    pub fn run_shuttle(&mut self, targets: &ShuttleTargets) -> Result<(), Error<D::Error>> {
        loop {
            self.shuttle_step(targets.outbound, PollLimit::Unbounded)?;
            self.shuttle_step(targets.home, PollLimit::Unbounded)?;
        }
    }

    /// Read access to the driver capability.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the driver capability, for register tweaks outside
    /// the fixed sequence.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Tears the sequencer apart without touching the hardware state.
    pub fn release(self) -> (D, EN, DELAY) {
        (self.driver, self.enable.pin, self.delay)
    }
}
