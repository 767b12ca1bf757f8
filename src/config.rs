//! Static motor and drive-stage parameters and the values derived from them.
//!
//! Everything here is datasheet- or board-level input: nothing is read back
//! from the chip. The derived numbers feed the register writes performed by
//! [`crate::sequencer::BringupSequencer`].

use crate::errors::Error;

/// Electrical parameters of the stepper motor, copied from its datasheet.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorProfile {
    /// Rated operating voltage in volts.
    pub rated_voltage: f32,
    /// Rated coil current in milliamps.
    pub rated_current_ma: u32,
    /// Coil resistance in ohms.
    pub coil_resistance_ohms: f32,
    /// Holding torque in millinewton-metres.
    pub holding_torque_mnm: u32,
    /// Rotation per full step in degrees.
    pub step_angle_degrees: f32,
}

impl MotorProfile {
    /// Kysan 1040118 (17HD-B8X300-0.4A), the motor the demo values were tuned on.
    pub const KYSAN_1040118: Self = Self {
        rated_voltage: 12.0,
        rated_current_ma: 400,
        coil_resistance_ohms: 30.0,
        holding_torque_mnm: 260,
        step_angle_degrees: 1.8,
    };

    /// Full steps per shaft revolution.
    #[must_use]
    pub fn steps_per_revolution(&self) -> f32 {
        360.0 / self.step_angle_degrees
    }
}

/// Board-level parameters of the driver stage.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveConfig {
    /// Motor supply voltage in volts.
    pub supply_voltage: f32,
    /// Sense resistor value in ohms.
    pub sense_resistor_ohms: f32,
    /// Chip clock in hertz (12 MHz when running on the internal clock).
    pub clock_hz: u32,
    /// Target chopper frequency in hertz, picked from the datasheet table
    /// for the selected PWM frequency divider.
    pub chop_frequency_hz: u32,
    /// Fraction of the standstill chopper cycle spent in slow decay.
    pub decay_fraction: f32,
    /// Microsteps per full step.
    pub microstep_resolution: u16,
}

impl Default for DriveConfig {
    /// 24 V supply, 75 mΩ sense resistor, internal 12 MHz clock, 35.1 kHz chop.
    fn default() -> Self {
        Self {
            supply_voltage: 24.0,
            sense_resistor_ohms: 0.075,
            clock_hz: 12_000_000,
            chop_frequency_hz: 35_100,
            decay_fraction: 0.7,
            microstep_resolution: 256,
        }
    }
}

/// A motor profile paired with the drive stage it runs on.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveSetup {
    /// Motor datasheet record.
    pub motor: MotorProfile,
    /// Drive-stage record.
    pub drive: DriveConfig,
}

impl DriveSetup {
    /// Pairs a motor with a drive stage.
    #[must_use]
    pub const fn new(motor: MotorProfile, drive: DriveConfig) -> Self {
        Self { motor, drive }
    }

    /// Rejects setups the derived math cannot work with.
    ///
    /// # Errors
    /// Returns `Error::InvalidValue` for a non-positive supply voltage or
    /// sense resistance.
    pub fn validate<E>(&self) -> Result<(), Error<E>> {
        if self.drive.supply_voltage <= 0.0 || self.drive.sense_resistor_ohms <= 0.0 {
            return Err(Error::InvalidValue);
        }
        Ok(())
    }

    /// Coil current in milliamps when the motor runs from the drive supply
    /// instead of its rated voltage, assuming constant power.
    ///
    /// A 12 V / 400 mA motor on a 24 V supply comes out at 200 mA.
    #[must_use]
    pub fn nominal_current_ma(&self) -> u32 {
        let scaled =
            self.motor.rated_current_ma as f32 * self.motor.rated_voltage / self.drive.supply_voltage;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            scaled as u32
        }
    }

    /// Chopper off-time factor derived from clock, chop frequency and decay
    /// fraction.
    ///
    /// Carried as-is from the board bring-up notes: the derivation is known
    /// not to land on a working TOFF for every clock/chopper combination, so
    /// it is exposed as a plain input. Override [`ChopperTiming::off_time`]
    /// when the measured chop frequency disagrees.
    #[must_use]
    pub fn off_time_factor(&self) -> f32 {
        let standstill_half_cycle =
            (100_000.0 / self.drive.chop_frequency_hz as f32) * self.drive.decay_fraction * 0.5;
        (standstill_half_cycle * self.drive.clock_hz as f32 - 12.0) / 3_200_000.0
    }

    /// [`off_time_factor`](Self::off_time_factor) truncated into the 4-bit
    /// TOFF field. Zero disables the chopper entirely.
    #[must_use]
    pub fn suggested_off_time(&self) -> u8 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            self.off_time_factor().clamp(0.0, crate::MAX_OFF_TIME as f32) as u8
        }
    }
}

/// Chopper timing block written by the base configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChopperTiming {
    /// Comparator blanking time selector (TBL, 0..=3).
    pub blanking_time: u8,
    /// Chopper off time (TOFF, 0..=15, zero disables the driver).
    pub off_time: u8,
    /// PWM frequency divider selector (0..=3).
    pub pwm_frequency: u8,
}

impl ChopperTiming {
    /// The demonstration timing: blanking selector 2, derived off time,
    /// PWM frequency selector 1 (35.1 kHz at 12 MHz).
    #[must_use]
    pub fn for_setup(setup: &DriveSetup) -> Self {
        Self {
            blanking_time: 2,
            off_time: setup.suggested_off_time(),
            pwm_frequency: 1,
        }
    }

    /// Checks every field against its register range.
    ///
    /// # Errors
    /// Returns `Error::InvalidValue` when a field does not fit its bitfield.
    pub fn validate<E>(&self) -> Result<(), Error<E>> {
        if self.blanking_time > crate::MAX_BLANKING_TIME
            || self.off_time > crate::MAX_OFF_TIME
            || self.pwm_frequency > crate::MAX_PWM_FREQUENCY
        {
            return Err(Error::InvalidValue);
        }
        Ok(())
    }
}

/// Ramp generator values for the shuttle demonstration.
///
/// All values are in the chip's internal velocity/acceleration units, which
/// depend on the chip clock. They are deliberately independent of
/// [`MotorProfile`]: no derivation from the motor parameters is implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionProfile {
    /// Velocity below which a positioning move is considered finished (VSTOP).
    pub stop_velocity: u32,
    /// Velocity at which a move starts (VSTART).
    pub start_velocity: u32,
    /// Velocity at which the ramp switches from A1 to AMAX (V1).
    pub midpoint_velocity: u32,
    /// Cruise velocity (VMAX).
    pub max_velocity: u32,
    /// Acceleration below the midpoint velocity (A1).
    pub initial_acceleration: u16,
    /// Acceleration above the midpoint velocity (AMAX).
    pub max_acceleration: u16,
    /// Deceleration above the midpoint velocity (DMAX).
    pub max_deceleration: u16,
    /// Deceleration below the midpoint velocity (D1).
    pub midpoint_deceleration: u16,
}

impl Default for MotionProfile {
    /// The fixed demonstration ramp used by the shuttle loop.
    fn default() -> Self {
        Self {
            stop_velocity: 10,
            start_velocity: 0,
            midpoint_velocity: 600_000,
            max_velocity: 838_809,
            initial_acceleration: 1,
            max_acceleration: 100,
            max_deceleration: 500,
            midpoint_deceleration: 32_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    fn demo_setup() -> DriveSetup {
        DriveSetup::new(MotorProfile::KYSAN_1040118, DriveConfig::default())
    }

    #[test]
    fn test_nominal_current_constant_power() {
        // 12 V * 400 mA on a 24 V supply halves the current.
        assert_eq!(demo_setup().nominal_current_ma(), 200);
    }

    #[test]
    fn test_nominal_current_matched_supply() {
        let mut setup = demo_setup();
        setup.drive.supply_voltage = 12.0;
        assert_eq!(setup.nominal_current_ma(), 400);
    }

    #[test]
    fn test_steps_per_revolution() {
        assert_eq!(MotorProfile::KYSAN_1040118.steps_per_revolution(), 200.0);
    }

    #[test]
    fn test_suggested_off_time_demo_board() {
        let setup = demo_setup();
        // ~3.7 for the 12 MHz / 35.1 kHz / 0.7 combination, truncated to 3.
        assert!(setup.off_time_factor() > 3.0 && setup.off_time_factor() < 4.0);
        assert_eq!(setup.suggested_off_time(), 3);
    }

    #[test]
    fn test_suggested_off_time_clamped() {
        let mut setup = demo_setup();
        setup.drive.chop_frequency_hz = 100;
        assert_eq!(setup.suggested_off_time(), crate::MAX_OFF_TIME);
    }

    #[test]
    fn test_validate_rejects_zero_supply() {
        let mut setup = demo_setup();
        setup.drive.supply_voltage = 0.0;
        assert_eq!(
            setup.validate::<Infallible>(),
            Err(crate::Error::InvalidValue)
        );
    }

    #[test]
    fn test_chopper_timing_for_demo_setup() {
        let timing = ChopperTiming::for_setup(&demo_setup());
        assert_eq!(timing.blanking_time, 2);
        assert_eq!(timing.off_time, 3);
        assert_eq!(timing.pwm_frequency, 1);
        assert!(timing.validate::<Infallible>().is_ok());
    }

    #[test]
    fn test_chopper_timing_range_check() {
        let timing = ChopperTiming {
            blanking_time: 4,
            off_time: 3,
            pwm_frequency: 1,
        };
        assert_eq!(
            timing.validate::<Infallible>(),
            Err(crate::Error::InvalidValue)
        );
    }
}
