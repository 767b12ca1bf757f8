//! The driver capability and its SPI implementation.
//!
//! [`Driver`] names every register knob the bring-up sequence turns, so the
//! sequencer can run against the real chip or a recording mock. [`Tmc5160`]
//! is the real thing: a thin register transport over an
//! [`embedded_hal::spi::SpiDevice`] with shadow copies of the write-only
//! registers.

use core::fmt;

use embedded_hal::spi::SpiDevice;

use crate::enums::RampMode;
use crate::registers::{self, Address};

/// Register-level capability of a TMC5160 behind some transport.
///
/// Setters are named after their function rather than their register; several
/// of them land in the same physical register. Every call is an absolute
/// write, so repeating a configuration block is harmless.
pub trait Driver {
    /// Transport error type.
    type Error;

    /// Pushes the initial register images to the chip.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Motor offset recalibration on stand still.
    fn set_recalibrate(&mut self, enabled: bool) -> Result<(), Self::Error>;
    /// Short standstill detection window (2^18 clocks instead of 2^20).
    fn set_fast_standstill(&mut self, enabled: bool) -> Result<(), Self::Error>;
    /// StealthChop voltage PWM mode.
    fn set_silent_step(&mut self, enabled: bool) -> Result<(), Self::Error>;
    /// Multistep filtering for step pulses.
    fn set_multistep_filter(&mut self, enabled: bool) -> Result<(), Self::Error>;
    /// Inverts motor direction.
    fn set_shaft_reversed(&mut self, reversed: bool) -> Result<(), Self::Error>;
    /// 1/16 step hysteresis for the step frequency comparison.
    fn set_small_hysteresis(&mut self, small: bool) -> Result<(), Self::Error>;
    /// Stop-input pin handling.
    fn set_stop_inputs(&mut self, enabled: bool) -> Result<(), Self::Error>;
    /// Direct coil current control, bypassing the sequencer.
    fn set_direct_mode(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Sets run current from an RMS milliamp target; hold current is
    /// `hold_scale` (0.0..=1.0) of the run current.
    fn set_rms_current(&mut self, milliamps: u32, hold_scale: f32) -> Result<(), Self::Error>;

    /// Short-to-supply protection: monitoring switch and sensitivity level
    /// (lower is more sensitive).
    fn set_short_to_supply(&mut self, monitor: bool, level: u8) -> Result<(), Self::Error>;
    /// Short-to-ground protection: monitoring switch and sensitivity level.
    fn set_short_to_ground(&mut self, monitor: bool, level: u8) -> Result<(), Self::Error>;

    /// Comparator blanking time selector (TBL).
    fn set_blanking_time(&mut self, selector: u8) -> Result<(), Self::Error>;
    /// Chopper off time (TOFF). Zero disables the power stage.
    fn set_off_time(&mut self, off_time: u8) -> Result<(), Self::Error>;
    /// PWM frequency divider selector.
    fn set_pwm_frequency(&mut self, selector: u8) -> Result<(), Self::Error>;

    /// Ramp generator mode.
    fn set_ramp_mode(&mut self, mode: RampMode) -> Result<(), Self::Error>;
    /// VSTART.
    fn set_start_velocity(&mut self, velocity: u32) -> Result<(), Self::Error>;
    /// VSTOP.
    fn set_stop_velocity(&mut self, velocity: u32) -> Result<(), Self::Error>;
    /// V1.
    fn set_midpoint_velocity(&mut self, velocity: u32) -> Result<(), Self::Error>;
    /// VMAX.
    fn set_max_velocity(&mut self, velocity: u32) -> Result<(), Self::Error>;
    /// A1.
    fn set_initial_acceleration(&mut self, accel: u16) -> Result<(), Self::Error>;
    /// AMAX.
    fn set_max_acceleration(&mut self, accel: u16) -> Result<(), Self::Error>;
    /// DMAX.
    fn set_max_deceleration(&mut self, decel: u16) -> Result<(), Self::Error>;
    /// D1.
    fn set_midpoint_deceleration(&mut self, decel: u16) -> Result<(), Self::Error>;

    /// Clears latched status flags; bit 1 clears the matching GSTAT flag.
    fn clear_status_flags(&mut self, mask: u32) -> Result<(), Self::Error>;
    /// Issues an absolute positioning target (XTARGET).
    fn set_target_position(&mut self, target: i32) -> Result<(), Self::Error>;
    /// Whether the ramp generator has arrived at the last commanded target.
    fn position_reached(&mut self) -> Result<bool, Self::Error>;
}

/// Full-scale sense voltage of the chip in millivolts.
const FULL_SCALE_MV: u64 = 325;

/// Translates an RMS milliamp target into (GLOBALSCALER, current scale).
///
/// Vendor algorithm: start from the maximum current scale of 31 and walk it
/// down until the global scaler lands in 32..=255. A scaler of zero selects
/// full scale (256).
fn scale_current(sense_resistor_ohms: f32, milliamps: u32) -> (u8, u8) {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rs_scaled = (sense_resistor_ohms * 65_535.0) as u64;
    // 11585 = 32 * 256 * sqrt(2)
    let numerator = ((11_585 * rs_scaled) >> 8) * u64::from(milliamps);

    let mut cs: u32 = 31;
    let mut scaler;
    loop {
        let denominator = ((FULL_SCALE_MV * 0xFFFF) >> 8) * u64::from(cs + 1);
        scaler = numerator / denominator;
        if scaler > 255 {
            scaler = 0;
            break;
        }
        if scaler >= 32 || scaler == 0 || cs == 0 {
            break;
        }
        cs -= 1;
    }
    #[allow(clippy::cast_possible_truncation)]
    {
        (scaler as u8, cs as u8)
    }
}

/// TMC5160 register transport over SPI.
///
/// Keeps shadow images of the write-only and multi-field registers so that
/// each setter re-emits the whole register.
pub struct Tmc5160<SPI> {
    spi: SPI,
    sense_resistor_ohms: f32,
    gconf: registers::GCONF,
    short_conf: registers::SHORT_CONF,
    chop_conf: registers::CHOPCONF,
    pwm_conf: registers::PWMCONF,
    ihold_irun: registers::IHOLD_IRUN,
}

impl<SPI> fmt::Debug for Tmc5160<SPI> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tmc5160")
            .field("sense_resistor_ohms", &self.sense_resistor_ohms)
            .finish_non_exhaustive()
    }
}

impl<SPI> Tmc5160<SPI>
where
    SPI: SpiDevice<u8>,
{
    /// Creates a driver over an SPI device, bound to the board's sense
    /// resistor value.
    pub fn new(spi: SPI, sense_resistor_ohms: f32) -> Self {
        Self {
            spi,
            sense_resistor_ohms,
            gconf: registers::GCONF::default(),
            short_conf: registers::SHORT_CONF::default(),
            chop_conf: registers::CHOPCONF::default(),
            pwm_conf: registers::PWMCONF::default(),
            ihold_irun: registers::IHOLD_IRUN::default(),
        }
    }

    /// Releases the SPI device.
    pub fn free(self) -> SPI {
        self.spi
    }

    /// Writes one register: address byte with the write flag, then the value
    /// big-endian.
    fn write_register(&mut self, addr: Address, value: u32) -> Result<(), SPI::Error> {
        let bytes = value.to_be_bytes();
        let frame = [
            addr.write_address(),
            bytes[0],
            bytes[1],
            bytes[2],
            bytes[3],
        ];
        self.spi.write(&frame)
    }

    /// Reads one register. The chip answers with the value captured on the
    /// previous transfer, so the datagram is sent twice and the second reply
    /// is the live value.
    fn read_register(&mut self, addr: Address) -> Result<u32, SPI::Error> {
        let frame = [addr as u8, 0, 0, 0, 0];
        let mut response = [0u8; 5];
        self.spi.transfer(&mut response, &frame)?;
        self.spi.transfer(&mut response, &frame)?;
        Ok(u32::from_be_bytes([
            response[1],
            response[2],
            response[3],
            response[4],
        ]))
    }

    fn write_gconf(&mut self) -> Result<(), SPI::Error> {
        let value = self.gconf.bits();
        self.write_register(Address::GCONF, value)
    }

    fn write_chop_conf(&mut self) -> Result<(), SPI::Error> {
        let value = self.chop_conf.bits();
        self.write_register(Address::CHOPCONF, value)
    }
}

impl<SPI> Driver for Tmc5160<SPI>
where
    SPI: SpiDevice<u8>,
{
    type Error = SPI::Error;

    fn begin(&mut self) -> Result<(), Self::Error> {
        let (gconf, short_conf, chop_conf, pwm_conf, ihold_irun) = (
            self.gconf.bits(),
            self.short_conf.bits(),
            self.chop_conf.bits(),
            self.pwm_conf.bits(),
            self.ihold_irun.bits(),
        );
        self.write_register(Address::GCONF, gconf)?;
        self.write_register(Address::SHORT_CONF, short_conf)?;
        self.write_register(Address::CHOPCONF, chop_conf)?;
        self.write_register(Address::PWMCONF, pwm_conf)?;
        self.write_register(Address::IHOLD_IRUN, ihold_irun)
    }

    fn set_recalibrate(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.gconf.set_recalibrate(enabled);
        self.write_gconf()
    }

    fn set_fast_standstill(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.gconf.set_faststandstill(enabled);
        self.write_gconf()
    }

    fn set_silent_step(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.gconf.set_en_pwm_mode(enabled);
        self.write_gconf()
    }

    fn set_multistep_filter(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.gconf.set_multistep_filt(enabled);
        self.write_gconf()
    }

    fn set_shaft_reversed(&mut self, reversed: bool) -> Result<(), Self::Error> {
        self.gconf.set_shaft(reversed);
        self.write_gconf()
    }

    fn set_small_hysteresis(&mut self, small: bool) -> Result<(), Self::Error> {
        self.gconf.set_small_hysteresis(small);
        self.write_gconf()
    }

    fn set_stop_inputs(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.gconf.set_stop_enable(enabled);
        self.write_gconf()
    }

    fn set_direct_mode(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.gconf.set_direct_mode(enabled);
        self.write_gconf()
    }

    fn set_rms_current(&mut self, milliamps: u32, hold_scale: f32) -> Result<(), Self::Error> {
        let (scaler, cs) = scale_current(self.sense_resistor_ohms, milliamps);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let hold = (f32::from(cs) * hold_scale.clamp(0.0, 1.0)) as u8;
        self.ihold_irun.set_irun(cs);
        self.ihold_irun.set_ihold(hold);
        let ihold_irun = self.ihold_irun.bits();
        self.write_register(Address::GLOBAL_SCALER, u32::from(scaler))?;
        self.write_register(Address::IHOLD_IRUN, ihold_irun)
    }

    fn set_short_to_supply(&mut self, monitor: bool, level: u8) -> Result<(), Self::Error> {
        self.chop_conf.set_diss2vs(!monitor);
        self.short_conf.set_s2vs_level(level);
        let short_conf = self.short_conf.bits();
        self.write_register(Address::SHORT_CONF, short_conf)?;
        self.write_chop_conf()
    }

    fn set_short_to_ground(&mut self, monitor: bool, level: u8) -> Result<(), Self::Error> {
        self.chop_conf.set_diss2g(!monitor);
        self.short_conf.set_s2g_level(level);
        let short_conf = self.short_conf.bits();
        self.write_register(Address::SHORT_CONF, short_conf)?;
        self.write_chop_conf()
    }

    fn set_blanking_time(&mut self, selector: u8) -> Result<(), Self::Error> {
        self.chop_conf.set_tbl(selector);
        self.write_chop_conf()
    }

    fn set_off_time(&mut self, off_time: u8) -> Result<(), Self::Error> {
        self.chop_conf.set_toff(off_time);
        self.write_chop_conf()
    }

    fn set_pwm_frequency(&mut self, selector: u8) -> Result<(), Self::Error> {
        self.pwm_conf.set_pwm_freq(selector);
        let pwm_conf = self.pwm_conf.bits();
        self.write_register(Address::PWMCONF, pwm_conf)
    }

    fn set_ramp_mode(&mut self, mode: RampMode) -> Result<(), Self::Error> {
        self.write_register(Address::RAMPMODE, u32::from(mode as u8))
    }

    fn set_start_velocity(&mut self, velocity: u32) -> Result<(), Self::Error> {
        self.write_register(Address::VSTART, velocity)
    }

    fn set_stop_velocity(&mut self, velocity: u32) -> Result<(), Self::Error> {
        self.write_register(Address::VSTOP, velocity)
    }

    fn set_midpoint_velocity(&mut self, velocity: u32) -> Result<(), Self::Error> {
        self.write_register(Address::V1, velocity)
    }

    fn set_max_velocity(&mut self, velocity: u32) -> Result<(), Self::Error> {
        self.write_register(Address::VMAX, velocity)
    }

    fn set_initial_acceleration(&mut self, accel: u16) -> Result<(), Self::Error> {
        self.write_register(Address::A1, u32::from(accel))
    }

    fn set_max_acceleration(&mut self, accel: u16) -> Result<(), Self::Error> {
        self.write_register(Address::AMAX, u32::from(accel))
    }

    fn set_max_deceleration(&mut self, decel: u16) -> Result<(), Self::Error> {
        self.write_register(Address::DMAX, u32::from(decel))
    }

    fn set_midpoint_deceleration(&mut self, decel: u16) -> Result<(), Self::Error> {
        self.write_register(Address::D1, u32::from(decel))
    }

    fn clear_status_flags(&mut self, mask: u32) -> Result<(), Self::Error> {
        self.write_register(Address::GSTAT, mask)
    }

    fn set_target_position(&mut self, target: i32) -> Result<(), Self::Error> {
        #[allow(clippy::cast_sign_loss)]
        let raw = target as u32;
        self.write_register(Address::XTARGET, raw)
    }

    fn position_reached(&mut self) -> Result<bool, Self::Error> {
        let ramp_stat = registers::RAMP_STAT::from_bits(self.read_register(Address::RAMP_STAT)?);
        Ok(ramp_stat.position_reached())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_current_demo_board() {
        // 200 mA across 75 mΩ: the scaler only reaches the valid band after
        // the current scale steps down.
        let (scaler, cs) = scale_current(0.075, 200);
        assert!((32..=255).contains(&scaler));
        assert_eq!(cs, 15);
    }

    #[test]
    fn test_scale_current_monotonic() {
        let (_, cs_low) = scale_current(0.075, 200);
        let (_, cs_high) = scale_current(0.075, 400);
        assert!(cs_high >= cs_low);
    }

    #[test]
    fn test_scale_current_full_scale() {
        // Past the representable range the scaler saturates to 0 (= 256/256).
        let (scaler, cs) = scale_current(0.075, 4000);
        assert_eq!(scaler, 0);
        assert_eq!(cs, 31);
    }
}
