//! TMC5160 register addresses and field layouts.
//!
//! Only the registers the bring-up sequence touches are declared. Field
//! positions follow section 6 of the TMC5160A datasheet; write-only registers
//! are shadowed in [`crate::driver::Tmc5160`] so every update is an absolute
//! full-register write.

#![allow(non_camel_case_types)]

use bitfield::bitfield;

/// OR-ed into the address byte of a write datagram.
pub const WRITE_FLAG: u8 = 0x80;

/// Addresses of the registers used during bring-up.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Address {
    /// Global configuration flags.
    GCONF = 0x00,
    /// Global status flags, write 1 to clear.
    GSTAT = 0x01,
    /// Short-circuit detector tuning.
    SHORT_CONF = 0x09,
    /// Full-scale current scaler.
    GLOBAL_SCALER = 0x0B,
    /// Run/hold current control.
    IHOLD_IRUN = 0x10,
    /// Ramp generator mode.
    RAMPMODE = 0x20,
    /// Start velocity.
    VSTART = 0x23,
    /// First-phase acceleration.
    A1 = 0x24,
    /// First/second phase threshold velocity.
    V1 = 0x25,
    /// Second-phase acceleration.
    AMAX = 0x26,
    /// Cruise velocity.
    VMAX = 0x27,
    /// Second-phase deceleration.
    DMAX = 0x28,
    /// First-phase deceleration.
    D1 = 0x2A,
    /// Stop velocity.
    VSTOP = 0x2B,
    /// Positioning target.
    XTARGET = 0x2D,
    /// Ramp generator status flags.
    RAMP_STAT = 0x35,
    /// Chopper configuration.
    CHOPCONF = 0x6C,
    /// StealthChop PWM configuration.
    PWMCONF = 0x70,
}

impl Address {
    /// The address byte of a write datagram for this register.
    #[must_use]
    pub const fn write_address(self) -> u8 {
        self as u8 | WRITE_FLAG
    }
}

bitfield! {
    /// Global configuration flags (GCONF, 0x00).
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct GCONF(u32);
    impl Debug;
    u8;
    pub recalibrate, set_recalibrate: 0;
    pub faststandstill, set_faststandstill: 1;
    pub en_pwm_mode, set_en_pwm_mode: 2;
    pub multistep_filt, set_multistep_filt: 3;
    pub shaft, set_shaft: 4;
    pub small_hysteresis, set_small_hysteresis: 14;
    pub stop_enable, set_stop_enable: 15;
    pub direct_mode, set_direct_mode: 16;
    pub test_mode, set_test_mode: 17;
}

bitfield! {
    /// Global status flags (GSTAT, 0x01). Writing 1 clears a flag.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct GSTAT(u32);
    impl Debug;
    u8;
    pub reset, set_reset: 0;
    pub drv_err, set_drv_err: 1;
    pub uv_cp, set_uv_cp: 2;
}

bitfield! {
    /// Short-circuit detector tuning (SHORT_CONF, 0x09). Write-only.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct SHORT_CONF(u32);
    impl Debug;
    u8;
    pub s2vs_level, set_s2vs_level: 3, 0;
    pub s2g_level, set_s2g_level: 11, 8;
    pub shortfilter, set_shortfilter: 17, 16;
    pub shortdelay, set_shortdelay: 18;
}

impl Default for SHORT_CONF {
    /// Chip reset value: both levels 6, filter 1.
    fn default() -> Self {
        Self(0x0001_0606)
    }
}

bitfield! {
    /// Run/hold current control (IHOLD_IRUN, 0x10). Write-only.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct IHOLD_IRUN(u32);
    impl Debug;
    u8;
    pub ihold, set_ihold: 4, 0;
    pub irun, set_irun: 12, 8;
    pub ihold_delay, set_ihold_delay: 19, 16;
}

bitfield! {
    /// Chopper configuration (CHOPCONF, 0x6C).
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct CHOPCONF(u32);
    impl Debug;
    u8;
    pub toff, set_toff: 3, 0;
    pub hstrt, set_hstrt: 6, 4;
    pub hend, set_hend: 10, 7;
    pub chm, set_chm: 14;
    pub tbl, set_tbl: 16, 15;
    pub mres, set_mres: 27, 24;
    pub intpol, set_intpol: 28;
    pub diss2g, set_diss2g: 30;
    pub diss2vs, set_diss2vs: 31;
}

impl Default for CHOPCONF {
    /// Chip reset value.
    fn default() -> Self {
        Self(0x1041_0150)
    }
}

bitfield! {
    /// StealthChop PWM configuration (PWMCONF, 0x70). Write-only.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct PWMCONF(u32);
    impl Debug;
    u8;
    pub pwm_ofs, set_pwm_ofs: 7, 0;
    pub pwm_grad, set_pwm_grad: 15, 8;
    pub pwm_freq, set_pwm_freq: 17, 16;
    pub pwm_autoscale, set_pwm_autoscale: 18;
    pub pwm_autograd, set_pwm_autograd: 19;
    pub freewheel, set_freewheel: 21, 20;
    pub pwm_reg, set_pwm_reg: 27, 24;
    pub pwm_lim, set_pwm_lim: 31, 28;
}

impl Default for PWMCONF {
    /// Chip reset value.
    fn default() -> Self {
        Self(0xC40C_001E)
    }
}

bitfield! {
    /// Ramp generator status (RAMP_STAT, 0x35).
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct RAMP_STAT(u32);
    impl Debug;
    u8;
    pub status_stop_l, _: 0;
    pub status_stop_r, _: 1;
    pub event_stop_l, _: 4;
    pub event_stop_r, _: 5;
    pub event_stop_sg, _: 6;
    pub event_pos_reached, _: 7;
    pub velocity_reached, _: 8;
    pub position_reached, _: 9;
    pub vzero, _: 10;
    pub second_move, _: 12;
    pub status_sg, _: 13;
}

macro_rules! impl_raw_access {
    ($($T:ident),*) => {
        $(
            impl $T {
                /// The raw register value.
                #[must_use]
                pub const fn bits(&self) -> u32 {
                    self.0
                }

                /// Wraps a raw register value read back from the chip.
                #[must_use]
                pub const fn from_bits(bits: u32) -> Self {
                    Self(bits)
                }
            }
        )*
    };
}

impl_raw_access!(GCONF, GSTAT, SHORT_CONF, IHOLD_IRUN, CHOPCONF, PWMCONF, RAMP_STAT);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_address_sets_msb() {
        assert_eq!(Address::XTARGET.write_address(), 0xAD);
        assert_eq!(Address::GCONF.write_address(), 0x80);
    }

    #[test]
    fn test_gconf_bit_positions() {
        let mut g = GCONF(0);
        g.set_en_pwm_mode(true);
        assert_eq!(g.0, 0b100);
        g.set_direct_mode(true);
        assert_eq!(g.0, 0b1_0000_0000_0000_0100);
    }

    #[test]
    fn test_short_conf_reset_levels() {
        let s = SHORT_CONF::default();
        assert_eq!(s.s2vs_level(), 6);
        assert_eq!(s.s2g_level(), 6);
        assert_eq!(s.shortfilter(), 1);
    }

    #[test]
    fn test_chopconf_packing() {
        let mut c = CHOPCONF(0);
        c.set_toff(3);
        c.set_tbl(2);
        assert_eq!(c.0, (2 << 15) | 3);
        c.set_diss2vs(true);
        assert!(c.0 & 0x8000_0000 != 0);
    }

    #[test]
    fn test_ihold_irun_packing() {
        let mut r = IHOLD_IRUN(0);
        r.set_irun(31);
        r.set_ihold(16);
        r.set_ihold_delay(1);
        assert_eq!(r.0, (1 << 16) | (31 << 8) | 16);
    }

    #[test]
    fn test_ramp_stat_position_reached_bit() {
        let s = RAMP_STAT(1 << 9);
        assert!(s.position_reached());
        assert!(!s.velocity_reached());
    }
}
