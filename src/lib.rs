//! A `no_std` bring-up crate for the **TMC5160** stepper driver.
//!
//! The crate covers the power-on path of a TMC5160 wired for SPI control:
//! global configuration, current scaling, short-circuit protection, chopper
//! timing, the positioning ramp, and a fault clear before the power stage is
//! enabled. On top of that sits a demonstration run loop that shuttles the
//! motor between two absolute targets using the chip's internal ramp
//! generator.
//!
//! [`driver::Tmc5160`] speaks the 5-byte SPI datagram protocol through any
//! `embedded-hal` [`SpiDevice`](embedded_hal::spi::SpiDevice). The register
//! setters are gathered behind the [`Driver`] trait so the sequencing logic
//! can be exercised against a fake in tests.

#![no_std]

pub mod config;
pub mod driver;
pub mod enums;
mod errors;
pub mod registers;
pub mod sequencer;

pub use config::{ChopperTiming, DriveConfig, DriveSetup, MotionProfile, MotorProfile};
pub use driver::{Driver, Tmc5160};
pub use enums::RampMode;
pub use errors::Error;
pub use sequencer::{BringupSequencer, PollLimit, ShuttleTargets};

/// Maximum value of the 4-bit TOFF chopper field.
pub const MAX_OFF_TIME: u8 = 0x0F;
/// Maximum value of the 2-bit TBL blanking selector.
pub const MAX_BLANKING_TIME: u8 = 0x03;
/// Maximum value of the 2-bit PWM_FREQ divider selector.
pub const MAX_PWM_FREQUENCY: u8 = 0x03;
/// Maximum short-circuit detector sensitivity level.
pub const MAX_SHORT_LEVEL: u8 = 0x0F;

/// GSTAT write mask covering reset, driver error and charge-pump undervoltage.
pub const CLEAR_ALL_FAULTS: u32 = 0b111;
/// How long the power stage is held off before faults are cleared, in ms.
pub const FAULT_SETTLE_MS: u32 = 1000;

/// Short detector level used by the base configuration (chip reset value).
pub const SHORT_SENSE_LEVEL: u8 = 6;
/// Hold current as a fraction of run current during bring-up.
pub const HOLD_CURRENT_SCALE: f32 = 1.0;

/// Outbound target of the demonstration shuttle, in microsteps.
pub const SHUTTLE_OUTBOUND: i32 = 250_000;
/// Return target of the demonstration shuttle.
pub const SHUTTLE_HOME: i32 = 0;
