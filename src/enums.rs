/// Ramp generator operating mode (RAMPMODE register).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RampMode {
    /// Move to XTARGET using the full A/D ramp.
    Positioning = 0x00,
    /// Run at VMAX in the positive direction.
    VelocityPositive = 0x01,
    /// Run at VMAX in the negative direction.
    VelocityNegative = 0x02,
    /// Hold the current velocity, ignoring the ramp.
    Hold = 0x03,
}
