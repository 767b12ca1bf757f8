/// Errors surfaced by the bring-up sequencer and the SPI transport.
///
/// `E` is the bus error of the underlying `embedded-hal` implementation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// A configuration value is outside the range the chip accepts.
    InvalidValue,
    /// A register transaction failed on the bus.
    Comm(E),
    /// The enable line could not be driven.
    Pin,
    /// A bounded position wait ran out of polls before the ramp finished.
    WaitExpired,
}

impl<E> Error<E> {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidValue => "Value out of range",
            Self::Comm(_) => "Register transaction failed",
            Self::Pin => "Enable line failure",
            Self::WaitExpired => "Position wait expired",
        }
    }
}
