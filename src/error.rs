//! Error types for the tester's collaborators and transports.
//!
//! None of these ever leave the poll loop: the command layer turns each one into
//! an `ERROR` reply or a debug line.

use thiserror::Error;

/// Errors raised by the discrete I/O layer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    #[error("Unknown pin name")]
    UnknownPin,
    #[error("Pin is an input")]
    InputOnly,
    #[error("I2C expander error")]
    Expander,
}

/// Errors raised by the I2C slave register block.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveError {
    #[error("Invalid slave address")]
    InvalidAddress,
    #[error("Invalid register address")]
    InvalidRegister,
    #[error("Slave listener error")]
    Listener,
}

/// Errors raised by the analog sampler.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogError {
    #[error("ADC conversion timeout")]
    Timeout,
}

/// Errors raised while driving a serial link.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    #[error("Serial communication error: {0:?}")]
    Serial(embedded_io::ErrorKind),
    #[error("Bus direction pin error")]
    Direction,
    #[error("Port not connected")]
    NotConnected,
    #[error("Baud rate change refused")]
    Reconfigure,
}

impl LinkError {
    /// Wrap any `embedded_io` error, keeping only its kind.
    pub fn serial(err: impl embedded_io::Error) -> Self {
        LinkError::Serial(err.kind())
    }
}

/// Errors raised by the PCA9534 expander driver.
#[derive(Error, Debug)]
pub enum Pca9534Error<E: embedded_hal::i2c::Error> {
    #[error("I2C bus error")]
    Bus(E),
}

impl<E: embedded_hal::i2c::Error> From<Pca9534Error<E>> for IoError {
    fn from(_: Pca9534Error<E>) -> Self {
        IoError::Expander
    }
}
