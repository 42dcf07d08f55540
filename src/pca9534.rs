//! Driver for the PCA9534 8-bit I2C port expander carrying the tester's power switches.

use embedded_hal::i2c::I2c;
use modular_bitfield::prelude::*;
use strum_macros::{EnumIter, IntoStaticStr};

use crate::error::Pca9534Error;

/// 7-bit bus address with A2..A0 tied low.
pub const PCA9534_ADDRESS: u8 = 0x38;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// __R__ - Input port levels.
    Input = 0x00,
    /// __R/W__ - Output port latch.
    Output = 0x01,
    /// __R/W__ - Input polarity inversion.
    Polarity = 0x02,
    /// __R/W__ - Pin direction, `1` = input.
    Config = 0x03,
}

impl From<Register> for u8 {
    fn from(value: Register) -> Self {
        value as u8
    }
}

/// Expander pins by their board net name. The discriminant is the port bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[repr(u8)]
pub enum ExpanderPin {
    #[strum(serialize = "BLON")]
    Blon = 0,
    #[strum(serialize = "BRITE")]
    Brite = 1,
    #[strum(serialize = "ERG_PWM")]
    ErgPwm = 2,
    #[strum(serialize = "PWM_EXT")]
    PwmExt = 3,
    #[strum(serialize = "VIN_INV_EN")]
    VinInvEn = 4,
    #[strum(serialize = "VIN_MAIN_EN")]
    VinMainEn = 5,
    #[strum(serialize = "V5_INV_EN")]
    V5InvEn = 6,
    #[strum(serialize = "V5_MAIN_EN")]
    V5MainEn = 7,
}

impl ExpanderPin {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// The output port as named fields.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpanderPort {
    pub blon: bool,
    pub brite: bool,
    pub erg_pwm: bool,
    pub pwm_ext: bool,
    pub vin_inv_en: bool,
    pub vin_main_en: bool,
    pub v5_inv_en: bool,
    pub v5_main_en: bool,
}

impl ExpanderPort {
    /// Levels driven right after reset: backlight dimmed, inverter input enabled.
    pub fn power_on() -> Self {
        ExpanderPort::new()
            .with_brite(true)
            .with_erg_pwm(true)
            .with_pwm_ext(true)
            .with_vin_inv_en(true)
    }

    pub fn bits(self) -> u8 {
        self.into_bytes()[0]
    }
}

pub struct Pca9534<I2C: I2c> {
    bus: I2C,
    address: u8,
}

impl<I2C: I2c> Pca9534<I2C> {
    pub fn new(bus: I2C, address: u8) -> Self {
        Self { bus, address }
    }

    /// Drive `port` and make every pin an output.
    pub fn init(&mut self, port: ExpanderPort) -> Result<(), Pca9534Error<I2C::Error>> {
        self.write_register(Register::Output, port.bits())?;
        self.write_register(Register::Polarity, 0x00)?;
        self.write_register(Register::Config, 0x00)
    }

    pub fn read_register(&mut self, register: Register) -> Result<u8, Pca9534Error<I2C::Error>> {
        let mut value = [0u8; 1];
        self.bus
            .write_read(self.address, &[register.into()], &mut value)
            .map_err(Pca9534Error::Bus)?;
        Ok(value[0])
    }

    pub fn write_register(
        &mut self,
        register: Register,
        value: u8,
    ) -> Result<(), Pca9534Error<I2C::Error>> {
        self.bus
            .write(self.address, &[register.into(), value])
            .map_err(Pca9534Error::Bus)
    }

    /// Return the output latch.
    pub fn outputs(&mut self) -> Result<ExpanderPort, Pca9534Error<I2C::Error>> {
        let bits = self.read_register(Register::Output)?;
        Ok(ExpanderPort::from_bytes([bits]))
    }

    pub fn output(&mut self, pin: ExpanderPin) -> Result<bool, Pca9534Error<I2C::Error>> {
        Ok(self.read_register(Register::Output)? & pin.mask() != 0)
    }

    /// Read-modify-write of a single output bit.
    pub fn set_output(
        &mut self,
        pin: ExpanderPin,
        high: bool,
    ) -> Result<(), Pca9534Error<I2C::Error>> {
        let latch = self.read_register(Register::Output)?;
        let latch = if high {
            latch | pin.mask()
        } else {
            latch & !pin.mask()
        };
        self.write_register(Register::Output, latch)
    }

    pub fn toggle_output(&mut self, pin: ExpanderPin) -> Result<(), Pca9534Error<I2C::Error>> {
        let latch = self.read_register(Register::Output)?;
        self.write_register(Register::Output, latch ^ pin.mask())
    }

    pub fn release(self) -> I2C {
        self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExpanderBus;

    fn expander() -> Pca9534<MockExpanderBus> {
        Pca9534::new(MockExpanderBus::new(PCA9534_ADDRESS), PCA9534_ADDRESS)
    }

    #[test]
    fn power_on_pattern() {
        assert_eq!(ExpanderPort::power_on().bits(), 0b0001_1110);
    }

    #[test]
    fn init_configures_outputs() {
        let mut expander = expander();
        expander.init(ExpanderPort::power_on()).unwrap();
        assert_eq!(expander.read_register(Register::Config).unwrap(), 0x00);
        let outputs = expander.outputs().unwrap();
        assert!(outputs.brite());
        assert!(outputs.vin_inv_en());
        assert!(!outputs.blon());
    }

    #[test]
    fn set_output_preserves_other_bits() {
        let mut expander = expander();
        expander.init(ExpanderPort::power_on()).unwrap();
        expander.set_output(ExpanderPin::V5MainEn, true).unwrap();
        expander.set_output(ExpanderPin::Brite, false).unwrap();
        assert_eq!(
            expander.read_register(Register::Output).unwrap(),
            0b1001_1100
        );
    }

    #[test]
    fn toggle_twice_restores() {
        let mut expander = expander();
        expander.init(ExpanderPort::power_on()).unwrap();
        let before = expander.read_register(Register::Output).unwrap();
        expander.toggle_output(ExpanderPin::Blon).unwrap();
        assert!(expander.output(ExpanderPin::Blon).unwrap());
        expander.toggle_output(ExpanderPin::Blon).unwrap();
        assert_eq!(expander.read_register(Register::Output).unwrap(), before);
    }

    #[test]
    fn bus_errors_surface() {
        let mut bus = MockExpanderBus::new(PCA9534_ADDRESS);
        bus.set_error(true);
        let mut expander = Pca9534::new(bus, PCA9534_ADDRESS);
        assert!(matches!(
            expander.read_register(Register::Input),
            Err(Pca9534Error::Bus(_))
        ));
    }
}
