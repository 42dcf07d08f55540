//! One pin namespace over the MCU's own GPIO and the PCA9534 expander.
//!
//! Pins are addressed by net name. A registered name matches when it is a
//! case-insensitive prefix of the requested one, so `led1` and `LED1_X` both
//! reach `LED1`.

use core::fmt::Write;

use embedded_hal::i2c::I2c;
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, IntoStaticStr};

use crate::{
    error::IoError,
    pca9534::{ExpanderPin, ExpanderPort, Pca9534},
    text::name_matches,
};

/// Outputs driven directly by the MCU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum NativeOutput {
    #[strum(serialize = "SER1_RS232_EN")]
    Ser1Rs232En,
    #[strum(serialize = "SER2_RS232_EN")]
    Ser2Rs232En,
    #[strum(serialize = "RS232_5_OEN")]
    Rs232_5Oen,
    #[strum(serialize = "RS232_5_RTS")]
    Rs232_5Rts,
    #[strum(serialize = "RS485_4_DE")]
    Rs485_4De,
    #[strum(serialize = "RS485_4_REN")]
    Rs485_4Ren,
    #[strum(serialize = "J7_RST")]
    J7Rst,
    #[strum(serialize = "COM2_RSTn")]
    Com2Rstn,
    #[strum(serialize = "5V_VMAIN_PG")]
    V5VmainPg,
    #[strum(serialize = "P105")]
    P105,
    #[strum(serialize = "LED1")]
    Led1,
    #[strum(serialize = "LED2")]
    Led2,
}

impl NativeOutput {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Monitored inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum BoardInput {
    #[strum(serialize = "VIN_VINV_PG")]
    VinVinvPg,
    #[strum(serialize = "VIN_VMAIN_PG")]
    VinVmainPg,
    #[strum(serialize = "V5_VINV_PG")]
    V5VinvPg,
    #[strum(serialize = "V5_VMAIN_PG")]
    V5VmainPg,
    #[strum(serialize = "VIN_INV_IMON")]
    VinInvImon,
    #[strum(serialize = "VIN_MAIN_IMON")]
    VinMainImon,
    #[strum(serialize = "V5_INV_IMON")]
    V5InvImon,
    #[strum(serialize = "V5_MAIN_IMON")]
    V5MainImon,
    #[strum(serialize = "SER1_INVALIDn")]
    Ser1Invalidn,
    #[strum(serialize = "SER2_INVALIDn")]
    Ser2Invalidn,
    #[strum(serialize = "I2C_GPIO_INTn")]
    I2cGpioIntn,
    #[strum(serialize = "P104")]
    P104,
}

impl BoardInput {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn description(self) -> &'static str {
        match self {
            BoardInput::VinVinvPg => "Inverter input power good",
            BoardInput::VinVmainPg => "Main input power good",
            BoardInput::V5VinvPg => "Inverter 5V power good",
            BoardInput::V5VmainPg => "Main 5V power good",
            BoardInput::VinInvImon => "Inverter input current monitor",
            BoardInput::VinMainImon => "Main input current monitor",
            BoardInput::V5InvImon => "Inverter 5V current monitor",
            BoardInput::V5MainImon => "Main 5V current monitor",
            BoardInput::Ser1Invalidn => "SER1 RS232 no valid signal",
            BoardInput::Ser2Invalidn => "SER2 RS232 no valid signal",
            BoardInput::I2cGpioIntn => "PCA9534 interrupt",
            BoardInput::P104 => "Spare input P104",
        }
    }

    pub fn active_high(self) -> bool {
        !matches!(
            self,
            BoardInput::Ser1Invalidn | BoardInput::Ser2Invalidn | BoardInput::I2cGpioIntn
        )
    }
}

/// Access to the MCU's own GPIO, supplied by the board.
pub trait NativePins {
    fn set_output(&mut self, pin: NativeOutput, high: bool);

    /// Level currently latched on an output.
    fn output(&mut self, pin: NativeOutput) -> bool;

    /// Electrical level of an input.
    fn input(&mut self, pin: BoardInput) -> bool;

    fn toggle_output(&mut self, pin: NativeOutput) {
        let level = self.output(pin);
        self.set_output(pin, !level);
    }
}

/// The discrete I/O operations the console relies on.
pub trait DiscreteIo {
    fn set(&mut self, name: &str, high: bool) -> Result<(), IoError>;
    fn toggle(&mut self, name: &str) -> Result<(), IoError>;
    fn output(&mut self, name: &str) -> Result<bool, IoError>;
    /// Whether the input is at its active level.
    fn input_active(&mut self, name: &str) -> Result<bool, IoError>;
    fn write_input(&mut self, name: &str, out: &mut dyn Write) -> Result<(), IoError>;
    fn write_inputs(&mut self, out: &mut dyn Write) -> Result<(), IoError>;
    /// Output levels of every pin.
    fn write_states(&mut self, out: &mut dyn Write) -> Result<(), IoError>;
    /// Name, location, direction and level of every pin.
    fn write_details(&mut self, out: &mut dyn Write) -> Result<(), IoError>;
}

/// Any pin that can be driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLine {
    Native(NativeOutput),
    Expander(ExpanderPin),
}

impl OutputLine {
    pub fn name(self) -> &'static str {
        match self {
            OutputLine::Native(pin) => pin.name(),
            OutputLine::Expander(pin) => pin.name(),
        }
    }

    /// Every output in namespace order.
    pub fn all() -> impl Iterator<Item = OutputLine> {
        NativeOutput::iter()
            .map(OutputLine::Native)
            .chain(ExpanderPin::iter().map(OutputLine::Expander))
    }

    pub fn lookup(name: &str) -> Option<OutputLine> {
        OutputLine::all().find(|line| name_matches(line.name(), name))
    }

    /// Like [`OutputLine::lookup`], telling inputs apart from unknown names.
    pub fn resolve(name: &str) -> Result<OutputLine, IoError> {
        match OutputLine::lookup(name) {
            Some(line) => Ok(line),
            None if lookup_input(name).is_some() => Err(IoError::InputOnly),
            None => Err(IoError::UnknownPin),
        }
    }
}

pub fn lookup_input(name: &str) -> Option<BoardInput> {
    BoardInput::iter().find(|input| name_matches(input.name(), name))
}

fn level(high: bool) -> &'static str {
    if high { "HIGH" } else { "LOW" }
}

/// [`DiscreteIo`] for the tester: native pins plus the PCA9534.
pub struct BoardIo<P: NativePins, I2C: I2c> {
    pins: P,
    expander: Pca9534<I2C>,
}

impl<P: NativePins, I2C: I2c> BoardIo<P, I2C> {
    pub fn new(pins: P, expander: Pca9534<I2C>) -> Self {
        Self { pins, expander }
    }

    /// Bring the expander to its power-on pattern.
    pub fn init(&mut self) -> Result<(), IoError> {
        self.expander.init(ExpanderPort::power_on())?;
        Ok(())
    }

    pub fn pins(&mut self) -> &mut P {
        &mut self.pins
    }

    pub fn expander(&mut self) -> &mut Pca9534<I2C> {
        &mut self.expander
    }

    fn line_level(&mut self, line: OutputLine) -> Result<bool, IoError> {
        match line {
            OutputLine::Native(pin) => Ok(self.pins.output(pin)),
            OutputLine::Expander(pin) => Ok(self.expander.output(pin)?),
        }
    }

    fn input_line(&mut self, input: BoardInput, out: &mut dyn Write) {
        let high = self.pins.input(input);
        let state = if high == input.active_high() {
            "ACTIVE"
        } else {
            "INACTIVE"
        };
        let _ = writeln!(
            out,
            "{:<14} {:<32} {:<8} ({})",
            input.name(),
            input.description(),
            state,
            level(high)
        );
    }
}

impl<P: NativePins, I2C: I2c> DiscreteIo for BoardIo<P, I2C> {
    fn set(&mut self, name: &str, high: bool) -> Result<(), IoError> {
        match OutputLine::resolve(name)? {
            OutputLine::Native(pin) => self.pins.set_output(pin, high),
            OutputLine::Expander(pin) => self.expander.set_output(pin, high)?,
        }
        Ok(())
    }

    fn toggle(&mut self, name: &str) -> Result<(), IoError> {
        match OutputLine::resolve(name)? {
            OutputLine::Native(pin) => self.pins.toggle_output(pin),
            OutputLine::Expander(pin) => self.expander.toggle_output(pin)?,
        }
        Ok(())
    }

    fn output(&mut self, name: &str) -> Result<bool, IoError> {
        let line = OutputLine::resolve(name)?;
        self.line_level(line)
    }

    fn input_active(&mut self, name: &str) -> Result<bool, IoError> {
        let input = lookup_input(name).ok_or(IoError::UnknownPin)?;
        Ok(self.pins.input(input) == input.active_high())
    }

    fn write_input(&mut self, name: &str, out: &mut dyn Write) -> Result<(), IoError> {
        let input = lookup_input(name).ok_or(IoError::UnknownPin)?;
        self.input_line(input, out);
        Ok(())
    }

    fn write_inputs(&mut self, out: &mut dyn Write) -> Result<(), IoError> {
        let _ = writeln!(out, "Input States\n------------------------------");
        for input in BoardInput::iter() {
            self.input_line(input, out);
        }
        Ok(())
    }

    fn write_states(&mut self, out: &mut dyn Write) -> Result<(), IoError> {
        let _ = writeln!(out, "GPIO States\n------------------------------");
        for line in OutputLine::all() {
            let high = self.line_level(line)?;
            let _ = writeln!(out, "{:<14} = {}", line.name(), high as u8);
        }
        Ok(())
    }

    fn write_details(&mut self, out: &mut dyn Write) -> Result<(), IoError> {
        let _ = writeln!(out, "GPIO Details\n------------------------------");
        for line in OutputLine::all() {
            let high = self.line_level(line)?;
            let _ = match line {
                OutputLine::Native(_) => {
                    writeln!(out, "{:<14} MCU       OUT {}", line.name(), level(high))
                }
                OutputLine::Expander(pin) => writeln!(
                    out,
                    "{:<14} PCA9534.{} OUT {}",
                    line.name(),
                    pin as u8,
                    level(high)
                ),
            };
        }
        for input in BoardInput::iter() {
            let high = self.pins.input(input);
            let _ = writeln!(
                out,
                "{:<14} MCU       IN  {} active {} - {}",
                input.name(),
                level(high),
                level(input.active_high()),
                input.description()
            );
        }
        Ok(())
    }
}
