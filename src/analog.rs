//! Analog rail monitoring.
//!
//! Each channel's divider network is described by a [`Scaling`] that turns the
//! averaged 12-bit conversion into millivolts.

use core::fmt::Write;

use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{EnumCount as EnumCountMacro, EnumIter};

use crate::error::AnalogError;

/// Conversions averaged per reading.
pub const OVERSAMPLING: u32 = 3;

/// Divider scaling for the 12V/24V rails.
pub const RAIL_SCALING: Scaling = Scaling::new(25150, 3785);
/// Divider scaling for the 3.3V and 5V rails.
pub const LOGIC_SCALING: Scaling = Scaling::new(250, 157);

/// Sampled channels, in ADC sequence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumCountMacro)]
pub enum AnalogChannel {
    InvJ2,
    MainJ2,
    Inverter,
    Volt3v3,
    Volt5v,
}

impl AnalogChannel {
    pub fn label(self) -> &'static str {
        match self {
            AnalogChannel::InvJ2 => "INV_12V_J2",
            AnalogChannel::MainJ2 => "MAIN_5V_J2",
            AnalogChannel::Inverter => "INV_12V",
            AnalogChannel::Volt3v3 => "3V3_PERI",
            AnalogChannel::Volt5v => "VOLT5V0",
        }
    }

    pub fn scaling(self) -> Scaling {
        match self {
            AnalogChannel::InvJ2 | AnalogChannel::MainJ2 | AnalogChannel::Inverter => {
                RAIL_SCALING
            }
            AnalogChannel::Volt3v3 | AnalogChannel::Volt5v => LOGIC_SCALING,
        }
    }

    /// Order used by the text dumps.
    pub const DUMP_ORDER: [AnalogChannel; AnalogChannel::COUNT] = [
        AnalogChannel::Inverter,
        AnalogChannel::Volt3v3,
        AnalogChannel::Volt5v,
        AnalogChannel::InvJ2,
        AnalogChannel::MainJ2,
    ];
}

/// Ratio applied to a raw conversion: `mv = raw * multiplier / divisor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaling {
    pub multiplier: u32,
    pub divisor: u32,
}

impl Default for Scaling {
    /// No scaling.
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl Scaling {
    pub const fn new(multiplier: u32, divisor: u32) -> Self {
        Self {
            multiplier,
            divisor,
        }
    }

    /// Convert an averaged conversion to millivolts.
    #[inline]
    pub const fn raw_to_mv(&self, raw: u16) -> u32 {
        raw as u32 * self.multiplier / self.divisor
    }
}

/// One-shot conversions, supplied by the board's ADC driver.
pub trait AdcSampler {
    fn sample(&mut self, channel: AnalogChannel) -> Result<u16, AnalogError>;
}

/// The analog readings the console relies on.
pub trait AnalogReader {
    /// Take fresh readings of every channel.
    fn refresh(&mut self) -> Result<(), AnalogError>;
    fn raw(&self, channel: AnalogChannel) -> u16;
    fn millivolts(&self, channel: AnalogChannel) -> u32;

    fn write_raw(&self, out: &mut dyn Write) {
        let _ = writeln!(out, "Raw ADC Values\n------------------------------");
        for channel in AnalogChannel::DUMP_ORDER {
            let _ = writeln!(out, "Raw {:<12} = {}", channel.label(), self.raw(channel));
        }
    }

    fn write_scaled(&self, out: &mut dyn Write) {
        let _ = writeln!(out, "Calculated ADC Values\n------------------------------");
        for channel in AnalogChannel::DUMP_ORDER {
            let _ = writeln!(
                out,
                "{:<12} = {} mV",
                channel.label(),
                self.millivolts(channel)
            );
        }
    }
}

/// Averaged readings of every channel.
pub struct AnalogBank<S: AdcSampler> {
    sampler: S,
    raw: [u16; AnalogChannel::COUNT],
}

impl<S: AdcSampler> AnalogBank<S> {
    pub fn new(sampler: S) -> Self {
        Self {
            sampler,
            raw: [0; AnalogChannel::COUNT],
        }
    }

    fn average(&mut self, channel: AnalogChannel) -> Result<u16, AnalogError> {
        let mut total = 0u32;
        for _ in 0..OVERSAMPLING {
            total += self.sampler.sample(channel)? as u32;
        }
        Ok((total / OVERSAMPLING) as u16)
    }

    pub fn sampler(&mut self) -> &mut S {
        &mut self.sampler
    }
}

impl<S: AdcSampler> AnalogReader for AnalogBank<S> {
    /// Readings are only replaced once every channel converted.
    fn refresh(&mut self) -> Result<(), AnalogError> {
        let mut fresh = [0u16; AnalogChannel::COUNT];
        for channel in AnalogChannel::iter() {
            fresh[channel as usize] = self.average(channel)?;
        }
        self.raw = fresh;
        Ok(())
    }

    fn raw(&self, channel: AnalogChannel) -> u16 {
        self.raw[channel as usize]
    }

    fn millivolts(&self, channel: AnalogChannel) -> u32 {
        channel.scaling().raw_to_mv(self.raw(channel))
    }
}
