//! Serial port identities, their settings and the outbound link abstraction.

use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{AsRefStr, EnumCount as EnumCountMacro, EnumIter, IntoStaticStr};

use crate::{
    config::{DEBUG_BAUD, EngineConfig, SERIAL_BAUD, USB_BAUD},
    error::{IoError, LinkError},
    gpio::DiscreteIo,
};

/// Every serial port on the tester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumCountMacro, IntoStaticStr)]
pub enum PortId {
    /// Command port (USART2).
    #[strum(serialize = "CONSOLE")]
    Console,
    /// USART1.
    #[strum(serialize = "COM0")]
    Com0,
    /// USART3.
    #[strum(serialize = "COM1")]
    Com1,
    /// USART4, half-duplex RS-485.
    #[strum(serialize = "COM485")]
    Com485,
    /// USART5.
    #[strum(serialize = "COM2")]
    Com2,
    /// USB bridge. Has no local UART.
    #[strum(serialize = "COM3")]
    Com3,
}

impl PortId {
    pub fn label(self) -> &'static str {
        self.into()
    }

    /// Suffix used by the `BAUDn` verbs.
    pub fn baud_suffix(self) -> &'static str {
        match self {
            PortId::Console => "",
            PortId::Com0 => "0",
            PortId::Com1 => "1",
            PortId::Com485 => "485",
            PortId::Com2 => "2",
            PortId::Com3 => "3",
        }
    }

    pub fn default_baud(self) -> u32 {
        match self {
            PortId::Console => DEBUG_BAUD,
            PortId::Com3 => USB_BAUD,
            _ => SERIAL_BAUD,
        }
    }

    pub fn max_baud(self, config: &EngineConfig) -> u32 {
        match self {
            PortId::Com3 => config.usb_baud_max,
            _ => config.serial_baud_max,
        }
    }

    /// Whether a UART on the tester itself backs this port.
    pub fn has_uart(self) -> bool {
        !matches!(self, PortId::Com3)
    }
}

/// Electrical mode of the configurable transceiver (`SERCFG`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, AsRefStr)]
#[repr(u8)]
pub enum SerialMode {
    #[default]
    #[strum(serialize = "RS232")]
    Rs232 = 0,
    #[strum(serialize = "RS485")]
    Rs485 = 1,
    #[strum(serialize = "TTL")]
    Ttl = 2,
}

impl TryFrom<u32> for SerialMode {
    type Error = ();
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        SerialMode::iter().find(|mode| *mode as u32 == value).ok_or(())
    }
}

impl SerialMode {
    /// Drive the transceiver control lines for this mode.
    pub fn apply(self, io: &mut dyn DiscreteIo) -> Result<(), IoError> {
        // (RS232_5_OEN, SER2_RS232_EN, RS485_4_DE, RS485_4_REN)
        // OEN and REN are active low; DE stays low outside a RS-485 transmit.
        let (oen, en, de, ren) = match self {
            SerialMode::Rs232 => (true, true, false, true),
            SerialMode::Rs485 => (true, true, false, false),
            SerialMode::Ttl => (false, false, false, true),
        };
        io.set("RS232_5_OEN", oen)?;
        io.set("SER2_RS232_EN", en)?;
        io.set("RS485_4_DE", de)?;
        io.set("RS485_4_REN", ren)
    }
}

/// Current baud of every port and the transceiver mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    bauds: [u32; PortId::COUNT],
    pub serial_mode: SerialMode,
}

impl Default for PortSettings {
    fn default() -> Self {
        let mut bauds = [0; PortId::COUNT];
        for port in PortId::iter() {
            bauds[port as usize] = port.default_baud();
        }
        Self {
            bauds,
            serial_mode: SerialMode::default(),
        }
    }
}

impl PortSettings {
    pub fn baud(&self, port: PortId) -> u32 {
        self.bauds[port as usize]
    }

    pub fn set_baud(&mut self, port: PortId, baud: u32) {
        self.bauds[port as usize] = baud;
    }
}

/// Outbound side of a serial port.
pub trait Link {
    /// Send `message`, terminated with CR unless it already ends in CR or LF.
    fn transmit(&mut self, message: &[u8]) -> Result<(), LinkError>;
}

pub(crate) fn needs_terminator(message: &[u8]) -> bool {
    !matches!(message.last(), Some(b'\r' | b'\n'))
}

/// A plain full-duplex UART used as a [`Link`].
pub struct UartLink<S: embedded_io::Write> {
    interface: S,
}

impl<S: embedded_io::Write> UartLink<S> {
    pub fn new(interface: S) -> Self {
        Self { interface }
    }

    pub fn interface(&self) -> &S {
        &self.interface
    }
}

impl<S: embedded_io::Write> Link for UartLink<S> {
    fn transmit(&mut self, message: &[u8]) -> Result<(), LinkError> {
        self.interface
            .write_all(message)
            .map_err(LinkError::serial)?;
        if needs_terminator(message) {
            self.interface.write_all(b"\r").map_err(LinkError::serial)?;
        }
        self.interface.flush().map_err(LinkError::serial)
    }
}
