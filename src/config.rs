//! Board constants and the runtime configuration of the engine.

use fugit::{MillisDurationU32, TimerInstantU32};
use modular_bitfield::prelude::*;

/// Millisecond tick instant supplied by the board's system timer.
pub type Instant = TimerInstantU32<1000>;
/// Millisecond duration.
pub type Duration = MillisDurationU32;

/// Receive queue size of every UART. Holds `UART_BUFFER_SIZE - 1` bytes.
pub const UART_BUFFER_SIZE: usize = 1024;
/// Command line buffer size of the console. Holds `CMD_BUFFER_SIZE - 1` characters.
pub const CMD_BUFFER_SIZE: usize = 32;
/// Receive buffer of the RS-485 transport.
pub const RS485_BUFFER_SIZE: usize = 64;
/// Longest message a data port relays in one reply.
pub const RELAY_CAPACITY: usize = UART_BUFFER_SIZE - 1;
/// Text buffer used for the multi-line dumps (HELP, STATUS, GPIO tables, ...).
pub const DUMP_CAPACITY: usize = 3072;

pub const SERIAL_BAUD: u32 = 115_200;
pub const SERIAL_BAUD_MAX: u32 = 230_400;
/// Default and maximum rate of the USB bridge (COM3).
pub const USB_BAUD: u32 = 460_800;
/// Rate of the console port.
pub const DEBUG_BAUD: u32 = 921_600;

pub const RS485_IDLE_MS: u32 = 50;
pub const HEARTBEAT_MS: u32 = 100;
/// Number of heartbeats between two ADC refreshes.
pub const ADC_REFRESH_TICKS: u8 = 10;

pub const FIRMWARE_VERSION: &str = "0.93  Build 1823";

/// Runtime switches of the debug lane and its per-subsystem chatter.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugFlags {
    /// Debug lane enabled at all.
    pub lane: bool,
    /// Echo every dispatched command.
    pub cmd: bool,
    pub gpio: bool,
    pub uart: bool,
    pub adc: bool,
    pub i2c: bool,
    #[skip]
    __: B2,
}

impl Default for DebugFlags {
    fn default() -> Self {
        DebugFlags::new()
            .with_lane(true)
            .with_cmd(true)
            .with_gpio(true)
            .with_uart(true)
    }
}

/// Engine configuration. Start from [`EngineConfig::default`] and adjust with the `with_*` methods.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Reported by `VERS` and `STATUS`.
    pub version: &'static str,
    /// Highest baud accepted for the UART backed ports.
    pub serial_baud_max: u32,
    /// Highest baud accepted for the USB bridge.
    pub usb_baud_max: u32,
    /// Silence after which a partial RS-485 message is flushed.
    pub rs485_idle: Duration,
    /// Period of the LED2 heartbeat.
    pub heartbeat: Duration,
    pub adc_refresh_ticks: u8,
    pub debug: DebugFlags,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            version: FIRMWARE_VERSION,
            serial_baud_max: SERIAL_BAUD_MAX,
            usb_baud_max: USB_BAUD,
            rs485_idle: Duration::millis(RS485_IDLE_MS),
            heartbeat: Duration::millis(HEARTBEAT_MS),
            adc_refresh_ticks: ADC_REFRESH_TICKS,
            debug: DebugFlags::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_version(self, version: &'static str) -> Self {
        EngineConfig { version, ..self }
    }

    pub fn with_rs485_idle(self, rs485_idle: Duration) -> Self {
        EngineConfig { rs485_idle, ..self }
    }

    pub fn with_heartbeat(self, heartbeat: Duration) -> Self {
        EngineConfig { heartbeat, ..self }
    }

    /// A value of `0` disables the periodic ADC refresh.
    pub fn with_adc_refresh_ticks(self, adc_refresh_ticks: u8) -> Self {
        EngineConfig {
            adc_refresh_ticks,
            ..self
        }
    }

    pub fn with_debug(self, debug: DebugFlags) -> Self {
        EngineConfig { debug, ..self }
    }
}
