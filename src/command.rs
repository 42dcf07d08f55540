//! Console verbs and their dispatch.
//!
//! [`COMMANDS`] is scanned in order and the first entry whose name is a
//! case-insensitive prefix of the verb runs. Specific verbs are registered
//! before the shorter ones they extend (`ADC_RAW` before `ADC`, `INPUT_ALL`
//! before `INPUT`); field tools rely on this precedence.

use core::fmt::Write;

use strum::IntoEnumIterator;

use crate::{
    analog::AnalogChannel,
    board::Board,
    config::EngineConfig,
    error::{LinkError, SlaveError},
    line::CommandRecord,
    port::{PortId, PortSettings, SerialMode},
    reply::Lanes,
    text::{Dump, format, name_matches, parse_number, parse_number_saturating},
};

/// What a handler can reach while it runs.
pub struct Session<'a> {
    pub board: &'a mut dyn Board,
    pub lanes: &'a mut dyn Lanes,
    pub settings: &'a mut PortSettings,
    pub config: &'a EngineConfig,
}

impl Session<'_> {
    fn reply(&mut self, topic: &str, body: &str) {
        self.lanes.reply(topic, body);
    }

    /// Debug lane, muted when `DebugFlags::lane` is off.
    fn debug(&mut self, topic: &str, body: &str) {
        if self.config.debug.lane() {
            self.lanes.debug(topic, body);
        }
    }

    fn gpio_debug(&mut self, topic: &str, body: &str) {
        if self.config.debug.gpio() {
            self.debug(topic, body);
        }
    }

    fn uart_debug(&mut self, topic: &str, body: &str) {
        if self.config.debug.uart() {
            self.debug(topic, body);
        }
    }

    fn i2c_debug(&mut self, topic: &str, body: &str) {
        if self.config.debug.i2c() {
            self.debug(topic, body);
        }
    }
}

pub type Handler = fn(&mut Session<'_>, Option<&str>);

pub struct CommandDescriptor {
    pub name: &'static str,
    pub usage: &'static str,
    pub brief: &'static str,
    pub handler: Handler,
}

/// Outcome of feeding one line to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Blank or control line.
    Ignored,
    Handled(&'static str),
    Unknown,
}

macro_rules! command {
    ($name:literal, $usage:literal, $brief:literal, $handler:expr) => {
        CommandDescriptor {
            name: $name,
            usage: $usage,
            brief: $brief,
            handler: $handler,
        }
    };
}

/// Registration order is significant, see the module docs.
pub static COMMANDS: &[CommandDescriptor] = &[
    command!("VERS", "VERS", "Firmware version", cmd_vers),
    command!("LED1", "LED1 <ON|OFF>", "Drive LED1", |s, a| led(s, "LED1", a)),
    command!("LED2", "LED2 <ON|OFF>", "Drive LED2", |s, a| led(s, "LED2", a)),
    command!("ADC_RAW", "ADC_RAW", "Raw ADC readings", cmd_adc_raw),
    command!("ADC_INVERTER", "ADC_INVERTER", "Inverter 12V rail in mV", |s, _| {
        adc_channel(s, "ADC_INVERTER", AnalogChannel::Inverter)
    }),
    command!("ADC_VOLT3V3", "ADC_VOLT3V3", "3.3V rail in mV", |s, _| {
        adc_channel(s, "ADC_VOLT3V3", AnalogChannel::Volt3v3)
    }),
    command!("ADC_VOLT5V", "ADC_VOLT5V", "5V rail in mV", |s, _| {
        adc_channel(s, "ADC_VOLT5V", AnalogChannel::Volt5v)
    }),
    command!("ADC_INVJ2", "ADC_INVJ2", "Inverter J2 rail in mV", |s, _| {
        adc_channel(s, "ADC_INVJ2", AnalogChannel::InvJ2)
    }),
    command!("ADC_MAIN", "ADC_MAIN", "Main J2 rail in mV", |s, _| {
        adc_channel(s, "ADC_MAIN", AnalogChannel::MainJ2)
    }),
    command!("ADC", "ADC", "All rails in mV", cmd_adc),
    command!("I2C_SLAVE_ADDR", "I2C_SLAVE_ADDR <addr>", "Set own I2C address", cmd_i2c_slave_addr),
    command!("I2C_REG_SET", "I2C_REG_SET <reg> <val>", "Write slave register", cmd_i2c_reg_set),
    command!("I2C_REG_GET", "I2C_REG_GET <reg>", "Read slave register", cmd_i2c_reg_get),
    command!("I2C_STATUS", "I2C_STATUS", "I2C slave status", cmd_i2c_status),
    command!("GPIO_ALL", "GPIO_ALL", "Output levels", cmd_gpio_all),
    command!("GPIODETAILS", "GPIODETAILS", "Pin table", cmd_gpio_details),
    command!("TOGGLE", "TOGGLE <pin>", "Invert an output", |s, a| drive(s, "TOGGLE", a, None)),
    command!("SET", "SET <pin>", "Drive an output high", |s, a| drive(s, "SET", a, Some(true))),
    command!("CLR", "CLR <pin>", "Drive an output low", |s, a| drive(s, "CLR", a, Some(false))),
    command!("READ", "READ <pin>", "Input active?", cmd_read),
    command!("INPUT_ALL", "INPUT_ALL", "Input table", cmd_input_all),
    command!("INPUT", "INPUT <pin>", "One input", cmd_input),
    command!("COM0", "COM0 <msg>", "Send on COM0", |s, a| send(s, PortId::Com0, a)),
    command!("COM1", "COM1 <msg>", "Send on COM1", |s, a| send(s, PortId::Com1, a)),
    command!("COM485", "COM485 <msg>", "Send on RS-485", |s, a| send(s, PortId::Com485, a)),
    command!("COM2", "COM2 <msg>", "Send on COM2", |s, a| send(s, PortId::Com2, a)),
    command!("COM3", "COM3 <msg>", "Send on COM3", |s, a| send(s, PortId::Com3, a)),
    command!("BAUD0", "BAUD0 [rate]", "COM0 baud", |s, a| baud(s, PortId::Com0, a)),
    command!("BAUD1", "BAUD1 [rate]", "COM1 baud", |s, a| baud(s, PortId::Com1, a)),
    command!("BAUD2", "BAUD2 [rate]", "COM2 baud", |s, a| baud(s, PortId::Com2, a)),
    command!("BAUD485", "BAUD485 [rate]", "RS-485 baud", |s, a| baud(s, PortId::Com485, a)),
    command!("BAUD3", "BAUD3 [rate]", "COM3 baud", |s, a| baud(s, PortId::Com3, a)),
    command!("SERCFG", "SERCFG [0|1|2]", "Transceiver 232/485/TTL", cmd_sercfg),
    command!("HELP", "HELP", "This list", cmd_help),
    command!("STATUS", "STATUS", "Board summary", cmd_status),
];

/// First registered command matching `verb`.
pub fn lookup(verb: &str) -> Option<&'static CommandDescriptor> {
    COMMANDS.iter().find(|command| name_matches(command.name, verb))
}

pub fn dispatch<const C: usize>(record: &CommandRecord<C>, session: &mut Session<'_>) -> Dispatch {
    execute(&record.verb, record.argument(), session)
}

/// Run one verb. Lines not starting with a printable command character are ignored.
pub fn execute(verb: &str, argument: Option<&str>, session: &mut Session<'_>) -> Dispatch {
    if !matches!(verb.as_bytes().first(), Some(b'0'..=b'z')) {
        return Dispatch::Ignored;
    }

    if session.config.debug.cmd() {
        session.debug(verb, argument.unwrap_or(""));
    }

    match lookup(verb) {
        Some(command) => {
            trace!("{} -> {}", verb, command.name);
            (command.handler)(session, argument);
            Dispatch::Handled(command.name)
        }
        None => {
            debug!("Unknown command {}", verb);
            session.debug(verb, "Unknown command");
            Dispatch::Unknown
        }
    }
}

fn cmd_vers(s: &mut Session<'_>, _: Option<&str>) {
    let version = s.config.version;
    s.reply("VERS", version);
}

fn led(s: &mut Session<'_>, name: &'static str, argument: Option<&str>) {
    // Leading match only: "ONX" and "10" still switch on.
    let level = match argument.map(str::trim) {
        Some(arg) if name_matches("ON", arg) || arg.starts_with('1') => true,
        Some(arg) if name_matches("OFF", arg) || arg.starts_with('0') => false,
        _ => {
            let usage: heapless::String<32> = format(format_args!("Usage: {} ON|OFF", name));
            s.gpio_debug(name, &usage);
            return;
        }
    };

    match s.board.io().set(name, level) {
        Ok(()) => {
            let state = if level { "ON" } else { "OFF" };
            let body: heapless::String<32> = format(format_args!("{} turned {}", name, state));
            s.gpio_debug(name, &body);
        }
        Err(_) => s.reply(name, "ERROR"),
    }
}

fn adc_channel(s: &mut Session<'_>, topic: &str, channel: AnalogChannel) {
    let millivolts = s.board.analog().millivolts(channel);
    let body: heapless::String<12> = format(format_args!("{}", millivolts));
    s.reply(topic, &body);
}

fn cmd_adc_raw(s: &mut Session<'_>, _: Option<&str>) {
    let mut dump = Dump::new();
    s.board.analog().write_raw(&mut dump);
    s.reply("ADC_RAW", &dump);
}

fn cmd_adc(s: &mut Session<'_>, _: Option<&str>) {
    let mut dump = Dump::new();
    s.board.analog().write_scaled(&mut dump);
    s.reply("ADC", &dump);
}

fn parse_byte(text: &str) -> Option<u8> {
    parse_number(text).and_then(|value| u8::try_from(value).ok())
}

fn register_line(index: u8, value: u8) -> heapless::String<24> {
    format(format_args!("Reg 0x{:02X} = 0x{:02X}", index, value))
}

fn cmd_i2c_slave_addr(s: &mut Session<'_>, argument: Option<&str>) {
    const TOPIC: &str = "I2C_SLAVE_ADDR";
    let Some(argument) = argument else {
        s.reply(TOPIC, "Missing address");
        return;
    };

    let result = parse_byte(argument)
        .ok_or(SlaveError::InvalidAddress)
        .and_then(|address| s.board.i2c_slave().set_address(address).map(|_| address));
    match result {
        Ok(address) => {
            let body: heapless::String<8> = format(format_args!("0x{:02X}", address));
            s.reply(TOPIC, &body);
            let body: heapless::String<32> =
                format(format_args!("Slave address set to 0x{:02X}", address));
            s.i2c_debug(TOPIC, &body);
        }
        Err(err) => {
            debug!("{}: {}", TOPIC, err);
            s.reply(TOPIC, "ERROR");
            s.i2c_debug(TOPIC, &format::<32>(format_args!("{}", err)));
        }
    }
}

fn cmd_i2c_reg_set(s: &mut Session<'_>, argument: Option<&str>) {
    const TOPIC: &str = "I2C_REG_SET";
    let Some(argument) = argument else {
        s.reply(TOPIC, "Missing parameters");
        return;
    };
    let mut words = argument.split_whitespace();
    let Some(index) = words.next() else {
        s.reply(TOPIC, "Missing register address");
        return;
    };
    let Some(value) = words.next() else {
        s.reply(TOPIC, "Missing value");
        return;
    };

    let result = match (parse_byte(index), parse_byte(value)) {
        (Some(index), Some(value)) => s
            .board
            .i2c_slave()
            .set_register(index, value)
            .map(|_| (index, value)),
        _ => Err(SlaveError::InvalidRegister),
    };
    match result {
        Ok((index, value)) => {
            s.reply(TOPIC, &register_line(index, value));
            let body: heapless::String<32> =
                format(format_args!("Register 0x{:02X} set to 0x{:02X}", index, value));
            s.i2c_debug(TOPIC, &body);
        }
        Err(err) => {
            s.reply(TOPIC, "ERROR");
            s.i2c_debug(TOPIC, &format::<32>(format_args!("{}", err)));
        }
    }
}

fn cmd_i2c_reg_get(s: &mut Session<'_>, argument: Option<&str>) {
    const TOPIC: &str = "I2C_REG_GET";
    let Some(argument) = argument else {
        s.reply(TOPIC, "Missing register address");
        return;
    };

    let result = parse_byte(argument)
        .ok_or(SlaveError::InvalidRegister)
        .and_then(|index| s.board.i2c_slave().register(index).map(|value| (index, value)));
    match result {
        Ok((index, value)) => s.reply(TOPIC, &register_line(index, value)),
        Err(err) => {
            s.reply(TOPIC, "ERROR");
            s.i2c_debug(TOPIC, &format::<32>(format_args!("{}", err)));
        }
    }
}

fn cmd_i2c_status(s: &mut Session<'_>, _: Option<&str>) {
    let mut dump = Dump::new();
    s.board.i2c_slave().write_status(&mut dump);
    s.reply("I2C_STATUS", &dump);
}

fn cmd_gpio_all(s: &mut Session<'_>, _: Option<&str>) {
    let mut dump = Dump::new();
    match s.board.io().write_states(&mut dump) {
        Ok(()) => s.reply("GPIO_ALL", &dump),
        Err(_) => s.reply("GPIO_ALL", "ERROR"),
    }
}

fn cmd_gpio_details(s: &mut Session<'_>, _: Option<&str>) {
    let mut dump = Dump::new();
    match s.board.io().write_details(&mut dump) {
        Ok(()) => s.reply("GPIODETAILS", &dump),
        Err(_) => s.reply("GPIODETAILS", "ERROR"),
    }
}

/// `level` of `None` toggles.
fn drive(s: &mut Session<'_>, verb: &str, argument: Option<&str>, level: Option<bool>) {
    let Some(name) = argument else {
        let usage: heapless::String<40> = format(format_args!("Usage: {} <pin_name>", verb));
        s.gpio_debug(verb, &usage);
        return;
    };

    let io = s.board.io();
    let result = match level {
        Some(high) => io.set(name, high),
        None => io.toggle(name),
    };
    s.reply(name, if result.is_ok() { "OK" } else { "ERROR" });
}

fn cmd_read(s: &mut Session<'_>, argument: Option<&str>) {
    let Some(name) = argument else {
        s.gpio_debug("READ", "Usage: READ <pin_name>");
        return;
    };

    match s.board.io().input_active(name) {
        Ok(active) => s.reply(name, if active { "TRUE" } else { "FALSE" }),
        Err(_) => {
            s.reply(name, "ERROR");
            s.gpio_debug("READ", "Error: Unknown input");
        }
    }
}

fn cmd_input_all(s: &mut Session<'_>, _: Option<&str>) {
    let mut dump = Dump::new();
    match s.board.io().write_inputs(&mut dump) {
        Ok(()) => s.reply("INPUT_ALL", &dump),
        Err(_) => s.reply("INPUT_ALL", "ERROR"),
    }
}

fn cmd_input(s: &mut Session<'_>, argument: Option<&str>) {
    let Some(name) = argument else {
        s.gpio_debug("INPUT", "Usage: INPUT <pin_name>");
        return;
    };

    let mut line = heapless::String::<128>::new();
    match s.board.io().write_input(name, &mut line) {
        Ok(()) => s.reply(name, line.trim_end()),
        Err(_) => s.reply(name, "ERROR"),
    }
}

fn send(s: &mut Session<'_>, port: PortId, argument: Option<&str>) {
    let label = port.label();
    let Some(message) = argument else {
        let usage: heapless::String<40> = format(format_args!("Usage: {} <message>", label));
        s.uart_debug(label, &usage);
        return;
    };

    let result = s
        .board
        .link(port)
        .ok_or(LinkError::NotConnected)
        .and_then(|link| link.transmit(message.as_bytes()));
    match result {
        Ok(()) => {
            let body: heapless::String<24> = format(format_args!("Sent to {}", label));
            s.uart_debug(label, &body);
        }
        Err(err) => {
            warn!("{} transmit failed: {}", label, err);
            s.reply(label, "ERROR");
        }
    }
}

fn baud(s: &mut Session<'_>, port: PortId, argument: Option<&str>) {
    let suffix = port.baud_suffix();
    let Some(argument) = argument else {
        let topic: heapless::String<16> = format(format_args!("baud{}", suffix));
        let body: heapless::String<12> = format(format_args!("{}", s.settings.baud(port)));
        s.reply(&topic, &body);
        return;
    };

    let verb: heapless::String<16> = format(format_args!("BAUD{}", suffix));
    // Out-of-range values saturate and are then clamped to the port maximum.
    let requested = parse_number_saturating(argument).unwrap_or(0);
    if requested == 0 {
        s.uart_debug(&verb, "Invalid Baud Rate");
        return;
    }
    let rate = requested.min(port.max_baud(s.config));

    if port.has_uart() {
        if let Err(err) = s.board.set_baud(port, rate) {
            warn!("{} baud change failed: {}", port.label(), err);
            s.reply(&verb, "ERROR");
            return;
        }
        let body: heapless::String<24> = format(format_args!("Baud change {}", port.label()));
        s.reply("CONFIG", &body);
    }
    s.settings.set_baud(port, rate);
    info!("{} baud set to {}", port.label(), rate);

    let topic: heapless::String<16> = format(format_args!("Baud{} changed", suffix));
    let body: heapless::String<12> = format(format_args!("{}", rate));
    s.uart_debug(&topic, &body);
}

fn cmd_sercfg(s: &mut Session<'_>, argument: Option<&str>) {
    if let Some(argument) = argument {
        let mode = match parse_number(argument).and_then(|n| SerialMode::try_from(n).ok()) {
            Some(mode) => mode,
            None => {
                s.uart_debug("SERCFG", "ERROR");
                SerialMode::Rs232
            }
        };
        if mode.apply(s.board.io()).is_err() {
            s.reply("SERCFG", "ERROR");
            return;
        }
        s.settings.serial_mode = mode;
    }

    let body: heapless::String<4> = format(format_args!("{}", s.settings.serial_mode as u8));
    s.uart_debug("Serial Cfg", &body);
}

fn cmd_help(s: &mut Session<'_>, _: Option<&str>) {
    let mut help = Dump::new();
    let _ = writeln!(help, "Commands (first prefix match wins)");
    for command in COMMANDS {
        let _ = writeln!(help, "{:<24} - {}", command.usage, command.brief);
    }
    s.reply("HELP", &help);
}

fn cmd_status(s: &mut Session<'_>, _: Option<&str>) {
    let mut status = Dump::new();
    let _ = writeln!(status, "Version       = {}", s.config.version);

    let io = s.board.io();
    for led in ["LED1", "LED2"] {
        let _ = match io.output(led) {
            Ok(high) => writeln!(status, "{:<13} = {}", led, if high { "ON" } else { "OFF" }),
            Err(_) => writeln!(status, "{:<13} = ERROR", led),
        };
    }

    let mode: &str = s.settings.serial_mode.as_ref();
    let _ = writeln!(status, "Serial Cfg    = {}", mode);
    for port in PortId::iter() {
        let _ = writeln!(status, "{:<13} = {} baud", port.label(), s.settings.baud(port));
    }
    let _ = writeln!(status, "I2C address   = 0x{:02X}", s.board.i2c_slave().address());
    s.board.analog().write_scaled(&mut status);

    s.reply("STATUS", &status);
}
