use std::env;
use std::io::{BufRead, BufReader};

use inquire::{Select, Text};
use serialport::SerialPort;
use slcd_tester::command::COMMANDS;
use slcd_tester::config::DEBUG_BAUD;
use slcd_tester::port::{Link, UartLink};

// The tester answers within a few milliseconds; dumps take a little longer to drain.
const SERIAL_TIMEOUT_MS: u64 = 300;
const QUIT: &str = "<quit>";

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

/// Print console lines until the tester goes quiet.
fn print_replies(reader: &mut impl BufRead) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let kind = match line.as_bytes().first() {
                    Some(b'{') => "reply",
                    Some(b'[') => "debug",
                    _ => "     ",
                };
                print!("{kind} | {line}");
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
            Err(e) => {
                eprintln!("Read failed: {e}");
                break;
            }
        }
    }
}

fn main() {
    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select the tester console port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {} @ {} baud", port_name, DEBUG_BAUD);

    let port = serialport::new(&port_name, DEBUG_BAUD)
        .timeout(std::time::Duration::from_millis(SERIAL_TIMEOUT_MS))
        .open()
        .expect("Failed to open serial port");
    let mut reader = BufReader::new(port.try_clone().expect("Failed to clone serial port"));
    let mut console = UartLink::new(PortWrapper(port));

    let mut choices: Vec<&str> = COMMANDS.iter().map(|c| c.usage).collect();
    choices.push(QUIT);

    loop {
        let usage = match Select::new("Command:", choices.clone()).prompt() {
            Ok(QUIT) | Err(_) => break,
            Ok(usage) => usage,
        };
        let verb = usage.split_whitespace().next().unwrap_or(usage);

        let mut line = verb.to_string();
        if usage.contains('<') || usage.contains('[') {
            let argument = Text::new(&format!("{verb} argument:"))
                .with_help_message(usage)
                .prompt()
                .unwrap_or_default();
            if !argument.trim().is_empty() {
                line.push(' ');
                line.push_str(argument.trim());
            }
        }

        if let Err(e) = console.transmit(line.as_bytes()) {
            eprintln!("Send failed: {e}");
            continue;
        }
        print_replies(&mut reader);
    }
}
