//! Test doubles standing in for the tester's peripherals.

use embedded_hal::i2c::{self, Operation};
use strum::EnumCount;

use crate::{
    analog::{AdcSampler, AnalogBank, AnalogChannel, AnalogReader},
    board::Board,
    error::{AnalogError, LinkError, SlaveError},
    gpio::{BoardInput, BoardIo, DiscreteIo, NativeOutput, NativePins},
    i2c_slave::{RegisterBlock, SlaveListener, SlaveRegisters},
    pca9534::{PCA9534_ADDRESS, Pca9534},
    port::{Link, PortId, UartLink},
    rs485::{HalfDuplex, Rs485Link},
};

/// Emulates the transmit side of a serial port.
pub struct MockSerial {
    /// Everything written so far.
    write_buffer: heapless::Vec<u8, 4096>,
    /// Fail every write and flush.
    should_error_on_write: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum MockSerialError {
    /// Simulated buffer overflow
    #[error("mock buffer overflow")]
    BufferOverflow,
    /// Generic simulated error
    #[error("simulated serial error")]
    SimulatedError,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            should_error_on_write: false,
        }
    }

    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    pub fn clear_written_data(&mut self) {
        self.write_buffer.clear();
    }

    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }
}

/// Output pin recording every level it was driven to.
#[derive(Debug, Default)]
pub struct MockPin {
    history: Vec<bool>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.history.last().copied().unwrap_or(false)
    }

    pub fn history(&self) -> &[bool] {
        &self.history
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.history.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.history.push(true);
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MockBusError {
    #[error("no acknowledge")]
    NoAcknowledge,
    #[error("simulated bus error")]
    SimulatedError,
}

impl i2c::Error for MockBusError {
    fn kind(&self) -> i2c::ErrorKind {
        match self {
            MockBusError::NoAcknowledge => {
                i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)
            }
            MockBusError::SimulatedError => i2c::ErrorKind::Other,
        }
    }
}

/// An I2C bus with one PCA9534 on it.
pub struct MockExpanderBus {
    address: u8,
    /// Input, output, polarity, config. Power-on values.
    registers: [u8; 4],
    pointer: usize,
    should_error: bool,
}

impl MockExpanderBus {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0x00, 0xFF, 0x00, 0xFF],
            pointer: 0,
            should_error: false,
        }
    }

    pub fn set_error(&mut self, should_error: bool) {
        self.should_error = should_error;
    }
}

impl i2c::ErrorType for MockExpanderBus {
    type Error = MockBusError;
}

impl i2c::I2c for MockExpanderBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.should_error {
            return Err(MockBusError::SimulatedError);
        }
        if address != self.address {
            return Err(MockBusError::NoAcknowledge);
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if let Some((pointer, data)) = bytes.split_first() {
                        self.pointer = (*pointer & 0x03) as usize;
                        for byte in data {
                            // The input port is read-only.
                            if self.pointer != 0 {
                                self.registers[self.pointer] = *byte;
                            }
                        }
                    }
                }
                Operation::Read(buffer) => {
                    buffer.fill(self.registers[self.pointer]);
                }
            }
        }
        Ok(())
    }
}

/// MCU GPIO kept in plain arrays.
#[derive(Debug, Default)]
pub struct MockPins {
    outputs: [bool; 16],
    inputs: [bool; 16],
}

impl MockPins {
    pub fn set_input(&mut self, pin: BoardInput, high: bool) {
        self.inputs[pin as usize] = high;
    }
}

impl NativePins for MockPins {
    fn set_output(&mut self, pin: NativeOutput, high: bool) {
        self.outputs[pin as usize] = high;
    }

    fn output(&mut self, pin: NativeOutput) -> bool {
        self.outputs[pin as usize]
    }

    fn input(&mut self, pin: BoardInput) -> bool {
        self.inputs[pin as usize]
    }
}

/// Fixed or cycling conversion results per channel.
#[derive(Debug, Default)]
pub struct MockSampler {
    values: [u16; AnalogChannel::COUNT],
    sequences: [Vec<u16>; AnalogChannel::COUNT],
    cursor: usize,
    failing: [bool; AnalogChannel::COUNT],
}

impl MockSampler {
    pub fn set(&mut self, channel: AnalogChannel, value: u16) {
        self.values[channel as usize] = value;
        self.sequences[channel as usize].clear();
    }

    pub fn set_sequence(&mut self, channel: AnalogChannel, values: &[u16]) {
        self.sequences[channel as usize] = values.to_vec();
    }

    pub fn fail(&mut self, channel: AnalogChannel) {
        self.failing[channel as usize] = true;
    }
}

impl AdcSampler for MockSampler {
    fn sample(&mut self, channel: AnalogChannel) -> Result<u16, AnalogError> {
        if self.failing[channel as usize] {
            return Err(AnalogError::Timeout);
        }
        let sequence = &self.sequences[channel as usize];
        if sequence.is_empty() {
            return Ok(self.values[channel as usize]);
        }
        let value = sequence[self.cursor % sequence.len()];
        self.cursor += 1;
        Ok(value)
    }
}

/// Records every address the slave was armed with.
#[derive(Debug, Default)]
pub struct MockListener {
    addresses: Vec<u8>,
    should_error: bool,
}

impl MockListener {
    pub fn addresses(&self) -> &[u8] {
        &self.addresses
    }

    pub fn set_error(&mut self, should_error: bool) {
        self.should_error = should_error;
    }
}

impl SlaveListener for MockListener {
    fn listen(&mut self, address: u8) -> Result<(), SlaveError> {
        if self.should_error {
            return Err(SlaveError::Listener);
        }
        self.addresses.push(address);
        Ok(())
    }
}

/// Discrete I/O over mocks, expander at its power-on pattern.
pub fn board_io() -> BoardIo<MockPins, MockExpanderBus> {
    let expander = Pca9534::new(MockExpanderBus::new(PCA9534_ADDRESS), PCA9534_ADDRESS);
    let mut io = BoardIo::new(MockPins::default(), expander);
    io.init().unwrap();
    io
}

/// A whole tester built from the real collaborators over mocks.
pub struct MockBoard {
    pub analog: AnalogBank<MockSampler>,
    pub io: BoardIo<MockPins, MockExpanderBus>,
    pub slave: RegisterBlock<MockListener>,
    pub com0: UartLink<MockSerial>,
    pub com1: UartLink<MockSerial>,
    pub com2: UartLink<MockSerial>,
    pub rs485: HalfDuplex<MockSerial, MockPin, MockPin>,
    /// Every accepted baud change.
    pub bauds: Vec<(PortId, u32)>,
    pub refuse_baud: bool,
}

impl MockBoard {
    pub fn new() -> Self {
        let mut sampler = MockSampler::default();
        sampler.set(AnalogChannel::Inverter, 1803);
        sampler.set(AnalogChannel::Volt3v3, 2112);
        let mut analog = AnalogBank::new(sampler);
        analog.refresh().unwrap();

        Self {
            analog,
            io: board_io(),
            slave: RegisterBlock::new(MockListener::default()).unwrap(),
            com0: UartLink::new(MockSerial::new()),
            com1: UartLink::new(MockSerial::new()),
            com2: UartLink::new(MockSerial::new()),
            rs485: HalfDuplex::new(MockSerial::new(), MockPin::new(), MockPin::new()).unwrap(),
            bauds: Vec::new(),
            refuse_baud: false,
        }
    }
}

impl Board for MockBoard {
    fn analog(&mut self) -> &mut dyn AnalogReader {
        &mut self.analog
    }

    fn io(&mut self) -> &mut dyn DiscreteIo {
        &mut self.io
    }

    fn i2c_slave(&mut self) -> &mut dyn SlaveRegisters {
        &mut self.slave
    }

    fn link(&mut self, port: PortId) -> Option<&mut dyn Link> {
        match port {
            PortId::Com0 => Some(&mut self.com0 as &mut dyn Link),
            PortId::Com1 => Some(&mut self.com1 as &mut dyn Link),
            PortId::Com2 => Some(&mut self.com2 as &mut dyn Link),
            PortId::Com485 => Some(&mut self.rs485 as &mut dyn Link),
            PortId::Console | PortId::Com3 => None,
        }
    }

    fn rs485(&mut self) -> Option<&mut dyn Rs485Link> {
        Some(&mut self.rs485 as &mut dyn Rs485Link)
    }

    fn set_baud(&mut self, port: PortId, baud: u32) -> Result<(), LinkError> {
        if self.refuse_baud {
            return Err(LinkError::Reconfigure);
        }
        self.bauds.push((port, baud));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::I2c;
    use embedded_io::Write;

    #[test]
    fn mock_serial_records_writes() {
        let mut serial = MockSerial::new();
        serial.write_all(b"abc").unwrap();
        serial.write_all(b"def").unwrap();
        assert_eq!(serial.written_data(), b"abcdef");
        serial.clear_written_data();
        assert!(serial.written_data().is_empty());
    }

    #[test]
    fn mock_serial_error_injection() {
        let mut serial = MockSerial::new();
        serial.set_write_error(true);
        assert!(matches!(
            serial.write(b"x"),
            Err(MockSerialError::SimulatedError)
        ));
        assert!(serial.flush().is_err());
    }

    #[test]
    fn mock_bus_naks_other_addresses() {
        let mut bus = MockExpanderBus::new(PCA9534_ADDRESS);
        assert!(matches!(
            bus.write(0x20, &[0x01, 0x00]),
            Err(MockBusError::NoAcknowledge)
        ));
        let mut value = [0u8; 1];
        bus.write_read(PCA9534_ADDRESS, &[0x03], &mut value).unwrap();
        assert_eq!(value, [0xFF]);
    }

    #[test]
    fn mock_pin_tracks_level() {
        use embedded_hal::digital::OutputPin;
        let mut pin = MockPin::new();
        assert!(!pin.is_high());
        pin.set_high().unwrap();
        assert!(pin.is_high());
        assert_eq!(pin.history(), &[true]);
    }
}
