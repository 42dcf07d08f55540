//! Half-duplex RS-485 transport with explicit bus direction control.
//!
//! The transceiver has an active-high driver enable (DE) and an active-low receiver
//! enable (RE#). The controller sits in [`Direction::Receive`] except for the duration
//! of a [`HalfDuplex::transmit`] call. Inbound bytes are framed by silence: a message
//! is complete once the line stays idle for the window the caller polls with.

use embedded_hal::digital::OutputPin;

use crate::{
    config::{Duration, Instant, RS485_BUFFER_SIZE},
    error::LinkError,
    port::{Link, needs_terminator},
};

pub type Rs485Message = heapless::Vec<u8, RS485_BUFFER_SIZE>;

/// Which side currently owns the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Receive,
    Transmit,
}

/// The RS-485 port as seen by the engine.
pub trait Rs485Link: Link {
    /// Queue one received byte.
    fn receive(&mut self, byte: u8, now: Instant);

    /// Take the buffered message once the bus has been idle for longer than `idle`.
    fn poll_idle(&mut self, now: Instant, idle: Duration) -> Option<Rs485Message>;

    fn direction(&self) -> Direction;
}

pub struct HalfDuplex<S, DE, RE>
where
    S: embedded_io::Write,
    DE: OutputPin,
    RE: OutputPin,
{
    interface: S,
    driver_enable: DE,
    /// Active low.
    receiver_enable: RE,
    direction: Direction,
    received: Rs485Message,
    last_receive: Option<Instant>,
}

impl<S, DE, RE> HalfDuplex<S, DE, RE>
where
    S: embedded_io::Write,
    DE: OutputPin,
    RE: OutputPin,
{
    /// Take ownership of the port and its direction pins, leaving the bus in receive.
    pub fn new(interface: S, driver_enable: DE, receiver_enable: RE) -> Result<Self, LinkError> {
        let mut link = Self {
            interface,
            driver_enable,
            receiver_enable,
            direction: Direction::Transmit,
            received: heapless::Vec::new(),
            last_receive: None,
        };
        link.enable_receive()?;
        Ok(link)
    }

    fn enable_transmit(&mut self) -> Result<(), LinkError> {
        self.direction = Direction::Transmit;
        self.driver_enable
            .set_high()
            .map_err(|_| LinkError::Direction)?;
        self.receiver_enable
            .set_high()
            .map_err(|_| LinkError::Direction)
    }

    fn enable_receive(&mut self) -> Result<(), LinkError> {
        let driver = self.driver_enable.set_low();
        let receiver = self.receiver_enable.set_low();
        self.direction = Direction::Receive;
        driver
            .map_err(|_| LinkError::Direction)
            .and(receiver.map_err(|_| LinkError::Direction))
    }

    /// Send `message` and wait until the UART reports it fully shifted out.
    ///
    /// The bus is handed back to the receiver whatever the outcome.
    pub fn transmit(&mut self, message: &[u8]) -> Result<(), LinkError> {
        let sent = self.enable_transmit().and_then(|_| self.write_frame(message));
        let released = self.enable_receive();
        sent.and(released)
    }

    fn write_frame(&mut self, message: &[u8]) -> Result<(), LinkError> {
        self.interface
            .write_all(message)
            .map_err(LinkError::serial)?;
        if needs_terminator(message) {
            self.interface.write_all(b"\r").map_err(LinkError::serial)?;
        }
        // Returns once the transmit-complete condition holds.
        self.interface.flush().map_err(LinkError::serial)
    }

    /// Queue one received byte. Bytes beyond the buffer are dropped and do not count as activity.
    pub fn receive(&mut self, byte: u8, now: Instant) {
        if self.received.push(byte).is_ok() {
            self.last_receive = Some(now);
        }
    }

    /// Flush the pending message once no byte was stored for longer than `idle`.
    pub fn poll_idle(&mut self, now: Instant, idle: Duration) -> Option<Rs485Message> {
        let last = self.last_receive?;
        let silent = now
            .checked_duration_since(last)
            .unwrap_or(Duration::from_ticks(0));
        if silent <= idle {
            return None;
        }
        self.last_receive = None;
        if self.received.is_empty() {
            return None;
        }
        Some(core::mem::take(&mut self.received))
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Bytes received since the last flush.
    pub fn pending(&self) -> &[u8] {
        &self.received
    }

    pub fn interface(&self) -> &S {
        &self.interface
    }

    pub fn release(self) -> (S, DE, RE) {
        (self.interface, self.driver_enable, self.receiver_enable)
    }
}

impl<S, DE, RE> Link for HalfDuplex<S, DE, RE>
where
    S: embedded_io::Write,
    DE: OutputPin,
    RE: OutputPin,
{
    fn transmit(&mut self, message: &[u8]) -> Result<(), LinkError> {
        HalfDuplex::transmit(self, message)
    }
}

impl<S, DE, RE> Rs485Link for HalfDuplex<S, DE, RE>
where
    S: embedded_io::Write,
    DE: OutputPin,
    RE: OutputPin,
{
    fn receive(&mut self, byte: u8, now: Instant) {
        HalfDuplex::receive(self, byte, now)
    }

    fn poll_idle(&mut self, now: Instant, idle: Duration) -> Option<Rs485Message> {
        HalfDuplex::poll_idle(self, now, idle)
    }

    fn direction(&self) -> Direction {
        HalfDuplex::direction(self)
    }
}
