//! The poll loop: drains every receive queue, runs console commands, relays data
//! ports and keeps the heartbeat going.

use crate::{
    board::Board,
    command::{self, Dispatch, Session},
    config::{CMD_BUFFER_SIZE, EngineConfig, Instant, RELAY_CAPACITY, UART_BUFFER_SIZE},
    line::LineAssembler,
    port::{PortId, PortSettings},
    relay::DataRelay,
    reply::Lanes,
    ring_buffer::RingBuffer,
    text::trim_line_end,
};

/// Data ports relayed with CR/LF framing. COM485 is framed by idle time instead.
pub const RELAYED_PORTS: [PortId; 3] = [PortId::Com0, PortId::Com1, PortId::Com2];

/// Receive queues of every port with a local UART.
///
/// Meant to live in a `static` so each UART interrupt can push into its queue.
pub struct RxQueues<const N: usize = UART_BUFFER_SIZE> {
    console: RingBuffer<N>,
    com0: RingBuffer<N>,
    com1: RingBuffer<N>,
    com485: RingBuffer<N>,
    com2: RingBuffer<N>,
}

impl<const N: usize> Default for RxQueues<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RxQueues<N> {
    pub const fn new() -> Self {
        Self {
            console: RingBuffer::new(),
            com0: RingBuffer::new(),
            com1: RingBuffer::new(),
            com485: RingBuffer::new(),
            com2: RingBuffer::new(),
        }
    }

    /// `None` for ports without a receiver.
    pub fn queue(&self, port: PortId) -> Option<&RingBuffer<N>> {
        match port {
            PortId::Console => Some(&self.console),
            PortId::Com0 => Some(&self.com0),
            PortId::Com1 => Some(&self.com1),
            PortId::Com485 => Some(&self.com485),
            PortId::Com2 => Some(&self.com2),
            PortId::Com3 => None,
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    settings: PortSettings,
    console: LineAssembler<CMD_BUFFER_SIZE>,
    relays: [DataRelay<RELAY_CAPACITY>; RELAYED_PORTS.len()],
    last_heartbeat: Option<Instant>,
    heartbeats: u8,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            settings: PortSettings::default(),
            console: LineAssembler::new(),
            relays: core::array::from_fn(|_| DataRelay::new()),
            last_heartbeat: None,
            heartbeats: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn settings(&self) -> &PortSettings {
        &self.settings
    }

    /// Put the transceiver in its configured mode and announce the boot.
    pub fn start(&mut self, board: &mut dyn Board, lanes: &mut dyn Lanes) {
        if let Err(err) = self.settings.serial_mode.apply(board.io()) {
            warn!("Serial mode not applied: {}", err);
        }
        info!("Tester is up, firmware {}", self.config.version);
        if self.config.debug.lane() {
            lanes.debug("Tester is up", self.config.version);
        }
    }

    /// One pass of the main loop.
    pub fn poll<const N: usize>(
        &mut self,
        queues: &RxQueues<N>,
        board: &mut dyn Board,
        lanes: &mut dyn Lanes,
        now: Instant,
    ) {
        while let Some(byte) = queues.console.pop() {
            self.feed_console(byte, board, lanes);
        }
        self.relay_data_ports(queues, lanes);
        self.relay_rs485(&queues.com485, board, lanes, now);
        self.housekeeping(board, lanes, now);
    }

    /// Feed one console byte, dispatching the line it completes.
    pub fn feed_console(
        &mut self,
        byte: u8,
        board: &mut dyn Board,
        lanes: &mut dyn Lanes,
    ) -> Option<Dispatch> {
        let record = self.console.feed(byte)?;
        let mut session = Session {
            board,
            lanes,
            settings: &mut self.settings,
            config: &self.config,
        };
        Some(command::dispatch(&record, &mut session))
    }

    fn relay_data_ports<const N: usize>(&mut self, queues: &RxQueues<N>, lanes: &mut dyn Lanes) {
        for (port, relay) in RELAYED_PORTS.iter().zip(self.relays.iter_mut()) {
            let Some(queue) = queues.queue(*port) else {
                continue;
            };
            while let Some(byte) = queue.pop() {
                if let Some(message) = relay.feed(byte) {
                    lanes.reply_bytes(port.label(), message);
                }
            }
        }
    }

    fn relay_rs485<const N: usize>(
        &mut self,
        queue: &RingBuffer<N>,
        board: &mut dyn Board,
        lanes: &mut dyn Lanes,
        now: Instant,
    ) {
        let Some(link) = board.rs485() else {
            queue.drain(|_| {});
            return;
        };
        queue.drain(|byte| link.receive(byte, now));

        if let Some(message) = link.poll_idle(now, self.config.rs485_idle) {
            debug!("RS485 received {} bytes", message.len());
            let body = trim_line_end(&message);
            if !body.is_empty() {
                lanes.reply_bytes(PortId::Com485.label(), body);
            }
        }
    }

    /// LED2 heartbeat and the periodic ADC refresh.
    pub fn housekeeping(&mut self, board: &mut dyn Board, lanes: &mut dyn Lanes, now: Instant) {
        let Some(last) = self.last_heartbeat else {
            self.last_heartbeat = Some(now);
            return;
        };
        let due = now
            .checked_duration_since(last)
            .is_some_and(|elapsed| elapsed >= self.config.heartbeat);
        if !due {
            return;
        }
        self.last_heartbeat = Some(now);

        if let Err(err) = board.io().toggle("LED2") {
            warn!("Heartbeat failed: {}", err);
        }

        if self.config.adc_refresh_ticks == 0 {
            return;
        }
        self.heartbeats += 1;
        if self.heartbeats >= self.config.adc_refresh_ticks {
            self.heartbeats = 0;
            if let Err(err) = board.analog().refresh() {
                warn!("ADC refresh failed: {}", err);
                if self.config.debug.lane() && self.config.debug.adc() {
                    lanes.debug("ADC", "Refresh failed");
                }
            }
        }
    }
}
