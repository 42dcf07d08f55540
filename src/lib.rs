//! Serial command and transport engine for the SLCD power-supply tester board.
//!
//! The tester watches the analog rails of an inverter/power-supply unit, drives its
//! enable lines, and talks over several serial links:
//! * a console port carrying line-oriented commands (`VERB [ARGUMENT]`),
//! * three plain data ports whose lines are relayed back to the console,
//! * a half-duplex RS-485 port with explicit bus direction control,
//! * a USB bridge (COM3) that only has settings on the tester side.
//!
//! UART interrupts push bytes into [`engine::RxQueues`]; the main loop calls
//! [`engine::Engine::poll`], which assembles console lines, dispatches them through
//! [`command::COMMANDS`] and writes the results on the two console lanes:
//! * replies: `{"TOPIC" : "BODY"}`
//! * debug lines: `["TOPIC" : "BODY"]`
//!
//! It supports `no-std` environments by use of the `no-std` feature flag. Nothing
//! allocates; every buffer has a fixed capacity.
//!
//! The console ports should be configured like so:
//! * Console baud rate: 921600
//! * COM0/COM1/COM2/RS-485 default baud rate: 115200
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None

#![cfg_attr(feature = "no-std", no_std)]

#[macro_use]
mod log;

pub mod analog;
pub mod board;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod gpio;
pub mod i2c_slave;
pub mod line;
pub mod pca9534;
pub mod port;
pub mod relay;
pub mod reply;
pub mod ring_buffer;
pub mod rs485;
pub mod text;

#[cfg(test)]
mod mock;
