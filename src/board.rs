//! The hardware the engine talks to, gathered behind one trait.

use crate::{
    analog::AnalogReader,
    error::LinkError,
    gpio::DiscreteIo,
    i2c_slave::SlaveRegisters,
    port::{Link, PortId},
    rs485::Rs485Link,
};

/// Everything a console command may reach.
///
/// The engine owns no hardware; a board implementation hands out its
/// collaborators one call at a time.
pub trait Board {
    fn analog(&mut self) -> &mut dyn AnalogReader;

    fn io(&mut self) -> &mut dyn DiscreteIo;

    fn i2c_slave(&mut self) -> &mut dyn SlaveRegisters;

    /// Outbound side of a port, `None` when the port has no local transmitter.
    fn link(&mut self, port: PortId) -> Option<&mut dyn Link>;

    fn rs485(&mut self) -> Option<&mut dyn Rs485Link>;

    /// Re-initialise a UART at a new rate.
    fn set_baud(&mut self, port: PortId, baud: u32) -> Result<(), LinkError>;
}
