//! The tester's own I2C slave: two byte registers behind a selectable 7-bit address.
//!
//! A master write of one byte selects the register, a second byte stores into it.
//! A master read returns the selected register.

use core::fmt::Write;

use strum_macros::IntoStaticStr;

use crate::error::SlaveError;

pub const DEFAULT_SLAVE_ADDRESS: u8 = 0x50;
pub const SLAVE_REGISTER_COUNT: usize = 2;
/// Highest valid 7-bit address.
pub const MAX_SLAVE_ADDRESS: u8 = 0x7F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoStaticStr)]
pub enum SlaveState {
    #[default]
    #[strum(serialize = "IDLE")]
    Idle,
    #[strum(serialize = "REG_ADDR")]
    RegAddr,
    #[strum(serialize = "REG_READ")]
    RegRead,
    #[strum(serialize = "REG_WRITE")]
    RegWrite,
}

/// Re-arms the I2C peripheral in slave mode. Supplied by the board.
pub trait SlaveListener {
    fn listen(&mut self, address: u8) -> Result<(), SlaveError>;
}

/// The slave register operations the console relies on.
pub trait SlaveRegisters {
    fn address(&self) -> u8;
    fn set_address(&mut self, address: u8) -> Result<(), SlaveError>;
    fn register(&self, index: u8) -> Result<u8, SlaveError>;
    fn set_register(&mut self, index: u8, value: u8) -> Result<(), SlaveError>;
    fn write_status(&self, out: &mut dyn Write);
}

pub struct RegisterBlock<L: SlaveListener> {
    listener: L,
    address: u8,
    registers: [u8; SLAVE_REGISTER_COUNT],
    selected: u8,
    state: SlaveState,
}

impl<L: SlaveListener> RegisterBlock<L> {
    /// Start listening on [`DEFAULT_SLAVE_ADDRESS`].
    pub fn new(mut listener: L) -> Result<Self, SlaveError> {
        listener.listen(DEFAULT_SLAVE_ADDRESS)?;
        Ok(Self {
            listener,
            address: DEFAULT_SLAVE_ADDRESS,
            registers: [0; SLAVE_REGISTER_COUNT],
            selected: 0,
            state: SlaveState::Idle,
        })
    }

    pub fn state(&self) -> SlaveState {
        self.state
    }

    pub fn selected(&self) -> u8 {
        self.selected
    }

    /// Our address was matched. Returns the byte to send for a master read.
    pub fn on_address_match(&mut self, master_writes: bool) -> Option<u8> {
        if master_writes {
            self.state = SlaveState::RegAddr;
            None
        } else {
            self.state = SlaveState::RegRead;
            Some(self.registers[self.selected as usize])
        }
    }

    /// A byte arrived from the master.
    pub fn on_receive(&mut self, byte: u8) {
        match self.state {
            SlaveState::RegAddr => {
                self.selected = if (byte as usize) < SLAVE_REGISTER_COUNT {
                    byte
                } else {
                    0
                };
                self.state = SlaveState::RegWrite;
            }
            SlaveState::RegWrite => {
                self.registers[self.selected as usize] = byte;
            }
            SlaveState::Idle | SlaveState::RegRead => {}
        }
    }

    /// Stop condition: the transfer is over.
    pub fn on_complete(&mut self) {
        self.state = SlaveState::Idle;
    }

    /// Bus error or NACK: drop the transfer and listen again.
    pub fn on_error(&mut self) -> Result<(), SlaveError> {
        self.state = SlaveState::Idle;
        self.listener.listen(self.address)
    }

    pub fn listener(&mut self) -> &mut L {
        &mut self.listener
    }
}

impl<L: SlaveListener> SlaveRegisters for RegisterBlock<L> {
    fn address(&self) -> u8 {
        self.address
    }

    fn set_address(&mut self, address: u8) -> Result<(), SlaveError> {
        if address > MAX_SLAVE_ADDRESS {
            return Err(SlaveError::InvalidAddress);
        }
        self.listener.listen(address)?;
        self.address = address;
        self.state = SlaveState::Idle;
        Ok(())
    }

    fn register(&self, index: u8) -> Result<u8, SlaveError> {
        self.registers
            .get(index as usize)
            .copied()
            .ok_or(SlaveError::InvalidRegister)
    }

    fn set_register(&mut self, index: u8, value: u8) -> Result<(), SlaveError> {
        let slot = self
            .registers
            .get_mut(index as usize)
            .ok_or(SlaveError::InvalidRegister)?;
        *slot = value;
        Ok(())
    }

    fn write_status(&self, out: &mut dyn Write) {
        let state: &'static str = self.state.into();
        let _ = writeln!(out, "I2C Slave Status\n------------------------------");
        let _ = writeln!(out, "Address       = 0x{:02X}", self.address);
        for (index, value) in self.registers.iter().enumerate() {
            let _ = writeln!(out, "Register {}    = 0x{:02X}", index, value);
        }
        let _ = writeln!(out, "Current state = {}", state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockListener;

    fn block() -> RegisterBlock<MockListener> {
        RegisterBlock::new(MockListener::default()).unwrap()
    }

    #[test]
    fn starts_on_default_address() {
        let mut block = block();
        assert_eq!(block.address(), 0x50);
        assert_eq!(block.listener().addresses(), &[0x50]);
    }

    #[test]
    fn address_must_be_seven_bit() {
        let mut block = block();
        assert_eq!(block.set_address(0x80), Err(SlaveError::InvalidAddress));
        assert_eq!(block.address(), 0x50);
        block.set_address(0x7F).unwrap();
        assert_eq!(block.address(), 0x7F);
        assert_eq!(block.listener().addresses(), &[0x50, 0x7F]);
    }

    #[test]
    fn listener_failure_keeps_old_address() {
        let mut block = block();
        block.listener().set_error(true);
        assert_eq!(block.set_address(0x20), Err(SlaveError::Listener));
        assert_eq!(block.address(), 0x50);
    }

    #[test]
    fn register_bounds() {
        let mut block = block();
        block.set_register(1, 0xAB).unwrap();
        assert_eq!(block.register(1), Ok(0xAB));
        assert_eq!(block.register(2), Err(SlaveError::InvalidRegister));
        assert_eq!(block.set_register(2, 0), Err(SlaveError::InvalidRegister));
    }

    #[test]
    fn master_write_then_read() {
        let mut block = block();
        assert_eq!(block.on_address_match(true), None);
        assert_eq!(block.state(), SlaveState::RegAddr);
        block.on_receive(1);
        assert_eq!(block.state(), SlaveState::RegWrite);
        block.on_receive(0x42);
        block.on_complete();
        assert_eq!(block.state(), SlaveState::Idle);
        assert_eq!(block.register(1), Ok(0x42));

        assert_eq!(block.on_address_match(false), Some(0x42));
        assert_eq!(block.state(), SlaveState::RegRead);
    }

    #[test]
    fn invalid_register_selects_zero() {
        let mut block = block();
        block.on_address_match(true);
        block.on_receive(9);
        assert_eq!(block.selected(), 0);
    }

    #[test]
    fn status_dump() {
        let mut block = block();
        block.set_register(0, 0x12).unwrap();
        block.on_address_match(true);
        let mut status = heapless::String::<256>::new();
        block.write_status(&mut status);
        assert!(status.contains("Address       = 0x50"));
        assert!(status.contains("Register 0    = 0x12"));
        assert!(status.contains("Current state = REG_ADDR"));
    }
}
