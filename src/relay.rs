//! Pass-through framing for the plain data ports.

/// Collects one data port's bytes into CR/LF terminated messages.
///
/// NUL bytes are discarded, empty lines produce nothing, and bytes past
/// `N` are dropped until the next terminator.
#[derive(Debug, Default)]
pub struct DataRelay<const N: usize> {
    message: heapless::Vec<u8, N>,
    flushed: bool,
}

impl<const N: usize> DataRelay<N> {
    pub const fn new() -> Self {
        Self {
            message: heapless::Vec::new(),
            flushed: false,
        }
    }

    /// Feed one byte. Returns the finished message when `byte` terminates it.
    ///
    /// The returned slice stays valid until the next call.
    pub fn feed(&mut self, byte: u8) -> Option<&[u8]> {
        if self.flushed {
            self.message.clear();
            self.flushed = false;
        }

        match byte {
            0 => None,
            b'\r' | b'\n' if self.message.is_empty() => None,
            b'\r' | b'\n' => {
                self.flushed = true;
                Some(self.message.as_slice())
            }
            _ => {
                // Full buffers drop silently.
                let _ = self.message.push(byte);
                None
            }
        }
    }

    /// Bytes collected for the message in progress.
    pub fn pending(&self) -> &[u8] {
        if self.flushed { &[] } else { self.message.as_slice() }
    }
}
