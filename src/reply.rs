//! The two output lanes of the console: machine replies and human debug lines.
//!
//! Reply: `{"TOPIC" : "BODY"}\n`. Debug: `["TOPIC" : "BODY"]\n`.

/// Where handlers send their results.
pub trait Lanes {
    fn reply_bytes(&mut self, topic: &str, body: &[u8]);

    fn reply(&mut self, topic: &str, body: &str) {
        self.reply_bytes(topic, body.as_bytes());
    }

    /// Which debug lines get here is decided by the caller's `DebugFlags`.
    fn debug(&mut self, topic: &str, body: &str);
}

/// [`Lanes`] written onto a single serial port.
pub struct ReplySink<W: embedded_io::Write> {
    writer: W,
}

impl<W: embedded_io::Write> ReplySink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, open: &[u8], topic: &str, body: &[u8], close: &[u8]) {
        let result = [open, topic.as_bytes(), &b"\" : \""[..], body, close]
            .iter()
            .try_for_each(|part| self.writer.write_all(part));
        if let Err(err) = result {
            warn!("Lost console line {}: {:?}", topic, embedded_io::Error::kind(&err));
        }
    }
}

impl<W: embedded_io::Write> Lanes for ReplySink<W> {
    fn reply_bytes(&mut self, topic: &str, body: &[u8]) {
        self.emit(b"{\"", topic, body, b"\"}\n");
    }

    fn debug(&mut self, topic: &str, body: &str) {
        self.emit(b"[\"", topic, body.as_bytes(), b"\"]\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSerial;

    #[test]
    fn reply_framing() {
        let mut sink = ReplySink::new(MockSerial::new());
        sink.reply("COM0", "hello");
        assert_eq!(sink.writer().written_data(), b"{\"COM0\" : \"hello\"}\n");
    }

    #[test]
    fn debug_framing() {
        let mut sink = ReplySink::new(MockSerial::new());
        sink.debug("Version", "0.93");
        assert_eq!(sink.writer().written_data(), b"[\"Version\" : \"0.93\"]\n");
    }

    #[test]
    fn lines_follow_each_other() {
        let mut sink = ReplySink::new(MockSerial::new());
        sink.debug("LED1", "LED1 turned ON");
        sink.reply("LED1", "OK");
        assert_eq!(
            sink.writer().written_data(),
            b"[\"LED1\" : \"LED1 turned ON\"]\n{\"LED1\" : \"OK\"}\n"
        );
        sink.writer_mut().clear_written_data();
        assert!(sink.into_inner().written_data().is_empty());
    }

    #[test]
    fn write_failure_is_swallowed() {
        let mut serial = MockSerial::new();
        serial.set_write_error(true);
        let mut sink = ReplySink::new(serial);
        sink.reply("VERS", "x");
        assert!(sink.writer().written_data().is_empty());
    }
}
