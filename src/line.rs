//! Console line assembly with single-entry history recall.

const ESC: u8 = 0x1B;
const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;

/// Progress through a `ESC [ A` cursor-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeState {
    #[default]
    None,
    EscSeen,
    BracketSeen,
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord<const C: usize> {
    /// Upper-cased first token.
    pub verb: heapless::String<C>,
    /// Remainder after the first space with trailing spaces trimmed, `None` when blank.
    pub argument: Option<heapless::String<C>>,
}

impl<const C: usize> CommandRecord<C> {
    /// Split a finished line at its first space.
    pub fn parse(line: &[u8]) -> Self {
        let (verb, rest) = match line.iter().position(|&b| b == b' ') {
            Some(split) => (&line[..split], Some(&line[split + 1..])),
            None => (line, None),
        };

        let mut verb = to_text::<C>(verb);
        verb.make_ascii_uppercase();

        let argument = rest
            .map(|rest| {
                let end = rest.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
                &rest[..end]
            })
            .filter(|rest| !rest.is_empty())
            .map(to_text::<C>);

        CommandRecord { verb, argument }
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

/// Bytes outside ASCII are shown as `?`.
fn to_text<const C: usize>(bytes: &[u8]) -> heapless::String<C> {
    let mut text = heapless::String::new();
    for &byte in bytes {
        let ch = if byte.is_ascii() { byte as char } else { '?' };
        if text.push(ch).is_err() {
            break;
        }
    }
    text
}

/// Builds command lines for one console port.
///
/// A line holds at most `C - 1` bytes; further bytes are dropped until CR or LF.
#[derive(Debug, Default)]
pub struct LineAssembler<const C: usize> {
    line: heapless::Vec<u8, C>,
    last: heapless::Vec<u8, C>,
    escape: EscapeState,
}

impl<const C: usize> LineAssembler<C> {
    pub const fn new() -> Self {
        Self {
            line: heapless::Vec::new(),
            last: heapless::Vec::new(),
            escape: EscapeState::None,
        }
    }

    /// Feed one received byte, returning a record when it completes a non-empty line.
    pub fn feed(&mut self, byte: u8) -> Option<CommandRecord<C>> {
        match (self.escape, byte) {
            (_, ESC) => {
                self.escape = EscapeState::EscSeen;
                return None;
            }
            (EscapeState::EscSeen, b'[') => {
                self.escape = EscapeState::BracketSeen;
                return None;
            }
            (EscapeState::BracketSeen, b'A') => {
                self.escape = EscapeState::None;
                if !self.last.is_empty() {
                    self.line.clone_from(&self.last);
                }
                return None;
            }
            _ => self.escape = EscapeState::None,
        }

        match byte {
            b'\r' | b'\n' => self.submit(),
            BACKSPACE | DELETE => {
                self.line.pop();
                None
            }
            _ => {
                if self.line.len() < C - 1 {
                    // Cannot fail below C - 1.
                    let _ = self.line.push(byte);
                }
                None
            }
        }
    }

    fn submit(&mut self) -> Option<CommandRecord<C>> {
        if self.line.is_empty() {
            return None;
        }
        self.last.clone_from(&self.line);
        let record = CommandRecord::parse(&self.line);
        self.line.clear();
        Some(record)
    }

    /// The line being typed.
    pub fn pending(&self) -> &[u8] {
        &self.line
    }

    /// The most recently submitted line.
    pub fn last_command(&self) -> &[u8] {
        &self.last
    }

    pub fn escape_state(&self) -> EscapeState {
        self.escape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Assembler = LineAssembler<32>;

    fn feed_all(assembler: &mut Assembler, bytes: &[u8]) -> Vec<CommandRecord<32>> {
        bytes.iter().filter_map(|&b| assembler.feed(b)).collect()
    }

    #[test]
    fn parses_verb_and_argument() {
        let mut assembler = Assembler::new();
        let records = feed_all(&mut assembler, b"led1 On  \r");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verb.as_str(), "LED1");
        assert_eq!(records[0].argument(), Some("On"));
    }

    #[test]
    fn blank_argument_is_none() {
        let record = CommandRecord::<32>::parse(b"STATUS    ");
        assert_eq!(record.verb.as_str(), "STATUS");
        assert_eq!(record.argument(), None);

        let record = CommandRecord::<32>::parse(b"help");
        assert_eq!(record.verb.as_str(), "HELP");
        assert_eq!(record.argument(), None);
    }

    #[test]
    fn argument_keeps_inner_spaces() {
        let record = CommandRecord::<32>::parse(b"i2c_reg_set 1 42");
        assert_eq!(record.verb.as_str(), "I2C_REG_SET");
        assert_eq!(record.argument(), Some("1 42"));
    }

    #[test]
    fn empty_lines_do_not_dispatch() {
        let mut assembler = Assembler::new();
        assert!(feed_all(&mut assembler, b"\r\n\r\n").is_empty());
        assert!(assembler.last_command().is_empty());
    }

    #[test]
    fn crlf_yields_one_record() {
        let mut assembler = Assembler::new();
        let records = feed_all(&mut assembler, b"VERS\r\n");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn history_recall_replays_last_command() {
        let mut assembler = Assembler::new();
        let first = feed_all(&mut assembler, b"LED1 ON\r");
        assert_eq!(assembler.last_command(), b"LED1 ON");

        let second = feed_all(&mut assembler, b"\x1b[A\r");
        assert_eq!(first, second);
        assert_eq!(second[0].argument(), Some("ON"));
    }

    #[test]
    fn recall_without_history_is_ignored() {
        let mut assembler = Assembler::new();
        assert!(feed_all(&mut assembler, b"\x1b[A").is_empty());
        assert!(assembler.pending().is_empty());
        assert_eq!(assembler.escape_state(), EscapeState::None);
    }

    #[test]
    fn recalled_line_can_be_extended() {
        let mut assembler = Assembler::new();
        feed_all(&mut assembler, b"COM0 hi\r");
        let records = feed_all(&mut assembler, b"\x1b[A!\r");
        assert_eq!(records[0].argument(), Some("hi!"));
    }

    #[test]
    fn lone_escape_is_swallowed() {
        let mut assembler = Assembler::new();
        let records = feed_all(&mut assembler, b"VE\x1bRS\r");
        assert_eq!(records[0].verb.as_str(), "VERS");
        assert_eq!(assembler.escape_state(), EscapeState::None);
    }

    #[test]
    fn broken_sequence_keeps_following_byte() {
        let mut assembler = Assembler::new();
        let records = feed_all(&mut assembler, b"\x1b[BX\r");
        assert_eq!(records[0].verb.as_str(), "BX");
    }

    #[test]
    fn other_arrows_are_not_recall() {
        let mut assembler = Assembler::new();
        feed_all(&mut assembler, b"VERS\r");
        feed_all(&mut assembler, b"\x1b[B");
        assert_eq!(assembler.pending(), b"B");
    }

    #[test]
    fn overflow_truncates_line() {
        let mut assembler = Assembler::new();
        let mut input = [b'X'; 40];
        input[39] = b'\r';
        let records = feed_all(&mut assembler, &input);
        assert_eq!(records[0].verb.len(), 31);
    }

    #[test]
    fn backspace_edits_line() {
        let mut assembler = Assembler::new();
        let records = feed_all(&mut assembler, b"VERX\x08S\r");
        assert_eq!(records[0].verb.as_str(), "VERS");

        // Nothing to erase.
        let records = feed_all(&mut assembler, b"\x7f\x7fHELP\r");
        assert_eq!(records[0].verb.as_str(), "HELP");
    }

    #[test]
    fn non_ascii_bytes_are_masked() {
        let record = CommandRecord::<32>::parse(&[b'A', 0xC3, b'B']);
        assert_eq!(record.verb.as_str(), "A?B");
    }
}
