//! Small text helpers shared by the console handlers.

use core::fmt::Write;

use crate::config::DUMP_CAPACITY;

/// Buffer for multi-line reply bodies. Output past the end is cut off.
pub type Dump = heapless::String<DUMP_CAPACITY>;

/// Format into a fixed-capacity string, truncating on overflow.
pub fn format<const N: usize>(args: core::fmt::Arguments<'_>) -> heapless::String<N> {
    let mut text = heapless::String::new();
    let _ = text.write_fmt(args);
    text
}

/// `registered` is a case-insensitive prefix of `requested`.
pub fn name_matches(registered: &str, requested: &str) -> bool {
    requested
        .as_bytes()
        .get(..registered.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(registered.as_bytes()))
}

/// Parse an unsigned number, decimal or `0x` hex, ignoring leading spaces.
///
/// The whole remainder must be digits; anything else, including overflow, yields `None`.
pub fn parse_number(text: &str) -> Option<u32> {
    let (digits, radix) = split_radix(text)?;
    u32::from_str_radix(digits, radix).ok()
}

/// Like [`parse_number`], but a value too large for `u32` becomes `u32::MAX`.
pub fn parse_number_saturating(text: &str) -> Option<u32> {
    let (digits, radix) = split_radix(text)?;
    Some(digits.bytes().fold(0u32, |value, b| {
        let digit = (b as char).to_digit(radix).unwrap_or(0);
        value.saturating_mul(radix).saturating_add(digit)
    }))
}

fn split_radix(text: &str) -> Option<(&str, u32)> {
    let text = text.trim_start_matches(' ');
    let (digits, radix) = match text.get(..2) {
        Some("0x" | "0X") => (&text[2..], 16),
        _ => (text, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    Some((digits, radix))
}

/// Strip trailing CR/LF bytes.
pub fn trim_line_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |i| i + 1);
    &bytes[..end]
}
