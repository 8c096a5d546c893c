//! Input decoding and character-level access for the scanner.

use std::sync::Arc;

use crate::{Mark, ReaderError};

/// Character encoding of a YAML stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// Decoded input with position tracking.
///
/// The whole input is decoded and validated up front, then consumed with
/// k-character lookahead. A NUL sentinel is reported past the end of input,
/// which lets the scanner treat end-of-stream like any other character.
#[derive(Debug, Clone)]
pub struct Reader {
    name: Arc<str>,
    buffer: Vec<char>,
    pointer: usize,
    line: usize,
    column: usize,
    encoding: Encoding,
}

impl Reader {
    /// Decode raw bytes, detecting the encoding from a leading BOM.
    ///
    /// A UTF-16 BOM selects the matching UTF-16 variant; anything else is
    /// treated as UTF-8 (a UTF-8 BOM is stripped).
    pub fn from_bytes(name: impl Into<Arc<str>>, bytes: &[u8]) -> Result<Self, ReaderError> {
        let name = name.into();
        let (encoding, body) = detect_encoding(bytes);
        let text = match encoding {
            Encoding::Utf8 => match std::str::from_utf8(body) {
                Ok(text) => text.to_string(),
                Err(err) => {
                    return Err(ReaderError::new(
                        &name,
                        err.valid_up_to(),
                        None,
                        "invalid UTF-8 byte sequence",
                    ));
                }
            },
            Encoding::Utf16Le => decode_utf16(&name, body, u16::from_le_bytes)?,
            Encoding::Utf16Be => decode_utf16(&name, body, u16::from_be_bytes)?,
        };
        Self::build(name, &text, encoding)
    }

    /// Wrap an already-decoded string.
    pub fn from_str(name: impl Into<Arc<str>>, text: &str) -> Result<Self, ReaderError> {
        Self::build(name.into(), text, Encoding::Utf8)
    }

    fn build(name: Arc<str>, text: &str, encoding: Encoding) -> Result<Self, ReaderError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let buffer: Vec<char> = text.chars().collect();
        for (position, &ch) in buffer.iter().enumerate() {
            if !is_printable(ch) {
                return Err(ReaderError::new(
                    &name,
                    position,
                    Some(ch),
                    "special characters are not allowed",
                ));
            }
        }
        Ok(Self {
            name,
            buffer,
            pointer: 0,
            line: 0,
            column: 0,
            encoding,
        })
    }

    /// The detected encoding of the input.
    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Name of the stream.
    #[inline]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Character offset from the start of the stream.
    #[inline]
    pub fn index(&self) -> usize {
        self.pointer
    }

    /// Current line, 0-based.
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Current column, 0-based.
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Peek at the character `k` positions ahead without consuming.
    /// Past the end of input this reports NUL.
    #[inline]
    pub fn peek(&self, k: usize) -> char {
        self.buffer.get(self.pointer + k).copied().unwrap_or('\0')
    }

    /// The next `k` characters as a string (shorter at end of input).
    pub fn prefix(&self, k: usize) -> String {
        let end = (self.pointer + k).min(self.buffer.len());
        self.buffer[self.pointer..end].iter().collect()
    }

    /// Consume `k` characters, updating line and column.
    pub fn forward(&mut self, k: usize) {
        for _ in 0..k {
            let Some(&ch) = self.buffer.get(self.pointer) else {
                break;
            };
            self.pointer += 1;
            if matches!(ch, '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
                || (ch == '\r' && self.peek(0) != '\n')
            {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }

    /// The current position as a [`Mark`].
    pub fn mark(&self) -> Mark {
        Mark::new(self.name.clone(), self.pointer, self.line, self.column)
    }
}

fn detect_encoding(bytes: &[u8]) -> (Encoding, &[u8]) {
    if bytes.starts_with(&[0xff, 0xfe]) {
        (Encoding::Utf16Le, &bytes[2..])
    } else if bytes.starts_with(&[0xfe, 0xff]) {
        (Encoding::Utf16Be, &bytes[2..])
    } else if bytes.starts_with(&[0xef, 0xbb, 0xbf]) {
        (Encoding::Utf8, &bytes[3..])
    } else {
        (Encoding::Utf8, bytes)
    }
}

fn decode_utf16(
    name: &str,
    bytes: &[u8],
    from_bytes: fn([u8; 2]) -> u16,
) -> Result<String, ReaderError> {
    if bytes.len() % 2 != 0 {
        return Err(ReaderError::new(
            name,
            bytes.len() - 1,
            None,
            "truncated UTF-16 code unit",
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| from_bytes([pair[0], pair[1]]))
        .collect();
    char::decode_utf16(units.iter().copied())
        .collect::<Result<String, _>>()
        .map_err(|err| {
            ReaderError::new(
                name,
                units
                    .iter()
                    .position(|&u| u == err.unpaired_surrogate())
                    .unwrap_or(0),
                char::from_u32(err.unpaired_surrogate() as u32),
                "unpaired UTF-16 surrogate",
            )
        })
}

/// The YAML 1.1 printable set: TAB, line breaks, x20-x7E, NEL, and the
/// non-surrogate planes, minus the BOM character.
fn is_printable(ch: char) -> bool {
    matches!(ch,
        '\t' | '\n' | '\r' | '\u{85}'
        | ' '..='\u{7e}'
        | '\u{a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}')
        && ch != '\u{feff}'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_default() {
        let reader = Reader::from_bytes("t", b"a: 1").unwrap();
        assert_eq!(reader.encoding(), Encoding::Utf8);
        assert_eq!(reader.peek(0), 'a');
        assert_eq!(reader.peek(3), '1');
        assert_eq!(reader.peek(4), '\0');
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let reader = Reader::from_bytes("t", b"\xef\xbb\xbfok").unwrap();
        assert_eq!(reader.prefix(2), "ok");
    }

    #[test]
    fn test_utf16le_bom() {
        let reader = Reader::from_bytes("t", b"\xff\xfea\x00b\x00").unwrap();
        assert_eq!(reader.encoding(), Encoding::Utf16Le);
        assert_eq!(reader.prefix(2), "ab");
    }

    #[test]
    fn test_utf16be_bom() {
        let reader = Reader::from_bytes("t", b"\xfe\xff\x00a\x00b").unwrap();
        assert_eq!(reader.encoding(), Encoding::Utf16Be);
        assert_eq!(reader.prefix(2), "ab");
    }

    #[test]
    fn test_control_character_is_rejected() {
        let err = Reader::from_str("t", "a\x07b").unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.character, Some('\x07'));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let err = Reader::from_bytes("t", b"ab\xffcd").unwrap_err();
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_position_tracking() {
        let mut reader = Reader::from_str("t", "ab\ncd").unwrap();
        reader.forward(3);
        assert_eq!((reader.line(), reader.column()), (1, 0));
        reader.forward(2);
        assert_eq!((reader.line(), reader.column()), (1, 2));
        let mark = reader.mark();
        assert_eq!(mark.index, 5);
    }

    #[test]
    fn test_crlf_counts_one_line() {
        let mut reader = Reader::from_str("t", "a\r\nb").unwrap();
        reader.forward(3);
        assert_eq!((reader.line(), reader.column()), (1, 0));
        assert_eq!(reader.peek(0), 'b');
    }
}
