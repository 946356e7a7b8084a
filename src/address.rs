//! Textual memory addresses.
//!
//! An address is an area mnemonic followed by a word number and an optional
//! bit number in dot notation:
//!
//! | Text | Mnemonic | Word | Bit |
//! |------|----------|------|-----|
//! | `D100` | `D` | 100 | - |
//! | `H82.1` | `H` | 82 | 1 |
//! | ` cio 12 ` | `CIO` | 12 | - |
//! | `E0_200` | `E0_` | 200 | - |
//!
//! Concatenated bit references such as `H8201` are not accepted: without
//! knowing the element width of the area they are ambiguous.
//!
//! # Example
//!
//! ```
//! use fins_engine::MemoryAddress;
//!
//! let addr: MemoryAddress = "H82.1".parse().unwrap();
//! assert_eq!(addr.mnemonic(), "H");
//! assert_eq!(addr.main(), 82);
//! assert_eq!(addr.sub(), Some(1));
//!
//! assert!("H82.16".parse::<MemoryAddress>().is_err());
//! assert!("WXYZ1".parse::<MemoryAddress>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{FinsError, Result};

/// Width of the NUL padded mnemonic buffer.
pub const MNEMONIC_LEN: usize = 4;

/// Highest bit number within a word.
pub const MAX_BIT: u8 = 15;

/// A parsed memory reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryAddress {
    name: [u8; MNEMONIC_LEN],
    main: u32,
    sub: Option<u8>,
}

impl MemoryAddress {
    /// Builds an address from its parts.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidAddress` if the mnemonic is empty, longer
    /// than three characters or not ASCII, or if `sub` is above 15.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::MemoryAddress;
    ///
    /// let addr = MemoryAddress::new("dm", 100, None).unwrap();
    /// assert_eq!(addr.to_string(), "DM100");
    /// ```
    pub fn new(mnemonic: &str, main: u32, sub: Option<u8>) -> Result<Self> {
        let text = || format!("{mnemonic}{main}");
        if mnemonic.is_empty() || mnemonic.len() >= MNEMONIC_LEN || !mnemonic.is_ascii() {
            return Err(FinsError::invalid_address(
                text(),
                "mnemonic must be one to three ASCII characters",
            ));
        }
        if sub.is_some_and(|bit| bit > MAX_BIT) {
            return Err(FinsError::invalid_address(text(), "bit number above 15"));
        }

        let mut name = [0u8; MNEMONIC_LEN];
        for (slot, byte) in name.iter_mut().zip(mnemonic.bytes()) {
            *slot = byte.to_ascii_uppercase();
        }
        Ok(Self { name, main, sub })
    }

    /// The uppercase area mnemonic without padding.
    pub fn mnemonic(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(MNEMONIC_LEN);
        // only ASCII is ever stored
        std::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    /// The NUL padded mnemonic bytes.
    pub fn mnemonic_bytes(&self) -> [u8; MNEMONIC_LEN] {
        self.name
    }

    /// Main (word) address.
    pub fn main(&self) -> u32 {
        self.main
    }

    /// Bit number, if the text used dot notation.
    pub fn sub(&self) -> Option<u8> {
        self.sub
    }

    /// Bit number for the wire, 0 when no bit was given.
    pub fn bit(&self) -> u8 {
        self.sub.unwrap_or(0)
    }
}

impl fmt::Display for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.mnemonic(), self.main)?;
        if let Some(bit) = self.sub {
            write!(f, ".{bit}")?;
        }
        Ok(())
    }
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Reads a run of decimal digits. `None` on overflow.
fn read_decimal(bytes: &[u8], mut pos: usize) -> Option<(u32, usize)> {
    let mut value = 0u32;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        value = value
            .checked_mul(10)?
            .checked_add(u32::from(bytes[pos] - b'0'))?;
        pos += 1;
    }
    Some((value, pos))
}

impl FromStr for MemoryAddress {
    type Err = FinsError;

    fn from_str(text: &str) -> Result<Self> {
        let invalid = |reason: &str| FinsError::invalid_address(text, reason);
        let bytes = text.as_bytes();

        let mut pos = skip_whitespace(bytes, 0);
        let mut name = [0u8; MNEMONIC_LEN];
        let mut len = 0;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            if len == MNEMONIC_LEN - 1 {
                return Err(invalid("mnemonic longer than three letters"));
            }
            name[len] = bytes[pos].to_ascii_uppercase();
            len += 1;
            pos += 1;
        }

        // Extended memory banks are named E0_ through EC_
        if name[0] == b'E' {
            if len == 1
                && bytes.get(pos).is_some_and(u8::is_ascii_digit)
                && bytes.get(pos + 1) == Some(&b'_')
            {
                name[1] = bytes[pos];
                name[2] = b'_';
                len = 3;
                pos += 2;
            } else if len == 2 && name[1].is_ascii_hexdigit() && bytes.get(pos) == Some(&b'_') {
                name[2] = b'_';
                len = 3;
                pos += 1;
            }
        }

        if len == 0 {
            return Err(invalid("missing area mnemonic"));
        }

        pos = skip_whitespace(bytes, pos);
        if !bytes.get(pos).is_some_and(u8::is_ascii_digit) {
            return Err(invalid("expected a word number"));
        }
        let (main, next) = read_decimal(bytes, pos).ok_or_else(|| invalid("word number too large"))?;
        pos = next;

        let mut sub = None;
        if bytes.get(pos) == Some(&b'.') {
            pos += 1;
            if !bytes.get(pos).is_some_and(u8::is_ascii_digit) {
                return Err(invalid("expected a bit number after '.'"));
            }
            let (bit, next) = read_decimal(bytes, pos).unwrap_or((u32::MAX, bytes.len()));
            if bit > u32::from(MAX_BIT) {
                return Err(invalid("bit number above 15"));
            }
            sub = Some(bit as u8);
            pos = next;
        }

        pos = skip_whitespace(bytes, pos);
        if pos != bytes.len() {
            return Err(invalid("unexpected trailing characters"));
        }

        Ok(Self { name, main, sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<MemoryAddress> {
        text.parse()
    }

    #[test]
    fn test_parse_word_address() {
        let addr = parse("D100").unwrap();
        assert_eq!(addr.mnemonic(), "D");
        assert_eq!(addr.mnemonic_bytes(), [b'D', 0, 0, 0]);
        assert_eq!(addr.main(), 100);
        assert_eq!(addr.sub(), None);
        assert_eq!(addr.bit(), 0);
    }

    #[test]
    fn test_parse_bit_address() {
        let addr = parse("H82.1").unwrap();
        assert_eq!(addr.mnemonic(), "H");
        assert_eq!(addr.main(), 82);
        assert_eq!(addr.sub(), Some(1));
    }

    #[test]
    fn test_parse_bit_above_15_rejected() {
        assert!(parse("H82.16").is_err());
        assert!(parse("H82.99999999999").is_err());
        assert_eq!(parse("H82.15").unwrap().sub(), Some(15));
        assert_eq!(parse("H82.015").unwrap().sub(), Some(15));
    }

    #[test]
    fn test_parse_three_letter_mnemonic() {
        let addr = parse("XYZ100").unwrap();
        assert_eq!(addr.mnemonic(), "XYZ");
        assert_eq!(addr.main(), 100);
    }

    #[test]
    fn test_parse_fourth_letter_rejected() {
        assert!(parse("WXYZ1").is_err());
    }

    #[test]
    fn test_parse_case_and_whitespace() {
        let addr = parse("  cio  12  ").unwrap();
        assert_eq!(addr.mnemonic(), "CIO");
        assert_eq!(addr.main(), 12);
    }

    #[test]
    fn test_parse_extended_bank() {
        let addr = parse("E0_200").unwrap();
        assert_eq!(addr.mnemonic(), "E0_");
        assert_eq!(addr.main(), 200);

        let addr = parse("ec_5.3").unwrap();
        assert_eq!(addr.mnemonic(), "EC_");
        assert_eq!(addr.sub(), Some(3));

        // current bank keeps its plain form
        let addr = parse("E0100").unwrap();
        assert_eq!(addr.mnemonic(), "E");
        assert_eq!(addr.main(), 100);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["", "   ", "D", "100", "D-1", "D100x", "D10 0", "D100.", "D100.1.2", "H8201x"] {
            assert!(parse(text).is_err(), "{text:?} should be rejected");
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(parse("D4294967296").is_err());
        assert_eq!(parse("D4294967295").unwrap().main(), u32::MAX);
    }

    #[test]
    fn test_display_roundtrip() {
        for text in ["D100", "H82.1", "CIO0", "E0_7.15"] {
            assert_eq!(parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_new_validates() {
        assert!(MemoryAddress::new("", 1, None).is_err());
        assert!(MemoryAddress::new("ABCD", 1, None).is_err());
        assert!(MemoryAddress::new("W", 1, Some(16)).is_err());
        assert_eq!(
            MemoryAddress::new("w", 1, Some(3)).unwrap(),
            parse("W1.3").unwrap()
        );
    }
}
