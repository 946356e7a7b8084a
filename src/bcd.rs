//! Binary-coded decimal codecs used by Omron PLC timers, counters and
//! `BCD`/`BIN` instructions.
//!
//! Every nibble of a BCD word holds one decimal digit. Unsigned values use all
//! nibbles as digits; signed values use one of four conventions to mark the
//! sign:
//!
//! | Convention | 16-bit range | 32-bit range | Negative marker |
//! |------------|--------------|--------------|-----------------|
//! | [`SignedBcd::SignBit`] | -999..=999 | -9999999..=9999999 | top bit set |
//! | [`SignedBcd::SignBitWide`] | -7999..=7999 | -79999999..=79999999 | top bit set |
//! | [`SignedBcd::NibbleF`] | -999..=9999 | -9999999..=99999999 | top nibble `F` |
//! | [`SignedBcd::NibbleFA`] | -1999..=9999 | -19999999..=99999999 | top nibble `F` (-0xxx) or `A` (-1xxx) |
//!
//! Decoding and encoding never fail hard: a value that is not representable
//! yields `None`, so a bulk read with one corrupted word still returns every
//! other element.
//!
//! # Example
//!
//! ```
//! use fins_engine::bcd::{self, BcdKind, SignedBcd};
//!
//! assert_eq!(bcd::decode(0x1234, BcdKind::Unsigned16), Some(1234));
//! assert_eq!(bcd::decode(0x12A4, BcdKind::Unsigned16), None);
//!
//! let kind = BcdKind::Signed16(SignedBcd::NibbleFA);
//! assert_eq!(bcd::encode(-1234, kind), Some(0xA234));
//! assert_eq!(bcd::decode(0xA234, kind), Some(-1234));
//! ```

use std::ops::RangeInclusive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const INVALID: u8 = 0xFF;

/// Decimal value of every byte that holds two valid BCD digits.
const BCD_BYTE: [u8; 256] = build_byte_table();

const fn build_byte_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < 256 {
        let hi = i >> 4;
        let lo = i & 0x0F;
        if hi < 10 && lo < 10 {
            table[i] = (hi * 10 + lo) as u8;
        }
        i += 1;
    }
    table
}

/// Sign convention of a signed BCD value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SignedBcd {
    /// Most significant bit is the sign; three (or seven) magnitude digits.
    SignBit,
    /// Most significant bit is the sign; the top digit may reach 7.
    SignBitWide,
    /// Top nibble `F` marks a negative value made of the remaining digits.
    NibbleF,
    /// Top nibble `F` marks `-0xxx`, `A` marks `-1xxx`.
    NibbleFA,
}

/// BCD encoding of one PLC value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BcdKind {
    /// Four digit unsigned value in one word.
    Unsigned16,
    /// Eight digit unsigned value in two words.
    Unsigned32,
    /// Signed value in one word.
    Signed16(SignedBcd),
    /// Signed value in two words.
    Signed32(SignedBcd),
}

impl BcdKind {
    /// Width of the encoded value in bits (16 or 32).
    pub fn bits(self) -> u32 {
        match self {
            Self::Unsigned16 | Self::Signed16(_) => 16,
            Self::Unsigned32 | Self::Signed32(_) => 32,
        }
    }

    /// Number of PLC words one value occupies.
    pub fn words(self) -> usize {
        (self.bits() / 16) as usize
    }

    fn digits(self) -> u32 {
        self.bits() / 4
    }

    /// Inclusive range of integers this kind can represent.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::bcd::{BcdKind, SignedBcd};
    ///
    /// assert_eq!(BcdKind::Signed16(SignedBcd::SignBitWide).range(), -7999..=7999);
    /// assert_eq!(BcdKind::Unsigned32.range(), 0..=99_999_999);
    /// ```
    pub fn range(self) -> RangeInclusive<i32> {
        match self {
            Self::Unsigned16 => 0..=9_999,
            Self::Unsigned32 => 0..=99_999_999,
            Self::Signed16(SignedBcd::SignBit) => -999..=999,
            Self::Signed16(SignedBcd::SignBitWide) => -7_999..=7_999,
            Self::Signed16(SignedBcd::NibbleF) => -999..=9_999,
            Self::Signed16(SignedBcd::NibbleFA) => -1_999..=9_999,
            Self::Signed32(SignedBcd::SignBit) => -9_999_999..=9_999_999,
            Self::Signed32(SignedBcd::SignBitWide) => -79_999_999..=79_999_999,
            Self::Signed32(SignedBcd::NibbleF) => -9_999_999..=99_999_999,
            Self::Signed32(SignedBcd::NibbleFA) => -19_999_999..=99_999_999,
        }
    }

    /// Decodes `raw` with this kind. See [`decode`].
    pub fn decode(self, raw: u32) -> Option<i32> {
        decode(raw, self)
    }

    /// Encodes `value` with this kind. See [`encode`].
    pub fn encode(self, value: i32) -> Option<u32> {
        encode(value, self)
    }
}

/// Reads `digits` BCD nibbles from the low end of `raw`.
fn unpack(raw: u32, digits: u32) -> Option<u32> {
    let mut value = 0u32;
    for byte_index in (0..digits / 2).rev() {
        let byte = BCD_BYTE[((raw >> (byte_index * 8)) & 0xFF) as usize];
        if byte == INVALID {
            return None;
        }
        value = value * 100 + u32::from(byte);
    }
    Some(value)
}

/// Writes `value` as `digits` BCD nibbles. `None` if it needs more digits.
fn pack(mut value: u32, digits: u32) -> Option<u32> {
    let mut raw = 0u32;
    for n in 0..digits {
        raw |= (value % 10) << (4 * n);
        value /= 10;
    }
    (value == 0).then_some(raw)
}

/// Decodes a BCD value.
///
/// Only the low [`BcdKind::bits`] bits of `raw` are examined. Returns `None`
/// when a nibble is not a decimal digit, the sign marker is unknown, or the
/// magnitude falls outside [`BcdKind::range`].
pub fn decode(raw: u32, kind: BcdKind) -> Option<i32> {
    let bits = kind.bits();
    let digits = kind.digits();
    let raw = if bits == 32 { raw } else { raw & 0xFFFF };
    let top_shift = bits - 4;
    let body_mask = (1u32 << top_shift) - 1;

    let value = match kind {
        BcdKind::Unsigned16 | BcdKind::Unsigned32 => unpack(raw, digits)? as i64,
        BcdKind::Signed16(sign) | BcdKind::Signed32(sign) => match sign {
            SignedBcd::SignBit | SignedBcd::SignBitWide => {
                let sign_bit = 1u32 << (bits - 1);
                let magnitude = unpack(raw & !sign_bit, digits)? as i64;
                if raw & sign_bit != 0 {
                    -magnitude
                } else {
                    magnitude
                }
            }
            SignedBcd::NibbleF | SignedBcd::NibbleFA => match raw >> top_shift {
                0..=9 => unpack(raw, digits)? as i64,
                0xF => -(unpack(raw & body_mask, digits)? as i64),
                0xA if sign == SignedBcd::NibbleFA => {
                    -(10i64.pow(digits - 1) + unpack(raw & body_mask, digits)? as i64)
                }
                _ => return None,
            },
        },
    };

    let range = kind.range();
    if value < i64::from(*range.start()) || value > i64::from(*range.end()) {
        return None;
    }
    i32::try_from(value).ok()
}

/// Encodes an integer as BCD.
///
/// Returns `None` if `value` is outside [`BcdKind::range`].
pub fn encode(value: i32, kind: BcdKind) -> Option<u32> {
    if !kind.range().contains(&value) {
        return None;
    }

    let bits = kind.bits();
    let digits = kind.digits();
    let top_shift = bits - 4;
    let magnitude = value.unsigned_abs();

    match kind {
        BcdKind::Unsigned16 | BcdKind::Unsigned32 => pack(magnitude, digits),
        BcdKind::Signed16(sign) | BcdKind::Signed32(sign) => match sign {
            SignedBcd::SignBit | SignedBcd::SignBitWide => {
                let raw = pack(magnitude, digits)?;
                if value < 0 {
                    Some(raw | 1 << (bits - 1))
                } else {
                    Some(raw)
                }
            }
            SignedBcd::NibbleF | SignedBcd::NibbleFA => {
                if value >= 0 {
                    return pack(magnitude, digits);
                }
                let thousands = 10u32.pow(digits - 1);
                if magnitude < thousands {
                    Some(0xF << top_shift | pack(magnitude, digits - 1)?)
                } else if sign == SignedBcd::NibbleFA {
                    Some(0xA << top_shift | pack(magnitude - thousands, digits - 1)?)
                } else {
                    None
                }
            }
        },
    }
}
