//! Splitting bulk transfers into protocol sized chunks.
//!
//! A single memory area read or write may carry only a limited number of
//! elements. [`ChunkPlan`] walks a request of any length and yields one
//! [`Chunk`] per message: where it starts on the wire, how many elements it
//! covers and where those elements sit in the caller's buffer.
//!
//! Values wider than one word (32-bit integers, floats, 32-bit BCD) never
//! straddle two messages. Bit transfers advance the bit number and carry into
//! the word address when they pass bit 15.
//!
//! # Example
//!
//! ```
//! use fins_engine::{ChunkPlan, ElementKind};
//!
//! let chunks: Vec<_> = ChunkPlan::new(ElementKind::Word, 100, 0, 270, 269)
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//!
//! assert_eq!(chunks.len(), 2);
//! assert_eq!((chunks[0].word, chunks[0].elements), (100, 269));
//! assert_eq!((chunks[1].word, chunks[1].elements), (369, 1));
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FinsError, Result};

/// Read words per message over SYSWAY and other small frame networks.
pub const MAX_READ_WORDS_SYSWAY: u16 = 269;
/// Write words per message over SYSWAY and other small frame networks.
pub const MAX_WRITE_WORDS_SYSWAY: u16 = 267;
/// Read words per message over Ethernet and Controller Link.
pub const MAX_READ_WORDS_ETHERNET: u16 = 999;
/// Write words per message over Ethernet and Controller Link.
pub const MAX_WRITE_WORDS_ETHERNET: u16 = 996;
/// Wire items per multiple memory area read.
pub const MAX_MULTI_READ_ITEMS: usize = 24;

const BITS_PER_WORD: u64 = 16;

/// Element layout of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// One bit per element, one byte on the wire.
    Bit,
    /// One 16-bit word per element.
    Word,
    /// Two words per element (32-bit values).
    DoubleWord,
    /// Four words per element (64-bit values).
    QuadWord,
}

impl ElementKind {
    /// Wire elements (bits or words) occupied by one value.
    pub fn wire_per_element(self) -> usize {
        match self {
            ElementKind::Bit | ElementKind::Word => 1,
            ElementKind::DoubleWord => 2,
            ElementKind::QuadWord => 4,
        }
    }

    /// Bytes occupied on the wire by one value.
    pub fn byte_len(self) -> usize {
        match self {
            ElementKind::Bit => 1,
            other => other.wire_per_element() * 2,
        }
    }
}

/// Per-message element limits of the network path to the PLC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferCapacity {
    /// Maximum elements in one read response.
    pub read: u16,
    /// Maximum elements in one write command.
    pub write: u16,
}

impl TransferCapacity {
    /// Limits safe for every network path.
    pub const SYSWAY: Self = Self {
        read: MAX_READ_WORDS_SYSWAY,
        write: MAX_WRITE_WORDS_SYSWAY,
    };

    /// Limits for a PLC reached directly over Ethernet.
    pub const ETHERNET: Self = Self {
        read: MAX_READ_WORDS_ETHERNET,
        write: MAX_WRITE_WORDS_ETHERNET,
    };
}

impl Default for TransferCapacity {
    fn default() -> Self {
        Self::SYSWAY
    }
}

/// One message worth of a bulk transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Wire word address of the first element.
    pub word: u16,
    /// Bit number of the first element, 0 for word transfers.
    pub bit: u8,
    /// Index of the first value in the caller's buffer.
    pub offset: usize,
    /// Number of values in this chunk.
    pub elements: usize,
    /// Count field for the command: bits or words.
    pub wire_count: u16,
}

impl Chunk {
    /// Range of the caller's buffer covered by this chunk.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.elements
    }
}

/// Iterator over the chunks of a bulk transfer.
///
/// Yields an error, and then stops, if the wire address would leave the
/// 16-bit address space.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    kind: ElementKind,
    per_chunk: usize,
    width: usize,
    cursor: u64,
    offset: usize,
    remaining: usize,
    failed: bool,
}

impl ChunkPlan {
    /// Plans the transfer of `count` values starting at wire address
    /// `word`.`bit` with at most `capacity` wire elements per message.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidParameter` if `capacity` cannot hold a
    /// single value or `bit` is above 15.
    pub fn new(kind: ElementKind, word: u32, bit: u8, count: usize, capacity: u16) -> Result<Self> {
        let width = kind.wire_per_element();
        let per_chunk = usize::from(capacity) / width;
        if per_chunk == 0 {
            return Err(FinsError::invalid_parameter(
                "capacity",
                format!("{capacity} cannot hold a {width} word value"),
            ));
        }
        if bit > 15 {
            return Err(FinsError::invalid_parameter("bit", "must be 0-15"));
        }

        let cursor = match kind {
            ElementKind::Bit => u64::from(word) * BITS_PER_WORD + u64::from(bit),
            _ => u64::from(word),
        };

        Ok(Self {
            kind,
            per_chunk,
            width,
            cursor,
            offset: 0,
            remaining: count,
            failed: false,
        })
    }

    /// Counts wire elements of `element_len` bytes instead of words.
    ///
    /// Index registers hold 4 bytes per element, so a 32-bit value there
    /// takes one wire element where a data memory word pair takes two. The
    /// per-message limit stays in words.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidParameter` if a value is not a whole
    /// number of elements.
    pub fn with_element_len(mut self, element_len: u8) -> Result<Self> {
        let element_len = usize::from(element_len);
        let bytes = self.kind.byte_len();
        if element_len == 0 || bytes % element_len != 0 {
            return Err(FinsError::invalid_parameter(
                "address",
                format!("a {bytes} byte value does not fill whole {element_len} byte elements"),
            ));
        }
        self.width = bytes / element_len;
        Ok(self)
    }

    /// Number of messages the transfer needs.
    pub fn message_count(&self) -> usize {
        self.remaining.div_ceil(self.per_chunk)
    }
}

impl Iterator for ChunkPlan {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.failed {
            return None;
        }

        let (word, bit) = match self.kind {
            ElementKind::Bit => (self.cursor / BITS_PER_WORD, (self.cursor % BITS_PER_WORD) as u8),
            _ => (self.cursor, 0),
        };
        let Ok(word) = u16::try_from(word) else {
            self.failed = true;
            return Some(Err(FinsError::invalid_parameter(
                "address",
                format!("word address {word} beyond 0xFFFF"),
            )));
        };

        let elements = self.per_chunk.min(self.remaining);
        let wire = elements * self.width;
        let chunk = Chunk {
            word,
            bit,
            offset: self.offset,
            elements,
            // bounded by the u16 capacity
            wire_count: wire as u16,
        };

        self.cursor += wire as u64;
        self.offset += elements;
        self.remaining -= elements;
        Some(Ok(chunk))
    }
}
