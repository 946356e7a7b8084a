//! FINS response parsing and validation.
//!
//! # Response Structure
//!
//! | Component | Size | Description |
//! |-----------|------|-------------|
//! | Header | 12 bytes | FINS header, MRC and SRC echoed from the command |
//! | Main Code | 1 byte | End code main part (bit 7: network relay error) |
//! | Sub Code | 1 byte | End code sub part (bits 6-7: CPU unit error flags) |
//! | Data | Variable | Response data (if any) |
//!
//! # End Codes
//!
//! The flag bits of the end code report conditions unrelated to the command
//! itself, so they are masked before the code is inspected. A response whose
//! masked end code is `0x0000` is successful.
//!
//! # Example
//!
//! ```
//! use fins_engine::FinsResponse;
//!
//! let bytes = [
//!     0xC0, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x0A, 0x00, 0x01, 0x01, 0x01, // header
//!     0x00, 0x40, // end code, non-fatal CPU error flag set
//!     0x12, 0x34, 0x56, 0x78, // data: 0x1234, 0x5678
//! ];
//!
//! let response = FinsResponse::from_bytes(&bytes).unwrap();
//! assert!(response.is_success());
//!
//! let words = response.to_words().unwrap();
//! assert_eq!(words, vec![0x1234, 0x5678]);
//! ```

use crate::error::{FinsError, Result};
use crate::header::{FinsHeader, FINS_HEADER_SIZE};

/// Size of the end code at the front of every response body.
pub const END_CODE_SIZE: usize = 2;

/// Minimum response size: header (12) + end code (2).
pub const MIN_RESPONSE_SIZE: usize = FINS_HEADER_SIZE + END_CODE_SIZE;

/// Parsed FINS response.
#[derive(Debug, Clone)]
pub struct FinsResponse {
    /// Response header.
    pub header: FinsHeader,
    /// Main end code, flag bit masked.
    pub main_code: u8,
    /// Sub end code, flag bits masked.
    pub sub_code: u8,
    /// Response data following the end code.
    pub data: Vec<u8>,
}

impl FinsResponse {
    /// Parses a FINS response from a received header and body.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::BodyTooShort` if the frame has no room for the
    /// header and end code.
    pub fn from_bytes(frame: &[u8]) -> Result<Self> {
        if frame.len() < MIN_RESPONSE_SIZE {
            return Err(FinsError::BodyTooShort);
        }

        let header = FinsHeader::from_bytes(&frame[..FINS_HEADER_SIZE])?;

        Ok(Self {
            header,
            main_code: frame[FINS_HEADER_SIZE] & 0x7F,
            sub_code: frame[FINS_HEADER_SIZE + 1] & 0x3F,
            data: frame[MIN_RESPONSE_SIZE..].to_vec(),
        })
    }

    /// The masked end code as one number.
    pub fn end_code(&self) -> u16 {
        u16::from(self.main_code) << 8 | u16::from(self.sub_code)
    }

    /// Returns whether the masked end code is zero.
    pub fn is_success(&self) -> bool {
        self.main_code == 0x00 && self.sub_code == 0x00
    }

    /// Validates the response and returns an error if it indicates failure.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::PlcError` if the masked end code is non-zero.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::FinsResponse;
    ///
    /// let error_bytes = [
    ///     0xC0, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x0A, 0x00, 0x01, 0x01, 0x01,
    ///     0x11, 0x03, // address range exceeded
    /// ];
    /// let response = FinsResponse::from_bytes(&error_bytes).unwrap();
    /// assert_eq!(response.check_error().unwrap_err().code(), 0x1103);
    /// ```
    pub fn check_error(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(FinsError::end_code(self.main_code, self.sub_code))
        }
    }

    /// Checks that exactly `len` data bytes follow the end code.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::BodyTooShort` on any other length.
    pub fn expect_data_len(&self, len: usize) -> Result<()> {
        if self.data.len() == len {
            Ok(())
        } else {
            Err(FinsError::BodyTooShort)
        }
    }

    /// Converts response data to words (big-endian u16 values).
    ///
    /// # Errors
    ///
    /// Returns `FinsError::BodyTooShort` if the data length is odd.
    pub fn to_words(&self) -> Result<Vec<u16>> {
        if self.data.len() % 2 != 0 {
            return Err(FinsError::BodyTooShort);
        }

        Ok(self
            .data
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect())
    }

    /// Converts bit-area response data, one byte per bit, to booleans.
    pub fn to_bits(&self) -> Vec<bool> {
        self.data.iter().map(|&b| b & 0x01 != 0).collect()
    }
}
