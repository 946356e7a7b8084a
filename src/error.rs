//! Error types for the FINS engine.
//!
//! Every failure is a [`FinsError`]. Callers that need the flat numeric
//! result code used by Omron tooling get it from [`FinsError::code`]; the
//! values live in [`codes`].

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::area::Access;
use crate::tcp::TcpErrorCode;

/// Result type alias for FINS operations.
pub type Result<T> = std::result::Result<T, FinsError>;

/// Numeric result codes.
///
/// Codes below `0x8000` are PLC end codes passed through verbatim. Codes from
/// [`ERRNO_BASE`](codes::ERRNO_BASE) upwards carry a platform socket error
/// number.
pub mod codes {
    /// Execution was successful.
    pub const SUCCESS: u16 = 0x0000;
    /// There is no connection with the remote PLC.
    pub const NOT_CONNECTED: u16 = 0x8002;
    /// Execution successful and last data delivered.
    pub const SUCCESS_LAST_DATA: u16 = 0x8004;
    /// The host name or IP address could not be resolved.
    pub const INVALID_IP_ADDRESS: u16 = 0x8005;
    /// The connection was closed after reaching the error threshold.
    pub const MAX_ERROR_COUNT: u16 = 0x8006;
    /// A response did not belong to the request just sent.
    pub const SYNC_ERROR: u16 = 0x8007;
    /// No address in the remote PLC was specified.
    pub const NO_READ_ADDRESS: u16 = 0x8101;
    /// No write address in the remote PLC was specified.
    pub const NO_WRITE_ADDRESS: u16 = 0x8102;
    /// An invalid read address string was specified.
    pub const INVALID_READ_ADDRESS: u16 = 0x8201;
    /// An invalid write address string was specified.
    pub const INVALID_WRITE_ADDRESS: u16 = 0x8202;
    /// No readable area matches the address.
    pub const INVALID_READ_AREA: u16 = 0x8301;
    /// No writable area matches the address.
    pub const INVALID_WRITE_AREA: u16 = 0x8302;
    /// No fillable area matches the address.
    pub const INVALID_FILL_AREA: u16 = 0x8303;
    /// A parameter was rejected before anything was sent.
    pub const INVALID_PARAMETER_AREA: u16 = 0x8401;
    /// The response body is shorter than the command requires.
    pub const BODY_TOO_SHORT: u16 = 0x8703;
    /// The FINS body is longer than allowed.
    pub const BODY_TOO_LONG: u16 = 0x8704;
    /// Error sending the handshake or wrapper header.
    pub const HEADER_SEND_ERROR: u16 = 0x8705;
    /// Error sending the complete command.
    pub const COMMAND_SEND_ERROR: u16 = 0x8706;
    /// The response frame is shorter than announced.
    pub const RESPONSE_INCOMPLETE: u16 = 0x8707;
    /// Illegal FINS/TCP command.
    pub const ILLEGAL_FINS_COMMAND: u16 = 0x870B;
    /// The received response header is incomplete.
    pub const RESPONSE_HEADER_INCOMPLETE: u16 = 0x870C;
    /// An invalid force action was specified.
    pub const INVALID_FORCE_COMMAND: u16 = 0x870D;
    /// The back-off window after a close has not elapsed yet.
    pub const TRY_LATER: u16 = 0x8801;
    /// TCP connection closed by the remote node.
    pub const CLOSED_BY_REMOTE: u16 = 0x8900;
    /// The first four bytes of the wrapper were not `FINS`.
    pub const NO_FINS_HEADER: u16 = 0x8901;
    /// Wrapper data length too long.
    pub const DATA_LENGTH_TOO_LONG: u16 = 0x8902;
    /// Wrapper command not supported.
    pub const COMMAND_NOT_SUPPORTED: u16 = 0x8903;
    /// All connections of the remote node are in use.
    pub const ALL_CONNECTIONS_IN_USE: u16 = 0x8904;
    /// The client node is already connected.
    pub const NODE_ALREADY_CONNECTED: u16 = 0x8905;
    /// The client IP address is protected.
    pub const NODE_IP_PROTECTED: u16 = 0x8906;
    /// The client node number is out of range.
    pub const CLIENT_NODE_OUT_OF_RANGE: u16 = 0x8907;
    /// Client and server use the same node number.
    pub const SAME_NODE_ADDRESS: u16 = 0x8908;
    /// No node number is available for assignment.
    pub const NO_NODE_ADDRESS_AVAILABLE: u16 = 0x8909;
    /// Platform socket errors are reported as `ERRNO_BASE + errno`.
    pub const ERRNO_BASE: u16 = 0xC000;
}

/// Errors that can occur during FINS communication.
#[derive(Debug, Error)]
pub enum FinsError {
    /// Non-zero end code returned by the PLC.
    #[error("PLC error: main code 0x{main_code:02X}, sub code 0x{sub_code:02X}")]
    PlcError {
        /// Main end code (bit 7 masked).
        main_code: u8,
        /// Sub end code (bits 6 and 7 masked).
        sub_code: u8,
    },

    /// The textual memory address could not be parsed.
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The text that was rejected.
        address: String,
        /// Why it was rejected.
        reason: String,
        /// Direction of the operation the address was given for.
        access: Access,
    },

    /// No memory area of the connected PLC supports the requested access.
    #[error("No {access} area for address '{address}'")]
    AreaNotFound {
        /// The address that was looked up.
        address: String,
        /// The requested capability.
        access: Access,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// The PLC host could not be resolved to a socket address.
    #[error("Invalid IP address '{host}'")]
    InvalidIpAddress {
        /// The host that failed to resolve.
        host: String,
    },

    /// The session has no open transport.
    #[error("Not connected")]
    NotConnected,

    /// The reconnect back-off window has not elapsed.
    #[error("Reconnect not allowed for another {retry_in:?}")]
    TryLater {
        /// Time until the next connect attempt is allowed.
        retry_in: Duration,
    },

    /// The FINS/TCP wrapper reported an error instead of data.
    #[error("FINS/TCP error: {0}")]
    Transport(TcpErrorCode),

    /// The handshake or wrapper header could not be sent completely.
    #[error("Header send error")]
    HeaderSend,

    /// The FINS header and body could not be sent completely.
    #[error("Command send error")]
    CommandSend,

    /// The wrapper header of a response was cut short.
    #[error("Response header incomplete")]
    ResponseHeaderIncomplete,

    /// Fewer bytes arrived than the wrapper announced.
    #[error("Response incomplete")]
    ResponseIncomplete,

    /// The response body is too short for the command.
    #[error("Response body too short")]
    BodyTooShort,

    /// A command or response body exceeds the protocol maximum.
    #[error("Body too long: {length} bytes")]
    BodyTooLong {
        /// Offending length in bytes.
        length: usize,
    },

    /// The response does not correlate with the request just sent.
    #[error("Synchronization error: response does not match request")]
    SyncError,

    /// Too many consecutive errors; the connection was closed.
    #[error("Maximum error count reached, connection closed")]
    MaxErrorCount,

    /// Socket level I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FinsError {
    /// Creates a new `PlcError` from a raw end code, masking the network
    /// relay and fatal/non-fatal flag bits.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::FinsError;
    ///
    /// let err = FinsError::end_code(0xA1, 0x41);
    /// assert_eq!(err.code(), 0x2101);
    /// ```
    pub fn end_code(main_code: u8, sub_code: u8) -> Self {
        Self::PlcError {
            main_code: main_code & 0x7F,
            sub_code: sub_code & 0x3F,
        }
    }

    /// Creates a new `InvalidAddress` error.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::FinsError;
    ///
    /// let err = FinsError::invalid_address("H82.16", "bit number above 15");
    /// ```
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
            access: Access::READ,
        }
    }

    /// Re-tags an address error with the direction of the failed operation.
    ///
    /// Other errors are returned unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::{codes, Access, FinsError};
    ///
    /// let err = FinsError::invalid_address("D1x", "unexpected trailing characters");
    /// assert_eq!(err.code(), codes::INVALID_READ_ADDRESS);
    /// assert_eq!(err.for_access(Access::WRITE).code(), codes::INVALID_WRITE_ADDRESS);
    /// ```
    pub fn for_access(self, access: Access) -> Self {
        match self {
            Self::InvalidAddress {
                address, reason, ..
            } => Self::InvalidAddress {
                address,
                reason,
                access,
            },
            other => other,
        }
    }

    /// Creates a new `AreaNotFound` error.
    pub fn area_not_found(address: impl Into<String>, access: Access) -> Self {
        Self::AreaNotFound {
            address: address.into(),
            access,
        }
    }

    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::FinsError;
    ///
    /// let err = FinsError::invalid_parameter("count", "must be greater than 0");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Returns the numeric result code of this error.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::{codes, FinsError};
    ///
    /// assert_eq!(FinsError::SyncError.code(), codes::SYNC_ERROR);
    /// ```
    pub fn code(&self) -> u16 {
        match self {
            Self::PlcError {
                main_code,
                sub_code,
            } => u16::from(*main_code) << 8 | u16::from(*sub_code),
            Self::InvalidAddress {
                address, access, ..
            } => {
                let write = is_write(*access);
                match (address.trim().is_empty(), write) {
                    (true, false) => codes::NO_READ_ADDRESS,
                    (true, true) => codes::NO_WRITE_ADDRESS,
                    (false, false) => codes::INVALID_READ_ADDRESS,
                    (false, true) => codes::INVALID_WRITE_ADDRESS,
                }
            }
            Self::AreaNotFound { access, .. } => {
                if access.intersects(Access::FILL) {
                    codes::INVALID_FILL_AREA
                } else if is_write(*access) {
                    codes::INVALID_WRITE_AREA
                } else {
                    codes::INVALID_READ_AREA
                }
            }
            Self::InvalidParameter { .. } => codes::INVALID_PARAMETER_AREA,
            Self::InvalidIpAddress { .. } => codes::INVALID_IP_ADDRESS,
            Self::NotConnected => codes::NOT_CONNECTED,
            Self::TryLater { .. } => codes::TRY_LATER,
            Self::Transport(code) => code.code(),
            Self::HeaderSend => codes::HEADER_SEND_ERROR,
            Self::CommandSend => codes::COMMAND_SEND_ERROR,
            Self::ResponseHeaderIncomplete => codes::RESPONSE_HEADER_INCOMPLETE,
            Self::ResponseIncomplete => codes::RESPONSE_INCOMPLETE,
            Self::BodyTooShort => codes::BODY_TOO_SHORT,
            Self::BodyTooLong { .. } => codes::BODY_TOO_LONG,
            Self::SyncError => codes::SYNC_ERROR,
            Self::MaxErrorCount => codes::MAX_ERROR_COUNT,
            Self::Io(err) => {
                let errno = err
                    .raw_os_error()
                    .and_then(|errno| u16::try_from(errno).ok())
                    .unwrap_or(0);
                codes::ERRNO_BASE.saturating_add(errno)
            }
        }
    }

    /// Returns whether this error leaves the transport unusable.
    ///
    /// Fatal errors close the session regardless of the error threshold.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MaxErrorCount | Self::Transport(TcpErrorCode::ClosedByRemote) | Self::Io(_)
        )
    }

    /// Returns whether the error was detected locally, before any I/O.
    ///
    /// Local errors bypass the session's error accounting.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress { .. }
                | Self::AreaNotFound { .. }
                | Self::InvalidParameter { .. }
                | Self::InvalidIpAddress { .. }
                | Self::TryLater { .. }
        )
    }
}

/// Whether `access` modifies PLC memory.
fn is_write(access: Access) -> bool {
    access.intersects(Access::WRITE | Access::FILL | Access::TRANSFER_DEST | Access::FORCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plc_error_display() {
        let err = FinsError::end_code(0x01, 0x01);
        assert_eq!(err.to_string(), "PLC error: main code 0x01, sub code 0x01");
    }

    #[test]
    fn test_end_code_masks_flag_bits() {
        let err = FinsError::end_code(0x80 | 0x26, 0xC0 | 0x05);
        assert_eq!(err.code(), 0x2605);
    }

    #[test]
    fn test_invalid_address_display() {
        let err = FinsError::invalid_address("WXYZ1", "mnemonic longer than three letters");
        assert_eq!(
            err.to_string(),
            "Invalid address 'WXYZ1': mnemonic longer than three letters"
        );
        assert_eq!(err.code(), codes::INVALID_READ_ADDRESS);
        assert_eq!(
            FinsError::invalid_address("  ", "empty").code(),
            codes::NO_READ_ADDRESS
        );
        assert_eq!(
            FinsError::invalid_address("", "empty").for_access(Access::FILL).code(),
            codes::NO_WRITE_ADDRESS
        );
        assert_eq!(
            err.for_access(Access::FORCE).code(),
            codes::INVALID_WRITE_ADDRESS
        );
    }

    #[test]
    fn test_area_not_found_code_follows_access() {
        assert_eq!(
            FinsError::area_not_found("D1", Access::READ).code(),
            codes::INVALID_READ_AREA
        );
        assert_eq!(
            FinsError::area_not_found("D1", Access::WRITE).code(),
            codes::INVALID_WRITE_AREA
        );
        assert_eq!(
            FinsError::area_not_found("D1", Access::FILL).code(),
            codes::INVALID_FILL_AREA
        );
    }

    #[test]
    fn test_io_error_lands_in_errno_range() {
        let err = FinsError::from(io::Error::from_raw_os_error(104));
        assert_eq!(err.code(), codes::ERRNO_BASE + 104);
        assert!(err.is_fatal());

        let err = FinsError::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(err.code(), codes::ERRNO_BASE);
    }

    #[test]
    fn test_fatal_class() {
        assert!(FinsError::MaxErrorCount.is_fatal());
        assert!(FinsError::Transport(TcpErrorCode::ClosedByRemote).is_fatal());
        assert!(!FinsError::Transport(TcpErrorCode::NoFinsHeader).is_fatal());
        assert!(!FinsError::SyncError.is_fatal());
        assert!(!FinsError::end_code(0x21, 0x01).is_fatal());
    }

    #[test]
    fn test_local_errors() {
        assert!(FinsError::invalid_parameter("count", "zero").is_local());
        assert!(!FinsError::NotConnected.is_local());
        assert!(!FinsError::ResponseIncomplete.is_local());
    }

    #[test]
    fn test_transport_error_code() {
        let err = FinsError::Transport(TcpErrorCode::NodeAlreadyConnected);
        assert_eq!(err.code(), codes::NODE_ALREADY_CONNECTED);
    }
}
