//! FINS/TCP framing.
//!
//! Over TCP every FINS frame travels inside a 16-byte wrapper:
//!
//! | Bytes | Field | Description |
//! |-------|-------|-------------|
//! | 0-3 | Magic | ASCII `FINS` |
//! | 4-7 | Length | Big-endian count of the bytes after this field |
//! | 8-11 | Command | 0 = node address request, 1 = node address response, 2 = frame |
//! | 12-15 | Error | 0 on success, otherwise a [`TcpErrorCode`] |
//!
//! A connection starts with a handshake: the client sends a 20-byte node
//! address request and the server answers with 24 bytes carrying the client
//! and server node numbers. After that each FINS command is sent as a frame
//! wrapper followed by the 12-byte FINS header and the command body.
//!
//! # Example
//!
//! ```
//! use fins_engine::tcp::{TcpHeader, CMD_FRAME};
//!
//! let wrapper = TcpHeader::frame(12 + 6);
//! assert_eq!(wrapper.command, CMD_FRAME);
//! assert_eq!(wrapper.to_bytes()[4..8], [0, 0, 0, 26]);
//! ```

use std::fmt;
use std::io::{self, Read};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{codes, FinsError, Result};
use crate::header::FINS_HEADER_SIZE;

/// Wrapper magic.
pub const FINS_MAGIC: [u8; 4] = *b"FINS";

/// Size of the wrapper in front of every frame.
pub const TCP_HEADER_SIZE: usize = 16;

/// Size of the client node address request.
pub const HANDSHAKE_REQUEST_SIZE: usize = 20;

/// Size of the server node address response.
pub const HANDSHAKE_RESPONSE_SIZE: usize = 24;

/// Client node address request command.
pub const CMD_NODE_ADDRESS_REQUEST: u32 = 0;

/// Server node address response command.
pub const CMD_NODE_ADDRESS_RESPONSE: u32 = 1;

/// FINS frame command.
pub const CMD_FRAME: u32 = 2;

/// Largest FINS body accepted in either direction.
pub const MAX_BODY_LEN: usize = 2000;

/// Default FINS port.
pub const DEFAULT_FINS_PORT: u16 = 9600;

/// Bytes of the wrapper counted by the length field (command and error).
const LENGTH_OVERHEAD: usize = 8;

/// Pause between receive attempts that returned no data.
const RECV_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Error reported in the wrapper instead of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TcpErrorCode {
    /// The remote node closed the connection.
    ClosedByRemote,
    /// The wrapper did not start with `FINS`.
    NoFinsHeader,
    /// The data length was too long.
    DataLengthTooLong,
    /// The command is not supported.
    CommandNotSupported,
    /// All connections are in use.
    AllConnectionsInUse,
    /// The client node is already connected.
    NodeAlreadyConnected,
    /// The client IP address is protected.
    NodeIpProtected,
    /// The client node number is out of range.
    ClientNodeOutOfRange,
    /// Client and server use the same node number.
    SameNodeAddress,
    /// No node number is available.
    NoNodeAddressAvailable,
    /// Any other wrapper error value.
    Illegal(u32),
}

impl TcpErrorCode {
    /// Decodes the wrapper error field.
    pub fn from_wire(value: u32) -> Self {
        match value {
            0x00 => Self::ClosedByRemote,
            0x01 => Self::NoFinsHeader,
            0x02 => Self::DataLengthTooLong,
            0x03 => Self::CommandNotSupported,
            0x20 => Self::AllConnectionsInUse,
            0x21 => Self::NodeAlreadyConnected,
            0x22 => Self::NodeIpProtected,
            0x23 => Self::ClientNodeOutOfRange,
            0x24 => Self::SameNodeAddress,
            0x25 => Self::NoNodeAddressAvailable,
            other => Self::Illegal(other),
        }
    }

    /// Numeric result code of this wrapper error.
    pub fn code(self) -> u16 {
        match self {
            Self::ClosedByRemote => codes::CLOSED_BY_REMOTE,
            Self::NoFinsHeader => codes::NO_FINS_HEADER,
            Self::DataLengthTooLong => codes::DATA_LENGTH_TOO_LONG,
            Self::CommandNotSupported => codes::COMMAND_NOT_SUPPORTED,
            Self::AllConnectionsInUse => codes::ALL_CONNECTIONS_IN_USE,
            Self::NodeAlreadyConnected => codes::NODE_ALREADY_CONNECTED,
            Self::NodeIpProtected => codes::NODE_IP_PROTECTED,
            Self::ClientNodeOutOfRange => codes::CLIENT_NODE_OUT_OF_RANGE,
            Self::SameNodeAddress => codes::SAME_NODE_ADDRESS,
            Self::NoNodeAddressAvailable => codes::NO_NODE_ADDRESS_AVAILABLE,
            Self::Illegal(_) => codes::ILLEGAL_FINS_COMMAND,
        }
    }
}

impl fmt::Display for TcpErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClosedByRemote => f.write_str("connection closed by remote node"),
            Self::NoFinsHeader => f.write_str("missing FINS header"),
            Self::DataLengthTooLong => f.write_str("data length too long"),
            Self::CommandNotSupported => f.write_str("command not supported"),
            Self::AllConnectionsInUse => f.write_str("all connections in use"),
            Self::NodeAlreadyConnected => f.write_str("node already connected"),
            Self::NodeIpProtected => f.write_str("node IP address protected"),
            Self::ClientNodeOutOfRange => f.write_str("client node out of range"),
            Self::SameNodeAddress => f.write_str("same node address as server"),
            Self::NoNodeAddressAvailable => f.write_str("no node address available"),
            Self::Illegal(value) => write!(f, "illegal FINS command (error 0x{value:08X})"),
        }
    }
}

/// The 16-byte FINS/TCP wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    /// Bytes following the length field.
    pub length: u32,
    /// Wrapper command.
    pub command: u32,
    /// Wrapper error.
    pub error: u32,
}

impl TcpHeader {
    /// Wrapper announcing a FINS header plus body of `payload_len` bytes.
    pub fn frame(payload_len: usize) -> Self {
        Self {
            length: (payload_len + LENGTH_OVERHEAD) as u32,
            command: CMD_FRAME,
            error: 0,
        }
    }

    /// Serializes the wrapper.
    pub fn to_bytes(self) -> [u8; TCP_HEADER_SIZE] {
        let mut bytes = [0u8; TCP_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&FINS_MAGIC);
        bytes[4..8].copy_from_slice(&self.length.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.command.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.error.to_be_bytes());
        bytes
    }

    /// Parses a wrapper. The magic is not checked; the command field decides.
    pub fn from_bytes(bytes: &[u8; TCP_HEADER_SIZE]) -> Self {
        let word = |at: usize| u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        Self {
            length: word(4),
            command: word(8),
            error: word(12),
        }
    }

    /// Validates a received frame wrapper and returns the size of the FINS
    /// header plus body that follows it.
    ///
    /// # Errors
    ///
    /// - `FinsError::Transport` if the command is not a frame
    /// - `FinsError::BodyTooLong` if more than a header and 2000 bytes are announced
    /// - `FinsError::BodyTooShort` if less than a FINS header is announced
    pub fn payload_len(&self) -> Result<usize> {
        if self.command != CMD_FRAME {
            return Err(FinsError::Transport(TcpErrorCode::from_wire(self.error)));
        }
        let length = (self.length as usize).saturating_sub(LENGTH_OVERHEAD);
        if length > FINS_HEADER_SIZE + MAX_BODY_LEN {
            return Err(FinsError::BodyTooLong { length });
        }
        if length < FINS_HEADER_SIZE {
            return Err(FinsError::BodyTooShort);
        }
        Ok(length)
    }
}

/// Builds the node address request. `client_node` 0 asks for automatic
/// assignment.
pub fn handshake_request(client_node: u8) -> [u8; HANDSHAKE_REQUEST_SIZE] {
    let header = TcpHeader {
        length: (HANDSHAKE_REQUEST_SIZE - LENGTH_OVERHEAD) as u32,
        command: CMD_NODE_ADDRESS_REQUEST,
        error: 0,
    };
    let mut bytes = [0u8; HANDSHAKE_REQUEST_SIZE];
    bytes[..TCP_HEADER_SIZE].copy_from_slice(&header.to_bytes());
    bytes[HANDSHAKE_REQUEST_SIZE - 1] = client_node;
    bytes
}

/// Node numbers negotiated in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAssignment {
    /// Node number assigned to this client.
    pub client_node: u8,
    /// Node number of the PLC.
    pub server_node: u8,
}

/// Parses the node address response.
///
/// # Errors
///
/// Returns `FinsError::Transport` with the decoded wrapper error if the
/// server did not answer with a node address response.
pub fn parse_handshake_response(bytes: &[u8; HANDSHAKE_RESPONSE_SIZE]) -> Result<NodeAssignment> {
    let mut wrapper = [0u8; TCP_HEADER_SIZE];
    wrapper.copy_from_slice(&bytes[..TCP_HEADER_SIZE]);
    let header = TcpHeader::from_bytes(&wrapper);
    if header.command != CMD_NODE_ADDRESS_RESPONSE {
        return Err(FinsError::Transport(TcpErrorCode::from_wire(header.error)));
    }
    Ok(NodeAssignment {
        client_node: bytes[19],
        server_node: bytes[23],
    })
}

/// Fills `buf` from `reader`, tolerating partial reads.
///
/// Reads that time out are retried after a short pause until `deadline`
/// passes. Returns the number of bytes read, which is less than `buf.len()`
/// if the stream ended or the deadline passed. Other I/O errors are returned.
pub fn recv_full<R: Read>(reader: &mut R, buf: &mut [u8], deadline: Instant) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                if Instant::now() >= deadline {
                    break;
                }
                thread::sleep(RECV_RETRY_DELAY);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
