//! FINS header structures and node addressing.
//!
//! # FINS Header Structure
//!
//! The FINS header is a 12-byte structure that precedes every FINS command and response:
//!
//! | Byte | Field | Description |
//! |------|-------|-------------|
//! | 0 | ICF | Information Control Field |
//! | 1 | RSV | Reserved (always 0x00) |
//! | 2 | GCT | Gateway Count |
//! | 3 | DNA | Destination Network Address |
//! | 4 | DA1 | Destination Node Address |
//! | 5 | DA2 | Destination Unit Address |
//! | 6 | SNA | Source Network Address |
//! | 7 | SA1 | Source Node Address |
//! | 8 | SA2 | Source Unit Address |
//! | 9 | SID | Service ID |
//! | 10 | MRC | Main Request Code |
//! | 11 | SRC | Sub Request Code |
//!
//! A response mirrors its request: the response bit of ICF is set, source and
//! destination are swapped, and SID, MRC and SRC are echoed.
//!
//! # Example
//!
//! ```
//! use fins_engine::{FinsHeader, NodeAddress};
//!
//! let plc = NodeAddress::new(0, 10, 0);
//! let host = NodeAddress::new(0, 1, 0);
//!
//! let request = FinsHeader::new_command(plc, host, 0x01, 0x01, 0x01);
//! let bytes = request.to_bytes();
//! assert_eq!(bytes.len(), 12);
//!
//! let response = request.response();
//! assert!(response.is_response_to(&request));
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FinsError, Result};

/// FINS header size in bytes.
pub const FINS_HEADER_SIZE: usize = 12;

/// ICF of a command that expects a response.
pub const ICF_COMMAND: u8 = 0x80;

/// ICF bit marking a response.
pub const ICF_RESPONSE_BIT: u8 = 0x40;

/// Default gateway count.
pub const DEFAULT_GCT: u8 = 0x02;

/// Node address for FINS communication.
///
/// Represents a network/node/unit address in the FINS protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeAddress {
    /// Network address (0 = local network).
    pub network: u8,
    /// Node address. 0 asks the PLC to assign one during the handshake.
    pub node: u8,
    /// Unit address (0 = CPU unit).
    pub unit: u8,
}

impl NodeAddress {
    /// Creates a new node address.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::NodeAddress;
    ///
    /// // Remote PLC on network 1, node 10, CPU unit
    /// let remote = NodeAddress::new(1, 10, 0);
    /// ```
    pub fn new(network: u8, node: u8, unit: u8) -> Self {
        Self {
            network,
            node,
            unit,
        }
    }

    /// Creates a local node address (network 0, node 0, unit 0).
    pub fn local() -> Self {
        Self::new(0, 0, 0)
    }
}

impl Default for NodeAddress {
    fn default() -> Self {
        Self::local()
    }
}

/// FINS command/response header (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinsHeader {
    /// Information Control Field.
    /// - Bit 7: 1 = response required
    /// - Bit 6: 0 = command, 1 = response
    pub icf: u8,
    /// Reserved byte (always 0x00).
    pub rsv: u8,
    /// Gateway Count.
    pub gct: u8,
    /// Destination Network Address.
    pub dna: u8,
    /// Destination Node Address.
    pub da1: u8,
    /// Destination Unit Address.
    pub da2: u8,
    /// Source Network Address.
    pub sna: u8,
    /// Source Node Address.
    pub sa1: u8,
    /// Source Unit Address.
    pub sa2: u8,
    /// Service ID (used to match responses with requests).
    pub sid: u8,
    /// Main Request Code.
    pub mrc: u8,
    /// Sub Request Code.
    pub src: u8,
}

impl FinsHeader {
    /// Creates a new command header.
    ///
    /// # Arguments
    ///
    /// * `destination` - Destination node address
    /// * `source` - Source node address
    /// * `sid` - Service ID for request/response matching
    /// * `mrc` - Main request code
    /// * `src` - Sub request code
    pub fn new_command(
        destination: NodeAddress,
        source: NodeAddress,
        sid: u8,
        mrc: u8,
        src: u8,
    ) -> Self {
        Self {
            icf: ICF_COMMAND,
            rsv: 0x00,
            gct: DEFAULT_GCT,
            dna: destination.network,
            da1: destination.node,
            da2: destination.unit,
            sna: source.network,
            sa1: source.node,
            sa2: source.unit,
            sid,
            mrc,
            src,
        }
    }

    /// Serializes the header to bytes.
    pub fn to_bytes(self) -> [u8; FINS_HEADER_SIZE] {
        [
            self.icf, self.rsv, self.gct, self.dna, self.da1, self.da2, self.sna, self.sa1,
            self.sa2, self.sid, self.mrc, self.src,
        ]
    }

    /// Parses a header from bytes.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::BodyTooShort` if the slice is shorter than 12 bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < FINS_HEADER_SIZE {
            return Err(FinsError::BodyTooShort);
        }

        Ok(Self {
            icf: data[0],
            rsv: data[1],
            gct: data[2],
            dna: data[3],
            da1: data[4],
            da2: data[5],
            sna: data[6],
            sa1: data[7],
            sa2: data[8],
            sid: data[9],
            mrc: data[10],
            src: data[11],
        })
    }

    /// Returns whether this is a response header.
    pub fn is_response(self) -> bool {
        (self.icf & ICF_RESPONSE_BIT) != 0
    }

    /// Returns the destination node address.
    pub fn destination(self) -> NodeAddress {
        NodeAddress::new(self.dna, self.da1, self.da2)
    }

    /// Returns the source node address.
    pub fn source(self) -> NodeAddress {
        NodeAddress::new(self.sna, self.sa1, self.sa2)
    }

    /// Builds the header a well-behaved PLC sends back for this request.
    pub fn response(self) -> Self {
        Self {
            icf: self.icf | ICF_RESPONSE_BIT,
            rsv: 0x00,
            dna: self.sna,
            da1: self.sa1,
            da2: self.sa2,
            sna: self.dna,
            sa1: self.da1,
            sa2: self.da2,
            ..self
        }
    }

    /// Checks that this header answers `request`.
    ///
    /// Every field except GCT takes part: the response bit must be set on
    /// top of the request's ICF, RSV must be zero, the addresses must be
    /// swapped, and SID, MRC and SRC must be echoed.
    pub fn is_response_to(&self, request: &FinsHeader) -> bool {
        self.icf == request.icf | ICF_RESPONSE_BIT
            && self.rsv == 0
            && self.destination() == request.source()
            && self.source() == request.destination()
            && self.sid == request.sid
            && self.mrc == request.mrc
            && self.src == request.src
    }
}
