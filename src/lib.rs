//! # Omron FINS/TCP Client Engine
//!
//! A Rust library for talking to Omron PLCs with the FINS (Factory Interface
//! Network Service) protocol over TCP.
//!
//! The engine is made of four pieces that the typed operations are built on:
//!
//! - **Session**: owns the TCP connection, performs the FINS/TCP node address
//!   handshake, frames commands, correlates every response with its request and
//!   keeps a consecutive error count that closes the connection when it gets
//!   too high.
//! - **Address resolution**: parses textual addresses (`D100`, `CIO12.3`,
//!   `E0_200`) and finds the memory area row of the PLC family that supports
//!   the requested access.
//! - **Chunked transfers**: splits reads and writes of any length into
//!   messages the network path can carry.
//! - **BCD codec**: unsigned and eight signed BCD encodings.
//!
//! Calls are blocking and a [`Session`] is meant to be used from one thread.
//! Independent sessions may run on separate threads.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fins_engine::{PlcFamily, Session, SessionConfig};
//!
//! fn main() -> fins_engine::Result<()> {
//!     // Nodes 0 let the PLC assign both addresses during the handshake
//!     let config = SessionConfig::new("192.168.1.250", 0, 0);
//!     let mut session = Session::connect(config)?;
//!
//!     // Sets the PLC family used for address resolution
//!     let cpu = session.identify()?;
//!     println!("{} {}", cpu.model, cpu.version);
//!
//!     // 500 words from DM100, split into two messages
//!     let data = session.read_u16("D100", 500)?;
//!     println!("D100 = {}", data[0]);
//!
//!     session.write_i32("D200", &[-123_456])?;
//!     session.write_bits("W3.4", &[true, false, true])?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Memory Operations
//!
//! ```no_run
//! # use fins_engine::{BcdKind, PlcFamily, Session, SessionConfig, SignedBcd};
//! # let mut session = Session::connect(SessionConfig::new("192.168.1.250", 0, 0).with_plc_family(PlcFamily::CsCj))?;
//! // REAL and LREAL
//! let temps: Vec<f32> = session.read_f32("D100", 4)?;
//! session.write_f64("D300", &[3.141592653589793])?;
//!
//! // BCD, invalid PLC data comes back as None
//! let counts: Vec<Option<u16>> = session.read_bcd16("D400", 10)?;
//! let offsets = session.read_sbcd16("D410", SignedBcd::NibbleF, 2)?;
//! session.write_bcd("D420", BcdKind::Unsigned32, &[12_345_678])?;
//!
//! // Fill and transfer inside the PLC
//! session.fill("D1000", 100, 0)?;
//! session.transfer("D1000", "D2000", 100)?;
//! # Ok::<(), fins_engine::FinsError>(())
//! ```
//!
//! ## Raw Commands
//!
//! Commands without a typed wrapper go through [`Session::send_command`],
//! which returns the response data after the end code has been checked:
//!
//! ```no_run
//! # use fins_engine::{Session, SessionConfig};
//! # let mut session = Session::connect(SessionConfig::new("192.168.1.250", 0, 0))?;
//! // Clock read
//! let clock = session.send_command(0x07, 0x01, &[])?;
//! # Ok::<(), fins_engine::FinsError>(())
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`Result<T, FinsError>`]. Each error also maps to
//! a 16-bit code through [`FinsError::code`] (see [`codes`]).
//!
//! ```no_run
//! use fins_engine::{FinsError, Session, SessionConfig};
//!
//! let mut session = Session::connect(SessionConfig::new("192.168.1.250", 0, 0))?;
//!
//! match session.read_u16("D100", 10) {
//!     Ok(data) => println!("Data: {:?}", data),
//!     Err(FinsError::PlcError { main_code, sub_code }) => {
//!         println!("PLC error: main=0x{:02X}, sub=0x{:02X}", main_code, sub_code);
//!     }
//!     Err(FinsError::MaxErrorCount) => {
//!         // Connection closed, reconnect once the back-off has elapsed
//!         println!("too many errors");
//!     }
//!     Err(e) => println!("Error {:04X}: {}", e.code(), e),
//! }
//! # Ok::<(), FinsError>(())
//! ```
//!
//! ## Logging
//!
//! The engine emits [`tracing`](https://docs.rs/tracing) events: connects and
//! disconnects at `info`, every command at `debug`, raw frames at `trace` and
//! correlation failures at `warn`. No subscriber is installed.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod address;
pub mod area;
pub mod bcd;
mod command;
mod error;
mod header;
mod memory;
mod response;
mod session;
pub mod tcp;
mod transfer;

// Public re-exports
pub use address::MemoryAddress;
pub use area::{Access, AreaDescriptor, PlcFamily};
pub use bcd::{BcdKind, SignedBcd};
pub use command::{AreaAddress, Command, ForceAction, PlcMode};
pub use error::{codes, FinsError, Result};
pub use header::{FinsHeader, NodeAddress, FINS_HEADER_SIZE};
pub use memory::{MultiReadItem, MultiReadKind, MultiReadValue};
pub use response::FinsResponse;
pub use session::{CpuUnitData, Session, SessionConfig};
pub use tcp::{TcpErrorCode, DEFAULT_FINS_PORT};
pub use transfer::{Chunk, ChunkPlan, ElementKind, TransferCapacity};
