//! FINS command bodies.
//!
//! A [`Command`] is the function code pair plus the body that follows the
//! 12-byte header. The session stamps the header (addresses and service ID)
//! when the command is executed, so the same command can be sent any number
//! of times.
//!
//! # Command Types
//!
//! ## Memory Operations
//! - [`Command::memory_read`] - Memory area read (0x01 0x01)
//! - [`Command::memory_write`] - Memory area write (0x01 0x02)
//! - [`Command::memory_fill`] - Memory area fill (0x01 0x03)
//! - [`Command::multiple_read`] - Multiple memory area read (0x01 0x04)
//! - [`Command::memory_transfer`] - Memory area transfer (0x01 0x05)
//!
//! ## PLC Control
//! - [`Command::run`] - Put the PLC into monitor or run mode (0x04 0x01)
//! - [`Command::stop`] - Stop the PLC (0x04 0x02)
//! - [`Command::cpu_unit_data_read`] - Read the CPU model and version (0x05 0x01)
//!
//! ## Forced I/O
//! - [`Command::forced_set_reset`] - Force bits (0x23 0x01)
//! - [`Command::forced_cancel`] - Cancel all forced bits (0x23 0x02)
//!
//! # Example
//!
//! ```
//! use fins_engine::{AreaAddress, Command};
//!
//! // Read 10 words from DM100
//! let cmd = Command::memory_read(AreaAddress::word(0x82, 100), 10);
//! assert_eq!((cmd.mrc, cmd.src), (0x01, 0x01));
//! assert_eq!(cmd.body, [0x82, 0x00, 0x64, 0x00, 0x00, 0x0A]);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Memory Area Access main request code (MRC).
pub const MRC_MEMORY: u8 = 0x01;
/// Memory Area Read sub request code (SRC).
pub const SRC_MEMORY_READ: u8 = 0x01;
/// Memory Area Write sub request code (SRC).
pub const SRC_MEMORY_WRITE: u8 = 0x02;
/// Memory Area Fill sub request code (SRC).
pub const SRC_MEMORY_FILL: u8 = 0x03;
/// Multiple Memory Area Read sub request code (SRC).
pub const SRC_MULTIPLE_READ: u8 = 0x04;
/// Memory Area Transfer sub request code (SRC).
pub const SRC_MEMORY_TRANSFER: u8 = 0x05;
/// Operating Mode Change main request code (MRC).
pub const MRC_OPERATING_MODE: u8 = 0x04;
/// Run sub request code (SRC).
pub const SRC_RUN: u8 = 0x01;
/// Stop sub request code (SRC).
pub const SRC_STOP: u8 = 0x02;
/// Machine Configuration Reading main request code (MRC).
pub const MRC_CONFIGURATION: u8 = 0x05;
/// CPU Unit Data Read sub request code (SRC).
pub const SRC_CPU_UNIT_DATA_READ: u8 = 0x01;
/// Forced Status main request code (MRC).
pub const MRC_FORCED: u8 = 0x23;
/// Forced Set/Reset sub request code (SRC).
pub const SRC_FORCED_SET_RESET: u8 = 0x01;
/// Forced Set/Reset Cancel sub request code (SRC).
pub const SRC_FORCED_CANCEL: u8 = 0x02;

/// Program number selecting the program currently loaded.
const CURRENT_PROGRAM: [u8; 2] = [0xFF, 0xFF];

/// Location of an element on the wire: area code, word and bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaAddress {
    /// FINS memory area code.
    pub area_code: u8,
    /// Word address within the area.
    pub word: u16,
    /// Bit position (0-15) for bit areas, 0 for word areas.
    pub bit: u8,
}

impl AreaAddress {
    /// Creates a word address (bit = 0).
    pub fn word(area_code: u8, word: u16) -> Self {
        Self {
            area_code,
            word,
            bit: 0,
        }
    }

    /// Creates a bit address.
    pub fn bit(area_code: u8, word: u16, bit: u8) -> Self {
        Self {
            area_code,
            word,
            bit,
        }
    }

    /// Serializes to 4 bytes (area, word high, word low, bit).
    pub fn to_bytes(self) -> [u8; 4] {
        let [hi, lo] = self.word.to_be_bytes();
        [self.area_code, hi, lo, self.bit]
    }
}

/// Operating mode selected by the run command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlcMode {
    /// Monitor mode - run with online editing and forcing allowed.
    Monitor,
    /// Run mode - normal execution.
    Run,
}

impl PlcMode {
    /// Returns the FINS code for this mode.
    pub fn code(self) -> u8 {
        match self {
            PlcMode::Monitor => 0x02,
            PlcMode::Run => 0x04,
        }
    }
}

/// Action applied to one bit by the forced set/reset command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ForceAction {
    /// Force the bit OFF.
    Reset,
    /// Force the bit ON.
    Set,
    /// Release the forced state and leave the bit OFF.
    ReleaseOff,
    /// Release the forced state and leave the bit ON.
    ReleaseOn,
    /// Release the forced state, keeping the current value.
    Release,
}

impl ForceAction {
    /// Returns the FINS code for this action.
    pub fn code(self) -> u16 {
        match self {
            ForceAction::Reset => 0x0000,
            ForceAction::Set => 0x0001,
            ForceAction::ReleaseOff => 0x8000,
            ForceAction::ReleaseOn => 0x8001,
            ForceAction::Release => 0xFFFF,
        }
    }

    /// Decodes a wire action code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0000 => Some(ForceAction::Reset),
            0x0001 => Some(ForceAction::Set),
            0x8000 => Some(ForceAction::ReleaseOff),
            0x8001 => Some(ForceAction::ReleaseOn),
            0xFFFF => Some(ForceAction::Release),
            _ => None,
        }
    }
}

/// A FINS command: function codes plus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Main request code.
    pub mrc: u8,
    /// Sub request code.
    pub src: u8,
    /// Bytes following the header.
    pub body: Vec<u8>,
}

impl Command {
    /// Creates a command with an arbitrary body.
    pub fn new(mrc: u8, src: u8, body: Vec<u8>) -> Self {
        Self { mrc, src, body }
    }

    /// Memory area read of `count` elements starting at `start`.
    pub fn memory_read(start: AreaAddress, count: u16) -> Self {
        let mut body = Vec::with_capacity(6);
        body.extend_from_slice(&start.to_bytes());
        body.extend_from_slice(&count.to_be_bytes());
        Self::new(MRC_MEMORY, SRC_MEMORY_READ, body)
    }

    /// Memory area write of `count` elements starting at `start`.
    ///
    /// `data` holds the encoded elements: two bytes per word, one per bit.
    pub fn memory_write(start: AreaAddress, count: u16, data: &[u8]) -> Self {
        let mut body = Vec::with_capacity(6 + data.len());
        body.extend_from_slice(&start.to_bytes());
        body.extend_from_slice(&count.to_be_bytes());
        body.extend_from_slice(data);
        Self::new(MRC_MEMORY, SRC_MEMORY_WRITE, body)
    }

    /// Memory area fill of `count` words with `value`.
    pub fn memory_fill(start: AreaAddress, count: u16, value: u16) -> Self {
        let mut body = Vec::with_capacity(8);
        body.extend_from_slice(&start.to_bytes());
        body.extend_from_slice(&count.to_be_bytes());
        body.extend_from_slice(&value.to_be_bytes());
        Self::new(MRC_MEMORY, SRC_MEMORY_FILL, body)
    }

    /// Multiple memory area read of the given elements.
    pub fn multiple_read(items: &[AreaAddress]) -> Self {
        let body = items.iter().flat_map(|item| item.to_bytes()).collect();
        Self::new(MRC_MEMORY, SRC_MULTIPLE_READ, body)
    }

    /// Memory area transfer of `count` words from `source` to `destination`.
    pub fn memory_transfer(source: AreaAddress, destination: AreaAddress, count: u16) -> Self {
        let mut body = Vec::with_capacity(10);
        body.extend_from_slice(&source.to_bytes());
        body.extend_from_slice(&destination.to_bytes());
        body.extend_from_slice(&count.to_be_bytes());
        Self::new(MRC_MEMORY, SRC_MEMORY_TRANSFER, body)
    }

    /// Switches the PLC into `mode`.
    pub fn run(mode: PlcMode) -> Self {
        let mut body = CURRENT_PROGRAM.to_vec();
        body.push(mode.code());
        Self::new(MRC_OPERATING_MODE, SRC_RUN, body)
    }

    /// Stops the PLC.
    pub fn stop() -> Self {
        Self::new(MRC_OPERATING_MODE, SRC_STOP, CURRENT_PROGRAM.to_vec())
    }

    /// Reads the CPU unit data block.
    pub fn cpu_unit_data_read() -> Self {
        Self::new(MRC_CONFIGURATION, SRC_CPU_UNIT_DATA_READ, Vec::new())
    }

    /// Forced set/reset of the given bits.
    pub fn forced_set_reset(bits: &[(ForceAction, AreaAddress)]) -> Self {
        let mut body = Vec::with_capacity(2 + bits.len() * 6);
        body.extend_from_slice(&(bits.len() as u16).to_be_bytes());
        for (action, address) in bits {
            body.extend_from_slice(&action.code().to_be_bytes());
            body.extend_from_slice(&address.to_bytes());
        }
        Self::new(MRC_FORCED, SRC_FORCED_SET_RESET, body)
    }

    /// Cancels every forced bit.
    pub fn forced_cancel() -> Self {
        Self::new(MRC_FORCED, SRC_FORCED_CANCEL, Vec::new())
    }
}
