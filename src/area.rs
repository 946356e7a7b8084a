//! Memory area capability table.
//!
//! Every PLC family exposes its memory through FINS area codes. The same
//! mnemonic maps to different codes depending on whether it is accessed per
//! bit or per word, and whether the forced-status shadow is requested. Some
//! areas are only partially writable: the auxiliary area `A` is read-only
//! below word 448, which is modeled as two overlapping rows with different
//! capabilities.
//!
//! | Mnemonic | Area | Aliases |
//! |----------|------|---------|
//! | `CIO` | Core I/O | |
//! | `W` | Work area | `WR` |
//! | `H` | Holding area | `HR` |
//! | `A` | Auxiliary area | `AR` |
//! | `TIM` | Timers | `T` |
//! | `CNT` | Counters | `C` |
//! | `DM` | Data memory | `D` |
//! | `E`, `E0_`..`EC_` | Extended data memory | |
//! | `EM` | EM current bank number | |
//! | `TK`, `TKS` | Task flags | |
//! | `IR`, `DR` | Index and data registers | |
//! | `C1M`, `CER`, `ON`, ... | Clock pulses and condition flags | |
//!
//! # Example
//!
//! ```
//! use fins_engine::{area, Access, MemoryAddress, PlcFamily};
//!
//! let addr: MemoryAddress = "D100".parse().unwrap();
//! let row = area::resolve(PlcFamily::CsCj, &addr, 16, Access::READ, false).unwrap();
//! assert_eq!(row.area_code, 0x82);
//! assert_eq!(row.wire_address(addr.main()), 100);
//! ```

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::address::MemoryAddress;

/// Addressing family of the connected PLC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlcFamily {
    /// Not identified yet; no area resolves.
    #[default]
    Unknown,
    /// CV series addressing.
    Cv,
    /// CS and CJ series addressing.
    CsCj,
}

impl PlcFamily {
    /// Derives the family from a CPU model name such as `CJ2M-CPU31`.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::PlcFamily;
    ///
    /// assert_eq!(PlcFamily::from_model("CJ2M-CPU31"), PlcFamily::CsCj);
    /// assert_eq!(PlcFamily::from_model("CV1000"), PlcFamily::Cv);
    /// assert_eq!(PlcFamily::from_model("NX1P2"), PlcFamily::Unknown);
    /// ```
    pub fn from_model(model: &str) -> Self {
        let bytes = model.as_bytes();
        match bytes.get(..2) {
            Some(b"CS") | Some(b"CJ") => Self::CsCj,
            Some(b"CV") => Self::Cv,
            _ => Self::Unknown,
        }
    }
}

/// Capability bitmask of a memory area.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Access(u8);

impl Access {
    /// No capability.
    pub const NONE: Self = Self(0x00);
    /// Memory area read.
    pub const READ: Self = Self(0x01);
    /// Memory area write.
    pub const WRITE: Self = Self(0x02);
    /// Memory area fill.
    pub const FILL: Self = Self(0x04);
    /// Multiple memory area read.
    pub const MULTI_READ: Self = Self(0x08);
    /// Source of a memory area transfer.
    pub const TRANSFER_SOURCE: Self = Self(0x10);
    /// Destination of a memory area transfer.
    pub const TRANSFER_DEST: Self = Self(0x20);
    /// Forced set/reset.
    pub const FORCE: Self = Self(0x40);
    /// Every capability of a plain word area.
    pub const ALL_WORD: Self = Self(0x3F);

    /// Raw bit pattern.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every flag of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether at least one flag of `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for Access {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Access {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

const ACCESS_NAMES: [(Access, &str); 7] = [
    (Access::READ, "read"),
    (Access::WRITE, "write"),
    (Access::FILL, "fill"),
    (Access::MULTI_READ, "multi-read"),
    (Access::TRANSFER_SOURCE, "transfer-source"),
    (Access::TRANSFER_DEST, "transfer-destination"),
    (Access::FORCE, "force"),
];

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in ACCESS_NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Access({self})")
    }
}

/// One row of the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaDescriptor {
    /// Family the row applies to.
    pub family: PlcFamily,
    /// Area mnemonic.
    pub mnemonic: &'static str,
    /// Element width in bits: 1 or 16.
    pub bits: u8,
    /// Bytes per element in a response.
    pub element_len: u8,
    /// FINS memory area code.
    pub area_code: u8,
    /// Lowest valid word number.
    pub low_id: u32,
    /// Highest valid word number.
    pub high_id: u32,
    /// Wire address of `low_id` (word << 8 | bit).
    pub low_addr: u32,
    /// Wire address of `high_id` (word << 8 | bit).
    pub high_addr: u32,
    /// Supported operations.
    pub access: Access,
    /// Whether this is the forced-status shadow of the area.
    pub forced: bool,
}

impl AreaDescriptor {
    /// Translates a word number into the on-wire word address.
    pub fn wire_address(&self, main: u32) -> u32 {
        main.saturating_sub(self.low_id) + (self.low_addr >> 8)
    }

    /// Whether `main` lies inside this row's id range.
    pub fn contains(&self, main: u32) -> bool {
        (self.low_id..=self.high_id).contains(&main)
    }
}

const RD: Access = Access::READ;
const WR: Access = Access::WRITE;
const FILL: Access = Access::FILL;
const MRD: Access = Access::MULTI_READ;
const TRS: Access = Access::TRANSFER_SOURCE;
const TRD: Access = Access::TRANSFER_DEST;
const FRC: Access = Access::FORCE;
const ALL: Access = Access::ALL_WORD;

const fn acc(flags: &[Access]) -> Access {
    let mut out = Access::NONE;
    let mut i = 0;
    while i < flags.len() {
        out = out.union(flags[i]);
        i += 1;
    }
    out
}

#[allow(clippy::too_many_arguments)]
const fn row(
    family: PlcFamily,
    mnemonic: &'static str,
    bits: u8,
    element_len: u8,
    area_code: u8,
    ids: (u32, u32),
    addrs: (u32, u32),
    access: Access,
    forced: bool,
) -> AreaDescriptor {
    AreaDescriptor {
        family,
        mnemonic,
        bits,
        element_len,
        area_code,
        low_id: ids.0,
        high_id: ids.1,
        low_addr: addrs.0,
        high_addr: addrs.1,
        access,
        forced,
    }
}

const CS: PlcFamily = PlcFamily::CsCj;
const CV: PlcFamily = PlcFamily::Cv;

const BIT_RW: Access = acc(&[RD, WR, MRD]);
const BIT_RWF: Access = acc(&[RD, WR, MRD, FRC]);
const BIT_RF: Access = acc(&[RD, MRD, FRC]);
const RO: Access = acc(&[RD, MRD]);
const REG: Access = acc(&[RD, WR, MRD]);

const fn flag(mnemonic: &'static str, addr: u32) -> AreaDescriptor {
    row(CS, mnemonic, 1, 1, 0x07, (0, 0), (addr, addr), RO, false)
}

/// Every memory area known for every family.
pub static AREAS: &[AreaDescriptor] = &[
    row(CS, "CIO", 1, 1, 0x30, (0, 6143), (0x000000, 0x17FF0F), BIT_RWF, false),
    row(CS, "CIO", 1, 1, 0x70, (0, 6143), (0x000000, 0x17FF0F), MRD, true),
    row(CS, "CIO", 16, 2, 0xB0, (0, 6143), (0x000000, 0x17FF00), ALL, false),
    row(CS, "CIO", 16, 4, 0xF0, (0, 6143), (0x000000, 0x17FF00), MRD, true),
    row(CS, "W", 1, 1, 0x31, (0, 511), (0x000000, 0x01FF0F), BIT_RWF, false),
    row(CS, "W", 1, 1, 0x71, (0, 511), (0x000000, 0x01FF0F), MRD, true),
    row(CS, "W", 16, 2, 0xB1, (0, 511), (0x000000, 0x01FF00), ALL, false),
    row(CS, "W", 16, 4, 0xF1, (0, 511), (0x000000, 0x01FF00), MRD, true),
    row(CS, "H", 1, 1, 0x32, (0, 511), (0x000000, 0x01FF0F), BIT_RWF, false),
    row(CS, "H", 1, 1, 0x72, (0, 511), (0x000000, 0x01FF0F), MRD, true),
    row(CS, "H", 16, 2, 0xB2, (0, 511), (0x000000, 0x01FF00), ALL, false),
    row(CS, "H", 16, 4, 0xF2, (0, 511), (0x000000, 0x01FF00), MRD, true),
    row(CS, "A", 1, 1, 0x33, (0, 959), (0x000000, 0x03BF0F), RO, false),
    row(CS, "A", 1, 1, 0x33, (448, 959), (0x01C000, 0x03BF0F), WR, false),
    row(CS, "A", 16, 2, 0xB3, (0, 959), (0x000000, 0x03BF00), acc(&[RD, MRD, TRS]), false),
    row(CS, "A", 16, 2, 0xB3, (448, 959), (0x01C000, 0x03BF00), acc(&[WR, FILL, TRD]), false),
    row(CS, "TIM", 1, 1, 0x09, (0, 4095), (0x000000, 0x0FFF00), BIT_RF, false),
    row(CS, "TIM", 1, 1, 0x49, (0, 4095), (0x000000, 0x0FFF00), MRD, true),
    row(CS, "TIM", 16, 2, 0x89, (0, 4095), (0x000000, 0x0FFF00), ALL, false),
    row(CS, "CNT", 1, 1, 0x09, (0, 4095), (0x800000, 0x8FFF00), BIT_RF, false),
    row(CS, "CNT", 1, 1, 0x49, (0, 4095), (0x800000, 0x8FFF00), MRD, true),
    row(CS, "CNT", 16, 2, 0x89, (0, 4095), (0x800000, 0x8FFF00), ALL, false),
    row(CS, "DM", 1, 1, 0x02, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "DM", 16, 2, 0x82, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E0_", 1, 1, 0x20, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "E1_", 1, 1, 0x21, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "E2_", 1, 1, 0x22, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "E3_", 1, 1, 0x23, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "E4_", 1, 1, 0x24, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "E5_", 1, 1, 0x25, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "E6_", 1, 1, 0x26, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "E7_", 1, 1, 0x27, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "E8_", 1, 1, 0x28, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "E9_", 1, 1, 0x29, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "EA_", 1, 1, 0x2A, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "EB_", 1, 1, 0x2B, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "EC_", 1, 1, 0x2C, (0, 32767), (0x000000, 0x7FFF0F), BIT_RW, false),
    row(CS, "E0_", 16, 2, 0xA0, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E1_", 16, 2, 0xA1, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E2_", 16, 2, 0xA2, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E3_", 16, 2, 0xA3, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E4_", 16, 2, 0xA4, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E5_", 16, 2, 0xA5, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E6_", 16, 2, 0xA6, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E7_", 16, 2, 0xA7, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E8_", 16, 2, 0xA8, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E9_", 16, 2, 0xA9, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "EA_", 16, 2, 0xAA, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "EB_", 16, 2, 0xAB, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "EC_", 16, 2, 0xAC, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "E", 16, 2, 0x98, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CS, "EM", 16, 2, 0xBC, (0, 0), (0x0F0000, 0x0F0000), RO, false),
    row(CS, "TK", 1, 1, 0x06, (0, 31), (0x000000, 0x001F00), RO, false),
    row(CS, "TKS", 1, 1, 0x46, (0, 31), (0x000000, 0x001F00), RO, false),
    row(CS, "IR", 16, 4, 0xDC, (0, 15), (0x010000, 0x010F00), REG, false),
    row(CS, "DR", 16, 2, 0xBC, (0, 15), (0x020000, 0x020F00), REG, false),
    flag("C1M", 0x000000),
    flag("C1S", 0x000100),
    flag("C02", 0x000200),
    flag("C01", 0x000300),
    flag("C22", 0x000400),
    flag("CER", 0x100000),
    flag("CCY", 0x100100),
    flag("CGT", 0x100200),
    flag("CEQ", 0x100300),
    flag("CLT", 0x100400),
    flag("NEG", 0x100500),
    flag("COF", 0x100600),
    flag("CUF", 0x100700),
    flag("CGE", 0x100800),
    flag("CNE", 0x100900),
    flag("CLE", 0x100A00),
    flag("OFF", 0x100E00),
    flag("ON", 0x100F00),
    row(CV, "CIO", 1, 1, 0x00, (0, 2555), (0x000000, 0x09FB0F), BIT_RF, false),
    row(CV, "CIO", 1, 1, 0x40, (0, 2555), (0x000000, 0x09FB0F), MRD, true),
    row(CV, "CIO", 16, 2, 0x80, (0, 2555), (0x000000, 0x09FB00), ALL, false),
    row(CV, "CIO", 16, 2, 0xC0, (0, 2555), (0x000000, 0x09FB00), MRD, true),
    row(CV, "A", 1, 1, 0x00, (0, 959), (0x0B0000, 0x0EBF0F), RO, false),
    row(CV, "A", 1, 1, 0x00, (448, 959), (0x0CC000, 0x0EBF0F), Access::NONE, false),
    row(CV, "A", 16, 2, 0x80, (0, 959), (0x0B0000, 0x0EBF00), acc(&[RD, MRD, TRS]), false),
    row(CV, "A", 16, 2, 0x80, (448, 959), (0x0CC000, 0x0EBF00), acc(&[WR, FILL, TRD]), false),
    row(CV, "TIM", 1, 1, 0x01, (0, 2047), (0x000000, 0x07FF00), BIT_RF, false),
    row(CV, "TIM", 1, 1, 0x41, (0, 2047), (0x000000, 0x07FF00), MRD, true),
    row(CV, "TIM", 16, 2, 0x81, (0, 2047), (0x000000, 0x07FF00), ALL, false),
    row(CV, "CNT", 1, 1, 0x01, (0, 2047), (0x080000, 0x0FFF00), BIT_RF, false),
    row(CV, "CNT", 1, 1, 0x41, (0, 2047), (0x080000, 0x0FFF00), MRD, true),
    row(CV, "CNT", 16, 2, 0x81, (0, 2047), (0x080000, 0x0FFF00), ALL, false),
    row(CV, "DM", 16, 2, 0x82, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CV, "E0_", 16, 2, 0x90, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CV, "E1_", 16, 2, 0x91, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CV, "E2_", 16, 2, 0x92, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CV, "E3_", 16, 2, 0x93, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CV, "E4_", 16, 2, 0x94, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CV, "E5_", 16, 2, 0x95, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CV, "E6_", 16, 2, 0x96, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CV, "E7_", 16, 2, 0x97, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CV, "E", 16, 2, 0x98, (0, 32767), (0x000000, 0x7FFF00), ALL, false),
    row(CV, "EM", 16, 2, 0x9C, (0, 0), (0x000600, 0x000600), RO, false),
    row(CV, "DR", 16, 2, 0x9C, (0, 2), (0x000300, 0x000500), REG, false),
];

/// Common alternative spellings of table mnemonics.
const ALIASES: [(&str, &str); 6] = [
    ("D", "DM"),
    ("WR", "W"),
    ("HR", "H"),
    ("AR", "A"),
    ("T", "TIM"),
    ("C", "CNT"),
];

/// Canonical table mnemonic for `mnemonic`.
pub fn canonical_mnemonic(mnemonic: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == mnemonic)
        .map_or(mnemonic, |&(_, name)| name)
}

/// Finds the area row serving `address`.
///
/// A row matches when its family and element width equal the request, its
/// capabilities share at least one flag with `access`, its forced flag equals
/// `forced`, its id range contains the word number, and its mnemonic equals
/// the (alias resolved) mnemonic of the address. The first match wins.
///
/// # Example
///
/// ```
/// use fins_engine::{area, Access, MemoryAddress, PlcFamily};
///
/// let low: MemoryAddress = "A100".parse().unwrap();
/// let high: MemoryAddress = "A500".parse().unwrap();
///
/// // the lower auxiliary area is read-only
/// assert!(area::resolve(PlcFamily::CsCj, &low, 16, Access::WRITE, false).is_none());
/// assert!(area::resolve(PlcFamily::CsCj, &high, 16, Access::WRITE, false).is_some());
/// ```
pub fn resolve(
    family: PlcFamily,
    address: &MemoryAddress,
    bits: u8,
    access: Access,
    forced: bool,
) -> Option<&'static AreaDescriptor> {
    let mnemonic = canonical_mnemonic(address.mnemonic());
    AREAS.iter().find(|area| {
        area.family == family
            && area.bits == bits
            && area.access.intersects(access)
            && area.forced == forced
            && area.contains(address.main())
            && area.mnemonic == mnemonic
    })
}
