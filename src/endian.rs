//! Target endianness and the bi-endian XOR address fold.

use crate::map::Address;

/// Target byte order for value conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Endianness {
    /// Most-significant byte at the lowest address.
    Big,
    /// Least-significant byte at the lowest address.
    #[default]
    Little,
}

/// Number of distinct XOR groupings in the address-fold table.
pub const XOR_GROUP_COUNT: usize = 8;

/// Bi-endian XOR address-fold table.
///
/// A byte-addressed target that can switch data endianness at runtime
/// still presents a consistent byte-address view for sub-word accesses by
/// folding the low address bits: an access of width `w` uses
/// `addr = xaddr ^ masks[(w − 1) % XOR_GROUP_COUNT]`. With the table in
/// the identity state every address passes through untouched, so the
/// disabled configuration costs a single XOR with zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorAddressing {
    masks: [Address; XOR_GROUP_COUNT],
}

impl XorAddressing {
    /// The identity table: no folding in any width group.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            masks: [0; XOR_GROUP_COUNT],
        }
    }

    /// The table for the byte-swapped endian mode.
    ///
    /// Width `w` folds with mask `XOR_GROUP_COUNT − w`: bytes swap with
    /// their mirror inside the native word, halfwords with theirs, and a
    /// full-word access passes through unchanged.
    #[must_use]
    pub const fn swapped() -> Self {
        Self {
            masks: [7, 6, 5, 4, 3, 2, 1, 0],
        }
    }

    /// Selects the table for the given endian mode.
    #[must_use]
    pub const fn for_mode(swapped: bool) -> Self {
        if swapped {
            Self::swapped()
        } else {
            Self::identity()
        }
    }

    /// Folds the logical address of an access of `width` bytes.
    #[must_use]
    pub const fn apply(&self, xaddr: Address, width: usize) -> Address {
        xaddr ^ self.masks[(width - 1) % XOR_GROUP_COUNT]
    }
}

impl Default for XorAddressing {
    fn default() -> Self {
        Self::identity()
    }
}
