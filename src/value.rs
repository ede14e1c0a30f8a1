//! Width-generic access values and target byte-order conversion.

use crate::endian::Endianness;
use crate::map::Address;

/// The target's native word type.
///
/// The word-sized entry points of the core are the [`AccessValue`]
/// instantiation at this alias; changing the target's word size means
/// changing this one definition.
pub type NativeWord = u64;

mod sealed {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
}

/// An unsigned integer moved by a single memory access.
///
/// Implemented exactly for the closed width set `u8`, `u16`, `u32` and
/// `u64` (the last doubling as [`NativeWord`]). Values are held in host
/// byte order everywhere inside the core and converted to or from target
/// order only at the transfer boundary.
pub trait AccessValue: Copy + Eq + std::fmt::Debug + sealed::Sealed {
    /// Access width in bytes; also the natural alignment boundary.
    const WIDTH: usize;
    /// `WIDTH − 1` as an address mask selecting the sub-width bits.
    const ADDRESS_MASK: Address;
    /// Fixed-size byte block holding one value in target memory order.
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default + Copy;

    /// Converts a host-order value into target-memory-order bytes.
    fn to_target_bytes(self, endianness: Endianness) -> Self::Bytes;

    /// Reassembles a host-order value from target-memory-order bytes.
    fn from_target_bytes(bytes: Self::Bytes, endianness: Endianness) -> Self;

    /// Zero-extends the value for trace records.
    fn as_u64(self) -> u64;
}

macro_rules! impl_access_value {
    ($ty:ty, $width:literal) => {
        impl AccessValue for $ty {
            const WIDTH: usize = $width;
            const ADDRESS_MASK: Address = $width - 1;
            type Bytes = [u8; $width];

            fn to_target_bytes(self, endianness: Endianness) -> Self::Bytes {
                match endianness {
                    Endianness::Big => self.to_be_bytes(),
                    Endianness::Little => self.to_le_bytes(),
                }
            }

            fn from_target_bytes(bytes: Self::Bytes, endianness: Endianness) -> Self {
                match endianness {
                    Endianness::Big => Self::from_be_bytes(bytes),
                    Endianness::Little => Self::from_le_bytes(bytes),
                }
            }

            fn as_u64(self) -> u64 {
                u64::from(self)
            }
        }
    };
}

impl_access_value!(u8, 1);
impl_access_value!(u16, 2);
impl_access_value!(u32, 4);
impl_access_value!(u64, 8);
