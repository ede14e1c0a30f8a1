//! Address spaces, mapping resolution, and device-backed I/O.

use std::fmt;

use crate::access::CpuContext;
use crate::fault::TranslationFault;

/// A simulated address, in bytes.
pub type Address = u64;

/// Opaque tag selecting which address-space table an access resolves
/// through. Passed through unchanged by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressSpace {
    /// Instruction fetch space.
    Instruction,
    /// Data load/store space.
    Data,
    /// Peripheral I/O space.
    Io,
}

impl AddressSpace {
    /// Short label used in traces and fault messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instruction => "insn",
            Self::Data => "data",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transfer direction of one access.
///
/// Purely informational: it selects which permission path a mapper checks
/// and how faults and trace records are labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Direction {
    /// Transfer from the address space into the CPU.
    Read,
    /// Transfer from the CPU into the address space.
    Write,
}

impl Direction {
    /// Short label used in traces and fault messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback I/O service for device-backed regions.
///
/// A callback reports the number of bytes it moved. The aligned core
/// paths require exact-width service and treat anything else as a fatal
/// internal error; the byte-wise buffer path treats a short count as a
/// stop condition.
pub trait Device {
    /// Reads `buffer.len()` bytes at `address` in the device's own space.
    fn io_read(&mut self, space: u32, address: Address, buffer: &mut [u8]) -> usize;

    /// Writes `buffer.len()` bytes at `address` in the device's own space.
    fn io_write(&mut self, space: u32, address: Address, buffer: &[u8], ctx: &CpuContext)
        -> usize;
}

/// Resolution of one access: exactly one kind of backing.
pub enum Backing<'a> {
    /// Direct view into a backing buffer, covering at least the requested
    /// length at the resolved address.
    Direct(&'a mut [u8]),
    /// Device-backed region serviced through callback I/O.
    Device {
        /// The servicing device.
        device: &'a mut dyn Device,
        /// The device's own space identifier for this region.
        space: u32,
    },
}

impl fmt::Debug for Backing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(buffer) => f.debug_tuple("Direct").field(&buffer.len()).finish(),
            Self::Device { space, .. } => f.debug_struct("Device").field("space", space).finish(),
        }
    }
}

/// Resolves `(space, address, length)` to a concrete backing.
///
/// Resolution happens fresh on every access; the core never caches a
/// returned descriptor.
pub trait AddressMapper {
    /// Resolves an access of `len` bytes at `address` in `space`.
    ///
    /// # Errors
    ///
    /// Returns a [`TranslationFault`] when no region covers the full
    /// access for the given direction.
    fn resolve(
        &mut self,
        space: AddressSpace,
        address: Address,
        len: usize,
        direction: Direction,
    ) -> Result<Backing<'_>, TranslationFault>;
}

enum RegionBacking {
    Ram(Box<[u8]>),
    Device {
        device: Box<dyn Device>,
        device_space: u32,
    },
}

impl fmt::Debug for RegionBacking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ram(bytes) => f.debug_tuple("Ram").field(&bytes.len()).finish(),
            Self::Device { device_space, .. } => f
                .debug_struct("Device")
                .field("device_space", device_space)
                .finish(),
        }
    }
}

#[derive(Debug)]
struct Region {
    space: AddressSpace,
    start: Address,
    len: usize,
    backing: RegionBacking,
}

impl Region {
    fn contains(&self, address: Address, len: usize) -> bool {
        if address < self.start {
            return false;
        }
        let Ok(offset) = usize::try_from(address - self.start) else {
            return false;
        };
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.len)
    }

    fn offset_of(&self, address: Address) -> Option<usize> {
        usize::try_from(address.checked_sub(self.start)?).ok()
    }
}

/// Reference [`AddressMapper`]: a linear list of per-space regions, each
/// backed by zero-initialized RAM or by a [`Device`].
///
/// An access must fall entirely inside one region; anything else is a
/// translation fault. Embedding simulators with richer region semantics
/// substitute their own mapper at the trait seam.
#[derive(Debug, Default)]
pub struct RegionMap {
    regions: Vec<Region>,
}

impl RegionMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    /// Maps `len` bytes of zero-filled RAM at `start` in `space`.
    pub fn add_ram(&mut self, space: AddressSpace, start: Address, len: usize) {
        self.regions.push(Region {
            space,
            start,
            len,
            backing: RegionBacking::Ram(vec![0; len].into_boxed_slice()),
        });
    }

    /// Maps `len` bytes at `start` in `space` onto a device, addressed in
    /// the device's own `device_space`.
    pub fn attach_device(
        &mut self,
        space: AddressSpace,
        start: Address,
        len: usize,
        device_space: u32,
        device: Box<dyn Device>,
    ) {
        self.regions.push(Region {
            space,
            start,
            len,
            backing: RegionBacking::Device {
                device,
                device_space,
            },
        });
    }

    /// Raw view of `len` RAM bytes at `address`, when a RAM region covers
    /// them. Intended for inspection and test fixtures, not for access
    /// paths.
    #[must_use]
    pub fn ram_bytes(&self, space: AddressSpace, address: Address, len: usize) -> Option<&[u8]> {
        let region = self
            .regions
            .iter()
            .find(|region| region.space == space && region.contains(address, len))?;
        let RegionBacking::Ram(bytes) = &region.backing else {
            return None;
        };
        let offset = region.offset_of(address)?;
        bytes.get(offset..offset + len)
    }
}

impl AddressMapper for RegionMap {
    fn resolve(
        &mut self,
        space: AddressSpace,
        address: Address,
        len: usize,
        direction: Direction,
    ) -> Result<Backing<'_>, TranslationFault> {
        let fault = TranslationFault {
            space,
            address,
            len,
            direction,
        };
        let Some(region) = self
            .regions
            .iter_mut()
            .find(|region| region.space == space && region.contains(address, len))
        else {
            return Err(fault);
        };
        let offset = region.offset_of(address).ok_or(fault)?;
        match &mut region.backing {
            RegionBacking::Ram(bytes) => Ok(Backing::Direct(&mut bytes[offset..offset + len])),
            RegionBacking::Device {
                device,
                device_space,
            } => Ok(Backing::Device {
                device: device.as_mut(),
                space: *device_space,
            }),
        }
    }
}
