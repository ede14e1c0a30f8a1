//! Memory-access core for an instruction-set simulator.
//!
//! This crate implements the primitives every emulated load/store
//! instruction calls to move a width-sized value between the simulated
//! address space and CPU-visible storage: endian translation (including
//! bi-endian XOR address folding), the alignment-policy state machine,
//! transparent dispatch to device-backed I/O, and structured access
//! tracing. Address-space resolution is consumed through the
//! [`AddressMapper`] seam; a reference [`RegionMap`] implementation is
//! provided for embedding and tests.

/// Width-generic access values and target byte-order conversion.
pub mod value;
pub use value::{AccessValue, NativeWord};

/// Target endianness and the bi-endian XOR address fold.
pub mod endian;
pub use endian::{Endianness, XorAddressing, XOR_GROUP_COUNT};

/// Alignment discipline configuration and per-access policy resolution.
pub mod align;
pub use align::{AlignmentConfig, AlignmentDecision, AlignmentMode};

/// Address spaces, mapping resolution, and device-backed I/O.
pub mod map;
pub use map::{Address, AddressMapper, AddressSpace, Backing, Device, Direction, RegionMap};

/// Fault taxonomy for program-visible faults and internal errors.
pub mod fault;
pub use fault::{AccessError, InternalError, MemoryFault, TranslationFault};

/// Structured access tracing.
pub mod trace;
pub use trace::{AccessRecord, TraceSink};

/// The orchestrating memory-access core.
pub mod access;
pub use access::{CoreConfig, CpuContext, MemoryCore};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
