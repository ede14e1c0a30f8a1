//! Fault taxonomy: program-visible faults versus internal errors.
//!
//! The two channels are deliberately disjoint. A [`MemoryFault`] models a
//! condition the simulated program caused and is expected to be turned
//! into the target architecture's own exception semantics by the
//! instruction-dispatch loop. An [`InternalError`] indicates a bug in the
//! surrounding simulator's configuration or in a collaborator's contract
//! and must abort the run. [`AccessError`] joins them so one match at the
//! call site tells the two apart.

use thiserror::Error;

use crate::map::{Address, AddressSpace, Direction};

/// Address resolution failure reported by an [`crate::AddressMapper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("{direction} of {len} bytes at {space}:{address:#x} has no mapping")]
pub struct TranslationFault {
    /// Address space the resolution ran in.
    pub space: AddressSpace,
    /// Physical core address that failed to resolve.
    pub address: Address,
    /// Requested access length in bytes.
    pub len: usize,
    /// Transfer direction of the failed access.
    pub direction: Direction,
}

/// Simulated-program-visible memory fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryFault {
    /// The access did not resolve to a valid mapping.
    #[error("{fault} (insn {instruction_address:#x})")]
    Translation {
        /// The mapper's resolution failure.
        fault: TranslationFault,
        /// Address of the instruction that issued the access.
        instruction_address: Address,
    },
    /// An unaligned access under the strict discipline, or a byte-wise
    /// fallback that moved the wrong number of bytes.
    #[error(
        "unaligned {direction} of width {width} at {space}:{address:#x} \
         (insn {instruction_address:#x})"
    )]
    UnalignedAccess {
        /// Transfer direction of the faulting access.
        direction: Direction,
        /// Access width in bytes.
        width: usize,
        /// Address space of the faulting access.
        space: AddressSpace,
        /// The unaligned address.
        address: Address,
        /// Address of the instruction that issued the access.
        instruction_address: Address,
    },
}

/// Host-side contract or configuration violation. Never visible to the
/// simulated program; the run must abort with the carried diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InternalError {
    /// The mixed discipline marker was reached as an effective per-access
    /// alignment mode.
    #[error("mixed alignment discipline reached during an unaligned {direction} of width {width}")]
    MixedAlignment {
        /// Transfer direction of the offending access.
        direction: Direction,
        /// Access width in bytes.
        width: usize,
    },
    /// A device callback moved a byte count other than the access width.
    #[error("device {direction} of width {width} moved {moved} bytes; exact-width service is required")]
    DeviceShortTransfer {
        /// Transfer direction of the offending access.
        direction: Direction,
        /// Access width in bytes.
        width: usize,
        /// Byte count the callback reported.
        moved: usize,
    },
}

/// Abnormal outcome of one access: either channel of the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessError {
    /// Simulated-program-visible fault.
    #[error(transparent)]
    Fault(#[from] MemoryFault),
    /// Host-side bug; abort the run.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl AccessError {
    /// `true` when the simulated program trapped, `false` when the host
    /// or its configuration is at fault.
    #[must_use]
    pub const fn is_program_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}
