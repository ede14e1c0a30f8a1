//! Structured access tracing.
//!
//! Tracing is a diagnostic side channel: a sink observes completed
//! accesses and has no feedback into their results.

use crate::map::{Address, AddressSpace, Direction};

/// One completed access, as delivered to a trace sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AccessRecord {
    /// Transfer direction.
    pub direction: Direction,
    /// Access width in bytes.
    pub width: usize,
    /// Address space the access resolved through.
    pub space: AddressSpace,
    /// Base address of the access. Aligned transfers carry the physical
    /// core address after the endian fold; byte-wise transfers carry the
    /// logical base, since each byte folds individually.
    pub address: Address,
    /// Host-order value, zero-extended.
    pub value: u64,
}

/// Sink for per-access diagnostic records.
pub trait TraceSink {
    /// Records one completed access, in execution order.
    fn trace_access(&mut self, record: AccessRecord);
}

impl TraceSink for Vec<AccessRecord> {
    fn trace_access(&mut self, record: AccessRecord) {
        self.push(record);
    }
}
