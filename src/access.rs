//! The orchestrating memory-access core.
//!
//! [`MemoryCore`] composes the endian fold, the alignment policy, mapping
//! resolution, and device dispatch into the four operation families every
//! emulated load/store calls: aligned read/write and unaligned
//! read/write, each generic over the access width. Values are in host
//! order on this side of every call; conversion to and from target order
//! happens exactly once, at the transfer boundary.

use crate::align::{AlignmentConfig, AlignmentDecision, AlignmentMode};
use crate::endian::{Endianness, XorAddressing};
use crate::fault::{AccessError, InternalError, MemoryFault};
use crate::map::{Address, AddressMapper, AddressSpace, Backing, Direction};
use crate::trace::{AccessRecord, TraceSink};
use crate::value::AccessValue;

/// Configuration threaded into a [`MemoryCore`] at construction.
///
/// The fields play the role of the build-time flags of a hardware
/// simulator: they are fixed for the lifetime of the core, except where a
/// capability explicitly admits runtime selection (see
/// [`AlignmentConfig::selectable`] and [`MemoryCore::set_xor_endian`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Target byte order for value conversion.
    pub endianness: Endianness,
    /// Enables bi-endian XOR address-folding support. When off, the fold
    /// is pinned to the identity and endian-mode switches have no effect
    /// on addressing.
    pub xor_endian: bool,
    /// Alignment capability and current discipline.
    pub alignment: AlignmentConfig,
}

/// Per-access CPU attribution: the instruction issuing the access and
/// this CPU's runtime trace enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuContext {
    /// Address of the instruction issuing the access, carried into fault
    /// records for attribution.
    pub instruction_address: Address,
    /// Runtime trace enable for this CPU.
    pub trace_enabled: bool,
}

impl CpuContext {
    /// Context for the instruction at `instruction_address`, tracing off.
    #[must_use]
    pub const fn at(instruction_address: Address) -> Self {
        Self {
            instruction_address,
            trace_enabled: false,
        }
    }

    /// The same context with tracing enabled.
    #[must_use]
    pub const fn with_tracing(mut self) -> Self {
        self.trace_enabled = true;
        self
    }
}

/// The memory-access core.
///
/// Generic over the [`AddressMapper`] so the surrounding simulator owns
/// region semantics; the core resolves every access fresh and never
/// caches a mapping.
pub struct MemoryCore<M> {
    mapper: M,
    config: CoreConfig,
    xor: XorAddressing,
    tracer: Option<Box<dyn TraceSink>>,
}

impl<M: AddressMapper> MemoryCore<M> {
    /// Creates a core over `mapper` with the given configuration. The
    /// XOR fold starts in the identity state regardless of support.
    pub const fn new(mapper: M, config: CoreConfig) -> Self {
        Self {
            mapper,
            config,
            xor: XorAddressing::identity(),
            tracer: None,
        }
    }

    /// The configuration this core was built with.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Shared view of the mapper.
    #[must_use]
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Exclusive view of the mapper.
    #[allow(clippy::missing_const_for_fn)]
    pub fn mapper_mut(&mut self) -> &mut M {
        &mut self.mapper
    }

    /// Consumes the core, returning the mapper.
    #[must_use]
    pub fn into_mapper(self) -> M {
        self.mapper
    }

    /// Selects the runtime alignment discipline. Inert unless the
    /// alignment capability is runtime-selectable.
    pub fn set_runtime_alignment(&mut self, mode: AlignmentMode) {
        self.config.alignment.set_runtime_mode(mode);
    }

    /// Switches the XOR address fold for an endian-mode change.
    ///
    /// No effect when the configuration was built without XOR-endian
    /// support; the fold stays pinned to the identity.
    #[allow(clippy::missing_const_for_fn)]
    pub fn set_xor_endian(&mut self, swapped: bool) {
        if self.config.xor_endian {
            self.xor = XorAddressing::for_mode(swapped);
        }
    }

    /// Installs or removes the trace sink. Records are delivered only for
    /// accesses whose [`CpuContext`] has tracing enabled.
    pub fn set_trace_sink(&mut self, tracer: Option<Box<dyn TraceSink>>) {
        self.tracer = tracer;
    }

    /// Reads one width-sized value at the aligned logical address
    /// `xaddr`. The caller has already established the address is to be
    /// treated as aligned, naturally or by prior rounding.
    ///
    /// # Errors
    ///
    /// [`MemoryFault::Translation`] when the mapper cannot resolve the
    /// access; [`InternalError::DeviceShortTransfer`] when a device
    /// callback breaks the exact-width contract. Never a partial read.
    pub fn read_aligned<V: AccessValue>(
        &mut self,
        ctx: &CpuContext,
        space: AddressSpace,
        xaddr: Address,
    ) -> Result<V, AccessError> {
        let addr = self.xor.apply(xaddr, V::WIDTH);
        let mut bytes = V::Bytes::default();
        match self
            .mapper
            .resolve(space, addr, V::WIDTH, Direction::Read)
            .map_err(|fault| MemoryFault::Translation {
                fault,
                instruction_address: ctx.instruction_address,
            })? {
            Backing::Direct(buffer) => bytes.as_mut().copy_from_slice(&buffer[..V::WIDTH]),
            Backing::Device {
                device,
                space: device_space,
            } => {
                let moved = device.io_read(device_space, addr, bytes.as_mut());
                if moved != V::WIDTH {
                    return Err(InternalError::DeviceShortTransfer {
                        direction: Direction::Read,
                        width: V::WIDTH,
                        moved,
                    }
                    .into());
                }
            }
        }
        let value = V::from_target_bytes(bytes, self.config.endianness);
        self.trace(ctx, Direction::Read, V::WIDTH, space, addr, value.as_u64());
        Ok(value)
    }

    /// Writes one width-sized value at the aligned logical address
    /// `xaddr`.
    ///
    /// # Errors
    ///
    /// Symmetric to [`Self::read_aligned`]: translation faults propagate,
    /// a short device transfer is an internal error, and a failed write
    /// never mutates the backing beyond a single width-sized store.
    pub fn write_aligned<V: AccessValue>(
        &mut self,
        ctx: &CpuContext,
        space: AddressSpace,
        xaddr: Address,
        value: V,
    ) -> Result<(), AccessError> {
        let addr = self.xor.apply(xaddr, V::WIDTH);
        let bytes = value.to_target_bytes(self.config.endianness);
        match self
            .mapper
            .resolve(space, addr, V::WIDTH, Direction::Write)
            .map_err(|fault| MemoryFault::Translation {
                fault,
                instruction_address: ctx.instruction_address,
            })? {
            Backing::Direct(buffer) => buffer[..V::WIDTH].copy_from_slice(bytes.as_ref()),
            Backing::Device {
                device,
                space: device_space,
            } => {
                let moved = device.io_write(device_space, addr, bytes.as_ref(), ctx);
                if moved != V::WIDTH {
                    return Err(InternalError::DeviceShortTransfer {
                        direction: Direction::Write,
                        width: V::WIDTH,
                        moved,
                    }
                    .into());
                }
            }
        }
        self.trace(ctx, Direction::Write, V::WIDTH, space, addr, value.as_u64());
        Ok(())
    }

    /// Reads one width-sized value at an address of unknown alignment.
    ///
    /// An aligned address forwards straight to [`Self::read_aligned`];
    /// otherwise the configured discipline decides between rounding,
    /// byte-wise service, and faulting.
    ///
    /// # Errors
    ///
    /// [`MemoryFault::UnalignedAccess`] under the strict discipline or
    /// when the byte-wise fallback comes up short, plus every error the
    /// aligned path can produce. [`InternalError::MixedAlignment`] when
    /// the effective discipline is the mixed marker.
    pub fn read_unaligned<V: AccessValue>(
        &mut self,
        ctx: &CpuContext,
        space: AddressSpace,
        addr: Address,
    ) -> Result<V, AccessError> {
        match self.config.alignment.decide::<V>(Direction::Read, addr)? {
            AlignmentDecision::Aligned(aligned) => self.read_aligned(ctx, space, aligned),
            AlignmentDecision::Fault => {
                Err(Self::unaligned_fault::<V>(ctx, Direction::Read, space, addr))
            }
            AlignmentDecision::ByteWise => {
                let mut bytes = V::Bytes::default();
                if self.read_bytes(space, addr, bytes.as_mut()) != V::WIDTH {
                    return Err(Self::unaligned_fault::<V>(ctx, Direction::Read, space, addr));
                }
                let value = V::from_target_bytes(bytes, self.config.endianness);
                self.trace(ctx, Direction::Read, V::WIDTH, space, addr, value.as_u64());
                Ok(value)
            }
        }
    }

    /// Writes one width-sized value at an address of unknown alignment.
    ///
    /// # Errors
    ///
    /// Symmetric to [`Self::read_unaligned`].
    pub fn write_unaligned<V: AccessValue>(
        &mut self,
        ctx: &CpuContext,
        space: AddressSpace,
        addr: Address,
        value: V,
    ) -> Result<(), AccessError> {
        match self.config.alignment.decide::<V>(Direction::Write, addr)? {
            AlignmentDecision::Aligned(aligned) => self.write_aligned(ctx, space, aligned, value),
            AlignmentDecision::Fault => Err(Self::unaligned_fault::<V>(
                ctx,
                Direction::Write,
                space,
                addr,
            )),
            AlignmentDecision::ByteWise => {
                let bytes = value.to_target_bytes(self.config.endianness);
                if self.write_bytes(ctx, space, addr, bytes.as_ref()) != V::WIDTH {
                    return Err(Self::unaligned_fault::<V>(
                        ctx,
                        Direction::Write,
                        space,
                        addr,
                    ));
                }
                self.trace(ctx, Direction::Write, V::WIDTH, space, addr, value.as_u64());
                Ok(())
            }
        }
    }

    /// Byte-wise, alignment-agnostic block read through the mapping path.
    ///
    /// Each byte is folded individually with the width-1 mask, so the
    /// transfer is order-correct under every endian mode. Returns the
    /// number of bytes moved before the first resolution or device
    /// failure; callers compare against the expected length.
    pub fn read_bytes(&mut self, space: AddressSpace, xaddr: Address, buffer: &mut [u8]) -> usize {
        let mut moved = 0;
        let mut offset: Address = 0;
        for byte in buffer.iter_mut() {
            let addr = self.xor.apply(xaddr.wrapping_add(offset), 1);
            let served = match self.mapper.resolve(space, addr, 1, Direction::Read) {
                Ok(Backing::Direct(slice)) => match slice.first() {
                    Some(first) => {
                        *byte = *first;
                        true
                    }
                    None => false,
                },
                Ok(Backing::Device {
                    device,
                    space: device_space,
                }) => device.io_read(device_space, addr, std::slice::from_mut(byte)) == 1,
                Err(_) => false,
            };
            if !served {
                break;
            }
            moved += 1;
            offset += 1;
        }
        moved
    }

    /// Byte-wise, alignment-agnostic block write through the mapping
    /// path. Counterpart of [`Self::read_bytes`]; bytes already written
    /// when a failure occurs stay written.
    pub fn write_bytes(
        &mut self,
        ctx: &CpuContext,
        space: AddressSpace,
        xaddr: Address,
        buffer: &[u8],
    ) -> usize {
        let mut moved = 0;
        let mut offset: Address = 0;
        for byte in buffer {
            let addr = self.xor.apply(xaddr.wrapping_add(offset), 1);
            let served = match self.mapper.resolve(space, addr, 1, Direction::Write) {
                Ok(Backing::Direct(slice)) => match slice.first_mut() {
                    Some(slot) => {
                        *slot = *byte;
                        true
                    }
                    None => false,
                },
                Ok(Backing::Device {
                    device,
                    space: device_space,
                }) => device.io_write(device_space, addr, std::slice::from_ref(byte), ctx) == 1,
                Err(_) => false,
            };
            if !served {
                break;
            }
            moved += 1;
            offset += 1;
        }
        moved
    }

    fn unaligned_fault<V: AccessValue>(
        ctx: &CpuContext,
        direction: Direction,
        space: AddressSpace,
        address: Address,
    ) -> AccessError {
        MemoryFault::UnalignedAccess {
            direction,
            width: V::WIDTH,
            space,
            address,
            instruction_address: ctx.instruction_address,
        }
        .into()
    }

    fn trace(
        &mut self,
        ctx: &CpuContext,
        direction: Direction,
        width: usize,
        space: AddressSpace,
        address: Address,
        value: u64,
    ) {
        if !ctx.trace_enabled {
            return;
        }
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.trace_access(AccessRecord {
                direction,
                width,
                space,
                address,
                value,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{CoreConfig, CpuContext, MemoryCore};
    use crate::align::{AlignmentConfig, AlignmentMode};
    use crate::endian::Endianness;
    use crate::fault::{AccessError, MemoryFault};
    use crate::map::{AddressSpace, Direction, RegionMap};
    use crate::trace::{AccessRecord, TraceSink};

    fn data_core(config: CoreConfig) -> MemoryCore<RegionMap> {
        let mut map = RegionMap::new();
        map.add_ram(AddressSpace::Data, 0x1000, 0x1000);
        MemoryCore::new(map, config)
    }

    #[test]
    fn aligned_round_trip_preserves_the_value() {
        let mut core = data_core(CoreConfig::default());
        let ctx = CpuContext::at(0x100);

        core.write_aligned::<u32>(&ctx, AddressSpace::Data, 0x1000, 0xCAFE_F00D)
            .expect("aligned write");
        let value = core
            .read_aligned::<u32>(&ctx, AddressSpace::Data, 0x1000)
            .expect("aligned read");
        assert_eq!(value, 0xCAFE_F00D);
    }

    #[test]
    fn translation_fault_carries_instruction_attribution() {
        let mut core = data_core(CoreConfig::default());
        let ctx = CpuContext::at(0xBEEF);

        let err = core
            .read_aligned::<u16>(&ctx, AddressSpace::Data, 0x8000)
            .expect_err("unmapped read");
        match err {
            AccessError::Fault(MemoryFault::Translation {
                fault,
                instruction_address,
            }) => {
                assert_eq!(fault.address, 0x8000);
                assert_eq!(fault.direction, Direction::Read);
                assert_eq!(instruction_address, 0xBEEF);
            }
            other => panic!("expected a translation fault, got {other:?}"),
        }
    }

    #[test]
    fn xor_switch_is_inert_without_support() {
        let mut core = data_core(CoreConfig::default());
        let ctx = CpuContext::at(0);

        core.write_aligned::<u8>(&ctx, AddressSpace::Data, 0x1003, 0x42)
            .expect("write");
        core.set_xor_endian(true);
        let value = core
            .read_aligned::<u8>(&ctx, AddressSpace::Data, 0x1003)
            .expect("read");
        assert_eq!(value, 0x42);
    }

    #[test]
    fn byte_wise_helpers_move_blocks_across_alignment() {
        let mut core = data_core(CoreConfig::default());
        let ctx = CpuContext::at(0);

        let written = core.write_bytes(&ctx, AddressSpace::Data, 0x1001, &[1, 2, 3, 4, 5]);
        assert_eq!(written, 5);

        let mut buffer = [0_u8; 5];
        let read = core.read_bytes(AddressSpace::Data, 0x1001, &mut buffer);
        assert_eq!(read, 5);
        assert_eq!(buffer, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn byte_wise_helpers_report_short_transfers() {
        let mut core = data_core(CoreConfig::default());
        let ctx = CpuContext::at(0);

        // The region ends at 0x2000; only two of four bytes resolve.
        let written = core.write_bytes(&ctx, AddressSpace::Data, 0x1FFE, &[9, 9, 9, 9]);
        assert_eq!(written, 2);

        let mut buffer = [0_u8; 4];
        assert_eq!(core.read_bytes(AddressSpace::Data, 0x1FFE, &mut buffer), 2);
    }

    #[test]
    fn runtime_alignment_selection_reaches_the_policy() {
        let config = CoreConfig {
            alignment: AlignmentConfig::selectable(AlignmentMode::Strict),
            ..CoreConfig::default()
        };
        let mut core = data_core(config);
        let ctx = CpuContext::at(0);

        assert!(core
            .read_unaligned::<u16>(&ctx, AddressSpace::Data, 0x1001)
            .is_err());

        core.set_runtime_alignment(AlignmentMode::Nonstrict);
        assert!(core
            .read_unaligned::<u16>(&ctx, AddressSpace::Data, 0x1001)
            .is_ok());
    }

    #[test]
    fn tracing_is_gated_per_cpu_context() {
        struct SharedSink(Rc<RefCell<Vec<AccessRecord>>>);

        impl TraceSink for SharedSink {
            fn trace_access(&mut self, record: AccessRecord) {
                self.0.borrow_mut().push(record);
            }
        }

        let records = Rc::new(RefCell::new(Vec::new()));
        let mut core = data_core(CoreConfig {
            endianness: Endianness::Big,
            ..CoreConfig::default()
        });
        core.set_trace_sink(Some(Box::new(SharedSink(Rc::clone(&records)))));

        let silent = CpuContext::at(0x10);
        core.write_aligned::<u16>(&silent, AddressSpace::Data, 0x1000, 0x1234)
            .expect("untraced write");

        let traced = CpuContext::at(0x12).with_tracing();
        core.write_aligned::<u16>(&traced, AddressSpace::Data, 0x1002, 0x5678)
            .expect("traced write");

        let records = records.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].direction, Direction::Write);
        assert_eq!(records[0].width, 2);
        assert_eq!(records[0].address, 0x1002);
        assert_eq!(records[0].value, 0x5678);
    }

    #[test]
    fn trace_addresses_are_folded_when_aligned_and_logical_when_byte_wise() {
        struct SharedSink(Rc<RefCell<Vec<AccessRecord>>>);

        impl TraceSink for SharedSink {
            fn trace_access(&mut self, record: AccessRecord) {
                self.0.borrow_mut().push(record);
            }
        }

        let records = Rc::new(RefCell::new(Vec::new()));
        let mut core = data_core(CoreConfig {
            endianness: Endianness::Big,
            xor_endian: true,
            alignment: AlignmentConfig::fixed(AlignmentMode::Nonstrict),
        });
        core.set_xor_endian(true);
        core.set_trace_sink(Some(Box::new(SharedSink(Rc::clone(&records)))));
        let ctx = CpuContext::at(0x20).with_tracing();

        core.write_aligned::<u16>(&ctx, AddressSpace::Data, 0x1000, 0x1234)
            .expect("aligned write");
        core.read_unaligned::<u16>(&ctx, AddressSpace::Data, 0x1001)
            .expect("byte-wise read");

        let records = records.borrow();
        assert_eq!(records.len(), 2);
        // Aligned transfers record the folded physical address.
        assert_eq!(records[0].address, 0x1000 ^ 6);
        // Byte-wise transfers record the logical base.
        assert_eq!(records[1].address, 0x1001);
    }
}
