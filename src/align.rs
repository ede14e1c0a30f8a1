//! Alignment discipline configuration and per-access policy resolution.

use crate::fault::InternalError;
use crate::map::{Address, Direction};
use crate::value::AccessValue;

/// Handling discipline for unaligned accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AlignmentMode {
    /// An unaligned access always faults.
    Strict,
    /// An unaligned access is serviced byte-wise.
    Nonstrict,
    /// Every address is silently rounded down to the aligned boundary.
    Forced,
    /// Capability marker: the discipline is selected at runtime.
    ///
    /// Only legal as a capability value. Reaching it as the effective
    /// per-access mode indicates a configuration bug in the surrounding
    /// simulator, never simulated-program behavior.
    Mixed,
}

/// Outcome of the per-access alignment decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentDecision {
    /// Service through the aligned path at the carried address.
    Aligned(Address),
    /// Service byte-wise through the alignment-agnostic buffer path.
    ByteWise,
    /// Raise an unaligned-access fault; the access must not complete.
    Fault,
}

/// Alignment capability and current discipline for one core.
///
/// The capability plays the role of a build-time flag: a fixed capability
/// pins the discipline and the runtime mode is never consulted, while a
/// selectable capability ([`AlignmentMode::Mixed`]) defers to the runtime
/// mode on every unaligned access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AlignmentConfig {
    capability: AlignmentMode,
    runtime: AlignmentMode,
}

impl AlignmentConfig {
    /// Hard-wires a single discipline for the lifetime of the core.
    #[must_use]
    pub const fn fixed(mode: AlignmentMode) -> Self {
        Self {
            capability: mode,
            runtime: mode,
        }
    }

    /// Runtime-selectable capability, starting in `initial`.
    #[must_use]
    pub const fn selectable(initial: AlignmentMode) -> Self {
        Self {
            capability: AlignmentMode::Mixed,
            runtime: initial,
        }
    }

    /// Selects the runtime discipline.
    ///
    /// Consulted only when the capability is selectable; under a fixed
    /// capability the stored mode is inert.
    #[allow(clippy::missing_const_for_fn)]
    pub fn set_runtime_mode(&mut self, mode: AlignmentMode) {
        self.runtime = mode;
    }

    /// The discipline effective for the next unaligned access.
    #[must_use]
    pub const fn effective(&self) -> AlignmentMode {
        match self.capability {
            AlignmentMode::Mixed => self.runtime,
            fixed => fixed,
        }
    }

    /// `true` when the capability is hard-wired to forced alignment.
    #[must_use]
    pub const fn hardwired_forced(&self) -> bool {
        matches!(self.capability, AlignmentMode::Forced)
    }

    /// Resolves how an access of `V::WIDTH` bytes at `addr` is serviced.
    ///
    /// A hard-wired forced capability rounds down without consulting the
    /// runtime mode. An aligned address takes the fast path after a single
    /// mask test. Everything else branches on the effective discipline.
    ///
    /// # Errors
    ///
    /// Returns [`InternalError::MixedAlignment`] when the effective
    /// discipline is [`AlignmentMode::Mixed`].
    pub const fn decide<V: AccessValue>(
        &self,
        direction: Direction,
        addr: Address,
    ) -> Result<AlignmentDecision, InternalError> {
        if self.hardwired_forced() {
            return Ok(AlignmentDecision::Aligned(addr & !V::ADDRESS_MASK));
        }
        if addr & V::ADDRESS_MASK == 0 {
            return Ok(AlignmentDecision::Aligned(addr));
        }
        match self.effective() {
            AlignmentMode::Strict => Ok(AlignmentDecision::Fault),
            AlignmentMode::Nonstrict => Ok(AlignmentDecision::ByteWise),
            AlignmentMode::Forced => Ok(AlignmentDecision::Aligned(addr & !V::ADDRESS_MASK)),
            AlignmentMode::Mixed => Err(InternalError::MixedAlignment {
                direction,
                width: V::WIDTH,
            }),
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self::fixed(AlignmentMode::Nonstrict)
    }
}

#[cfg(test)]
mod tests {
    use super::{AlignmentConfig, AlignmentDecision, AlignmentMode};
    use crate::fault::InternalError;
    use crate::map::Direction;

    #[test]
    fn aligned_addresses_take_the_fast_path_in_every_mode() {
        for mode in [
            AlignmentMode::Strict,
            AlignmentMode::Nonstrict,
            AlignmentMode::Forced,
        ] {
            let config = AlignmentConfig::fixed(mode);
            assert_eq!(
                config.decide::<u32>(Direction::Read, 0x1000),
                Ok(AlignmentDecision::Aligned(0x1000))
            );
        }
    }

    #[test]
    fn strict_mode_faults_on_unaligned_addresses() {
        let config = AlignmentConfig::fixed(AlignmentMode::Strict);
        assert_eq!(
            config.decide::<u16>(Direction::Read, 0x1001),
            Ok(AlignmentDecision::Fault)
        );
        assert_eq!(
            config.decide::<u64>(Direction::Write, 0x1004),
            Ok(AlignmentDecision::Fault)
        );
    }

    #[test]
    fn nonstrict_mode_falls_back_to_byte_wise_service() {
        let config = AlignmentConfig::fixed(AlignmentMode::Nonstrict);
        assert_eq!(
            config.decide::<u32>(Direction::Write, 0x1002),
            Ok(AlignmentDecision::ByteWise)
        );
    }

    #[test]
    fn forced_capability_rounds_down_without_consulting_runtime_mode() {
        let mut config = AlignmentConfig::fixed(AlignmentMode::Forced);
        config.set_runtime_mode(AlignmentMode::Strict);
        assert_eq!(
            config.decide::<u32>(Direction::Read, 0x1003),
            Ok(AlignmentDecision::Aligned(0x1000))
        );
        assert!(config.hardwired_forced());
    }

    #[test]
    fn selectable_capability_follows_the_runtime_mode() {
        let mut config = AlignmentConfig::selectable(AlignmentMode::Strict);
        assert_eq!(
            config.decide::<u16>(Direction::Read, 0x0001),
            Ok(AlignmentDecision::Fault)
        );

        config.set_runtime_mode(AlignmentMode::Nonstrict);
        assert_eq!(
            config.decide::<u16>(Direction::Read, 0x0001),
            Ok(AlignmentDecision::ByteWise)
        );

        config.set_runtime_mode(AlignmentMode::Forced);
        assert_eq!(
            config.decide::<u16>(Direction::Read, 0x0001),
            Ok(AlignmentDecision::Aligned(0x0000))
        );
    }

    #[test]
    fn mixed_effective_mode_is_an_internal_error() {
        let config = AlignmentConfig::selectable(AlignmentMode::Mixed);
        assert_eq!(
            config.decide::<u32>(Direction::Write, 0x1001),
            Err(InternalError::MixedAlignment {
                direction: Direction::Write,
                width: 4,
            })
        );
    }

    #[test]
    fn width_one_accesses_are_always_aligned() {
        let config = AlignmentConfig::fixed(AlignmentMode::Strict);
        for addr in [0x0000, 0x0001, 0xFFFF] {
            assert_eq!(
                config.decide::<u8>(Direction::Read, addr),
                Ok(AlignmentDecision::Aligned(addr))
            );
        }
    }
}
