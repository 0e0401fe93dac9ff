//! Three-valued capability tag state.
//!
//! Tags are tracked as two bit planes: `data` holds the tag value and `known`
//! records whether that value has actually been observed. A bit that is not
//! known must read as zero in `data`, so every sub-block is in exactly one of
//! three states: [`TagState::Clear`], [`TagState::Set`] or [`TagState::Unknown`].

use std::fmt;

use super::error::{InvariantViolation, SimError};

/// State of a single capability tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagState {
    /// Tag observed and clear (plain data).
    Clear,
    /// Tag observed and set (valid capability).
    Set,
    /// Tag never observed; treated as clear by default.
    Unknown,
}

impl TagState {
    /// Returns the state for an observed tag value.
    pub const fn from_tag(tag: bool) -> Self {
        if tag { Self::Set } else { Self::Clear }
    }

    /// Returns `true` unless the state is [`TagState::Unknown`].
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Tag bits for the capability sub-blocks of one cache line.
///
/// Bit `i` of each mask describes the `i`-th capability of the line, counted
/// from the lowest address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct TagBits {
    /// Tag values; only meaningful where `known` is set.
    pub data: u16,
    /// Which sub-block tags have been observed.
    pub known: u16,
}

impl TagBits {
    /// Builds a tag pair, rejecting value bits that are not known.
    ///
    /// # Arguments
    ///
    /// * `data` - Tag value mask.
    /// * `known` - Known mask.
    ///
    /// # Returns
    ///
    /// The pair, or [`InvariantViolation::InconsistentTags`] if `data & !known != 0`.
    pub fn new(data: u16, known: u16) -> Result<Self, SimError> {
        let bits = Self { data, known };
        if bits.is_consistent() {
            Ok(bits)
        } else {
            Err(SimError::Invariant(InvariantViolation::InconsistentTags {
                data,
                known,
            }))
        }
    }

    /// All sub-blocks unknown.
    pub const fn unknown() -> Self {
        Self { data: 0, known: 0 }
    }

    /// Returns `true` if no value bit is set without its known bit.
    #[inline]
    pub const fn is_consistent(self) -> bool {
        self.data & !self.known == 0
    }

    /// Returns the state of sub-block `index`.
    pub const fn state(self, index: u32) -> TagState {
        let bit = 1u16 << index;
        if self.known & bit == 0 {
            TagState::Unknown
        } else if self.data & bit == 0 {
            TagState::Clear
        } else {
            TagState::Set
        }
    }

    /// Sets the state of sub-block `index`.
    pub const fn set_state(&mut self, index: u32, state: TagState) {
        let bit = 1u16 << index;
        match state {
            TagState::Unknown => {
                self.known &= !bit;
                self.data &= !bit;
            }
            TagState::Clear => {
                self.known |= bit;
                self.data &= !bit;
            }
            TagState::Set => {
                self.known |= bit;
                self.data |= bit;
            }
        }
    }

    /// Marks every sub-block in `mask` as known with value `tag`.
    pub const fn assign(&mut self, mask: u16, tag: bool) {
        self.known |= mask;
        if tag {
            self.data |= mask;
        } else {
            self.data &= !mask;
        }
    }

    /// Returns `true` if every bit known in `other` is also known here.
    #[inline]
    pub const fn covers(self, other: Self) -> bool {
        self.known & other.known == other.known
    }

    /// Returns `true` if the bits known in `self` hold the same values in `other`.
    #[inline]
    pub const fn agrees_with(self, other: Self) -> bool {
        (self.data ^ other.data) & self.known == 0
    }

    /// Checks that replacing `self` with `incoming` without a write loses no
    /// knowledge and changes no observed value.
    ///
    /// # Arguments
    ///
    /// * `incoming` - Tags about to overwrite `self`.
    /// * `line_addr` - Line address, for the error report.
    pub(crate) fn check_invisible_update(
        self,
        incoming: Self,
        line_addr: u64,
    ) -> Result<(), InvariantViolation> {
        if !incoming.covers(self) {
            return Err(InvariantViolation::KnownBitsRegressed {
                line_addr,
                old_known: self.known,
                new_known: incoming.known,
            });
        }
        if !self.agrees_with(incoming) {
            return Err(InvariantViolation::KnownValueChanged {
                line_addr,
                old_data: self.data,
                new_data: incoming.data,
            });
        }
        Ok(())
    }
}

impl fmt::Display for TagBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data={:#06x} known={:#06x}", self.data, self.known)
    }
}
