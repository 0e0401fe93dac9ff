//! Common types shared by every part of the simulator.

/// Physical address newtype and alignment helpers.
pub mod addr;
/// Fixed constants of tagged memory and the device tree.
pub mod constants;
/// Error and invariant-violation types.
pub mod error;
/// Tagged memory geometry.
pub mod layout;
/// Three-valued tag bits.
pub mod tags;

pub use addr::PhysAddr;
pub use error::{InvariantViolation, Result, SimError};
pub use layout::MemoryLayout;
pub use tags::{TagBits, TagState};
