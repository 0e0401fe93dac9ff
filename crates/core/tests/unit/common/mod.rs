/// Memory layout geometry and sub-block masks.
pub mod layout;
/// Three-valued tag bits.
pub mod tags;
