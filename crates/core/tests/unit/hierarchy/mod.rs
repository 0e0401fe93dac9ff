/// Structural invariants after random traces and after deliberate damage.
pub mod invariants;
