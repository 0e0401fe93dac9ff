/// Uncompressed tag cache residency and write-backs.
pub mod tag_cache;
