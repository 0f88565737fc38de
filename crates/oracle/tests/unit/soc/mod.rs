
/// Guest memory translation and frame allocation.
pub mod memory;
