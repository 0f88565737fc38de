/// Platform that records memory and cache operations.
pub mod platform;
