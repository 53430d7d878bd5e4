//! Provider wire formats that differ from the canonical shape

pub mod anthropic;
pub mod compat;
