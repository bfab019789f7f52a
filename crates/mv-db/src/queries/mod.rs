//! Database query modules.

pub mod files;
pub mod orders;
