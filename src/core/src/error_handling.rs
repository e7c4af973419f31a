//! Error types shared by every module of the crate.

pub mod types;

pub use types::*;
