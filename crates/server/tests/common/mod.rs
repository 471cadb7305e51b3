//! Common test utilities and fixtures.

pub mod depot;

#[allow(unused_imports)]
pub use depot::*;
