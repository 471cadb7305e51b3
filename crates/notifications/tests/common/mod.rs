//! Common test utilities and fixtures.

pub mod faulty;
pub mod handlers;
pub mod store;

#[allow(unused_imports)]
pub use faulty::*;
#[allow(unused_imports)]
pub use handlers::*;
#[allow(unused_imports)]
pub use store::*;
