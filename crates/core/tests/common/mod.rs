//! Shared helpers for the integration tests.
//!
//! - Fixtures: stores, sinks, contexts and chains
//! - Test steps with observable side effects
//! - Custom assertions

pub mod assertions;
pub mod fixtures;
pub mod steps;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use steps::*;
