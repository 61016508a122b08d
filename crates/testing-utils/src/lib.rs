//! # Fleet Testing Utils
//!
//! Shared testing utilities for the fleet dispatching workspace.
//!
//! ## Features
//!
//! - **Test Data Builders**: vehicles, transport orders and order sequences with sensible defaults
//! - **Mock Services**: a scriptable router and a recording vehicle controller
//! - **Helpers**: small plant fixtures and async polling
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! fleet-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
