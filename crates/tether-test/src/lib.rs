//! Tether Test - Shared test utilities for weak event subscriptions.
//!
//! This crate provides fixtures that can be used across Tether crates as a
//! dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! tether-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use tether_test::{EventLog, test_bus, test_registry};
//!
//! #[test]
//! fn test_delivery() {
//!     let log = EventLog::new();
//!     let bus = test_bus();
//!     let registry = test_registry();
//!     // ...
//!     assert_eq!(log.entries(), ["m_one1:3"]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;
