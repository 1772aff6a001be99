//! # Microkernel Test Suite
//!
//! Cross-crate scenarios that need the engine, the monitor and the driver
//! registry wired together over one event bus.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs     # Scriptable module + call journal
//!     ├── lifecycle.rs   # Phase ordering, failure policy, rollback
//!     ├── monitoring.rs  # Monitor loops against a live engine
//!     └── properties.rs  # proptest: plan determinism, abort guarantees
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mk-tests
//! cargo test -p mk-tests integration::lifecycle
//! ```

#![allow(dead_code)]

pub mod integration;
