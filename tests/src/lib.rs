//! # Panel Bridge Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs       # calls, responses and pushes across a real channel
//!     ├── handshake.rs   # greeting and timeout fallback
//!     └── filesystem.rs  # view proxies against the local filesystem
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bridge-tests
//! cargo test -p bridge-tests integration::handshake::
//! ```

pub mod integration;
