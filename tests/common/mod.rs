//! Common test infrastructure
//!
//! A real server on an ephemeral port wired to stub collaborators, plus a
//! thin HTTP client. Tests should only import from this module, not from
//! internal submodules.
#![allow(dead_code)]

mod client;
mod server;
mod stubs;

// Public API - this is what tests import
pub use client::TestClient;
pub use server::{StubBehavior, TestServer};
