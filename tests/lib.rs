//! Integration test utilities
//!
//! This module exposes common test utilities to all integration test binaries.

pub mod harness;

// Used by the test binaries only.
use catbridge_merkle as _;
