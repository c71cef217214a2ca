//! Pieces shared by the catbridge binaries.

pub mod logging;
