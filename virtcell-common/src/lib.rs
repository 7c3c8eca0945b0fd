//! # virtcell Common
//!
//! Shared utilities for the virtcell components.

pub mod logging;

pub use logging::{init_logging, LogFormat};
