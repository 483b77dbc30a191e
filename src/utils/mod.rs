//! Utility modules
//!
//! This module contains common utilities used throughout the application,
//! including error handling, logging setup, credential encryption and
//! text helpers.

pub mod errors;
pub mod logging;
pub mod helpers;
pub mod crypto;

pub use errors::{TodoBridgeError, Result};
