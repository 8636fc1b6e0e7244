//! Configuration and constants
//!
//! Contains default values used throughout the application.

pub mod defaults;
