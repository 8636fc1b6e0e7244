//! Infrastructure layer
//!
//! Handles external processes. This module is the only place where build
//! commands are spawned.

pub mod script;
