//! Tokenforge - multi-platform design token build orchestrator
//!
//! This library schedules, caches and reports builds of independent platform
//! artifacts (iOS, Android, Web) generated from a shared set of design tokens.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Orchestration engine: executors, incremental cache, progress
//! - [`infra`] - Infrastructure layer (build command processes)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
