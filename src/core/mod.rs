//! Core business logic module
//!
//! This module contains the build orchestration engine. External processes
//! are only spawned from [`crate::infra`].
//!
//! # Submodules
//!
//! - [`platform`] - Target platform identifiers
//! - [`config`] - Build configuration (tokenforge.toml) parsing and validation
//! - [`result`] - Build results and structured build errors
//! - [`executor`] - Parallel and sequential execution strategies
//! - [`incremental`] - Change detection and the persisted build cache
//! - [`progress`] - Progress tracking and completion reports
//! - [`orchestrator`] - Top-level build state machine

pub mod config;
pub mod executor;
pub mod incremental;
pub mod orchestrator;
pub mod platform;
pub mod progress;
pub mod result;
