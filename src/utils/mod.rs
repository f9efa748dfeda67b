//! Utility functions and helpers for the offline-vault proxy.
//!
//! This module provides cross-cutting concerns like structured logging and
//! URL redaction for log output.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and credential-safe URL rendering.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
