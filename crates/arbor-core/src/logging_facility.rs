//! Structured logging facility for Arbor
//!
//! This module provides:
//! - Single initialization point via `init(profile)`
//! - Boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use arbor_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! The dispatcher owns the request boundary: handlers log with plain
//! `tracing` events and never emit their own start/end pair.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, init_with_filter, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
