//! Common utilities shared across the pre-delinquency prototype
//!
//! This crate provides shared functionality that can be used across the
//! scoring library and the delinquency backend, including:
//!
//! - Configuration loading with `!include` support
//! - Shared test utilities and assertion macros

pub mod config;
pub mod yaml_include;

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{TestError, TestResult};
