//! Shared test utilities for lexideck integration tests.
//!
//! This module provides:
//! - `TestHarness` for running the fetch pipeline against recorded pages
//! - Fixture helpers that resolve files under `tests/fixtures`

pub mod harness;

pub use harness::{fixture_path, read_fixture, TestHarness};
