//! Test support utilities for configurations integration tests.
//!
//! Provides mock providers with call counters, an isolated CLI
//! environment and assertion helpers.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod mocks;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use mocks::*;

use std::path::PathBuf;

use tempfile::TempDir;

/// CLI test environment with an isolated working directory.
///
/// Child processes use `.current_dir()` so tests can safely run in
/// parallel.
pub struct Test {
    /// Temporary working directory
    pub dir: TempDir,
}

impl Test {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    /// Create an environment whose `configurations.toml` holds `settings`.
    pub fn with_settings(settings: &str) -> Self {
        let t = Self::new();
        t.write_settings(settings);
        t
    }

    /// Path of the default settings file in the working directory.
    pub fn settings_path(&self) -> PathBuf {
        self.dir.path().join("configurations.toml")
    }

    pub fn write_settings(&self, settings: &str) {
        std::fs::write(self.settings_path(), settings).expect("failed to write settings");
    }
}
