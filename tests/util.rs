//! Shared test utilities for integration tests
//!
//! Provides fixture creation and small helpers used across multiple
//! test files.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use roughpatch::{EngineConfig, PatchEngine};

/// Temp dir holding a single `file.txt` with `body`
pub fn file_fixture(body: &str) -> (assert_fs::TempDir, PathBuf)
{
    // Initialize the temporary project root
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    let file = tmp.child("file.txt");
    file.write_str(body)
        .expect("write fixture");

    let path = file
        .path()
        .to_path_buf();
    (tmp, path)
}

/// Read a fixture back as UTF-8
pub fn read(path: &Path) -> String
{
    std::fs::read_to_string(path).expect("read fixture")
}

/// Engine whose similarity gates accept any rewrite
pub fn permissive_engine() -> PatchEngine
{
    let mut config = EngineConfig::default();
    config
        .validation
        .diff_min_similarity = 0.0;
    config
        .validation
        .block_min_similarity = 0.0;
    config
        .strategy
        .hunk_min_similarity = 0.0;
    PatchEngine::new(config)
}
