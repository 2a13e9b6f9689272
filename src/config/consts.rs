// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default number of modules executing at once
pub const DEFAULT_MAX_WORKERS: usize = 4;
/// Default run store location
pub const DEFAULT_DATABASE_URL: &str = "sqlite://transcript_pipeline.db";
/// Default directory that per-transcript artifact directories are created under
pub const DEFAULT_OUTPUT_ROOT: &str = "outputs";
/// Hidden bookkeeping directory inside a transcript's output directory; never scanned for orphans
pub const METADATA_DIR_NAME: &str = ".pipeline";
/// File suffixes the validator accepts without a warning
pub const KNOWN_ARTIFACT_SUFFIXES: &[&str] = &["json", "csv", "png", "jpg", "jpeg", "svg", "html", "txt"];
