// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Transcript not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read transcript {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid transcript {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}
