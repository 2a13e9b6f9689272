// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::TranscriptError;
use crate::transcript::{CanonicalTranscript, Segment};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Turns a transcript file into a [`CanonicalTranscript`].
pub trait TranscriptLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<CanonicalTranscript, TranscriptError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptDocument {
    Wrapped {
        segments: Vec<Segment>,
        #[serde(default)]
        speaker_map: BTreeMap<String, String>,
    },
    Bare(Vec<Segment>),
}

/// Loads transcripts stored as JSON, either `{"segments": [...], "speaker_map": {...}}`
/// or a bare array of segments.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTranscriptLoader;

impl TranscriptLoader for JsonTranscriptLoader {
    fn load(&self, path: &Path) -> Result<CanonicalTranscript, TranscriptError> {
        let content = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => TranscriptError::NotFound(path.to_path_buf()),
            _ => TranscriptError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let document: TranscriptDocument =
            serde_json::from_str(&content).map_err(|e| TranscriptError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let (segments, speaker_names) = match document {
            TranscriptDocument::Wrapped {
                segments,
                speaker_map,
            } => (segments, speaker_map),
            TranscriptDocument::Bare(segments) => (segments, BTreeMap::new()),
        };

        if segments.is_empty() {
            return Err(TranscriptError::Invalid {
                path: path.to_path_buf(),
                reason: "transcript has no segments".to_string(),
            });
        }

        Ok(CanonicalTranscript::from_segments(segments, speaker_names))
    }
}
