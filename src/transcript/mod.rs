// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Canonical transcript model and loading.

mod loader;

pub use loader::{JsonTranscriptLoader, TranscriptLoader};

use crate::cache::hashing::hash_payload;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One utterance in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub speaker: Option<String>,
    pub text: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

impl Segment {
    pub fn new(speaker: Option<&str>, text: &str) -> Self {
        Self {
            speaker: speaker.map(str::to_string),
            text: text.to_string(),
            start: None,
            end: None,
        }
    }

    pub fn with_timing(mut self, start: f64, end: f64) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

/// What the transcript data can support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub speaker_labels: bool,
    pub timestamps: bool,
}

/// A loaded transcript: its segments, capabilities and the hash of its content.
#[derive(Debug, Clone)]
pub struct CanonicalTranscript {
    pub content_hash: String,
    pub segments: Vec<Segment>,
    pub capabilities: Capabilities,
    /// Explicit display names keyed by speaker label
    pub speaker_names: BTreeMap<String, String>,
}

impl CanonicalTranscript {
    pub fn from_segments(segments: Vec<Segment>, speaker_names: BTreeMap<String, String>) -> Self {
        let capabilities = Capabilities {
            speaker_labels: !segments.is_empty() && segments.iter().all(|s| s.speaker.is_some()),
            timestamps: !segments.is_empty()
                && segments.iter().all(|s| s.start.is_some() && s.end.is_some()),
        };
        let content_hash = hash_payload(&serde_json::json!({ "segments": segments }));

        Self {
            content_hash,
            segments,
            capabilities,
            speaker_names,
        }
    }

    /// Map every speaker label that appears in the segments to a display name.
    /// Labels without an explicit name map to themselves.
    pub fn speaker_map(&self) -> BTreeMap<String, String> {
        self.segments
            .iter()
            .filter_map(|segment| segment.speaker.as_ref())
            .map(|label| {
                let name = self
                    .speaker_names
                    .get(label)
                    .cloned()
                    .unwrap_or_else(|| label.clone());
                (label.clone(), name)
            })
            .collect()
    }
}

/// Export suffixes dropped from a file stem, longest first.
const BASE_NAME_SUFFIXES: [&str; 3] = ["_transcript_diarised", "_transcript", "_diarised"];

/// The name all of a transcript's artifacts are grouped under.
///
/// This is the file stem with at most one known export suffix removed, so
/// `meeting_transcript_diarised.json` and `meeting.json` share `meeting`.
pub fn canonical_base_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transcript".to_string());

    BASE_NAME_SUFFIXES
        .iter()
        .find_map(|suffix| stem.strip_suffix(suffix))
        .filter(|base| !base.is_empty())
        .map(str::to_string)
        .unwrap_or(stem)
}
