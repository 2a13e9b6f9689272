// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shared, per-run state handed to every analysis module.
//!
//! The context owns the loaded transcript plus two maps that modules use to
//! hand data to later modules: finished results keyed by module name, and
//! intermediate computed values keyed by [`ComputedKey`]. All access goes
//! through a single `RwLock`, so concurrent modules never observe a partially
//! written map.
//!
//! A poisoned lock (a module panicked while holding it) is recovered rather
//! than propagated; the maps only ever hold complete values.

use crate::transcript::{canonical_base_name, CanonicalTranscript, Capabilities, Segment};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Key for an intermediate value shared between modules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComputedKey {
    /// Word totals per speaker label
    SpeakerWordCounts,
    /// Token frequencies across the whole transcript
    WordFrequencies,
    /// Lower-cased tokens per segment
    SegmentTokens,
    /// Anything a module wants to share that has no dedicated key
    Custom(String),
}

impl ComputedKey {
    pub fn custom(name: impl Into<String>) -> Self {
        ComputedKey::Custom(name.into())
    }
}

#[derive(Default)]
struct ContextState {
    segments: Arc<Vec<Segment>>,
    speaker_map: BTreeMap<String, String>,
    analysis_results: HashMap<String, Value>,
    computed_values: HashMap<ComputedKey, Value>,
    closed: bool,
}

pub struct PipelineContext {
    transcript_path: PathBuf,
    base_name: String,
    output_dir: PathBuf,
    content_hash: String,
    capabilities: Capabilities,
    state: RwLock<ContextState>,
}

impl PipelineContext {
    /// Build a context for `transcript`. Artifacts go under `output_dir`.
    pub fn new(
        transcript_path: impl AsRef<Path>,
        transcript: CanonicalTranscript,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let transcript_path = transcript_path.as_ref().to_path_buf();
        let speaker_map = transcript.speaker_map();
        Self {
            base_name: canonical_base_name(&transcript_path),
            transcript_path,
            output_dir: output_dir.into(),
            content_hash: transcript.content_hash,
            capabilities: transcript.capabilities,
            state: RwLock::new(ContextState {
                segments: Arc::new(transcript.segments),
                speaker_map,
                ..ContextState::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ContextState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ContextState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn transcript_path(&self) -> &Path {
        &self.transcript_path
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Transcript segments. Empty once the context is closed.
    pub fn segments(&self) -> Arc<Vec<Segment>> {
        Arc::clone(&self.read().segments)
    }

    pub fn speaker_map(&self) -> BTreeMap<String, String> {
        self.read().speaker_map.clone()
    }

    pub fn store_analysis_result(&self, module: &str, result: Value) {
        let mut state = self.write();
        if state.closed {
            debug!(module, "Ignoring analysis result stored after close");
            return;
        }
        state.analysis_results.insert(module.to_string(), result);
    }

    pub fn get_analysis_result(&self, module: &str) -> Option<Value> {
        self.read().analysis_results.get(module).cloned()
    }

    pub fn store_computed_value(&self, key: ComputedKey, value: Value) {
        let mut state = self.write();
        if state.closed {
            debug!(key = ?key, "Ignoring computed value stored after close");
            return;
        }
        state.computed_values.insert(key, value);
    }

    pub fn get_computed_value(&self, key: &ComputedKey) -> Option<Value> {
        self.read().computed_values.get(key).cloned()
    }

    pub fn has_computed_value(&self, key: &ComputedKey) -> bool {
        self.read().computed_values.contains_key(key)
    }

    /// Names of every module with a stored result, sorted.
    pub fn completed_modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().analysis_results.keys().cloned().collect();
        names.sort();
        names
    }

    /// Release everything the context holds. Safe to call more than once.
    pub fn close(&self) {
        let mut state = self.write();
        if state.closed {
            return;
        }
        state.segments = Arc::new(Vec::new());
        state.speaker_map.clear();
        state.analysis_results.clear();
        state.computed_values.clear();
        state.closed = true;
        debug!(base_name = %self.base_name, "Pipeline context closed");
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }
}
