// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{tokenize, write_json_artifact};
use crate::context::{ComputedKey, PipelineContext};
use crate::traits::{AnalysisModule, ModuleResult};

const UNLABELED_SPEAKER: &str = "unknown";

/// Per-speaker segment and word counts plus transcript duration.
pub struct StatsModule;

#[derive(Default)]
struct SpeakerStats {
    segments: usize,
    words: usize,
    speaking_seconds: f64,
}

#[async_trait]
impl AnalysisModule for StatsModule {
    async fn run(&self, context: Arc<PipelineContext>) -> ModuleResult {
        let segments = context.segments();
        let speaker_map = context.speaker_map();
        let base_name = context.base_name().to_string();

        let mut per_speaker: BTreeMap<String, SpeakerStats> = BTreeMap::new();
        for segment in segments.iter() {
            let label = segment.speaker.as_deref().unwrap_or(UNLABELED_SPEAKER);
            let entry = per_speaker.entry(label.to_string()).or_default();
            entry.segments += 1;
            entry.words += tokenize(&segment.text).count();
            if let (Some(start), Some(end)) = (segment.start, segment.end) {
                entry.speaking_seconds += (end - start).max(0.0);
            }
        }

        let duration_seconds = if context.capabilities().timestamps {
            let start = segments.iter().filter_map(|s| s.start).fold(f64::INFINITY, f64::min);
            let end = segments.iter().filter_map(|s| s.end).fold(f64::NEG_INFINITY, f64::max);
            Some(end - start)
        } else {
            None
        };

        let mut speakers = Map::new();
        let mut word_counts = Map::new();
        for (label, stats) in &per_speaker {
            let name = speaker_map.get(label).cloned().unwrap_or_else(|| label.clone());
            speakers.insert(
                label.clone(),
                json!({
                    "name": name,
                    "segments": stats.segments,
                    "words": stats.words,
                    "speaking_seconds": stats.speaking_seconds,
                }),
            );
            word_counts.insert(label.clone(), json!(stats.words));
        }

        let payload = json!({
            "segment_count": segments.len(),
            "word_count": per_speaker.values().map(|s| s.words).sum::<usize>(),
            "speaker_count": per_speaker.len(),
            "duration_seconds": duration_seconds,
            "speakers": speakers.clone(),
        });
        context.store_computed_value(ComputedKey::SpeakerWordCounts, Value::Object(word_counts));

        let mut artifacts = Vec::new();
        let global = format!("stats/data/global/{}_stats.json", base_name);
        match write_json_artifact(&context, &global, &payload).await {
            Ok(artifact) => artifacts.push(artifact),
            Err(e) => return ModuleResult::failure(e),
        }
        for (label, speaker) in &speakers {
            let relative = format!("stats/data/speakers/{}_{}_stats.json", base_name, label);
            match write_json_artifact(&context, &relative, speaker).await {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => return ModuleResult::failure(e),
            }
        }

        ModuleResult::with_artifacts(payload, artifacts)
    }

    fn name(&self) -> &'static str {
        "stats"
    }
}
