// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::write_json_artifact;
use crate::context::PipelineContext;
use crate::traits::{AnalysisModule, ModuleResult};

const SUMMARY_TOP_WORDS: usize = 5;

/// Combines the `stats` and `word_frequency` results into one overview.
pub struct SummaryModule;

#[async_trait]
impl AnalysisModule for SummaryModule {
    async fn run(&self, context: Arc<PipelineContext>) -> ModuleResult {
        let Some(stats) = context.get_analysis_result("stats") else {
            return ModuleResult::failure("summary requires the stats result");
        };
        let Some(frequencies) = context.get_analysis_result("word_frequency") else {
            return ModuleResult::failure("summary requires the word_frequency result");
        };

        let top_words: Vec<Value> = frequencies["top_words"]
            .as_array()
            .map(|words| words.iter().take(SUMMARY_TOP_WORDS).cloned().collect())
            .unwrap_or_default();

        let payload = json!({
            "transcript": context.base_name(),
            "speakers": stats["speaker_count"],
            "segments": stats["segment_count"],
            "words": stats["word_count"],
            "unique_words": frequencies["unique_words"],
            "duration_seconds": stats["duration_seconds"],
            "top_words": top_words,
        });

        let relative = format!("summary/data/global/{}_summary.json", context.base_name());
        match write_json_artifact(&context, &relative, &payload).await {
            Ok(artifact) => ModuleResult::with_artifacts(payload, vec![artifact]),
            Err(e) => ModuleResult::failure(e),
        }
    }

    fn name(&self) -> &'static str {
        "summary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::modules::test_support::context_in;

    #[tokio::test]
    async fn test_fails_without_upstream_results() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = SummaryModule.run(context_in(dir.path())).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_combines_upstream_results() {
        let dir = tempfile::TempDir::new().unwrap();
        let context = context_in(dir.path());
        context.store_analysis_result(
            "stats",
            json!({"speaker_count": 2, "segment_count": 3, "word_count": 19, "duration_seconds": 8.0}),
        );
        context.store_analysis_result(
            "word_frequency",
            json!({"unique_words": 14, "top_words": [["back", 3]]}),
        );

        let ModuleResult::Success(output) = SummaryModule.run(Arc::clone(&context)).await else {
            panic!("summary should succeed");
        };
        assert_eq!(output.payload["speakers"], 2);
        assert_eq!(output.payload["top_words"], json!([["back", 3]]));
        assert_eq!(output.payload["transcript"], "episode_12");
    }
}
