// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{tokenize, write_artifact};
use crate::context::{ComputedKey, PipelineContext};
use crate::traits::{AnalysisModule, ModuleResult};

const TOP_WORDS: usize = 20;

/// Token frequencies across the whole transcript.
pub struct WordFrequencyModule;

#[async_trait]
impl AnalysisModule for WordFrequencyModule {
    async fn run(&self, context: Arc<PipelineContext>) -> ModuleResult {
        let segments = context.segments();

        let mut word_counts: HashMap<String, usize> = HashMap::new();
        let mut segment_tokens = Vec::with_capacity(segments.len());
        for segment in segments.iter() {
            let tokens: Vec<String> = tokenize(&segment.text).collect();
            for token in &tokens {
                *word_counts.entry(token.clone()).or_insert(0) += 1;
            }
            segment_tokens.push(tokens);
        }

        // Most frequent first, ties alphabetical
        let mut ranked: Vec<(String, usize)> = word_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let total_words: usize = ranked.iter().map(|(_, count)| count).sum();
        let top_words: Vec<Value> = ranked
            .iter()
            .take(TOP_WORDS)
            .map(|(word, count)| json!([word, count]))
            .collect();

        let frequencies: serde_json::Map<String, Value> = ranked
            .iter()
            .map(|(word, count)| (word.clone(), json!(count)))
            .collect();
        context.store_computed_value(ComputedKey::WordFrequencies, Value::Object(frequencies));
        context.store_computed_value(ComputedKey::SegmentTokens, json!(segment_tokens));

        let mut csv = String::from("word,count\n");
        for (word, count) in &ranked {
            csv.push_str(&format!("{},{}\n", word, count));
        }
        let relative = format!(
            "word_frequency/data/global/{}_word_frequency.csv",
            context.base_name()
        );
        let artifact = match write_artifact(&context, &relative, csv.as_bytes()).await {
            Ok(artifact) => artifact,
            Err(e) => return ModuleResult::failure(e),
        };

        ModuleResult::with_artifacts(
            json!({
                "total_words": total_words,
                "unique_words": ranked.len(),
                "top_words": top_words,
            }),
            vec![artifact],
        )
    }

    fn name(&self) -> &'static str {
        "word_frequency"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::modules::test_support::context_in;
    use crate::traits::ModuleOutput;

    #[tokio::test]
    async fn test_ranks_words_by_frequency() {
        let dir = tempfile::TempDir::new().unwrap();
        let context = context_in(dir.path());

        let ModuleResult::Success(ModuleOutput { payload, artifacts }) =
            WordFrequencyModule.run(Arc::clone(&context)).await
        else {
            panic!("word_frequency should succeed");
        };

        // "back" and "to" appear three times each, "the" twice
        assert_eq!(payload["top_words"][0], json!(["back", 3]));
        assert_eq!(payload["top_words"][1], json!(["to", 3]));
        assert_eq!(payload["top_words"][2], json!(["the", 2]));
        assert_eq!(payload["total_words"], 19);

        let csv = std::fs::read_to_string(dir.path().join(&artifacts[0].relative_path)).unwrap();
        assert!(csv.starts_with("word,count\nback,3\n"));
        assert!(context
            .get_computed_value(&ComputedKey::WordFrequencies)
            .is_some());
    }
}
