// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::write_artifact;
use crate::context::PipelineContext;
use crate::store::ArtifactRole;
use crate::traits::{AnalysisModule, ModuleResult};

/// Human-readable rendering of the transcript.
pub struct TranscriptOutputModule;

fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0);
    let minutes = (total / 60.0).floor() as u64;
    format!("{:02}:{:05.2}", minutes, total - (minutes as f64) * 60.0)
}

#[async_trait]
impl AnalysisModule for TranscriptOutputModule {
    async fn run(&self, context: Arc<PipelineContext>) -> ModuleResult {
        let segments = context.segments();
        let speaker_map = context.speaker_map();

        let mut text = String::new();
        for segment in segments.iter() {
            if let Some(start) = segment.start {
                text.push_str(&format!("[{}] ", format_timestamp(start)));
            }
            if let Some(label) = &segment.speaker {
                let name = speaker_map.get(label).unwrap_or(label);
                text.push_str(&format!("{}: ", name));
            }
            text.push_str(segment.text.trim());
            text.push('\n');
        }

        let relative = format!("transcript_output/{}_transcript.txt", context.base_name());
        match write_artifact(&context, &relative, text.as_bytes()).await {
            Ok(artifact) => ModuleResult::with_artifacts(
                json!({ "lines": segments.len() }),
                vec![artifact.with_role(ArtifactRole::Primary)],
            ),
            Err(e) => ModuleResult::failure(e),
        }
    }

    fn name(&self) -> &'static str {
        "transcript_output"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::modules::test_support::context_in;
    use crate::traits::ModuleOutput;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00.00");
        assert_eq!(format_timestamp(75.5), "01:15.50");
    }

    #[tokio::test]
    async fn test_renders_named_speakers_with_timestamps() {
        let dir = tempfile::TempDir::new().unwrap();
        let context = context_in(dir.path());

        let ModuleResult::Success(ModuleOutput { artifacts, .. }) =
            TranscriptOutputModule.run(context).await
        else {
            panic!("transcript_output should succeed");
        };

        assert_eq!(artifacts[0].role, Some(ArtifactRole::Primary));
        let text = std::fs::read_to_string(dir.path().join(&artifacts[0].relative_path)).unwrap();
        let first_line = text.lines().next().unwrap();
        assert_eq!(first_line, "[00:00.00] Host: Welcome back to the show.");
        assert!(text.contains("SPEAKER_01: Thanks"));
    }
}
