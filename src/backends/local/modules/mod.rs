// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod stats;
pub mod summary;
pub mod transcript_output;
pub mod word_frequency;

pub use stats::StatsModule;
pub use summary::SummaryModule;
pub use transcript_output::TranscriptOutputModule;
pub use word_frequency::WordFrequencyModule;

use serde_json::Value;

use crate::context::PipelineContext;
use crate::traits::ArtifactOutput;

/// Write `bytes` under the context's output directory, creating parents.
pub(crate) async fn write_artifact(
    context: &PipelineContext,
    relative_path: &str,
    bytes: &[u8],
) -> Result<ArtifactOutput, String> {
    let path = context.output_dir().join(relative_path);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    Ok(ArtifactOutput::new(relative_path))
}

pub(crate) async fn write_json_artifact(
    context: &PipelineContext,
    relative_path: &str,
    value: &Value,
) -> Result<ArtifactOutput, String> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| format!("Failed to serialize {}: {}", relative_path, e))?;
    write_artifact(context, relative_path, &bytes).await
}

/// Lower-cased alphanumeric tokens of a piece of text.
pub(crate) fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().filter_map(|word| {
        let normalized: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        (!normalized.is_empty()).then_some(normalized)
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::context::PipelineContext;
    use crate::transcript::{CanonicalTranscript, Segment};
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Arc;

    pub fn context_in(output_dir: &Path) -> Arc<PipelineContext> {
        let transcript = CanonicalTranscript::from_segments(
            vec![
                Segment::new(Some("SPEAKER_00"), "Welcome back to the show.").with_timing(0.0, 2.5),
                Segment::new(Some("SPEAKER_01"), "Thanks, it is great to be back.")
                    .with_timing(2.5, 5.0),
                Segment::new(Some("SPEAKER_00"), "Let us get back to the data.")
                    .with_timing(5.0, 8.0),
            ],
            BTreeMap::from([("SPEAKER_00".to_string(), "Host".to_string())]),
        );
        Arc::new(PipelineContext::new(
            "/transcripts/episode_12.json",
            transcript,
            output_dir,
        ))
    }
}
