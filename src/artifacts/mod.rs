// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Artifact index and its integrity validator.
//!
//! Every file a module writes is recorded with the hash of its bytes at the
//! moment it was registered. The validator later compares the index with the
//! filesystem and with the run history it points at.

mod registry;
mod validator;

pub use registry::{ArtifactRegistry, NewArtifact};
pub use validator::{ArtifactValidator, FindingKind, Severity, ValidationFinding, ValidationReport};

use std::path::{Component, Path};

use crate::errors::{StoreError, StoreResult};
use crate::store::ArtifactRole;

/// Stable key of an artifact: its path relative to the artifact root with
/// forward slashes.
///
/// Absolute paths and paths that climb out of the root are rejected.
pub fn artifact_key(relative_path: &Path) -> StoreResult<String> {
    let mut parts = Vec::new();
    for component in relative_path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(StoreError::PathOutsideRoot(
                    relative_path.display().to_string(),
                ))
            }
        }
    }
    if parts.is_empty() {
        return Err(StoreError::PathOutsideRoot(
            relative_path.display().to_string(),
        ));
    }
    Ok(parts.join("/"))
}

/// Lower-cased file extension, if any.
pub fn artifact_type(relative_path: &Path) -> Option<String> {
    relative_path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Role of an artifact whose module did not declare one.
///
/// Global data and charts are primary. So is anything else under a `data` or
/// `charts` directory that is not per-speaker.
pub fn infer_role(artifact_key: &str) -> ArtifactRole {
    let segments: Vec<&str> = artifact_key.split('/').collect();
    let under = |dir: &str| segments.iter().position(|s| *s == dir);

    for dir in ["data", "charts"] {
        if let Some(index) = under(dir) {
            // The last segment is the file name, not a directory.
            if index + 1 >= segments.len() {
                continue;
            }
            let next = segments.get(index + 1).copied();
            if next == Some("global") {
                return ArtifactRole::Primary;
            }
            if next != Some("speakers") && !segments.contains(&"speakers") {
                return ArtifactRole::Primary;
            }
        }
    }
    ArtifactRole::Intermediate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_artifact_key_uses_forward_slashes() {
        let path: PathBuf = ["stats", "data", "global", "x_stats.json"].iter().collect();
        assert_eq!(
            artifact_key(&path).unwrap(),
            "stats/data/global/x_stats.json"
        );
        assert_eq!(
            artifact_key(Path::new("./stats/x.json")).unwrap(),
            "stats/x.json"
        );
    }

    #[test]
    fn test_artifact_key_rejects_escaping_paths() {
        for bad in ["../x.json", "/tmp/x.json", "stats/../../x.json", ""] {
            assert!(
                matches!(artifact_key(Path::new(bad)), Err(StoreError::PathOutsideRoot(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_artifact_type_is_lowercase_extension() {
        assert_eq!(artifact_type(Path::new("a/B.PNG")).as_deref(), Some("png"));
        assert_eq!(artifact_type(Path::new("a/README")), None);
    }

    #[test]
    fn test_infer_role() {
        let cases = [
            ("sentiment/data/global/x.json", ArtifactRole::Primary),
            ("sentiment/charts/global/x.png", ArtifactRole::Primary),
            ("sentiment/data/x.csv", ArtifactRole::Primary),
            ("sentiment/data/speakers/x_host.json", ArtifactRole::Intermediate),
            ("sentiment/charts/speakers/x_host.png", ArtifactRole::Intermediate),
            ("transcript_output/x_transcript.txt", ArtifactRole::Intermediate),
            ("sentiment/data", ArtifactRole::Intermediate),
        ];
        for (key, expected) in cases {
            assert_eq!(infer_role(key), expected, "{}", key);
        }
    }
}
