// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::artifacts::{artifact_key, artifact_type, infer_role};
use crate::cache::hashing::hash_file_async;
use crate::errors::{StoreError, StoreResult};
use crate::observability::messages::artifacts::ArtifactsRegistered;
use crate::observability::messages::StructuredLog;
use crate::store::{ArtifactRecord, ArtifactRole, ModuleRun, NewArtifactRecord, RunStore};
use crate::traits::ArtifactOutput;

/// A file about to be indexed. The content hash is computed on registration.
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub module_run_id: i64,
    pub transcript_id: i64,
    pub relative_path: PathBuf,
    pub artifact_root: PathBuf,
    pub artifact_type: Option<String>,
    pub role: ArtifactRole,
}

#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    store: RunStore,
}

impl ArtifactRegistry {
    pub fn new(store: RunStore) -> Self {
        Self { store }
    }

    /// Hash the file as it is on disk now and index it.
    ///
    /// Fails with `DuplicateArtifactKey` when the module run already has an
    /// artifact with the same key.
    pub async fn register(&self, artifact: &NewArtifact) -> StoreResult<ArtifactRecord> {
        let record = self.prepare(artifact, &mut HashSet::new()).await?;
        self.store.insert_artifact(&record).await
    }

    /// Check and hash a module's declared outputs without writing to the index.
    ///
    /// Fails on the first output that escapes `artifact_root`, cannot be read,
    /// or repeats a key already declared or already indexed for the run.
    pub async fn prepare_outputs(
        &self,
        module_run: &ModuleRun,
        artifact_root: &Path,
        outputs: &[ArtifactOutput],
    ) -> StoreResult<Vec<NewArtifactRecord>> {
        let mut declared = HashSet::with_capacity(outputs.len());
        let mut records = Vec::with_capacity(outputs.len());
        for output in outputs {
            let key = artifact_key(&output.relative_path)?;
            let artifact = NewArtifact {
                module_run_id: module_run.id,
                transcript_id: module_run.transcript_id,
                relative_path: output.relative_path.clone(),
                artifact_root: artifact_root.to_path_buf(),
                artifact_type: artifact_type(&output.relative_path),
                role: output.role.unwrap_or_else(|| infer_role(&key)),
            };
            records.push(self.prepare(&artifact, &mut declared).await?);
        }
        Ok(records)
    }

    /// Index everything a module reported writing under `artifact_root`.
    ///
    /// All outputs are checked and hashed first and then inserted in one
    /// transaction, so a failure leaves no records for the module run.
    pub async fn register_outputs(
        &self,
        module_run: &ModuleRun,
        artifact_root: &Path,
        outputs: &[ArtifactOutput],
    ) -> StoreResult<Vec<ArtifactRecord>> {
        let prepared = self
            .prepare_outputs(module_run, artifact_root, outputs)
            .await?;
        let records = self.store.insert_artifacts(&prepared).await?;

        ArtifactsRegistered {
            module: &module_run.module_name,
            module_run_id: module_run.id,
            count: records.len(),
        }
        .log();
        Ok(records)
    }

    async fn prepare(
        &self,
        artifact: &NewArtifact,
        declared: &mut HashSet<String>,
    ) -> StoreResult<NewArtifactRecord> {
        let key = artifact_key(&artifact.relative_path)?;
        if declared.contains(&key)
            || self.store.artifact_exists(artifact.module_run_id, &key).await?
        {
            return Err(StoreError::DuplicateArtifactKey {
                module_run_id: artifact.module_run_id,
                artifact_key: key,
            });
        }

        let content_hash = hash_file_async(artifact.artifact_root.join(&artifact.relative_path))
            .await
            .map_err(|source| StoreError::ArtifactUnreadable {
                artifact_key: key.clone(),
                source,
            })?;
        declared.insert(key.clone());
        Ok(NewArtifactRecord {
            module_run_id: artifact.module_run_id,
            transcript_id: artifact.transcript_id,
            relative_path: key.clone(),
            artifact_key: key,
            artifact_root: artifact.artifact_root.to_string_lossy().into_owned(),
            artifact_type: artifact.artifact_type.clone(),
            artifact_role: artifact.role,
            content_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::hashing::sha256_hex;
    use crate::store::NewModuleRun;
    use tempfile::TempDir;

    async fn module_run(store: &RunStore) -> ModuleRun {
        let transcript = store
            .upsert_transcript("/data/standup.json", "content", "standup")
            .await
            .unwrap();
        let run = store
            .create_pipeline_run(transcript.id, "0.1.0", "cfg", "input")
            .await
            .unwrap();
        store
            .create_module_run(&NewModuleRun {
                pipeline_run_id: run.id,
                transcript_id: transcript.id,
                module_name: "stats",
                module_version: "1",
                module_config_hash: "cfg",
                module_input_hash: "k",
                is_cacheable: true,
                cache_reason: None,
            })
            .await
            .unwrap()
    }

    fn write(root: &Path, relative: &str, bytes: &[u8]) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[tokio::test]
    async fn test_register_outputs_hashes_and_classifies() {
        let store = RunStore::in_memory().await.unwrap();
        let module_run = module_run(&store).await;
        let root = TempDir::new().unwrap();
        write(root.path(), "stats/data/global/standup_stats.json", b"{\"words\":3}");
        write(root.path(), "stats/data/speakers/standup_A_stats.JSON", b"{}");
        write(root.path(), "stats/standup_notes.txt", b"notes");

        let registry = ArtifactRegistry::new(store.clone());
        let records = registry
            .register_outputs(
                &module_run,
                root.path(),
                &[
                    ArtifactOutput::new("stats/data/global/standup_stats.json"),
                    ArtifactOutput::new("stats/data/speakers/standup_A_stats.JSON"),
                    ArtifactOutput::new("stats/standup_notes.txt").with_role(ArtifactRole::Primary),
                ],
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].artifact_role, ArtifactRole::Primary);
        assert_eq!(records[0].content_hash, sha256_hex(b"{\"words\":3}"));
        assert_eq!(records[1].artifact_role, ArtifactRole::Intermediate);
        assert_eq!(records[1].artifact_type.as_deref(), Some("json"));
        assert_eq!(records[2].artifact_role, ArtifactRole::Primary);
        assert_eq!(records[2].absolute_path(), root.path().join("stats/standup_notes.txt"));
        assert_eq!(store.artifacts_for_module_run(module_run.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_registering_same_key_twice_fails() {
        let store = RunStore::in_memory().await.unwrap();
        let module_run = module_run(&store).await;
        let root = TempDir::new().unwrap();
        write(root.path(), "stats/data/global/standup_stats.json", b"{}");

        let output = ArtifactOutput::new("stats/data/global/standup_stats.json");
        let result = ArtifactRegistry::new(store.clone())
            .register_outputs(&module_run, root.path(), &[output.clone(), output])
            .await;

        assert!(matches!(
            result,
            Err(StoreError::DuplicateArtifactKey { ref artifact_key, .. })
                if artifact_key == "stats/data/global/standup_stats.json"
        ));
        assert!(store.artifacts_for_module_run(module_run.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_and_escaping_path_are_rejected() {
        let store = RunStore::in_memory().await.unwrap();
        let module_run = module_run(&store).await;
        let root = TempDir::new().unwrap();
        let registry = ArtifactRegistry::new(store.clone());

        let missing = registry
            .register_outputs(&module_run, root.path(), &[ArtifactOutput::new("stats/gone.json")])
            .await;
        assert!(matches!(
            missing,
            Err(StoreError::ArtifactUnreadable { ref artifact_key, .. }) if artifact_key == "stats/gone.json"
        ));

        let escaping = registry
            .register_outputs(&module_run, root.path(), &[ArtifactOutput::new("../outside.json")])
            .await;
        assert!(matches!(escaping, Err(StoreError::PathOutsideRoot(_))));
        assert!(store.artifacts_for_module_run(module_run.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_partway_leaves_no_records() {
        let store = RunStore::in_memory().await.unwrap();
        let module_run = module_run(&store).await;
        let root = TempDir::new().unwrap();
        write(root.path(), "stats/data/global/standup_a.json", b"{}");

        let result = ArtifactRegistry::new(store.clone())
            .register_outputs(
                &module_run,
                root.path(),
                &[
                    ArtifactOutput::new("stats/data/global/standup_a.json"),
                    ArtifactOutput::new("stats/data/global/standup_b.json"),
                ],
            )
            .await;

        assert!(matches!(result, Err(StoreError::ArtifactUnreadable { .. })));
        assert!(store.artifacts_for_module_run(module_run.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_key_already_indexed_is_rejected_before_insert() {
        let store = RunStore::in_memory().await.unwrap();
        let module_run = module_run(&store).await;
        let root = TempDir::new().unwrap();
        write(root.path(), "stats/data/global/standup_a.json", b"{}");
        write(root.path(), "stats/data/global/standup_b.json", b"[]");
        let registry = ArtifactRegistry::new(store.clone());

        registry
            .register(&NewArtifact {
                module_run_id: module_run.id,
                transcript_id: module_run.transcript_id,
                relative_path: PathBuf::from("stats/data/global/standup_a.json"),
                artifact_root: root.path().to_path_buf(),
                artifact_type: Some("json".to_string()),
                role: ArtifactRole::Primary,
            })
            .await
            .unwrap();

        let result = registry
            .register_outputs(
                &module_run,
                root.path(),
                &[
                    ArtifactOutput::new("stats/data/global/standup_b.json"),
                    ArtifactOutput::new("stats/data/global/standup_a.json"),
                ],
            )
            .await;

        assert!(matches!(result, Err(StoreError::DuplicateArtifactKey { .. })));
        let keys: Vec<String> = store
            .artifacts_for_module_run(module_run.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.artifact_key)
            .collect();
        assert_eq!(keys, ["stats/data/global/standup_a.json"]);
    }
}
