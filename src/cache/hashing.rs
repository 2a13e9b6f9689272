// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Content addressing helpers.
//!
//! Every hash in the run store is a lowercase hex SHA-256 digest. Structured
//! payloads are hashed over their canonical JSON form: object keys sorted
//! recursively, no insignificant whitespace. Two payloads that differ only in
//! key order therefore hash identically.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const FILE_CHUNK_SIZE: usize = 8192;

/// Lowercase hex SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Recursively rebuild a value with object keys in sorted order.
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), sort_keys(v));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Compact, key-sorted JSON text for a value.
pub fn canonical_json(value: &Value) -> String {
    // Serializing a `Value` cannot fail: keys are always strings.
    serde_json::to_string(&sort_keys(value)).unwrap_or_default()
}

/// Hash a structured payload over its canonical JSON form.
pub fn hash_payload(value: &Value) -> String {
    sha256_hex(canonical_json(value).as_bytes())
}

/// Stream a file through SHA-256 in fixed-size chunks.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; FILE_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// [`hash_file`] on the blocking thread pool, for use from async code.
pub async fn hash_file_async(path: PathBuf) -> io::Result<String> {
    tokio::task::spawn_blocking(move || hash_file(&path))
        .await
        .map_err(io::Error::other)?
}

/// Builds the input fingerprint for one module execution.
///
/// The fingerprint covers the transcript content, the module's own
/// configuration and the output hash of every dependency, so editing any of
/// them changes the hash and misses the cache.
#[derive(Debug, Clone)]
pub struct InputHasher {
    transcript_hash: String,
    config_hash: String,
    dependency_outputs: BTreeMap<String, Option<String>>,
}

impl InputHasher {
    pub fn new(transcript_hash: impl Into<String>, config_hash: impl Into<String>) -> Self {
        Self {
            transcript_hash: transcript_hash.into(),
            config_hash: config_hash.into(),
            dependency_outputs: BTreeMap::new(),
        }
    }

    /// Record a dependency's output hash. `None` when the dependency produced
    /// no hash (it failed, or has not been recorded yet).
    pub fn dependency(mut self, module: impl Into<String>, output_hash: Option<String>) -> Self {
        self.dependency_outputs.insert(module.into(), output_hash);
        self
    }

    pub fn finish(&self) -> String {
        let dependencies: Map<String, Value> = self
            .dependency_outputs
            .iter()
            .map(|(name, hash)| {
                let value = hash.clone().map(Value::String).unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect();

        hash_payload(&serde_json::json!({
            "transcript_content_hash": self.transcript_hash,
            "module_config_hash": self.config_hash,
            "dependency_output_hashes": dependencies,
        }))
    }
}

/// Hash identifying a pipeline run's inputs.
pub fn pipeline_input_hash(transcript_hash: &str, config_hash: &str) -> String {
    hash_payload(&serde_json::json!({
        "transcript_content_hash": transcript_hash,
        "pipeline_config_hash": config_hash,
    }))
}

/// Output fingerprint of a module run.
///
/// Derived from the `(artifact_key, content_hash)` pairs of the run's primary
/// artifacts. A module with no primary artifacts falls back to hashing its
/// result payload together with its name and version.
pub fn output_hash<'a, I>(primary_artifacts: I, module: &str, version: &str, payload: &Value) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = primary_artifacts.into_iter().collect();
    if pairs.is_empty() {
        return hash_payload(&serde_json::json!({
            "module": module,
            "version": version,
            "outputs": payload,
        }));
    }
    pairs.sort();
    let entries: Vec<Value> = pairs
        .into_iter()
        .map(|(key, hash)| serde_json::json!([key, hash]))
        .collect();
    hash_payload(&Value::Array(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_key_order_does_not_change_hash() {
        let a = json!({"b": 1, "a": {"y": true, "x": [1, 2]}});
        let b = json!({"a": {"x": [1, 2], "y": true}, "b": 1});
        assert_eq!(hash_payload(&a), hash_payload(&b));
        assert_eq!(canonical_json(&a), r#"{"a":{"x":[1,2],"y":true},"b":1}"#);
    }

    #[test]
    fn test_array_order_changes_hash() {
        assert_ne!(hash_payload(&json!([1, 2])), hash_payload(&json!([2, 1])));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_file_matches_in_memory_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let content = vec![b'x'; FILE_CHUNK_SIZE * 2 + 17];
        file.write_all(&content).unwrap();
        file.flush().unwrap();

        assert_eq!(hash_file(file.path()).unwrap(), sha256_hex(&content));
    }

    #[tokio::test]
    async fn test_hash_file_async_matches_blocking_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"speaker,words\nA,3\n").unwrap();
        file.flush().unwrap();

        let path = file.path().to_path_buf();
        assert_eq!(hash_file_async(path.clone()).await.unwrap(), hash_file(&path).unwrap());
        assert!(hash_file_async(path.join("missing")).await.is_err());
    }

    #[test]
    fn test_input_hash_tracks_dependency_outputs() {
        let base = InputHasher::new("t", "c").dependency("ner", Some("h1".to_string()));
        let changed = InputHasher::new("t", "c").dependency("ner", Some("h2".to_string()));
        let same = InputHasher::new("t", "c").dependency("ner", Some("h1".to_string()));

        assert_eq!(base.finish(), same.finish());
        assert_ne!(base.finish(), changed.finish());
        assert_ne!(base.finish(), InputHasher::new("t", "c").finish());
    }

    #[test]
    fn test_input_hash_tracks_config() {
        assert_ne!(
            InputHasher::new("t", "c1").finish(),
            InputHasher::new("t", "c2").finish()
        );
    }

    #[test]
    fn test_output_hash_ignores_artifact_order() {
        let forward = output_hash([("a.json", "1"), ("b.json", "2")], "m", "1", &Value::Null);
        let reversed = output_hash([("b.json", "2"), ("a.json", "1")], "m", "1", &Value::Null);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_output_hash_falls_back_to_payload() {
        let empty: [(&str, &str); 0] = [];
        let a = output_hash(empty, "m", "1", &json!({"count": 1}));
        let b = output_hash(empty, "m", "1", &json!({"count": 2}));
        assert_ne!(a, b);
    }
}
