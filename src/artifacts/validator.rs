// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cache::hashing::hash_file;
use crate::config::consts::{KNOWN_ARTIFACT_SUFFIXES, METADATA_DIR_NAME};
use crate::errors::StoreResult;
use crate::observability::messages::artifacts::ValidationCompleted;
use crate::observability::messages::StructuredLog;
use crate::store::{ArtifactProvenance, RunStore, TranscriptRecord};

/// How bad a finding is. P0 findings mean the index cannot be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    P0,
    P1,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    UnknownTranscript,
    MissingFile,
    HashMismatch,
    BrokenProvenance,
    DuplicateArtifactKey,
    OrphanFile,
    SuspiciousFilename,
    UnrecognizedType,
}

impl FindingKind {
    pub fn severity(&self) -> Severity {
        match self {
            FindingKind::UnknownTranscript
            | FindingKind::MissingFile
            | FindingKind::BrokenProvenance
            | FindingKind::DuplicateArtifactKey => Severity::P0,
            FindingKind::HashMismatch | FindingKind::OrphanFile => Severity::P1,
            FindingKind::SuspiciousFilename | FindingKind::UnrecognizedType => Severity::Warning,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FindingKind::UnknownTranscript => "Transcript not found",
            FindingKind::MissingFile => "Missing file",
            FindingKind::HashMismatch => "Hash mismatch",
            FindingKind::BrokenProvenance => "Broken provenance",
            FindingKind::DuplicateArtifactKey => "Duplicate artifact key in module run",
            FindingKind::OrphanFile => "Orphan file",
            FindingKind::SuspiciousFilename => "Suspicious filename",
            FindingKind::UnrecognizedType => "Unrecognized artifact type",
        }
    }
}

/// One integrity problem and the path or identifier it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFinding {
    pub kind: FindingKind,
    pub subject: String,
}

impl ValidationFinding {
    pub fn new(kind: FindingKind, subject: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
        }
    }
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.subject)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub transcript_id: Option<i64>,
    pub p0_errors: Vec<ValidationFinding>,
    pub p1_errors: Vec<ValidationFinding>,
    pub warnings: Vec<ValidationFinding>,
    pub checked_files: usize,
    pub checked_records: usize,
    pub strict: bool,
}

impl ValidationReport {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Self::default()
        }
    }

    pub fn push(&mut self, finding: ValidationFinding) {
        match finding.kind.severity() {
            Severity::P0 => self.p0_errors.push(finding),
            Severity::P1 => self.p1_errors.push(finding),
            Severity::Warning => self.warnings.push(finding),
        }
    }

    /// Process exit status for the strictness the report was produced with.
    pub fn exit_code(&self) -> i32 {
        self.exit_code_for(self.strict)
    }

    /// 2 for any P0, else 1 for any P1, else 1 for warnings when strict, else 0.
    pub fn exit_code_for(&self, strict: bool) -> i32 {
        if !self.p0_errors.is_empty() {
            2
        } else if !self.p1_errors.is_empty() || (strict && !self.warnings.is_empty()) {
            1
        } else {
            0
        }
    }

    pub fn is_clean(&self) -> bool {
        self.p0_errors.is_empty() && self.p1_errors.is_empty() && self.warnings.is_empty()
    }

    /// Every finding, most severe first.
    pub fn findings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.p0_errors
            .iter()
            .chain(self.p1_errors.iter())
            .chain(self.warnings.iter())
    }
}

/// Cross-checks the artifact index against the filesystem and the run history.
///
/// Integrity problems never surface as errors; they are collected in the
/// report. Only failures to query the store are returned as `Err`.
#[derive(Debug, Clone)]
pub struct ArtifactValidator {
    store: RunStore,
    output_root: PathBuf,
}

impl ArtifactValidator {
    /// `output_root` is where per-transcript artifact directories live when a
    /// transcript has no indexed artifacts to point at one.
    pub fn new(store: RunStore, output_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            output_root: output_root.into(),
        }
    }

    /// Validate one transcript's artifacts, optionally limited to those of a
    /// single pipeline run (including runs it reused).
    ///
    /// `identifier` is a transcript id, a 64 character content hash, or the
    /// transcript's path.
    pub async fn validate(
        &self,
        identifier: &str,
        pipeline_run_id: Option<i64>,
        strict: bool,
    ) -> StoreResult<ValidationReport> {
        let mut report = ValidationReport::new(strict);
        let Some(transcript) = self.resolve_transcript(identifier).await? else {
            report.push(ValidationFinding::new(FindingKind::UnknownTranscript, identifier));
            self.log_report(identifier, &report);
            return Ok(report);
        };
        report.transcript_id = Some(transcript.id);

        let records = self
            .store
            .artifact_provenance(transcript.id, pipeline_run_id)
            .await?;
        // Files of other runs are not orphans when validating a single run.
        let indexed = match pipeline_run_id {
            Some(_) => self.store.artifact_provenance(transcript.id, None).await?,
            None => records.clone(),
        };
        report.checked_records = records.len();

        let default_root = self.output_root.join(&transcript.base_name);
        let base_name = transcript.base_name.clone();
        let (findings, checked_files) = tokio::task::spawn_blocking(move || {
            audit_filesystem(&records, &indexed, default_root, &base_name)
        })
        .await
        .map_err(io::Error::other)?;
        report.checked_files = checked_files;
        for finding in findings {
            report.push(finding);
        }

        self.log_report(&transcript.file_path, &report);
        Ok(report)
    }

    async fn resolve_transcript(&self, identifier: &str) -> StoreResult<Option<TranscriptRecord>> {
        if !identifier.is_empty() && identifier.chars().all(|c| c.is_ascii_digit()) {
            return match identifier.parse::<i64>() {
                Ok(id) => self.store.transcript_by_id(id).await,
                Err(_) => Ok(None),
            };
        }

        if identifier.len() == 64 && identifier.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Some(transcript) = self
                .store
                .transcript_by_content_hash(&identifier.to_ascii_lowercase())
                .await?
            {
                return Ok(Some(transcript));
            }
        }

        if let Some(transcript) = self.store.transcript_by_path(identifier).await? {
            return Ok(Some(transcript));
        }
        match std::fs::canonicalize(identifier) {
            Ok(resolved) => {
                self.store
                    .transcript_by_path(&resolved.to_string_lossy())
                    .await
            }
            Err(_) => Ok(None),
        }
    }

    fn log_report(&self, transcript: &str, report: &ValidationReport) {
        ValidationCompleted {
            transcript,
            checked_records: report.checked_records,
            checked_files: report.checked_files,
            p0: report.p0_errors.len(),
            p1: report.p1_errors.len(),
            warnings: report.warnings.len(),
        }
        .log();
    }
}

/// Record checks plus the orphan and naming scan of every artifact root.
///
/// Reads and walks files, so it runs on the blocking pool.
fn audit_filesystem(
    records: &[ArtifactProvenance],
    indexed: &[ArtifactProvenance],
    default_root: PathBuf,
    base_name: &str,
) -> (Vec<ValidationFinding>, usize) {
    let mut findings = check_records(records);

    let mut roots: BTreeSet<PathBuf> = records
        .iter()
        .map(|r| PathBuf::from(&r.artifact.artifact_root))
        .collect();
    roots.insert(default_root);

    let expected = expected_by_root(indexed);
    let empty = HashSet::new();
    let mut checked_files = 0;
    for root in &roots {
        let files = collect_files(root);
        checked_files += files.len();
        let expected = expected.get(root).unwrap_or(&empty);
        for relative in &files {
            if !expected.contains(relative) {
                findings.push(ValidationFinding::new(FindingKind::OrphanFile, relative.as_str()));
            }
            findings.extend(check_naming(relative, base_name));
        }
    }
    (findings, checked_files)
}

/// Provenance, duplicate key, presence and hash checks over indexed records.
fn check_records(records: &[ArtifactProvenance]) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    let mut seen: HashSet<(i64, &str)> = HashSet::new();

    for record in records {
        let artifact = &record.artifact;
        if !seen.insert((artifact.module_run_id, artifact.artifact_key.as_str())) {
            findings.push(ValidationFinding::new(
                FindingKind::DuplicateArtifactKey,
                artifact.artifact_key.as_str(),
            ));
        }

        if !record.is_intact() {
            findings.push(ValidationFinding::new(
                FindingKind::BrokenProvenance,
                artifact.relative_path.as_str(),
            ));
        }

        let path = artifact.absolute_path();
        if !path.is_file() {
            findings.push(ValidationFinding::new(
                FindingKind::MissingFile,
                artifact.relative_path.as_str(),
            ));
            continue;
        }

        match hash_file(&path) {
            Ok(actual) if actual == artifact.content_hash => {}
            Ok(_) => findings.push(ValidationFinding::new(
                FindingKind::HashMismatch,
                artifact.relative_path.as_str(),
            )),
            Err(e) => findings.push(ValidationFinding::new(
                FindingKind::HashMismatch,
                format!("{} (unreadable: {})", artifact.relative_path, e),
            )),
        }
    }
    findings
}

fn expected_by_root(records: &[ArtifactProvenance]) -> BTreeMap<PathBuf, HashSet<String>> {
    let mut expected: BTreeMap<PathBuf, HashSet<String>> = BTreeMap::new();
    for record in records {
        expected
            .entry(PathBuf::from(&record.artifact.artifact_root))
            .or_default()
            .insert(record.artifact.relative_path.clone());
    }
    expected
}

fn is_ignored(name: &str) -> bool {
    name == METADATA_DIR_NAME || name.eq_ignore_ascii_case(".ds_store")
}

/// Relative, forward-slash paths of every file under `root`.
fn collect_files(root: &Path) -> Vec<String> {
    if !root.is_dir() {
        return Vec::new();
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(&entry.file_name().to_string_lossy()));

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if let Ok(relative) = entry.path().strip_prefix(root) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    files.push(parts.join("/"));
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(root = %root.display(), error = %e, "Error accessing artifact entry"),
        }
    }
    files
}

fn check_naming(relative: &str, base_name: &str) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    let path = Path::new(relative);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !file_name.contains(base_name) {
        findings.push(ValidationFinding::new(FindingKind::SuspiciousFilename, relative));
    }
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        if !KNOWN_ARTIFACT_SUFFIXES.contains(&ext.as_str()) {
            findings.push(ValidationFinding::new(FindingKind::UnrecognizedType, relative));
        }
    }
    findings
}
