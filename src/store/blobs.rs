// src/store/blobs.rs

//! Content-addressed blob import.
//!
//! Files under a root directory are selected with glob patterns and
//! registered under an id derived from their content, so the same file
//! shipped twice ends up as one blob.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info};

use crate::errors::Result;
use crate::store::{LocalMemoryStore, Store};

/// Number of hex characters of the content hash used as blob id.
pub const BLOB_ID_LEN: usize = 32;

/// Include/exclude glob patterns, relative to the import root.
#[derive(Debug, Clone, Default)]
pub struct BlobPatterns {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl BlobPatterns {
    pub fn new<S: Into<String>>(include: impl IntoIterator<Item = S>) -> Self {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    pub fn exclude<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }
}

/// Compiled form of [`BlobPatterns`].
struct BlobMatcher {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl BlobMatcher {
    fn new(patterns: &BlobPatterns) -> Result<Self> {
        let include = build_globset(&patterns.include)?;
        let exclude = if patterns.exclude.is_empty() {
            None
        } else {
            Some(build_globset(&patterns.exclude)?)
        };
        Ok(Self { include, exclude })
    }

    fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    let set = builder.build().context("building blob globset")?;
    Ok(set)
}

/// Compute the blake3 hash of a single file as hex.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Blob id for a file: prefix of its content hash.
pub fn blob_id_for_file(path: &Path) -> Result<String> {
    let mut hash = compute_file_hash(path)?;
    hash.truncate(BLOB_ID_LEN);
    Ok(hash)
}

/// All files under `root` whose root-relative path matches `patterns`,
/// sorted by path.
pub fn collect_matching_files(root: &Path, patterns: &BlobPatterns) -> Result<Vec<PathBuf>> {
    let matcher = BlobMatcher::new(patterns)?;
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries =
            std::fs::read_dir(&dir).with_context(|| format!("reading dir {:?}", dir))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if matcher.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Register every matching file under `root` as a blob.
///
/// Returns `(blob_id, path)` for each matching file, in path order. Files
/// whose content is already stored are not registered again.
pub fn import_blobs(
    store: &mut LocalMemoryStore,
    root: &Path,
    patterns: &BlobPatterns,
) -> Result<Vec<(String, PathBuf)>> {
    let mut imported = Vec::new();

    for path in collect_matching_files(root, patterns)? {
        let blob_id = blob_id_for_file(&path)?;
        if store.has_blob(&blob_id) {
            debug!(blob = %blob_id, path = ?path, "blob content already stored; skipping");
        } else {
            store.add_blob(&blob_id, &path)?;
        }
        imported.push((blob_id, path));
    }

    info!(root = ?root, count = imported.len(), "imported blobs");
    Ok(imported)
}
