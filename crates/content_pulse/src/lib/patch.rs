//! # Patch files
//!
//! Splits a bundle of files concatenated as
//!
//! ```text
//! === FILE: src/main.rs ===
//! fn main() {}
//! === FILE: README.md ===
//! # Hello
//! ```
//!
//! and writes every section to its path under a root directory.

use std::{
    path::{Component, Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;

static FILE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=== FILE: (.*?) ===\s*$").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("Line {line}: file marker has an empty path")]
    EmptyPath { line: usize },
    #[error("Line {line}: refusing to write outside the root: {path}")]
    UnsafePath { line: usize, path: String },
    #[error("No `=== FILE: <path> ===` markers found")]
    NoFiles,
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    /// Relative to the root the patch is applied to
    pub path: PathBuf,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub files: Vec<PatchFile>,
    /// Non blank text found before the first marker
    pub preamble: Option<String>,
}

/// Only plain relative paths are accepted
fn checked_path(raw: &str, line: usize) -> Result<PathBuf, PatchError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PatchError::EmptyPath { line });
    }

    let path = PathBuf::from(raw);
    let safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe || path.is_absolute() {
        return Err(PatchError::UnsafePath {
            line,
            path: raw.to_string(),
        });
    }

    Ok(path)
}

pub fn parse_patch(input: &str) -> Result<Patch, PatchError> {
    let mut files: Vec<PatchFile> = Vec::new();
    let mut preamble = String::new();

    for (idx, line) in input.split_inclusive('\n').enumerate() {
        let marker = line.trim_end_matches(['\r', '\n']);
        if let Some(cap) = FILE_MARKER_RE.captures(marker) {
            let path = checked_path(&cap[1], idx + 1)?;
            files.push(PatchFile {
                path,
                contents: String::new(),
            });
            continue;
        }

        match files.last_mut() {
            Some(file) => file.contents.push_str(line),
            None => preamble.push_str(line),
        }
    }

    if files.is_empty() {
        return Err(PatchError::NoFiles);
    }

    let preamble = (!preamble.trim().is_empty()).then(|| preamble.trim().to_string());
    if let Some(text) = &preamble {
        tracing::warn!(chars = text.len(), "Ignoring text before the first file marker");
    }

    Ok(Patch { files, preamble })
}

impl Patch {
    /// Writes every file under `root`, creating parent directories. With
    /// `dry_run` nothing is written. Returns the target paths in order.
    pub fn apply(&self, root: &Path, dry_run: bool) -> Result<Vec<PathBuf>, PatchError> {
        let mut written = Vec::with_capacity(self.files.len());

        for file in &self.files {
            let target = root.join(&file.path);
            if dry_run {
                tracing::info!(path = %target.display(), bytes = file.contents.len(), "Would write");
                written.push(target);
                continue;
            }

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|source| PatchError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            std::fs::write(&target, &file.contents).map_err(|source| PatchError::Io {
                path: target.clone(),
                source,
            })?;
            tracing::info!(path = %target.display(), bytes = file.contents.len(), "Wrote file");

            written.push(target);
        }

        Ok(written)
    }
}
