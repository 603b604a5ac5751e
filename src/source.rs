// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record source reader.
//!
//! Loads the declaration directory and the auxiliary reserved and trusted
//! lists from disk. Reading is synchronous; async callers wrap it in
//! `tokio::task::spawn_blocking`.
//!
//! The reserved list (`reserved.json`) is a JSON array mixing two entry shapes:
//!
//! ```json
//! [
//!   "www",
//!   { "name": "docs", "target": "docs-site.example.org", "owner": "admins" }
//! ]
//! ```
//!
//! A bare string withholds the label from regular declarations. An object
//! withholds it and also publishes a reserved-origin record.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::constants::{DECLARATION_EXTENSION, RESERVED_DEFAULT_OWNER};
use crate::declaration::DesiredRecord;
use crate::errors::SourceError;

/// One declaration file as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationFile {
    /// Path of the file
    pub path: PathBuf,
    /// File stem, the label this file claims
    pub label: String,
    /// File contents, or the I/O error message when the file could not be read
    pub contents: Result<String, String>,
}

impl DeclarationFile {
    /// Build an in-memory declaration, mainly for tests and piped input.
    #[must_use]
    pub fn in_memory(path: impl Into<PathBuf>, label: &str, contents: &str) -> Self {
        Self {
            path: path.into(),
            label: label.to_string(),
            contents: Ok(contents.to_string()),
        }
    }

    /// Path rendered for diagnostics.
    #[must_use]
    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

/// One entry of the reserved list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ReservedEntry {
    /// Label withheld from regular declarations, no record published
    Label(String),
    /// Label withheld and published as a reserved-origin record
    Record {
        name: String,
        target: String,
        #[serde(default)]
        owner: Option<String>,
    },
}

impl ReservedEntry {
    /// The label this entry withholds.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Label(name) | Self::Record { name, .. } => name,
        }
    }

    /// The desired record this entry publishes, if any.
    #[must_use]
    pub fn desired_record(&self) -> Option<DesiredRecord> {
        match self {
            Self::Label(_) => None,
            Self::Record {
                name,
                target,
                owner,
            } => Some(DesiredRecord::reserved(
                name,
                owner.as_deref().unwrap_or(RESERVED_DEFAULT_OWNER),
                target,
            )),
        }
    }
}

/// The reserved-name list, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedList {
    entries: Vec<ReservedEntry>,
    path: Option<PathBuf>,
}

impl ReservedList {
    #[must_use]
    pub fn new(entries: Vec<ReservedEntry>) -> Self {
        Self {
            entries,
            path: None,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[ReservedEntry] {
        &self.entries
    }

    /// Whether `label` is withheld from regular declarations.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|entry| entry.name() == label)
    }

    /// Reserved-origin records to publish.
    #[must_use]
    pub fn records(&self) -> Vec<DesiredRecord> {
        self.entries
            .iter()
            .filter_map(ReservedEntry::desired_record)
            .collect()
    }

    /// Subject used in diagnostics about the entry for `label`.
    #[must_use]
    pub fn subject_for(&self, label: &str) -> String {
        let file = self
            .path
            .as_ref()
            .map_or_else(|| "reserved".to_string(), |p| p.display().to_string());
        format!("{file}#{label}")
    }
}

/// Read every `*.json` file under `dir`, sorted by path.
///
/// Sub-directories are walked so large registries can shard declarations
/// (`domains/a/alice.json`); hidden entries are skipped. Per-file read
/// failures are kept as `Err` contents so the validator reports them without
/// aborting the batch.
///
/// # Errors
///
/// Returns [`SourceError::DirectoryUnreadable`] if a directory cannot be listed.
pub fn load_declaration_files(dir: &Path) -> Result<Vec<DeclarationFile>, SourceError> {
    let mut paths = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let unreadable = |source| SourceError::DirectoryUnreadable {
            path: current.clone(),
            source,
        };
        for entry in fs::read_dir(&current).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            let hidden = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with('.'));
            if hidden {
                debug!(path = %path.display(), "Skipping hidden entry");
            } else if path.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|ext| ext.to_str()) == Some(DECLARATION_EXTENSION)
            {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "Skipping non-declaration entry");
            }
        }
    }
    paths.sort();

    let files: Vec<DeclarationFile> = paths.iter().map(|path| read_declaration(path)).collect();

    debug!(
        dir = %dir.display(),
        count = files.len(),
        "Loaded declaration files"
    );
    Ok(files)
}

/// Read a single declaration file; the label is the file stem.
#[must_use]
pub fn read_declaration(path: &Path) -> DeclarationFile {
    let label = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string();
    DeclarationFile {
        path: path.to_path_buf(),
        label,
        contents: fs::read_to_string(path).map_err(|e| e.to_string()),
    }
}

/// Lexically normalise `path`: `.` components are dropped and `..` removes
/// the preceding normal component. The filesystem is not consulted.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) =>
            {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Map user-supplied paths onto the paths of loaded declarations.
///
/// A selection matches a file when both normalise to the same path, or when
/// both canonicalise to the same file (absolute vs relative spellings,
/// symlinked directories). Selections that match nothing are returned
/// normalised so the validator can report them.
#[must_use]
pub fn resolve_selection(files: &[DeclarationFile], selection: &[PathBuf]) -> Vec<PathBuf> {
    let canonical: Vec<Option<PathBuf>> = files
        .iter()
        .map(|file| fs::canonicalize(&file.path).ok())
        .collect();

    selection
        .iter()
        .map(|selected| {
            let lexical = normalize_path(selected);
            let real = fs::canonicalize(selected).ok();
            files
                .iter()
                .zip(&canonical)
                .find(|(file, file_real)| {
                    normalize_path(&file.path) == lexical
                        || (real.is_some() && **file_real == real)
                })
                .map_or(lexical, |(file, _)| file.path.clone())
        })
        .collect()
}

/// Load the reserved-name list. A missing file yields an empty list.
///
/// # Errors
///
/// Returns an error if the file exists but is unreadable or malformed.
pub fn load_reserved_list(path: &Path) -> Result<ReservedList, SourceError> {
    let entries: Vec<ReservedEntry> = load_json_list(path)?;
    debug!(path = %path.display(), count = entries.len(), "Loaded reserved list");
    Ok(ReservedList {
        entries,
        path: Some(path.to_path_buf()),
    })
}

/// Load the trusted-owner set. A missing file yields an empty set.
///
/// # Errors
///
/// Returns an error if the file exists but is unreadable or malformed.
pub fn load_trusted_owners(path: &Path) -> Result<BTreeSet<String>, SourceError> {
    let owners: Vec<String> = load_json_list(path)?;
    debug!(path = %path.display(), count = owners.len(), "Loaded trusted owners");
    Ok(owners.into_iter().collect())
}

fn load_json_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SourceError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "List file not found, treating as empty");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(SourceError::ListUnreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&text).map_err(|source| SourceError::ListMalformed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod source_tests;
