// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admissibility rules for declaration files.
//!
//! Per-file rules run independently and collect every violation. Cross-file
//! rules (duplicate labels, per-owner quota) run once over the whole batch
//! afterwards. Nothing here logs or prints: results are returned as a
//! [`ValidationReport`] and presented by [`crate::report`].

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::ValidationPolicy;
use crate::constants::SUPPORTED_RECORD_KEY;
use crate::declaration::{DesiredRecord, RawDeclaration, RawOwner};
use crate::label::{normalize_hostname, validate_email, validate_hostname, validate_label};
use crate::source::{normalize_path, DeclarationFile, ReservedEntry};

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// The file could not be read or parsed
    Malformed,
    /// A required field is missing or has an invalid value
    Schema,
    /// The submitter is not the declared owner
    Security,
    /// Reserved name, quota, duplicate label or file name binding
    Policy,
}

impl DiagnosticKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Schema => "schema",
            Self::Security => "security",
            Self::Policy => "policy",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding about a file, label or owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// What the finding concerns (file path, reserved entry or owner)
    pub subject: String,
    pub kind: DiagnosticKind,
    /// One-line reason
    pub message: String,
}

impl Diagnostic {
    fn new(subject: &str, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            subject: subject.to_string(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.subject, self.kind, self.message)
    }
}

/// Outcome of validating a single declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub ok: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// `owner.username` when present as a non-empty string, used by quota checks
    pub owner: Option<String>,
    /// The canonical record, only when `ok`
    pub record: Option<DesiredRecord>,
}

/// Validate one declaration against the per-file rules.
///
/// Diagnostics use `filename_label` as their subject; [`validate_batch`]
/// reports file paths instead.
#[must_use]
pub fn validate_declaration(
    raw: &str,
    filename_label: &str,
    policy: &ValidationPolicy,
    requester: Option<&str>,
) -> Verdict {
    check_declaration(raw, filename_label, policy, requester, filename_label)
}

fn check_declaration(
    raw: &str,
    label: &str,
    policy: &ValidationPolicy,
    requester: Option<&str>,
    subject: &str,
) -> Verdict {
    let declaration = match parse_declaration(raw) {
        Ok(declaration) => declaration,
        Err(reason) => {
            return Verdict {
                ok: false,
                diagnostics: vec![Diagnostic::new(subject, DiagnosticKind::Malformed, reason)],
                owner: None,
                record: None,
            };
        }
    };

    let mut diagnostics = Vec::new();
    let mut push = |kind, message: String| diagnostics.push(Diagnostic::new(subject, kind, message));

    if let Err(violation) = validate_label(label) {
        push(
            DiagnosticKind::Schema,
            format!("file name label {label:?} {violation}"),
        );
    }
    if policy.is_reserved(label) {
        push(
            DiagnosticKind::Policy,
            format!("label {label:?} is reserved and cannot be claimed"),
        );
    }

    let owner = declaration.owner_object();
    if owner.is_none() {
        push(
            DiagnosticKind::Schema,
            "missing 'owner' object".to_string(),
        );
    }
    let RawOwner { username, email } = owner.unwrap_or_default();

    let username = non_empty_string(username.as_ref());
    match username {
        None => push(
            DiagnosticKind::Schema,
            "owner.username must be a non-empty string".to_string(),
        ),
        Some(username) => {
            if let Err(violation) = validate_label(username) {
                push(
                    DiagnosticKind::Schema,
                    format!("owner.username {username:?} {violation}"),
                );
            }
            if policy.require_filename_match && label != username {
                push(
                    DiagnosticKind::Policy,
                    format!("file name {label:?} must equal owner.username {username:?}"),
                );
            }
            if let Some(requester) = requester {
                if requester != username {
                    push(
                        DiagnosticKind::Security,
                        format!(
                            "submitted by {requester:?} but declares owner.username {username:?}"
                        ),
                    );
                }
            }
        }
    }

    let email = non_empty_string(email.as_ref());
    match email {
        None => push(
            DiagnosticKind::Schema,
            "owner.email must be a non-empty string".to_string(),
        ),
        Some(email) => {
            if let Err(reason) = validate_email(email) {
                push(DiagnosticKind::Schema, format!("owner.email {reason}"));
            }
        }
    }

    let mut target = None;
    match declaration.records_object() {
        None => push(
            DiagnosticKind::Schema,
            "missing 'records' object".to_string(),
        ),
        Some(records) => {
            for key in records.keys().filter(|key| *key != SUPPORTED_RECORD_KEY) {
                push(
                    DiagnosticKind::Schema,
                    format!("unsupported record type {key:?}, only {SUPPORTED_RECORD_KEY} is allowed"),
                );
            }
            match records.get(SUPPORTED_RECORD_KEY) {
                None => push(
                    DiagnosticKind::Schema,
                    format!("records must contain a {SUPPORTED_RECORD_KEY} entry"),
                ),
                Some(Value::String(value)) => {
                    let normalized = normalize_hostname(value);
                    match validate_hostname(&normalized) {
                        Ok(()) => target = Some(normalized),
                        Err(reason) => push(
                            DiagnosticKind::Schema,
                            format!("records.{SUPPORTED_RECORD_KEY} {value:?} {reason}"),
                        ),
                    }
                }
                Some(_) => push(
                    DiagnosticKind::Schema,
                    format!("records.{SUPPORTED_RECORD_KEY} must be a string"),
                ),
            }
        }
    }

    let ok = diagnostics.is_empty();
    let record = match (ok, username, email, target) {
        (true, Some(username), Some(email), Some(target)) => {
            Some(DesiredRecord::user(label, username, email, &target))
        }
        _ => None,
    };

    Verdict {
        ok,
        diagnostics,
        owner: username.map(str::to_string),
        record,
    }
}

/// Parse `raw` as a declaration. Only a top-level JSON object is accepted;
/// serde would otherwise read a struct from a sequence.
fn parse_declaration(raw: &str) -> Result<RawDeclaration, String> {
    match serde_json::from_str(raw) {
        Ok(value @ Value::Object(_)) => serde_json::from_value(value)
            .map_err(|e| format!("not a valid JSON declaration object: {e}")),
        Ok(_) => Err("declaration must be a JSON object".to_string()),
        Err(e) => Err(format!("not a valid JSON declaration object: {e}")),
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// Per-file result inside a [`ValidationReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    /// Path of the declaration, as displayed
    pub subject: String,
    pub label: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Result of validating a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Per-file outcomes for the files in scope
    pub files: Vec<FileOutcome>,
    /// Findings about reserved-list entries
    pub reserved: Vec<Diagnostic>,
    /// Duplicate-label and quota findings
    pub cross_file: Vec<Diagnostic>,
    /// Records from files that passed every per-file rule
    pub user_records: Vec<DesiredRecord>,
    /// Records published by the reserved list
    pub reserved_records: Vec<DesiredRecord>,
}

impl ValidationReport {
    /// Every diagnostic: per-file first, then reserved-list, then cross-file.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files
            .iter()
            .flat_map(|file| file.diagnostics.iter())
            .chain(self.reserved.iter())
            .chain(self.cross_file.iter())
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.diagnostics().next().is_none()
    }

    #[must_use]
    pub fn passed_files(&self) -> usize {
        self.files.iter().filter(|file| file.is_ok()).count()
    }

    #[must_use]
    pub fn failed_files(&self) -> usize {
        self.files.len() - self.passed_files()
    }

    /// The full desired set (user and reserved), sorted by label.
    ///
    /// Only meaningful when [`is_ok`](Self::is_ok) holds.
    #[must_use]
    pub fn desired_records(&self) -> Vec<DesiredRecord> {
        let mut records: Vec<DesiredRecord> = self
            .user_records
            .iter()
            .chain(self.reserved_records.iter())
            .cloned()
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }
}

/// Validate a batch of declarations.
///
/// * `requester` - identity submitting the change; checked against
///   `owner.username` of every file in scope
/// * `selected` - when set, only these paths are in scope: per-file findings
///   for other files are dropped and cross-file findings are kept only when
///   they involve a selected file. Every file still feeds the cross-file rules.
///   Paths are compared after [`normalize_path`]; a selected path that
///   matches no file is reported as [`DiagnosticKind::Malformed`]. Callers
///   holding files on disk should map spellings first with
///   [`crate::source::resolve_selection`].
#[must_use]
pub fn validate_batch(
    files: &[DeclarationFile],
    policy: &ValidationPolicy,
    requester: Option<&str>,
    selected: Option<&[PathBuf]>,
) -> ValidationReport {
    let selected: Option<Vec<PathBuf>> =
        selected.map(|paths| paths.iter().map(|path| normalize_path(path)).collect());
    let in_scope = |file: &DeclarationFile| {
        selected
            .as_ref()
            .is_none_or(|paths| paths.contains(&normalize_path(&file.path)))
    };

    let mut report = ValidationReport::default();
    for missing in selected.iter().flatten().filter(|path| {
        !files
            .iter()
            .any(|file| normalize_path(&file.path) == **path)
    }) {
        let subject = missing.display().to_string();
        report.files.push(FileOutcome {
            diagnostics: vec![Diagnostic::new(
                &subject,
                DiagnosticKind::Malformed,
                "selected file is not a declaration in the declarations directory".to_string(),
            )],
            label: missing
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string(),
            subject,
        });
    }

    let mut claims: BTreeMap<&str, Vec<&DeclarationFile>> = BTreeMap::new();
    let mut owners: BTreeMap<String, Vec<&DeclarationFile>> = BTreeMap::new();

    for file in files {
        let subject = file.display_path();
        let scoped = in_scope(file);
        let verdict = match &file.contents {
            Ok(raw) => check_declaration(
                raw,
                &file.label,
                policy,
                requester.filter(|_| scoped),
                &subject,
            ),
            Err(reason) => Verdict {
                ok: false,
                diagnostics: vec![Diagnostic::new(
                    &subject,
                    DiagnosticKind::Malformed,
                    format!("could not be read: {reason}"),
                )],
                owner: None,
                record: None,
            },
        };

        claims.entry(file.label.as_str()).or_default().push(file);
        if let Some(owner) = verdict.owner {
            owners.entry(owner).or_default().push(file);
        }
        if let Some(record) = verdict.record {
            report.user_records.push(record);
        }
        if scoped {
            report.files.push(FileOutcome {
                subject,
                label: file.label.clone(),
                diagnostics: verdict.diagnostics,
            });
        }
    }

    let touches_scope = |claimants: &[&DeclarationFile]| claimants.iter().any(|f| in_scope(*f));

    for (label, claimants) in &claims {
        if claimants.len() > 1 && touches_scope(claimants) {
            report.cross_file.push(Diagnostic::new(
                label,
                DiagnosticKind::Policy,
                format!(
                    "label {label:?} is declared by {} files: {}",
                    claimants.len(),
                    join_paths(claimants)
                ),
            ));
        }
    }

    for (owner, declared) in &owners {
        if declared.len() > 1 && !policy.is_trusted(owner) && touches_scope(declared) {
            report.cross_file.push(Diagnostic::new(
                owner,
                DiagnosticKind::Policy,
                format!(
                    "owner {owner:?} has {} declarations, untrusted owners are limited to 1: {}",
                    declared.len(),
                    join_paths(declared)
                ),
            ));
        }
    }

    if selected.is_none() {
        check_reserved_entries(policy, &mut report);
    }
    report.reserved_records = policy.reserved.records();
    report
}

fn check_reserved_entries(policy: &ValidationPolicy, report: &mut ValidationReport) {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in policy.reserved.entries() {
        let name = entry.name();
        let subject = policy.reserved.subject_for(name);
        *seen.entry(name).or_default() += 1;

        if let Err(violation) = validate_label(name) {
            report.reserved.push(Diagnostic::new(
                &subject,
                DiagnosticKind::Schema,
                format!("reserved label {name:?} {violation}"),
            ));
        }
        if let ReservedEntry::Record { target, .. } = entry {
            if let Err(reason) = validate_hostname(&normalize_hostname(target)) {
                report.reserved.push(Diagnostic::new(
                    &subject,
                    DiagnosticKind::Schema,
                    format!("reserved target {target:?} {reason}"),
                ));
            }
        }
    }
    for (name, count) in seen.into_iter().filter(|(_, count)| *count > 1) {
        report.reserved.push(Diagnostic::new(
            &policy.reserved.subject_for(name),
            DiagnosticKind::Policy,
            format!("reserved label {name:?} is listed {count} times"),
        ));
    }
}

fn join_paths(files: &[&DeclarationFile]) -> String {
    files
        .iter()
        .map(|file| file.display_path())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
