// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Syntax checks for subdomain labels, alias targets and contact addresses.
//!
//! Each check returns the first rule broken so diagnostics can name it
//! precisely ("contains consecutive hyphens", "exceeds 63 characters", ...).

use std::fmt;

use crate::constants::{MAX_EMAIL_LEN, MAX_HOSTNAME_LEN, MAX_LABEL_LEN};

/// A specific label syntax rule that was broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelViolation {
    /// Label has zero length
    Empty,
    /// Label is longer than 63 characters
    TooLong(usize),
    /// Label contains an ASCII uppercase letter
    Uppercase,
    /// Label contains a character outside `[a-z0-9-]`
    InvalidCharacter(char),
    /// Label starts with `-`
    LeadingHyphen,
    /// Label ends with `-`
    TrailingHyphen,
    /// Label contains `--`
    ConsecutiveHyphens,
}

impl fmt::Display for LabelViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "is empty"),
            Self::TooLong(len) => {
                write!(f, "exceeds {MAX_LABEL_LEN} characters (has {len})")
            }
            Self::Uppercase => write!(f, "contains uppercase letters"),
            Self::InvalidCharacter(c) => write!(f, "contains invalid character {c:?}"),
            Self::LeadingHyphen => write!(f, "starts with a hyphen"),
            Self::TrailingHyphen => write!(f, "ends with a hyphen"),
            Self::ConsecutiveHyphens => write!(f, "contains consecutive hyphens"),
        }
    }
}

/// Check a subdomain label: `[a-z0-9]` with single internal hyphens, 1-63 chars.
///
/// # Errors
///
/// Returns the first [`LabelViolation`] found, checked in declaration order.
pub fn validate_label(label: &str) -> Result<(), LabelViolation> {
    if label.is_empty() {
        return Err(LabelViolation::Empty);
    }
    let len = label.chars().count();
    if len > MAX_LABEL_LEN {
        return Err(LabelViolation::TooLong(len));
    }
    if label.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(LabelViolation::Uppercase);
    }
    if let Some(c) = label
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(LabelViolation::InvalidCharacter(c));
    }
    if label.starts_with('-') {
        return Err(LabelViolation::LeadingHyphen);
    }
    if label.ends_with('-') {
        return Err(LabelViolation::TrailingHyphen);
    }
    if label.contains("--") {
        return Err(LabelViolation::ConsecutiveHyphens);
    }
    Ok(())
}

/// Normalize an alias target: trim whitespace and a single trailing dot, lowercase.
#[must_use]
pub fn normalize_hostname(host: &str) -> String {
    let trimmed = host.trim();
    trimmed
        .strip_suffix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

/// Check an alias target hostname.
///
/// The hostname is expected to be normalized already (see [`normalize_hostname`]).
/// Each dot-separated part follows DNS hostname rules, which unlike subdomain
/// labels allow consecutive hyphens (`xn--` punycode).
///
/// # Errors
///
/// Returns a one-line reason naming the rule broken.
pub fn validate_hostname(host: &str) -> Result<(), String> {
    if host.is_empty() {
        return Err("is empty".to_string());
    }
    if host.len() > MAX_HOSTNAME_LEN {
        return Err(format!(
            "exceeds {MAX_HOSTNAME_LEN} characters (has {})",
            host.len()
        ));
    }
    if !host.contains('.') {
        return Err("must be a fully-qualified name containing at least one dot".to_string());
    }
    for part in host.split('.') {
        if part.is_empty() {
            return Err("contains an empty label".to_string());
        }
        if part.len() > MAX_LABEL_LEN {
            return Err(format!(
                "label {part:?} exceeds {MAX_LABEL_LEN} characters"
            ));
        }
        if let Some(c) = part
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
        {
            return Err(format!("label {part:?} contains invalid character {c:?}"));
        }
        if part.starts_with('-') || part.ends_with('-') {
            return Err(format!("label {part:?} starts or ends with a hyphen"));
        }
    }
    Ok(())
}

/// Loose `local@domain.tld` shape check, at most 254 characters.
///
/// # Errors
///
/// Returns a one-line reason naming the rule broken.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(format!(
            "exceeds {MAX_EMAIL_LEN} characters (has {})",
            email.len()
        ));
    }
    if email.chars().any(char::is_whitespace) {
        return Err("contains whitespace".to_string());
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err("is missing '@'".to_string());
    };
    if local.is_empty() || domain.contains('@') {
        return Err("is not shaped like local@domain.tld".to_string());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err("domain part is not shaped like domain.tld".to_string()),
    }
}

#[cfg(test)]
#[path = "label_tests.rs"]
mod label_tests;
