// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Declaration file schema and the canonical desired-record type.
//!
//! A declaration is one JSON file per subdomain label:
//!
//! ```json
//! {
//!   "owner": { "username": "alice", "email": "alice@example.com" },
//!   "records": { "CNAME": "alice.github.io" }
//! }
//! ```
//!
//! The raw schema is deliberately loose (`Option` fields, `serde_json::Value`
//! for record values) so the validator can report every missing or mistyped
//! field instead of stopping at the first serde error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::constants::SUPPORTED_RECORD_KEY;
use crate::label::normalize_hostname;

/// Record kinds this system publishes. Only alias records are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Canonical-name alias record
    #[serde(rename = "CNAME")]
    Cname,
}

impl RecordKind {
    /// Wire name of the record type as used in declarations and provider APIs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cname => SUPPORTED_RECORD_KEY,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a desired record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Submitted as a per-user declaration file
    User,
    /// Administratively assigned through the reserved list
    Reserved,
}

impl Origin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Reserved => "reserved",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw `owner` object of a declaration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOwner {
    pub username: Option<Value>,
    pub email: Option<Value>,
}

/// Raw declaration as parsed from disk, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDeclaration {
    pub owner: Option<Value>,
    pub records: Option<Value>,
}

impl RawDeclaration {
    /// The `owner` field when it is a JSON object.
    #[must_use]
    pub fn owner_object(&self) -> Option<RawOwner> {
        match &self.owner {
            Some(Value::Object(map)) => Some(RawOwner {
                username: map.get("username").cloned(),
                email: map.get("email").cloned(),
            }),
            _ => None,
        }
    }

    /// The `records` field when it is a JSON object.
    #[must_use]
    pub fn records_object(&self) -> Option<&Map<String, Value>> {
        match &self.records {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// One desired alias record, recomputed from declarations on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredRecord {
    /// Subdomain label (without the managed zone suffix)
    pub name: String,
    /// Identity of the requesting party
    pub owner_identity: String,
    /// Contact address, audit only
    pub owner_contact: String,
    /// Normalized alias target
    pub target: String,
    pub kind: RecordKind,
    pub origin: Origin,
}

impl DesiredRecord {
    /// Build a user-origin record, normalizing the target.
    #[must_use]
    pub fn user(name: &str, owner_identity: &str, owner_contact: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            owner_identity: owner_identity.to_string(),
            owner_contact: owner_contact.to_string(),
            target: normalize_hostname(target),
            kind: RecordKind::Cname,
            origin: Origin::User,
        }
    }

    /// Build a reserved-origin record, normalizing the target.
    #[must_use]
    pub fn reserved(name: &str, owner_identity: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            owner_identity: owner_identity.to_string(),
            owner_contact: String::new(),
            target: normalize_hostname(target),
            kind: RecordKind::Cname,
            origin: Origin::Reserved,
        }
    }

    /// Fully-qualified name of this record within `zone`.
    #[must_use]
    pub fn fqdn(&self, zone: &str) -> String {
        format!("{}.{}", self.name, zone.trim_end_matches('.')).to_ascii_lowercase()
    }
}
