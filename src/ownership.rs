// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership marker carried in the provider annotation of managed records.
//!
//! Records are tagged at create/update time with
//! `dnsclaim:managed origin=<origin> ts=<timestamp> owner=<identity>`.
//! Only the marker itself is needed to recognise a managed record; the rest
//! is audit information and is refreshed on every write.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::constants::{MAX_TAG_LEN, OWNERSHIP_MARKER};
use crate::declaration::DesiredRecord;

/// Whether a provider annotation marks the record as owned by this system.
#[must_use]
pub fn is_managed(annotation: Option<&str>) -> bool {
    annotation.is_some_and(|text| text.contains(OWNERSHIP_MARKER))
}

/// Build the annotation for `record` written at `now`.
///
/// The result never exceeds the provider limit; when it would, the owner
/// identity is shortened and the marker is always kept intact.
#[must_use]
pub fn build_tag(record: &DesiredRecord, now: DateTime<Utc>) -> String {
    let ts = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let fixed = format!("{OWNERSHIP_MARKER} origin={} ts={ts} owner=", record.origin);
    let budget = MAX_TAG_LEN.saturating_sub(fixed.len());
    let owner: String = record.owner_identity.chars().take(budget).collect();
    format!("{fixed}{owner}")
}

#[cfg(test)]
#[path = "ownership_tests.rs"]
mod ownership_tests;
