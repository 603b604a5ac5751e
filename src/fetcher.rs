// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Remote state fetcher.
//!
//! Lists alias records from the provider and keeps only those this system
//! owns: the name must sit strictly below the managed domain and the
//! annotation must carry the ownership marker. Untagged records are never
//! returned, so reconciliation can neither update nor delete them; a desired
//! name that collides with one surfaces as a provider-side create conflict.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::declaration::RecordKind;
use crate::errors::ProviderError;
use crate::label::normalize_hostname;
use crate::ownership::is_managed;
use crate::provider::{DnsProvider, ManagedDnsRecord, ProviderRecord};

/// Fetch the managed records of the zone below `domain_suffix`.
///
/// # Errors
///
/// Provider failures (network, authentication) propagate unchanged; there is
/// no local fallback state.
pub async fn fetch_managed(
    provider: &dyn DnsProvider,
    domain_suffix: &str,
) -> Result<Vec<ManagedDnsRecord>, ProviderError> {
    let records = provider.list_records(RecordKind::Cname).await?;
    let listed = records.len();
    let managed = filter_managed(records, domain_suffix);

    debug!(
        listed,
        managed = managed.len(),
        domain = domain_suffix,
        "Fetched remote state"
    );
    Ok(managed)
}

/// Keep the records below `domain_suffix` that carry the ownership marker.
///
/// Only the first record per name is kept; the provider should never hold
/// two alias records for one name.
#[must_use]
pub fn filter_managed(records: Vec<ProviderRecord>, domain_suffix: &str) -> Vec<ManagedDnsRecord> {
    let suffix = format!(".{}", normalize_hostname(domain_suffix));
    let mut seen = BTreeSet::new();
    let mut managed = Vec::new();

    for record in records {
        let fqdn = normalize_hostname(&record.name);
        if record.kind != RecordKind::Cname.as_str() {
            continue;
        }
        if !fqdn.ends_with(&suffix) || fqdn.len() == suffix.len() {
            continue;
        }
        if !is_managed(record.comment.as_deref()) {
            debug!(fqdn = %fqdn, "Ignoring record without ownership marker");
            continue;
        }
        if !seen.insert(fqdn.clone()) {
            warn!(fqdn = %fqdn, record_id = %record.id, "Ignoring duplicate managed record");
            continue;
        }
        managed.push(ManagedDnsRecord {
            record_id: record.id,
            fqdn,
            content: normalize_hostname(&record.content),
            tag: record.comment.unwrap_or_default(),
        });
    }
    managed
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod fetcher_tests;
