// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider abstraction.
//!
//! The reconciler and fetcher only talk to a [`DnsProvider`]. The production
//! implementation is [`CloudflareProvider`], which speaks the Cloudflare v4
//! REST API; tests substitute in-memory providers.
//!
//! # Example
//!
//! ```rust,no_run
//! use dnsclaim::config::ProviderConfig;
//! use dnsclaim::declaration::RecordKind;
//! use dnsclaim::provider::{CloudflareProvider, DnsProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ProviderConfig::new(
//!     "https://api.cloudflare.com/client/v4",
//!     Some("023e105f4ecef8ad9ca31a8372d0c353"),
//!     Some("token"),
//! )?;
//! let provider = CloudflareProvider::new(&config)?;
//! let records = provider.list_records(RecordKind::Cname).await?;
//! println!("{} CNAME records in zone", records.len());
//! # Ok(())
//! # }
//! ```

pub mod cloudflare;
pub mod retry;
#[cfg(test)]
pub mod testing;

pub use cloudflare::CloudflareProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::declaration::RecordKind;
use crate::errors::ProviderError;

/// A record as listed by the provider, before ownership filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Opaque provider handle
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record type as reported by the provider (e.g. `CNAME`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Record content (the alias target for CNAME)
    pub content: String,
    /// Free-form annotation; carries the ownership marker on managed records
    #[serde(default)]
    pub comment: Option<String>,
}

/// A provider record proven to be owned by this system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedDnsRecord {
    /// Opaque provider handle
    pub record_id: String,
    /// Lowercased fully-qualified name
    pub fqdn: String,
    /// Normalized alias target
    pub content: String,
    /// Annotation containing the ownership marker
    pub tag: String,
}

/// Payload for creating a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub kind: RecordKind,
    /// Fully-qualified name
    pub name: String,
    pub content: String,
    pub ttl: u32,
    /// Ownership annotation
    pub comment: String,
}

/// Operations consumed from a DNS provider.
///
/// Every method maps to exactly one provider API call (listing may page).
/// Implementations must not retry writes; reconciliation is idempotent and
/// converges on the next run instead.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record of `kind` in the zone.
    async fn list_records(&self, kind: RecordKind) -> Result<Vec<ProviderRecord>, ProviderError>;

    /// Create a record.
    async fn create_record(&self, record: &NewRecord) -> Result<ProviderRecord, ProviderError>;

    /// Replace the content and annotation of an existing record.
    async fn update_record(
        &self,
        record_id: &str,
        content: &str,
        comment: &str,
    ) -> Result<ProviderRecord, ProviderError>;

    /// Delete a record.
    async fn delete_record(&self, record_id: &str) -> Result<(), ProviderError>;
}
