// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Immutable run configuration.
//!
//! Everything a run needs (lists, credentials, limits) is resolved once at
//! startup into plain values and passed into each component. Nothing reads
//! the environment after this point.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::constants::{
    DEFAULT_DECLARATIONS_DIR, DEFAULT_RESERVED_FILE, DEFAULT_TRUSTED_FILE, ENV_API_TOKEN,
    ENV_DOMAIN, ENV_ZONE_ID, MAX_CONCURRENCY,
};
use crate::errors::{ConfigError, SourceError};
use crate::label::{normalize_hostname, validate_hostname};
use crate::source::{load_reserved_list, load_trusted_owners, ReservedList};

/// Admissibility policy consumed by the validator.
#[derive(Debug, Clone, Default)]
pub struct ValidationPolicy {
    /// Labels withheld from regular declarations
    pub reserved: ReservedList,
    /// Owners exempt from the one-declaration quota
    pub trusted_owners: BTreeSet<String>,
    /// Require the declaration file name to equal `owner.username`
    pub require_filename_match: bool,
}

impl ValidationPolicy {
    #[must_use]
    pub fn is_reserved(&self, label: &str) -> bool {
        self.reserved.contains(label)
    }

    #[must_use]
    pub fn is_trusted(&self, owner: &str) -> bool {
        self.trusted_owners.contains(owner)
    }
}

/// Provider endpoint and credentials.
#[derive(Clone)]
pub struct ProviderConfig {
    /// API base URL, always ending in `/` so relative joins keep the path
    pub api_base_url: Url,
    /// Provider zone identifier
    pub zone_id: String,
    /// Bearer credential
    pub api_token: String,
}

// Keep the bearer token out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("zone_id", &self.zone_id)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve provider settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] for an absent or blank zone id or
    /// token, and [`ConfigError::InvalidValue`] for an unparsable base URL.
    pub fn new(
        api_base_url: &str,
        zone_id: Option<&str>,
        api_token: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let zone_id = required(zone_id, "zone id", "zone-id", ENV_ZONE_ID)?;
        let api_token = required(api_token, "API token", "api-token", ENV_API_TOKEN)?;

        let with_slash = format!("{}/", api_base_url.trim_end_matches('/'));
        let api_base_url = Url::parse(&with_slash).map_err(|e| ConfigError::InvalidValue {
            setting: "api-base-url".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            api_base_url,
            zone_id,
            api_token,
        })
    }
}

/// Resolve and check the managed base domain (e.g. `example.dev`).
///
/// # Errors
///
/// Returns an error when the domain is absent or not a valid hostname.
pub fn resolve_domain(domain: Option<&str>) -> Result<String, ConfigError> {
    let raw = required(domain, "domain", "domain", ENV_DOMAIN)?;
    let domain = normalize_hostname(&raw);
    validate_hostname(&domain).map_err(|reason| ConfigError::InvalidValue {
        setting: "domain".to_string(),
        reason: format!("{domain:?} {reason}"),
    })?;
    Ok(domain)
}

/// Check the concurrency limit is within `1..=MAX_CONCURRENCY`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when out of range.
pub fn check_concurrency(concurrency: usize) -> Result<usize, ConfigError> {
    if (1..=MAX_CONCURRENCY).contains(&concurrency) {
        Ok(concurrency)
    } else {
        Err(ConfigError::InvalidValue {
            setting: "concurrency".to_string(),
            reason: format!("must be between 1 and {MAX_CONCURRENCY}, got {concurrency}"),
        })
    }
}

/// Options for a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Maximum provider write calls in flight
    pub concurrency: usize,
    /// Overall deadline for the apply phase
    pub timeout: Duration,
    /// TTL given to created records
    pub ttl: u32,
    /// Report the plan without calling the provider
    pub dry_run: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            concurrency: crate::constants::DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(crate::constants::DEFAULT_RUN_TIMEOUT_SECS),
            ttl: crate::constants::DEFAULT_RECORD_TTL_SECS,
            dry_run: false,
        }
    }
}

/// Where declarations and policy lists are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    /// Directory of declaration files
    pub declarations_dir: PathBuf,
    pub reserved_file: PathBuf,
    pub trusted_file: PathBuf,
    pub require_filename_match: bool,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            declarations_dir: PathBuf::from(DEFAULT_DECLARATIONS_DIR),
            reserved_file: PathBuf::from(DEFAULT_RESERVED_FILE),
            trusted_file: PathBuf::from(DEFAULT_TRUSTED_FILE),
            require_filename_match: false,
        }
    }
}

impl SourcePaths {
    /// Read the reserved and trusted lists into a [`ValidationPolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if a list exists but cannot be read or parsed.
    pub fn load_policy(&self) -> Result<ValidationPolicy, SourceError> {
        Ok(ValidationPolicy {
            reserved: load_reserved_list(&self.reserved_file)?,
            trusted_owners: load_trusted_owners(&self.trusted_file)?,
            require_filename_match: self.require_filename_match,
        })
    }
}

/// Full configuration of a reconciliation run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Managed zone base domain, normalized
    pub domain: String,
    pub sources: SourcePaths,
    pub provider: ProviderConfig,
    pub reconcile: ReconcileOptions,
}

fn required(
    value: Option<&str>,
    setting: &str,
    flag: &str,
    env: &str,
) -> Result<String, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::MissingSetting {
            setting: setting.to_string(),
            flag: flag.to_string(),
            env: env.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
