// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for dnsclaim.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Declaration Format Constants
// ============================================================================

/// The only record type a declaration may publish
pub const SUPPORTED_RECORD_KEY: &str = "CNAME";

/// File extension of declaration files
pub const DECLARATION_EXTENSION: &str = "json";

/// Default directory holding one declaration file per label
pub const DEFAULT_DECLARATIONS_DIR: &str = "domains";

/// Default path of the reserved-name list
pub const DEFAULT_RESERVED_FILE: &str = "reserved.json";

/// Default path of the trusted-owner list
pub const DEFAULT_TRUSTED_FILE: &str = "trusted.json";

/// Owner recorded on reserved entries that do not name one
pub const RESERVED_DEFAULT_OWNER: &str = "reserved";

// ============================================================================
// DNS Syntax Limits
// ============================================================================

/// Maximum length of a single DNS label (RFC 1035)
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of a fully-qualified hostname (RFC 1035, without trailing dot)
pub const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum length of an email address (RFC 5321 path limit)
pub const MAX_EMAIL_LEN: usize = 254;

// ============================================================================
// Ownership Tag Constants
// ============================================================================

/// Marker embedded in the provider annotation of every record this system owns
pub const OWNERSHIP_MARKER: &str = "dnsclaim:managed";

/// Provider-side limit on the annotation (Cloudflare record comment) length
pub const MAX_TAG_LEN: usize = 100;

// ============================================================================
// Provider Constants
// ============================================================================

/// Default Cloudflare v4 API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Page size used when listing provider records
pub const PROVIDER_LIST_PAGE_SIZE: u32 = 100;

/// Default TTL for published records (1 = provider "automatic")
pub const DEFAULT_RECORD_TTL_SECS: u32 = 1;

/// Per-request HTTP timeout
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Reconciliation Constants
// ============================================================================

/// Default number of provider write calls in flight at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Upper bound on configured concurrency, keeps well under provider rate limits
pub const MAX_CONCURRENCY: usize = 32;

/// Default overall deadline for a reconciliation run (10 minutes)
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 600;

// ============================================================================
// Environment Variables
// ============================================================================

/// Environment variable holding the managed base domain
pub const ENV_DOMAIN: &str = "DNSCLAIM_DOMAIN";

/// Environment variable holding the provider zone identifier
pub const ENV_ZONE_ID: &str = "CLOUDFLARE_ZONE_ID";

/// Environment variable holding the provider bearer token
pub const ENV_API_TOKEN: &str = "CLOUDFLARE_API_TOKEN";

/// Environment variable holding the identity submitting the change
pub const ENV_REQUESTER: &str = "DNSCLAIM_REQUESTER";
