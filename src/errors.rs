// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for dnsclaim.
//!
//! This module provides specialized error types for:
//! - Configuration problems detected at startup (missing credentials, bad values)
//! - Reading the declaration directory and the reserved/trusted lists
//! - DNS provider API operations (authentication, HTTP, decoding)
//!
//! Validation problems are not errors: they are collected as
//! [`Diagnostic`](crate::validation::Diagnostic) values so a whole batch is
//! always reported together.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building the run configuration.
///
/// All configuration errors are fatal and occur before any provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was not supplied on the command line or in the environment
    #[error("Missing required setting '{setting}' (set --{flag} or {env})")]
    MissingSetting {
        /// Human name of the setting
        setting: String,
        /// Command-line flag that supplies it
        flag: String,
        /// Environment variable that supplies it
        env: String,
    },

    /// A setting was supplied but is not usable
    #[error("Invalid value for '{setting}': {reason}")]
    InvalidValue {
        /// Human name of the setting
        setting: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Errors raised while reading declarations and auxiliary lists from disk.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The declaration directory could not be listed
    #[error("Failed to read declaration directory {path}: {source}")]
    DirectoryUnreadable {
        /// Directory path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An auxiliary list file exists but could not be read
    #[error("Failed to read list file {path}: {source}")]
    ListUnreadable {
        /// List file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An auxiliary list file is not a JSON array of the expected shape
    #[error("Malformed list file {path}: {source}")]
    ListMalformed {
        /// List file path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by a DNS provider.
///
/// `Authentication` is fatal for a whole reconciliation run; every other
/// variant is scoped to the single request that produced it.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The provider rejected the credential (HTTP 401/403)
    #[error("Provider rejected credentials (HTTP {status}): {message}")]
    Authentication {
        /// HTTP status code (401 or 403)
        status: u16,
        /// Provider-supplied message
        message: String,
    },

    /// The provider answered with a non-success HTTP status
    #[error("Provider request {method} {url} failed (HTTP {status}): {message}")]
    Http {
        /// HTTP method of the failed request
        method: String,
        /// Request URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Provider-supplied message
        message: String,
    },

    /// The provider answered 2xx but reported `success: false` in its envelope
    #[error("Provider reported failure for {method} {url}: {message}")]
    Api {
        /// HTTP method of the failed request
        method: String,
        /// Request URL
        url: String,
        /// Joined provider error messages
        message: String,
    },

    /// The request never produced a response (DNS, TCP, TLS, timeout)
    #[error("Connection to provider failed for {url}: {reason}")]
    Connection {
        /// Request URL
        url: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// The response body could not be decoded
    #[error("Failed to decode provider response from {url}: {reason}")]
    Decode {
        /// Request URL
        url: String,
        /// Decoder error
        reason: String,
    },

    /// A request could not be constructed (bad base URL, bad identifier)
    #[error("Invalid provider request: {reason}")]
    InvalidRequest {
        /// Explanation of what is invalid
        reason: String,
    },
}

impl ProviderError {
    /// Whether this error must abort the whole run rather than a single operation.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// HTTP status code carried by the error, when there is one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
