// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # dnsclaim - subdomain ownership registry for a DNS zone
//!
//! dnsclaim lets people claim a subdomain of a shared base domain by
//! submitting a small JSON declaration. It validates every declaration
//! against naming, ownership and quota rules, then reconciles the accepted
//! set into a DNS provider zone as alias (CNAME) records.
//!
//! ## Overview
//!
//! - Declarations are plain files (`domains/<label>.json`), re-read on every
//!   run. There is no local state.
//! - Only records carrying the ownership marker in their provider annotation
//!   are ever updated or deleted. Hand-made records are invisible.
//! - Validation is all-or-nothing: a single diagnostic blocks reconciliation.
//!
//! ## Modules
//!
//! - [`label`] - DNS label, hostname and email syntax
//! - [`declaration`] - declaration file shape and desired records
//! - [`source`] - reading declarations and policy lists from disk
//! - [`validation`] - per-file and cross-file admissibility rules
//! - [`provider`] - DNS provider abstraction and the Cloudflare client
//! - [`fetcher`] - listing the records this system owns
//! - [`ownership`] - the ownership annotation
//! - [`reconciler`] - diffing and applying writes
//! - [`report`] - log output for runs
//! - [`config`] - run configuration
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use dnsclaim::config::ValidationPolicy;
//! use dnsclaim::validation::validate_declaration;
//!
//! let raw = r#"{
//!     "owner": { "username": "alice", "email": "alice@example.com" },
//!     "records": { "CNAME": "alice.github.io" }
//! }"#;
//!
//! let verdict = validate_declaration(raw, "alice", &ValidationPolicy::default(), None);
//! assert!(verdict.ok);
//! ```

pub mod config;
pub mod constants;
pub mod declaration;
pub mod errors;
pub mod fetcher;
pub mod label;
pub mod metrics;
pub mod ownership;
pub mod provider;
pub mod reconciler;
pub mod report;
pub mod source;
pub mod validation;
