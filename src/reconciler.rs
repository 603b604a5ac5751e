// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of desired records against managed provider records.
//!
//! Reconciliation is split into a pure [`plan`] step, which diffs the two
//! sets by fully-qualified name, and an [`apply`] step, which executes the
//! planned writes against a [`DnsProvider`].
//!
//! # Apply semantics
//!
//! - Writes run concurrently, bounded by [`ReconcileOptions::concurrency`].
//!   The plan holds at most one operation per name, so a name is never
//!   written twice in one run.
//! - A failed write is recorded and never aborts the remaining writes.
//! - Writes are not retried. The next run converges instead.
//! - When [`ReconcileOptions::timeout`] expires, the run is cancelled, or the
//!   provider rejects the credentials, writes still outstanding are dropped
//!   and reported as failed.
//!
//! # Example
//!
//! ```rust,no_run
//! use dnsclaim::config::ReconcileOptions;
//! use dnsclaim::fetcher::fetch_managed;
//! use dnsclaim::provider::DnsProvider;
//! use dnsclaim::reconciler::{apply, plan};
//! # use dnsclaim::declaration::DesiredRecord;
//!
//! # async fn example(provider: &dyn DnsProvider, desired: Vec<DesiredRecord>) -> anyhow::Result<()> {
//! let actual = fetch_managed(provider, "example.dev").await?;
//! let plan = plan(&desired, &actual, "example.dev");
//! let summary = apply(&plan, provider, &ReconcileOptions::default()).await;
//! assert!(summary.is_success());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ReconcileOptions;
use crate::declaration::DesiredRecord;
use crate::errors::ProviderError;
use crate::label::normalize_hostname;
use crate::metrics;
use crate::ownership::build_tag;
use crate::provider::{DnsProvider, ManagedDnsRecord, NewRecord};

/// Failure reason for writes dropped at the deadline.
pub const DEADLINE_EXCEEDED: &str = "aborted: deadline exceeded";

/// Failure reason for writes dropped on cancellation.
pub const INTERRUPTED: &str = "aborted: interrupted";

/// Failure reason for writes dropped after the provider rejected credentials.
pub const CREDENTIALS_REJECTED: &str = "aborted: provider rejected credentials";

/// Kind of provider write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCreate {
    pub fqdn: String,
    pub record: DesiredRecord,
}

/// A managed record whose content changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub fqdn: String,
    pub record_id: String,
    /// Content currently held by the provider
    pub current: String,
    pub record: DesiredRecord,
}

/// Writes needed to converge the provider onto the desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub creates: Vec<PlannedCreate>,
    pub updates: Vec<PlannedUpdate>,
    /// Managed records with no desired counterpart
    pub deletes: Vec<ManagedDnsRecord>,
    /// Names already in the desired state
    pub unchanged: Vec<String>,
}

impl Plan {
    /// Number of provider writes the plan requires.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.write_count() == 0
    }
}

/// A write the provider accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedOperation {
    pub fqdn: String,
    pub action: Action,
}

/// A write that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub fqdn: String,
    pub action: Action,
    pub error: String,
}

/// Outcome of [`apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Accepted writes, in completion order
    pub completed: Vec<CompletedOperation>,
    /// Failed writes, in completion order
    pub failures: Vec<OperationFailure>,
    /// The deadline expired before every write completed
    pub timed_out: bool,
    /// The run was cancelled before every write completed
    pub interrupted: bool,
    /// No provider calls were made
    pub dry_run: bool,
    /// A write was rejected for bad credentials
    pub auth_failed: bool,
}

impl ReconcileSummary {
    /// Whether every planned write completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.timed_out && !self.interrupted
    }
}

/// Diff `desired` against `actual` for the zone `zone`.
///
/// Names are compared lowercased, content after hostname normalisation.
/// Output vectors are ordered by name.
#[must_use]
pub fn plan(desired: &[DesiredRecord], actual: &[ManagedDnsRecord], zone: &str) -> Plan {
    let zone = normalize_hostname(zone);
    let desired_by_name: BTreeMap<String, &DesiredRecord> =
        desired.iter().map(|r| (r.fqdn(&zone), r)).collect();
    let actual_by_name: BTreeMap<String, &ManagedDnsRecord> = actual
        .iter()
        .map(|r| (normalize_hostname(&r.fqdn), r))
        .collect();

    let mut plan = Plan::default();

    for (fqdn, record) in &desired_by_name {
        match actual_by_name.get(fqdn) {
            Some(current) if normalize_hostname(&current.content) == record.target => {
                plan.unchanged.push(fqdn.clone());
            }
            Some(current) => plan.updates.push(PlannedUpdate {
                fqdn: fqdn.clone(),
                record_id: current.record_id.clone(),
                current: current.content.clone(),
                record: (*record).clone(),
            }),
            None => plan.creates.push(PlannedCreate {
                fqdn: fqdn.clone(),
                record: (*record).clone(),
            }),
        }
    }

    for (fqdn, current) in &actual_by_name {
        if !desired_by_name.contains_key(fqdn) {
            plan.deletes.push((*current).clone());
        }
    }

    debug!(
        creates = plan.creates.len(),
        updates = plan.updates.len(),
        deletes = plan.deletes.len(),
        unchanged = plan.unchanged.len(),
        "Computed reconciliation plan"
    );
    plan
}

/// A single write, borrowed from the plan.
enum Operation<'a> {
    Create(&'a PlannedCreate),
    Update(&'a PlannedUpdate),
    Delete(&'a ManagedDnsRecord),
}

impl Operation<'_> {
    fn fqdn(&self) -> &str {
        match self {
            Self::Create(c) => &c.fqdn,
            Self::Update(u) => &u.fqdn,
            Self::Delete(d) => &d.fqdn,
        }
    }

    fn action(&self) -> Action {
        match self {
            Self::Create(_) => Action::Create,
            Self::Update(_) => Action::Update,
            Self::Delete(_) => Action::Delete,
        }
    }

    async fn execute(
        &self,
        provider: &dyn DnsProvider,
        ttl: u32,
        now: DateTime<Utc>,
    ) -> Result<(), ProviderError> {
        match self {
            Self::Create(c) => provider
                .create_record(&NewRecord {
                    kind: c.record.kind,
                    name: c.fqdn.clone(),
                    content: c.record.target.clone(),
                    ttl,
                    comment: build_tag(&c.record, now),
                })
                .await
                .map(|_| ()),
            Self::Update(u) => provider
                .update_record(&u.record_id, &u.record.target, &build_tag(&u.record, now))
                .await
                .map(|_| ()),
            Self::Delete(d) => provider.delete_record(&d.record_id).await,
        }
    }
}

/// Execute `plan` against `provider`.
///
/// Never returns an error: every write failure is captured in the summary.
pub async fn apply(
    plan: &Plan,
    provider: &dyn DnsProvider,
    options: &ReconcileOptions,
) -> ReconcileSummary {
    apply_until(plan, provider, options, std::future::pending()).await
}

/// Execute `plan` against `provider` until done, the deadline passes, or
/// `cancel` resolves.
pub async fn apply_until<C>(
    plan: &Plan,
    provider: &dyn DnsProvider,
    options: &ReconcileOptions,
    cancel: C,
) -> ReconcileSummary
where
    C: Future<Output = ()>,
{
    let mut summary = ReconcileSummary {
        unchanged: plan.unchanged.len(),
        dry_run: options.dry_run,
        ..ReconcileSummary::default()
    };
    if options.dry_run {
        info!(writes = plan.write_count(), "Dry run, skipping provider writes");
        return summary;
    }
    if plan.is_empty() {
        return summary;
    }

    let operations: Vec<Operation<'_>> = plan
        .creates
        .iter()
        .map(Operation::Create)
        .chain(plan.updates.iter().map(Operation::Update))
        .chain(plan.deletes.iter().map(Operation::Delete))
        .collect();
    let mut outstanding: BTreeMap<String, Action> = operations
        .iter()
        .map(|op| (op.fqdn().to_string(), op.action()))
        .collect();

    let deadline = Instant::now() + options.timeout;
    let now = Utc::now();
    let ttl = options.ttl;
    let concurrency = options.concurrency.max(1);

    let mut results = stream::iter(operations)
        .map(|op| async move {
            let result = op.execute(provider, ttl, now).await;
            (op.fqdn().to_string(), op.action(), result)
        })
        .buffer_unordered(concurrency);

    tokio::pin!(cancel);
    let abort_reason = loop {
        tokio::select! {
            biased;
            () = &mut cancel => {
                summary.interrupted = true;
                break Some(INTERRUPTED);
            }
            next = tokio::time::timeout_at(deadline, results.next()) => match next {
                Ok(Some((fqdn, action, result))) => {
                    outstanding.remove(&fqdn);
                    record_outcome(&mut summary, fqdn, action, result);
                    if summary.auth_failed {
                        break Some(CREDENTIALS_REJECTED);
                    }
                }
                Ok(None) => break None,
                Err(_) => {
                    summary.timed_out = true;
                    break Some(DEADLINE_EXCEEDED);
                }
            },
        }
    };
    drop(results);

    if let Some(reason) = abort_reason {
        warn!(
            outstanding = outstanding.len(),
            reason = reason,
            "Aborting outstanding provider writes"
        );
        for (fqdn, action) in outstanding {
            metrics::record_operation(action.as_str(), false);
            summary.failed += 1;
            summary.failures.push(OperationFailure {
                fqdn,
                action,
                error: reason.to_string(),
            });
        }
    }

    summary
}

fn record_outcome(
    summary: &mut ReconcileSummary,
    fqdn: String,
    action: Action,
    result: Result<(), ProviderError>,
) {
    metrics::record_operation(action.as_str(), result.is_ok());
    match result {
        Ok(()) => {
            match action {
                Action::Create => summary.created += 1,
                Action::Update => summary.updated += 1,
                Action::Delete => summary.deleted += 1,
            }
            summary.completed.push(CompletedOperation { fqdn, action });
        }
        Err(e) => {
            summary.auth_failed |= e.is_fatal();
            summary.failed += 1;
            summary.failures.push(OperationFailure {
                fqdn,
                action,
                error: e.to_string(),
            });
        }
    }
}

/// Plan and apply in one step.
pub async fn reconcile(
    desired: &[DesiredRecord],
    actual: &[ManagedDnsRecord],
    zone: &str,
    provider: &dyn DnsProvider,
    options: &ReconcileOptions,
) -> (Plan, ReconcileSummary) {
    let plan = plan(desired, actual, zone);
    let summary = apply(&plan, provider, options).await;
    (plan, summary)
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
