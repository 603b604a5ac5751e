// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Presentation of validation and reconciliation outcomes.
//!
//! Validation and reconciliation return plain values. This module is the
//! only place they are turned into log lines: one line per item followed by
//! a single summary count line.

use tracing::{error, info, warn};

use crate::metrics;
use crate::reconciler::{Plan, ReconcileSummary};
use crate::validation::ValidationReport;

/// One-line count summary of a validation run.
#[must_use]
pub fn validation_summary(report: &ValidationReport) -> String {
    format!(
        "{} files checked, {} passed, {} failed, {} diagnostics",
        report.files.len(),
        report.passed_files(),
        report.failed_files(),
        report.diagnostics().count()
    )
}

/// One-line count summary of a reconciliation run.
#[must_use]
pub fn reconcile_summary(summary: &ReconcileSummary) -> String {
    let mut line = format!(
        "{} created, {} updated, {} deleted, {} unchanged, {} failed",
        summary.created, summary.updated, summary.deleted, summary.unchanged, summary.failed
    );
    if summary.timed_out {
        line.push_str(" (deadline exceeded)");
    }
    if summary.interrupted {
        line.push_str(" (interrupted)");
    }
    if summary.dry_run {
        line.push_str(" (dry run)");
    }
    line
}

/// Log every file and diagnostic of `report`, then the summary line.
pub fn log_validation(report: &ValidationReport) {
    for file in &report.files {
        if file.is_ok() {
            info!(file = %file.subject, label = %file.label, "PASS");
        }
    }
    for diagnostic in report.diagnostics() {
        metrics::record_diagnostic(diagnostic.kind.as_str());
        error!(
            subject = %diagnostic.subject,
            kind = %diagnostic.kind,
            "{}",
            diagnostic.message
        );
    }

    let line = validation_summary(report);
    if report.is_ok() {
        info!(summary = %line, "Validation succeeded");
    } else {
        error!(summary = %line, "Validation failed");
    }
}

/// Log every planned write.
pub fn log_plan(plan: &Plan) {
    for create in &plan.creates {
        info!(
            action = "create",
            fqdn = %create.fqdn,
            target = %create.record.target,
            owner = %create.record.owner_identity,
            origin = %create.record.origin,
            "Planned"
        );
    }
    for update in &plan.updates {
        info!(
            action = "update",
            fqdn = %update.fqdn,
            from = %update.current,
            target = %update.record.target,
            owner = %update.record.owner_identity,
            "Planned"
        );
    }
    for delete in &plan.deletes {
        info!(
            action = "delete",
            fqdn = %delete.fqdn,
            target = %delete.content,
            "Planned"
        );
    }
    info!(
        creates = plan.creates.len(),
        updates = plan.updates.len(),
        deletes = plan.deletes.len(),
        unchanged = plan.unchanged.len(),
        "Plan computed"
    );
}

/// Log every write of `summary`, then the summary line.
pub fn log_reconcile(summary: &ReconcileSummary) {
    for done in &summary.completed {
        info!(action = %done.action, fqdn = %done.fqdn, "Applied");
    }
    for failure in &summary.failures {
        error!(
            action = %failure.action,
            fqdn = %failure.fqdn,
            error = %failure.error,
            "Provider write failed"
        );
    }

    let line = reconcile_summary(summary);
    if summary.is_success() {
        info!(summary = %line, "Reconciliation succeeded");
    } else if summary.auth_failed {
        error!(summary = %line, "Reconciliation aborted, provider rejected credentials");
    } else {
        warn!(summary = %line, "Reconciliation finished with failures");
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod report_tests;
