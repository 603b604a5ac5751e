// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `reconciler.rs`

#[cfg(test)]
mod tests {
    use crate::config::ReconcileOptions;
    use crate::declaration::DesiredRecord;
    use crate::fetcher::fetch_managed;
    use crate::ownership::is_managed;
    use crate::provider::testing::{listed, Call, MemoryProvider};
    use crate::provider::ManagedDnsRecord;
    use crate::reconciler::{
        apply, apply_until, plan, reconcile, Action, CREDENTIALS_REJECTED, DEADLINE_EXCEEDED,
        INTERRUPTED,
    };
    use std::time::Duration;

    const ZONE: &str = "example.dev";
    const TAG: &str = "dnsclaim:managed origin=user ts=2026-01-01T00:00:00Z owner=alice";

    fn alice(target: &str) -> DesiredRecord {
        DesiredRecord::user("alice", "alice", "alice@example.com", target)
    }

    fn managed(id: &str, fqdn: &str, content: &str) -> ManagedDnsRecord {
        ManagedDnsRecord {
            record_id: id.to_string(),
            fqdn: fqdn.to_string(),
            content: content.to_string(),
            tag: TAG.to_string(),
        }
    }

    fn options() -> ReconcileOptions {
        ReconcileOptions {
            timeout: Duration::from_secs(5),
            ..ReconcileOptions::default()
        }
    }

    fn many(count: usize) -> Vec<DesiredRecord> {
        (0..count)
            .map(|i| {
                let name = format!("user{i}");
                DesiredRecord::user(&name, &name, "u@example.com", "pages.example.org")
            })
            .collect()
    }

    // =====================================================
    // plan
    // =====================================================

    #[test]
    fn test_plan_matching_state_is_unchanged() {
        let desired = vec![alice("alice.github.io")];
        let actual = vec![managed("r1", "alice.example.dev", "alice.github.io")];

        let plan = plan(&desired, &actual, ZONE);

        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, vec!["alice.example.dev".to_string()]);
    }

    #[test]
    fn test_plan_compares_normalized_content() {
        let desired = vec![alice("Alice.GitHub.io.")];
        let actual = vec![managed("r1", "alice.example.dev", "alice.github.io")];

        assert!(plan(&desired, &actual, ZONE).is_empty());
    }

    #[test]
    fn test_plan_changed_target_is_update_not_replace() {
        let desired = vec![alice("alice2.github.io")];
        let actual = vec![managed("r1", "alice.example.dev", "alice.github.io")];

        let plan = plan(&desired, &actual, ZONE);

        assert!(plan.creates.is_empty());
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].record_id, "r1");
        assert_eq!(plan.updates[0].current, "alice.github.io");
        assert_eq!(plan.updates[0].record.target, "alice2.github.io");
    }

    #[test]
    fn test_plan_orphan_is_deleted() {
        let actual = vec![managed("r9", "gone.example.dev", "gone.github.io")];

        let plan = plan(&[], &actual, ZONE);

        assert_eq!(plan.deletes.len(), 1);
        assert_eq!(plan.deletes[0].record_id, "r9");
    }

    #[test]
    fn test_plan_missing_record_is_created() {
        let desired = vec![alice("alice.github.io")];

        let plan = plan(&desired, &[], ZONE);

        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].fqdn, "alice.example.dev");
    }

    #[test]
    fn test_plan_reserved_records_use_same_path() {
        let desired = vec![DesiredRecord::reserved("www", "reserved", "example.netlify.app")];
        let actual = vec![managed("r1", "www.example.dev", "old.netlify.app")];

        let plan = plan(&desired, &actual, ZONE);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].fqdn, "www.example.dev");
    }

    // =====================================================
    // apply
    // =====================================================

    #[tokio::test]
    async fn test_create_then_rerun_is_idempotent() {
        let provider = MemoryProvider::default();
        let desired = vec![alice("alice.github.io")];

        let (_, first) = reconcile(&desired, &[], ZONE, &provider, &options()).await;
        assert_eq!(first.created, 1);
        assert!(first.is_success());

        let actual = fetch_managed(&provider, ZONE).await.unwrap();
        let (second_plan, second) = reconcile(&desired, &actual, ZONE, &provider, &options()).await;

        assert!(second_plan.is_empty());
        assert_eq!(second.unchanged, 1);
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_created_record_carries_ownership_tag() {
        let provider = MemoryProvider::default();

        reconcile(&[alice("alice.github.io")], &[], ZONE, &provider, &options()).await;

        let records = provider.records();
        assert_eq!(records.len(), 1);
        let comment = records[0].comment.as_deref().unwrap();
        assert!(is_managed(Some(comment)));
        assert!(comment.contains("owner=alice"));
        assert!(comment.contains("origin=user"));
    }

    #[tokio::test]
    async fn test_target_change_updates_in_place() {
        let provider = MemoryProvider::with_records(vec![listed(
            "r1",
            "alice.example.dev",
            "alice.github.io",
            Some(TAG),
        )]);
        let actual = fetch_managed(&provider, ZONE).await.unwrap();

        let (_, summary) = reconcile(
            &[alice("alice2.github.io")],
            &actual,
            ZONE,
            &provider,
            &options(),
        )
        .await;

        assert_eq!(summary.updated, 1);
        assert_eq!(
            provider.calls(),
            vec![Call::Update {
                id: "r1".to_string(),
                content: "alice2.github.io".to_string(),
            }]
        );
        assert_eq!(provider.records()[0].content, "alice2.github.io");
        assert_ne!(provider.records()[0].comment.as_deref(), Some(TAG));
    }

    #[tokio::test]
    async fn test_removed_declaration_deletes_managed_record() {
        let provider = MemoryProvider::with_records(vec![listed(
            "r1",
            "alice.example.dev",
            "alice.github.io",
            Some(TAG),
        )]);
        let actual = fetch_managed(&provider, ZONE).await.unwrap();

        let (_, summary) = reconcile(&[], &actual, ZONE, &provider, &options()).await;

        assert_eq!(summary.deleted, 1);
        assert!(provider.records().is_empty());
    }

    #[tokio::test]
    async fn test_untagged_record_is_never_touched() {
        let provider = MemoryProvider::with_records(vec![listed(
            "manual",
            "www.example.dev",
            "example.netlify.app",
            None,
        )])
        .failing_on(&["www.example.dev"]);
        let actual = fetch_managed(&provider, ZONE).await.unwrap();
        let desired = vec![
            DesiredRecord::user("www", "mallory", "m@example.com", "evil.example.org"),
            alice("alice.github.io"),
        ];

        let (_, summary) = reconcile(&desired, &actual, ZONE, &provider, &options()).await;

        assert!(actual.is_empty());
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].fqdn, "www.example.dev");
        assert_eq!(summary.failures[0].action, Action::Create);
        assert!(!summary.is_success());
        assert!(provider
            .calls()
            .iter()
            .all(|c| !matches!(c, Call::Update { .. } | Call::Delete { .. })));
        let untouched = provider
            .records()
            .into_iter()
            .find(|r| r.id == "manual")
            .unwrap();
        assert_eq!(untouched.content, "example.netlify.app");
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_other_writes() {
        let provider = MemoryProvider::default().failing_on(&["user1.example.dev"]);

        let (_, summary) = reconcile(&many(5), &[], ZONE, &provider, &options()).await;

        assert_eq!(summary.created, 4);
        assert_eq!(summary.failed, 1);
        assert!(!summary.auth_failed);
        assert!(summary.failures[0].error.contains("injected failure"));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let provider = MemoryProvider::default().with_write_delay(Duration::from_millis(10));
        let options = ReconcileOptions {
            concurrency: 2,
            ..options()
        };

        let (_, summary) = reconcile(&many(8), &[], ZONE, &provider, &options).await;

        assert_eq!(summary.created, 8);
        assert!(provider.max_in_flight() <= 2);
        assert!(provider.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_deadline_aborts_outstanding_writes() {
        let provider = MemoryProvider::default().with_write_delay(Duration::from_secs(5));
        let options = ReconcileOptions {
            timeout: Duration::from_millis(20),
            ..options()
        };

        let (_, summary) = reconcile(&many(3), &[], ZONE, &provider, &options).await;

        assert!(summary.timed_out);
        assert_eq!(summary.failed, 3);
        assert!(summary.failures.iter().all(|f| f.error == DEADLINE_EXCEEDED));
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn test_cancellation_aborts_outstanding_writes() {
        let provider = MemoryProvider::default().with_write_delay(Duration::from_secs(5));
        let plan = plan(&many(2), &[], ZONE);

        let summary = apply_until(&plan, &provider, &options(), async {}).await;

        assert!(summary.interrupted);
        assert!(!summary.timed_out);
        assert_eq!(summary.failed, 2);
        assert!(summary.failures.iter().all(|f| f.error == INTERRUPTED));
    }

    #[tokio::test]
    async fn test_rejected_credentials_stop_the_run() {
        let provider = MemoryProvider::default().rejecting_credentials();
        let options = ReconcileOptions {
            concurrency: 1,
            ..options()
        };

        let (_, summary) = reconcile(&many(3), &[], ZONE, &provider, &options).await;

        assert!(summary.auth_failed);
        assert_eq!(summary.failed, 3);
        assert_eq!(provider.calls().len(), 1);
        assert_eq!(
            summary
                .failures
                .iter()
                .filter(|f| f.error == CREDENTIALS_REJECTED)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_provider_calls() {
        let provider = MemoryProvider::with_records(vec![listed(
            "r1",
            "gone.example.dev",
            "gone.github.io",
            Some(TAG),
        )]);
        let actual = fetch_managed(&provider, ZONE).await.unwrap();
        let options = ReconcileOptions {
            dry_run: true,
            ..options()
        };
        let plan = plan(&[alice("alice.github.io")], &actual, ZONE);

        let summary = apply(&plan, &provider, &options).await;

        assert!(summary.dry_run);
        assert_eq!(summary.created + summary.deleted, 0);
        assert!(provider.calls().is_empty());
        assert_eq!(plan.write_count(), 2);
    }
}
