// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::{
        check_concurrency, resolve_domain, ProviderConfig, SourcePaths, ValidationPolicy,
    };
    use crate::errors::ConfigError;
    use crate::source::{ReservedEntry, ReservedList};

    #[test]
    fn test_provider_config_requires_token() {
        let err = ProviderConfig::new("https://api.example.test", Some("zone"), None).unwrap_err();

        assert!(matches!(err, ConfigError::MissingSetting { ref flag, .. } if flag == "api-token"));
    }

    #[test]
    fn test_provider_config_blank_zone_is_missing() {
        let err = ProviderConfig::new("https://api.example.test", Some("  "), Some("t")).unwrap_err();

        assert!(matches!(err, ConfigError::MissingSetting { ref flag, .. } if flag == "zone-id"));
    }

    #[test]
    fn test_provider_config_base_url_gets_trailing_slash() {
        let config =
            ProviderConfig::new("https://api.example.test/client/v4/", Some("zone"), Some("tok"))
                .unwrap();

        assert_eq!(
            config.api_base_url.as_str(),
            "https://api.example.test/client/v4/"
        );
        assert_eq!(config.zone_id, "zone");
    }

    #[test]
    fn test_provider_config_debug_redacts_token() {
        let config =
            ProviderConfig::new("https://api.example.test", Some("zone"), Some("s3cr3t")).unwrap();

        let rendered = format!("{config:?}");

        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_provider_config_rejects_bad_url() {
        let err = ProviderConfig::new("not a url", Some("zone"), Some("tok")).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_resolve_domain_normalizes() {
        assert_eq!(resolve_domain(Some("Example.DEV.")).unwrap(), "example.dev");
        assert!(resolve_domain(None).is_err());
        assert!(resolve_domain(Some("localhost")).is_err());
    }

    #[test]
    fn test_check_concurrency_bounds() {
        assert_eq!(check_concurrency(4).unwrap(), 4);
        assert!(check_concurrency(0).is_err());
        assert!(check_concurrency(1000).is_err());
    }

    #[test]
    fn test_policy_lookups() {
        let policy = ValidationPolicy {
            reserved: ReservedList::new(vec![ReservedEntry::Label("www".into())]),
            trusted_owners: ["alice".to_string()].into_iter().collect(),
            require_filename_match: false,
        };

        assert!(policy.is_reserved("www"));
        assert!(!policy.is_reserved("alice"));
        assert!(policy.is_trusted("alice"));
        assert!(!policy.is_trusted("bob"));
    }

    #[test]
    fn test_source_paths_load_policy() {
        let dir = tempfile::tempdir().unwrap();
        let reserved_file = dir.path().join("reserved.json");
        std::fs::write(
            &reserved_file,
            r#"["www", {"name": "docs", "target": "docs.example.org"}]"#,
        )
        .unwrap();
        let paths = SourcePaths {
            reserved_file,
            trusted_file: dir.path().join("missing.json"),
            require_filename_match: true,
            ..SourcePaths::default()
        };

        let policy = paths.load_policy().unwrap();

        assert!(policy.is_reserved("www"));
        assert!(policy.is_reserved("docs"));
        assert!(policy.trusted_owners.is_empty());
        assert!(policy.require_filename_match);
    }

    #[test]
    fn test_source_paths_malformed_list_fails() {
        let dir = tempfile::tempdir().unwrap();
        let trusted_file = dir.path().join("trusted.json");
        std::fs::write(&trusted_file, "{not json").unwrap();
        let paths = SourcePaths {
            trusted_file,
            reserved_file: dir.path().join("missing.json"),
            ..SourcePaths::default()
        };

        assert!(paths.load_policy().is_err());
    }
}
