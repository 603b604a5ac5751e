// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for error types.

#[cfg(test)]
mod tests {
    use crate::errors::*;

    #[test]
    fn test_missing_setting_error() {
        let error = ConfigError::MissingSetting {
            setting: "API token".to_string(),
            flag: "api-token".to_string(),
            env: "CLOUDFLARE_API_TOKEN".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Missing required setting 'API token' (set --api-token or CLOUDFLARE_API_TOKEN)"
        );
    }

    #[test]
    fn test_authentication_error_is_fatal() {
        let error = ProviderError::Authentication {
            status: 403,
            message: "Invalid API Token".to_string(),
        };

        assert!(error.is_fatal());
        assert_eq!(error.status_code(), Some(403));
        assert_eq!(
            error.to_string(),
            "Provider rejected credentials (HTTP 403): Invalid API Token"
        );
    }

    #[test]
    fn test_http_error_is_not_fatal() {
        let error = ProviderError::Http {
            method: "POST".to_string(),
            url: "https://api.example.test/zones/z/dns_records".to_string(),
            status: 400,
            message: "Record already exists".to_string(),
        };

        assert!(!error.is_fatal());
        assert_eq!(error.status_code(), Some(400));
        assert!(error.to_string().contains("HTTP 400"));
    }

    #[test]
    fn test_connection_error_has_no_status() {
        let error = ProviderError::Connection {
            url: "https://api.example.test".to_string(),
            reason: "connection refused".to_string(),
        };

        assert!(!error.is_fatal());
        assert_eq!(error.status_code(), None);
    }
}
