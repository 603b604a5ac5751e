// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare v4 REST implementation of [`DnsProvider`].
//!
//! Every call goes through [`CloudflareProvider::request`], which attaches the
//! bearer credential, maps HTTP failures onto [`ProviderError`] and unwraps
//! the `{success, errors, result, result_info}` response envelope.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use super::retry::{read_backoff, retry_read};
use super::{DnsProvider, NewRecord, ProviderRecord};
use crate::config::ProviderConfig;
use crate::constants::{HTTP_REQUEST_TIMEOUT_SECS, PROVIDER_LIST_PAGE_SIZE};
use crate::declaration::RecordKind;
use crate::errors::ProviderError;

/// One entry of the envelope `errors` array.
#[derive(Debug, Clone, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Paging information attached to list responses.
#[derive(Debug, Clone, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

/// Cloudflare response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
    comment: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    content: &'a str,
    comment: &'a str,
}

#[derive(Debug, Deserialize)]
struct DeletedId {
    #[allow(dead_code)]
    id: String,
}

fn join_messages(errors: &[ApiMessage]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// DNS provider backed by the Cloudflare v4 API.
#[derive(Debug, Clone)]
pub struct CloudflareProvider {
    client: HttpClient,
    config: ProviderConfig,
}

impl CloudflareProvider {
    /// Create a provider for the zone in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidRequest`] if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("dnsclaim/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::InvalidRequest {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// URL of the zone's record collection, or of one record when `record_id` is set.
    fn records_url(&self, record_id: Option<&str>) -> Result<Url, ProviderError> {
        let path = match record_id {
            Some(id) => format!("zones/{}/dns_records/{id}", self.config.zone_id),
            None => format!("zones/{}/dns_records", self.config.zone_id),
        };
        self.config
            .api_base_url
            .join(&path)
            .map_err(|e| ProviderError::InvalidRequest {
                reason: format!("cannot build URL for {path}: {e}"),
            })
    }

    /// Execute one API call and unwrap its envelope.
    async fn request<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ProviderError>
    where
        T: DeserializeOwned,
        B: Serialize + std::fmt::Debug + Sync,
    {
        debug!(method = %method, url = %url, body = ?body, "HTTP API request to provider");

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(&self.config.api_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ProviderError::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| ProviderError::Connection {
            url: url.to_string(),
            reason: format!("failed to read response body: {e}"),
        })?;

        let envelope: Option<Envelope<T>> = serde_json::from_str(&text).ok();
        let message = envelope
            .as_ref()
            .map(|env| join_messages(&env.errors))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| text.chars().take(200).collect());

        if status.as_u16() == 401 || status.as_u16() == 403 {
            error!(method = %method, url = %url, status = %status, "Provider rejected credentials");
            return Err(ProviderError::Authentication {
                status: status.as_u16(),
                message,
            });
        }
        if !status.is_success() {
            error!(method = %method, url = %url, status = %status, error = %message, "HTTP API request failed");
            return Err(ProviderError::Http {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let envelope = envelope.ok_or_else(|| ProviderError::Decode {
            url: url.to_string(),
            reason: format!(
                "unexpected response body: {}",
                text.chars().take(200).collect::<String>()
            ),
        })?;
        if !envelope.success {
            return Err(ProviderError::Api {
                method: method.to_string(),
                url: url.to_string(),
                message,
            });
        }
        Ok(envelope)
    }

    fn take_result<T>(envelope: Envelope<T>, url: &Url) -> Result<T, ProviderError> {
        envelope.result.ok_or_else(|| ProviderError::Decode {
            url: url.to_string(),
            reason: "response is missing 'result'".to_string(),
        })
    }

    async fn list_page(
        &self,
        kind: RecordKind,
        page: u32,
    ) -> Result<(Vec<ProviderRecord>, Option<ResultInfo>), ProviderError> {
        let mut url = self.records_url(None)?;
        url.query_pairs_mut()
            .append_pair("type", kind.as_str())
            .append_pair("per_page", &PROVIDER_LIST_PAGE_SIZE.to_string())
            .append_pair("page", &page.to_string());

        let envelope: Envelope<Vec<ProviderRecord>> =
            self.request(Method::GET, url.clone(), None::<&()>).await?;
        let info = envelope.result_info.clone();
        Ok((Self::take_result(envelope, &url)?, info))
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_records(&self, kind: RecordKind) -> Result<Vec<ProviderRecord>, ProviderError> {
        let mut all_records = Vec::new();
        let mut page = 1;

        loop {
            let (records, info) =
                retry_read("list records", read_backoff(), || self.list_page(kind, page)).await?;
            let item_count = records.len();
            all_records.extend(records);

            debug!(
                page,
                items_in_page = item_count,
                total_items = all_records.len(),
                "Fetched page from provider"
            );

            match info {
                Some(info) if info.page < info.total_pages && item_count > 0 => page += 1,
                _ => break,
            }
        }

        Ok(all_records)
    }

    async fn create_record(&self, record: &NewRecord) -> Result<ProviderRecord, ProviderError> {
        let url = self.records_url(None)?;
        let body = CreateBody {
            kind: record.kind.as_str(),
            name: &record.name,
            content: &record.content,
            ttl: record.ttl,
            proxied: false,
            comment: &record.comment,
        };
        let envelope = self.request(Method::POST, url.clone(), Some(&body)).await?;
        Self::take_result(envelope, &url)
    }

    async fn update_record(
        &self,
        record_id: &str,
        content: &str,
        comment: &str,
    ) -> Result<ProviderRecord, ProviderError> {
        let url = self.records_url(Some(record_id))?;
        let body = UpdateBody { content, comment };
        let envelope = self.request(Method::PATCH, url.clone(), Some(&body)).await?;
        Self::take_result(envelope, &url)
    }

    async fn delete_record(&self, record_id: &str) -> Result<(), ProviderError> {
        let url = self.records_url(Some(record_id))?;
        let _: Envelope<DeletedId> = self.request(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cloudflare_tests.rs"]
mod cloudflare_tests;
