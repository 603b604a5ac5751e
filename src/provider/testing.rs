// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`DnsProvider`] used by unit tests.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{DnsProvider, NewRecord, ProviderRecord};
use crate::declaration::RecordKind;
use crate::errors::ProviderError;

/// A provider call as observed by [`MemoryProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { name: String, content: String },
    Update { id: String, content: String },
    Delete { id: String },
}

/// Zone held in memory, with call recording and failure injection.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    records: Mutex<Vec<ProviderRecord>>,
    calls: Mutex<Vec<Call>>,
    /// Names (create) or ids (update/delete) whose writes fail
    failing: BTreeSet<String>,
    /// Fail every call with an authentication error
    reject_credentials: bool,
    /// Delay applied to every write
    write_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
}

impl MemoryProvider {
    pub fn with_records(records: Vec<ProviderRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, keys: &[&str]) -> Self {
        self.failing = keys.iter().map(|k| (*k).to_string()).collect();
        self
    }

    pub fn rejecting_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<ProviderRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check(&self, key: &str) -> Result<(), ProviderError> {
        if self.reject_credentials {
            return Err(ProviderError::Authentication {
                status: 401,
                message: "Invalid API Token".to_string(),
            });
        }
        if self.failing.contains(key) {
            return Err(ProviderError::Http {
                method: "TEST".to_string(),
                url: format!("memory://{key}"),
                status: 400,
                message: format!("injected failure for {key}"),
            });
        }
        Ok(())
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Build a listed record.
pub fn listed(id: &str, name: &str, content: &str, comment: Option<&str>) -> ProviderRecord {
    ProviderRecord {
        id: id.to_string(),
        name: name.to_string(),
        kind: "CNAME".to_string(),
        content: content.to_string(),
        comment: comment.map(str::to_string),
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    async fn list_records(&self, kind: RecordKind) -> Result<Vec<ProviderRecord>, ProviderError> {
        self.check("")?;
        Ok(self
            .records()
            .into_iter()
            .filter(|r| r.kind == kind.as_str())
            .collect())
    }

    async fn create_record(&self, record: &NewRecord) -> Result<ProviderRecord, ProviderError> {
        self.enter().await;
        self.calls.lock().unwrap().push(Call::Create {
            name: record.name.clone(),
            content: record.content.clone(),
        });
        let result = self.check(&record.name).map(|()| {
            let id = format!("mem{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let created = listed(&id, &record.name, &record.content, Some(&record.comment));
            self.records.lock().unwrap().push(created.clone());
            created
        });
        self.leave();
        result
    }

    async fn update_record(
        &self,
        record_id: &str,
        content: &str,
        comment: &str,
    ) -> Result<ProviderRecord, ProviderError> {
        self.enter().await;
        self.calls.lock().unwrap().push(Call::Update {
            id: record_id.to_string(),
            content: content.to_string(),
        });
        let result = self.check(record_id).and_then(|()| {
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|r| r.id == record_id)
                .ok_or_else(|| ProviderError::Http {
                    method: "PATCH".to_string(),
                    url: format!("memory://{record_id}"),
                    status: 404,
                    message: "not found".to_string(),
                })?;
            record.content = content.to_string();
            record.comment = Some(comment.to_string());
            Ok(record.clone())
        });
        self.leave();
        result
    }

    async fn delete_record(&self, record_id: &str) -> Result<(), ProviderError> {
        self.enter().await;
        self.calls.lock().unwrap().push(Call::Delete {
            id: record_id.to_string(),
        });
        let result = self.check(record_id).map(|()| {
            self.records.lock().unwrap().retain(|r| r.id != record_id);
        });
        self.leave();
        result
    }
}
