// Common test utilities for integration tests

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use wiremock::MockServer;

use dnsclaim::config::{ProviderConfig, SourcePaths};
use dnsclaim::provider::CloudflareProvider;

pub const ZONE_ID: &str = "zone123";
pub const DOMAIN: &str = "example.dev";

/// Write `<dir>/<label>.json` owned by `username`, creating parent directories.
pub fn write_declaration(dir: &Path, label: &str, username: &str, target: &str) {
    let path = dir.join(format!("{label}.json"));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let body = json!({
        "owner": { "username": username, "email": format!("{username}@example.com") },
        "records": { "CNAME": target }
    });
    fs::write(path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
}

/// Source paths rooted in `root`, with `domains/`, `reserved.json` and `trusted.json`.
pub fn source_paths(root: &Path) -> SourcePaths {
    SourcePaths {
        declarations_dir: root.join("domains"),
        reserved_file: root.join("reserved.json"),
        trusted_file: root.join("trusted.json"),
        require_filename_match: false,
    }
}

/// Provider pointed at `server`.
pub fn provider(server: &MockServer) -> CloudflareProvider {
    let config = ProviderConfig::new(&server.uri(), Some(ZONE_ID), Some("test-token")).unwrap();
    CloudflareProvider::new(&config).unwrap()
}

/// Listed record as the provider returns it.
pub fn record(id: &str, name: &str, content: &str, comment: Option<&str>) -> Value {
    json!({ "id": id, "name": name, "type": "CNAME", "content": content, "comment": comment })
}

/// Successful single-page list envelope.
pub fn list_envelope(records: Vec<Value>) -> Value {
    json!({
        "success": true,
        "errors": [],
        "result": records,
        "result_info": { "page": 1, "total_pages": 1 }
    })
}

/// Successful envelope wrapping `result`.
pub fn envelope(result: Value) -> Value {
    json!({ "success": true, "errors": [], "result": result })
}

/// Path of the zone's record collection.
pub fn records_path() -> String {
    format!("/zones/{ZONE_ID}/dns_records")
}
