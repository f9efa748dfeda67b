// Shared fixtures for integration tests
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use offline_vault::config::AppConfig;
use offline_vault::engine::CacheEngine;
use offline_vault::error::{Result, VaultError};
use offline_vault::fetch::{FetchRequest, Fetcher};
use offline_vault::storage::{CachedResponse, InMemoryStorage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub const ORIGIN: &str = "https://app.test";

#[derive(Clone)]
enum Reply {
    Respond(CachedResponse),
    Fail(String),
}

/// Programmable fetcher. Unknown urls fail like an unreachable network.
#[derive(Default)]
pub struct FakeFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reply 200 with `body` and `content_type` for `url`.
    pub fn ok(&self, url: &str, body: &str, content_type: &str) {
        let response = CachedResponse::new(StatusCode::OK, body.to_string())
            .with_header(header::CONTENT_TYPE, content_type);
        self.respond(url, response);
    }

    pub fn status(&self, url: &str, status: u16) {
        let status = StatusCode::from_u16(status).unwrap();
        self.respond(url, CachedResponse::new(status, "error"));
    }

    pub fn respond(&self, url: &str, response: CachedResponse) {
        self.replies
            .lock()
            .insert(url.to_string(), Reply::Respond(response));
    }

    pub fn fail(&self, url: &str) {
        self.replies
            .lock()
            .insert(url.to_string(), Reply::Fail("connection refused".to_string()));
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse> {
        let url = request.url.to_string();
        *self.calls.lock().entry(url.clone()).or_insert(0) += 1;

        let reply = self.replies.lock().get(&url).cloned();
        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(reason)) => Err(VaultError::Network(reason)),
            None => Err(VaultError::Network(format!("no route to {}", url))),
        }
    }
}

/// Config for `https://app.test` with `cdn.test` allow-listed and one page bucket.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.upstream.origin = ORIGIN.to_string();
    config.upstream.allowed_origins = vec!["cdn.test".to_string()];
    config.buckets.app = "test-app".to_string();
    config.buckets.assets = "test-assets".to_string();
    config.buckets.runtime = "test-runtime".to_string();
    config
        .buckets
        .pages
        .insert("guide".to_string(), "vault-page-guide".to_string());
    config.precache.app = vec!["/".to_string(), "/offline.html".to_string()];
    config.precache.assets = vec!["/logo.png".to_string()];
    config
}

pub fn url(path: &str) -> String {
    format!("{}{}", ORIGIN, path)
}

pub struct Harness {
    pub engine: CacheEngine,
    pub storage: Arc<InMemoryStorage>,
    pub fetcher: Arc<FakeFetcher>,
}

/// Engine over in-memory storage and a fake fetcher, not yet activated.
pub fn harness_with(config: &AppConfig) -> Harness {
    let storage = Arc::new(InMemoryStorage::new());
    let fetcher = FakeFetcher::new();
    let engine = CacheEngine::new(config, storage.clone(), fetcher.clone()).unwrap();
    Harness {
        engine,
        storage,
        fetcher,
    }
}

/// Activated engine with the default test config.
pub async fn active_harness() -> Harness {
    let harness = harness_with(&test_config());
    harness.engine.lifecycle().activate().await.unwrap();
    harness
}
