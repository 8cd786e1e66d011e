//! Test doubles for the sync engine's collaborators.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use presencewatch_core::api::{FetchError, HttpClient, HttpResponse, ProxyList};
use presencewatch_core::cache::MemoryCache;
use presencewatch_core::models::Member;
use presencewatch_core::sync::{Collaborators, LiveDataSync, ManualClock};
use presencewatch_core::{Renderer, SyncConfig};

pub const ENDPOINT: &str = "https://widget.test/guild.json";

/// One scripted reply.
pub enum Reply {
    Body(u16, String),
    Fail(FetchError),
    /// Reply after a (tokio) delay.
    Delayed(Duration, Box<Reply>),
    /// Wait until `ScriptedHttp::release` is called.
    Gated(Box<Reply>),
    /// Never reply; only the engine's timeout ends the request.
    Hang,
}

impl Reply {
    pub fn widget(count: u64, members: &[(&str, &str)]) -> Self {
        let members: Vec<serde_json::Value> = members
            .iter()
            .map(|(name, status)| {
                serde_json::json!({
                    "username": name,
                    "avatar_url": format!("https://cdn.test/{}.png", name),
                    "status": status,
                })
            })
            .collect();
        Reply::Body(
            200,
            serde_json::json!({"presence_count": count, "members": members}).to_string(),
        )
    }
}

#[derive(Default)]
pub struct ScriptedHttp {
    script: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<String>>,
    gate: Notify,
    pub requested: Notify,
}

impl ScriptedHttp {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    fn resolve<'a>(
        &'a self,
        reply: Reply,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<HttpResponse, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            match reply {
                Reply::Body(status, body) => Ok(HttpResponse { status, body }),
                Reply::Fail(err) => Err(err),
                Reply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    self.resolve(*inner).await
                }
                Reply::Gated(inner) => {
                    self.gate.notified().await;
                    self.resolve(*inner).await
                }
                Reply::Hang => std::future::pending().await,
            }
        })
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Fail(FetchError::Network("script exhausted".into())));
        self.requested.notify_one();
        self.resolve(reply).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Counts(u64),
    Members(Vec<String>, bool),
    Status(bool, String),
    LastUpdated(DateTime<Utc>, bool),
    Loading,
}

#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<Rendered>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<Rendered> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_counts(&self) -> Option<u64> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Rendered::Counts(n) => Some(n),
            _ => None,
        })
    }

    pub fn last_members(&self) -> Option<(Vec<String>, bool)> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Rendered::Members(names, cached) => Some((names, cached)),
            _ => None,
        })
    }

    pub fn last_status(&self) -> Option<(bool, String)> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Rendered::Status(connected, msg) => Some((connected, msg)),
            _ => None,
        })
    }

    fn push(&self, call: Rendered) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Renderer for RecordingRenderer {
    fn render_counts(&self, online: u64) {
        self.push(Rendered::Counts(online));
    }

    fn render_members(&self, members: &[Member], from_cache: bool) {
        let names = members.iter().map(|m| m.username.clone()).collect();
        self.push(Rendered::Members(names, from_cache));
    }

    fn render_connection_status(&self, connected: bool, message: &str) {
        self.push(Rendered::Status(connected, message.to_string()));
    }

    fn render_last_updated(&self, timestamp: DateTime<Utc>, from_cache: bool) {
        self.push(Rendered::LastUpdated(timestamp, from_cache));
    }

    fn render_loading_placeholder(&self) {
        self.push(Rendered::Loading);
    }
}

pub fn config(proxies: &[&str]) -> SyncConfig {
    SyncConfig {
        endpoint: ENDPOINT.to_string(),
        proxies: ProxyList::from_strings(proxies).unwrap(),
        request_timeout: Duration::from_secs(10),
        max_attempts: 3,
        retry_delay: Duration::from_millis(2000),
        freshness_window: Duration::from_secs(60),
        visible_interval: Duration::from_secs(10),
        hidden_interval: Duration::from_secs(20),
        initial_fetch_delay: Duration::from_millis(100),
        cache_key: "presence".to_string(),
    }
}

pub struct Harness {
    pub sync: LiveDataSync,
    pub http: Arc<ScriptedHttp>,
    pub cache: Arc<MemoryCache>,
    pub renderer: Arc<RecordingRenderer>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(proxies: &[&str], replies: Vec<Reply>) -> Harness {
    let http = ScriptedHttp::new(replies);
    let cache = Arc::new(MemoryCache::new());
    let renderer = Arc::new(RecordingRenderer::default());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let sync = LiveDataSync::new(
        config(proxies),
        Collaborators {
            http: http.clone(),
            cache: cache.clone(),
            renderer: renderer.clone(),
            clock: clock.clone(),
        },
    );
    Harness {
        sync,
        http,
        cache,
        renderer,
        clock,
    }
}
