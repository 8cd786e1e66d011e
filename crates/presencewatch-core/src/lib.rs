//! Core library for presencewatch.
//!
//! Keeps an eventually-fresh local view of a community guild's presence
//! widget. The widget endpoint is polled directly or through a rotating list
//! of pass-through proxies; the last good payload is cached on disk so a
//! renderer always has something to show, even when every mirror is down.
//!
//! The main entry point is [`sync::LiveDataSync`], which is constructed once
//! by the application bootstrap with its collaborators passed in explicitly.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod render;
pub mod sync;

pub use api::{FetchError, HttpClient, ReqwestClient};
pub use cache::{CacheEntry, FileCache, MemoryCache, PersistentCache};
pub use config::{Config, SyncConfig};
pub use models::{Member, MemberStatus, PresencePayload};
pub use render::Renderer;
pub use sync::{Clock, ConnectionStatus, FetchOutcome, LiveDataSync, SyncState, SystemClock};
