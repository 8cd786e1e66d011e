//! HTTP access to the guild widget endpoint.
//!
//! This module provides the `HttpClient` seam used by the sync engine, the
//! reqwest-backed `ReqwestClient`, the proxy mirror list, and decoding of the
//! differently-wrapped responses those mirrors return.

pub mod client;
pub mod decode;
pub mod error;
pub mod proxy;

pub use client::{HttpClient, HttpResponse, ReqwestClient};
pub use decode::decode_payload;
pub use error::FetchError;
pub use proxy::{ProxyList, ProxyRoute};
