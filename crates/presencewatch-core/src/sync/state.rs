use std::fmt;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Offline,
    Failed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Offline => "offline",
            ConnectionStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// In-memory sync state. Created at start, mutated by every fetch attempt,
/// dropped with the component; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub connection_status: ConnectionStatus,
    pub consecutive_failures: u32,
    /// Always in `[0, proxy count)`.
    pub active_proxy_index: usize,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            connection_status: ConnectionStatus::Connecting,
            consecutive_failures: 0,
            active_proxy_index: 0,
            last_success_at: None,
        }
    }
}

impl SyncState {
    /// Back to the state of a fresh component, keeping `last_success_at`.
    pub fn reset_retry(&mut self) {
        self.consecutive_failures = 0;
        self.active_proxy_index = 0;
    }
}
