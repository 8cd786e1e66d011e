//! Renderer contract and the adaptation of payloads onto it.
//!
//! The UI layer implements [`Renderer`]; the sync engine never calls it
//! directly but goes through the helpers here, which apply the member
//! ordering and the cached/live markers consistently.

use chrono::{DateTime, Utc};

use crate::models::{sort_for_display, Member, PresencePayload};

/// Status line shown after a successful live fetch.
pub const MSG_LIVE: &str = "Live data updated";

/// Status line when every attempt failed but a cached payload exists.
pub const MSG_CACHED_AFTER_FAILURE: &str = "Using cached data - connection failed";

/// Status line when every attempt failed and nothing was cached.
pub const MSG_FALLBACK: &str = "Connection failed - showing fallback data";

/// Status line while the network is reported unreachable.
pub const MSG_OFFLINE: &str = "Offline - using cached data";

/// Presentation sink for presence data. Implementations must be cheap and
/// must not block; they are called from async tasks.
pub trait Renderer: Send + Sync {
    fn render_counts(&self, online: u64);

    /// `members` are already ordered and capped for display.
    fn render_members(&self, members: &[Member], from_cache: bool);

    fn render_connection_status(&self, connected: bool, message: &str);

    fn render_last_updated(&self, timestamp: DateTime<Utc>, from_cache: bool);

    fn render_loading_placeholder(&self);
}

/// Render a payload. `stamped_at` is the fetch time for live data and the
/// cache timestamp for cached data.
pub fn render_payload(
    renderer: &dyn Renderer,
    payload: &PresencePayload,
    from_cache: bool,
    stamped_at: DateTime<Utc>,
) {
    renderer.render_counts(payload.presence_count);
    renderer.render_members(&sort_for_display(&payload.members), from_cache);
    renderer.render_last_updated(stamped_at, from_cache);
}

/// Last-updated stamp for display, `HH:MM` in local time.
pub fn format_last_updated(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&chrono::Local)
        .format("Last updated: %H:%M")
        .to_string()
}

/// Render the hardcoded placeholder used when no data exists at all.
pub fn render_fallback(renderer: &dyn Renderer) {
    let fallback = PresencePayload::fallback();
    renderer.render_counts(fallback.presence_count);
    renderer.render_members(&fallback.members, false);
    renderer.render_connection_status(false, MSG_FALLBACK);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::models::MemberStatus;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Renderer for Recorder {
        fn render_counts(&self, online: u64) {
            self.push(format!("counts {}", online));
        }

        fn render_members(&self, members: &[Member], from_cache: bool) {
            let names: Vec<&str> = members.iter().map(|m| m.username.as_str()).collect();
            self.push(format!("members {} cached={}", names.join(","), from_cache));
        }

        fn render_connection_status(&self, connected: bool, message: &str) {
            self.push(format!("status {} {}", connected, message));
        }

        fn render_last_updated(&self, _timestamp: DateTime<Utc>, from_cache: bool) {
            self.push(format!("updated cached={}", from_cache));
        }

        fn render_loading_placeholder(&self) {
            self.push("loading".to_string());
        }
    }

    #[test]
    fn test_render_payload_sorts_members() {
        let recorder = Recorder::default();
        let payload = PresencePayload {
            presence_count: 42,
            members: vec![
                Member { username: "a".into(), avatar_url: String::new(), status: MemberStatus::Idle },
                Member { username: "b".into(), avatar_url: String::new(), status: MemberStatus::Online },
            ],
        };
        render_payload(&recorder, &payload, true, Utc::now());
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec!["counts 42", "members b,a cached=true", "updated cached=true"]
        );
    }

    #[test]
    fn test_format_last_updated() {
        let text = format_last_updated(Utc::now());
        assert!(text.starts_with("Last updated: "));
        assert_eq!(text.len(), "Last updated: 00:00".len());
    }

    #[test]
    fn test_render_fallback() {
        let recorder = Recorder::default();
        render_fallback(&recorder);
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec![
                "counts 248".to_string(),
                "members  cached=false".to_string(),
                format!("status false {}", MSG_FALLBACK),
            ]
        );
    }
}
