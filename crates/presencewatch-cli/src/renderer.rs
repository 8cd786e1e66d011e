//! Plain-text renderer for the terminal.

use chrono::{DateTime, Utc};

use presencewatch_core::models::{Member, MemberStatus};
use presencewatch_core::render::{format_last_updated, MSG_FALLBACK};
use presencewatch_core::Renderer;

/// Skeleton rows printed while a request is in flight.
const LOADING_ROWS: usize = 3;

#[derive(Debug, Default)]
pub struct TerminalRenderer {
    quiet: bool,
}

impl TerminalRenderer {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Dot for a member, keyed off the status indicator class.
    fn status_glyph(status: &MemberStatus) -> char {
        match status.indicator_class() {
            "status-online" => '●',
            "status-idle" => '◐',
            "status-dnd" => '⊘',
            _ => '○',
        }
    }

    fn member_lines(members: &[Member], from_cache: bool) -> Vec<String> {
        if members.is_empty() {
            return vec!["  No members listed".to_string()];
        }
        let mut lines: Vec<String> = members
            .iter()
            .map(|member| {
                format!(
                    "  {} {} [{}]",
                    Self::status_glyph(&member.status),
                    member.username,
                    member.status.as_str()
                )
            })
            .collect();
        if from_cache {
            lines.push("  Showing cached member data".to_string());
        }
        lines
    }

    fn status_lines(connected: bool, message: &str) -> Vec<String> {
        let label = if connected { "LIVE" } else { "OFFLINE" };
        let mut lines = vec![format!("[{}] {}", label, message)];
        if message == MSG_FALLBACK {
            lines.push("  Could not load member list.".to_string());
        }
        lines
    }
}

impl Renderer for TerminalRenderer {
    fn render_counts(&self, online: u64) {
        println!("{} members online", online);
    }

    fn render_members(&self, members: &[Member], from_cache: bool) {
        for line in Self::member_lines(members, from_cache) {
            println!("{}", line);
        }
    }

    fn render_connection_status(&self, connected: bool, message: &str) {
        for line in Self::status_lines(connected, message) {
            println!("{}", line);
        }
    }

    fn render_last_updated(&self, timestamp: DateTime<Utc>, from_cache: bool) {
        if from_cache {
            println!("{} (cached)", format_last_updated(timestamp));
        } else {
            println!("{}", format_last_updated(timestamp));
        }
    }

    fn render_loading_placeholder(&self) {
        if self.quiet {
            return;
        }
        println!("Loading members...");
        for _ in 0..LOADING_ROWS {
            println!("  ---");
        }
    }
}
