//! Data models for the guild presence widget.
//!
//! - `PresencePayload`: the online count plus the members currently visible
//! - `Member`, `MemberStatus`: one widget entry and its presence state

pub mod presence;

pub use presence::{sort_for_display, Member, MemberStatus, PresencePayload, MAX_RENDERED_MEMBERS};
