//! Typed gateway events.
//!
//! The platform adapter translates raw gateway payloads into these before
//! anything else sees them, so the dispatcher, router, and progress engine
//! never depend on the platform SDK directly.

use serde::{Deserialize, Serialize};

/// One inbound chat message, flattened to what the command pipeline needs.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub message_id: u64,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub author_id: u64,
    pub author_name: String,
    pub author_is_bot: bool,
    /// Role ids the author holds in the originating guild.
    pub author_roles: Vec<u64>,
    /// Whether the author is the guild owner or holds a role with the
    /// administrator permission (cache lookup).
    pub author_is_admin: bool,
    /// Whether the author is currently in a voice channel (cache lookup).
    pub author_in_voice: bool,
    pub content: String,
}

/// Snapshot of one guild invite, as returned by the REST surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteSnapshot {
    pub code: String,
    pub inviter_id: Option<u64>,
    pub uses: u64,
}

#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready {
        bot_user_id: u64,
        bot_name: String,
        guild_ids: Vec<u64>,
    },
    MessageCreate(MessageEvent),
    MemberJoin {
        guild_id: u64,
        user_id: u64,
        user_name: String,
    },
    MemberLeave {
        guild_id: u64,
        user_id: u64,
        user_name: String,
    },
    InviteCreate {
        guild_id: u64,
        code: String,
        inviter_id: Option<u64>,
        uses: u64,
    },
    GuildJoin {
        guild_id: u64,
        guild_name: String,
    },
    Disconnect {
        cause: String,
    },
}

/// Discriminant used for event-router subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Message,
    MemberJoin,
    MemberLeave,
    InviteCreate,
    GuildJoin,
    Disconnect,
}

impl GatewayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GatewayEvent::Ready { .. } => EventKind::Ready,
            GatewayEvent::MessageCreate(_) => EventKind::Message,
            GatewayEvent::MemberJoin { .. } => EventKind::MemberJoin,
            GatewayEvent::MemberLeave { .. } => EventKind::MemberLeave,
            GatewayEvent::InviteCreate { .. } => EventKind::InviteCreate,
            GatewayEvent::GuildJoin { .. } => EventKind::GuildJoin,
            GatewayEvent::Disconnect { .. } => EventKind::Disconnect,
        }
    }
}
