use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serenity::builder::{
    CreateEmbed, CreateMessage, EditMember, EditMessage, EditRole, GetMessages,
};
use serenity::http::Http;
use serenity::model::channel::ChannelType;
use serenity::model::colour::Colour;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serenity::model::Timestamp;

use mentor_core::config::REST_TIMEOUT_SECS;
use mentor_core::events::InviteSnapshot;

use crate::error::{PlatformError, Result};

/// Maximum characters per message (2000 is the platform limit; 1950 leaves
/// headroom for formatting added downstream).
const CHUNK_MAX: usize = 1950;

/// REST capability surface. Every call carries its own timeout and maps
/// failures onto [`PlatformError`]; callers decide whether to retry.
#[derive(Clone)]
pub struct Rest {
    http: Arc<Http>,
}

impl Rest {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> Arc<Http> {
        Arc::clone(&self.http)
    }

    /// Send `text` to a channel in ≤[`CHUNK_MAX`]-char chunks. Returns the id
    /// of the last message sent.
    pub async fn send_message(&self, channel_id: u64, text: &str) -> Result<u64> {
        let channel = ChannelId::new(channel_id);
        let mut last = 0;
        for chunk in split_chunks(text) {
            let msg = with_timeout(channel.say(&self.http, chunk)).await?;
            last = msg.id.get();
        }
        Ok(last)
    }

    pub async fn send_embed(&self, channel_id: u64, embed: CreateEmbed) -> Result<u64> {
        let channel = ChannelId::new(channel_id);
        let msg = with_timeout(
            channel.send_message(&self.http, CreateMessage::new().embed(embed)),
        )
        .await?;
        Ok(msg.id.get())
    }

    pub async fn edit_message(&self, channel_id: u64, message_id: u64, text: &str) -> Result<()> {
        let channel = ChannelId::new(channel_id);
        with_timeout(channel.edit_message(
            &self.http,
            MessageId::new(message_id),
            EditMessage::new().content(text),
        ))
        .await?;
        Ok(())
    }

    /// Best-effort direct message. Fails with `Forbidden` when the user has
    /// DMs closed; callers decide whether that matters.
    pub async fn dm_user(&self, user_id: u64, text: &str) -> Result<()> {
        let dm = with_timeout(UserId::new(user_id).create_dm_channel(&self.http)).await?;
        with_timeout(dm.id.say(&self.http, text)).await?;
        Ok(())
    }

    pub async fn dm_embed(&self, user_id: u64, embed: CreateEmbed) -> Result<()> {
        let dm = with_timeout(UserId::new(user_id).create_dm_channel(&self.http)).await?;
        with_timeout(dm.id.send_message(&self.http, CreateMessage::new().embed(embed))).await?;
        Ok(())
    }

    pub async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64, reason: &str) -> Result<()> {
        with_timeout(self.http.add_member_role(
            GuildId::new(guild_id),
            UserId::new(user_id),
            RoleId::new(role_id),
            Some(reason),
        ))
        .await?;
        Ok(())
    }

    /// Create a hoisted role with the given color. Returns the new role id.
    pub async fn create_role(
        &self,
        guild_id: u64,
        name: &str,
        rgb: (u8, u8, u8),
    ) -> Result<u64> {
        let role = with_timeout(GuildId::new(guild_id).create_role(
            &self.http,
            EditRole::new()
                .name(name)
                .colour(Colour::from_rgb(rgb.0, rgb.1, rgb.2))
                .hoist(true),
        ))
        .await?;
        Ok(role.id.get())
    }

    pub async fn reposition_role(&self, guild_id: u64, role_id: u64, position: u16) -> Result<()> {
        with_timeout(GuildId::new(guild_id).edit_role_position(
            &self.http,
            RoleId::new(role_id),
            position,
        ))
        .await?;
        Ok(())
    }

    /// All roles in a guild as `(id, name, position)`.
    pub async fn guild_roles(&self, guild_id: u64) -> Result<Vec<(u64, String, u16)>> {
        let roles = with_timeout(self.http.get_guild_roles(GuildId::new(guild_id))).await?;
        Ok(roles
            .into_iter()
            .map(|r| (r.id.get(), r.name, r.position))
            .collect())
    }

    /// Position of the bot's highest role in the guild, if any.
    pub async fn bot_top_role_position(&self, guild_id: u64) -> Result<Option<u16>> {
        let me = with_timeout(self.http.get_current_user()).await?;
        let member =
            with_timeout(self.http.get_member(GuildId::new(guild_id), me.id)).await?;
        let roles = self.guild_roles(guild_id).await?;
        Ok(roles
            .iter()
            .filter(|(id, _, _)| member.roles.iter().any(|r| r.get() == *id))
            .map(|(_, _, pos)| *pos)
            .max())
    }

    pub async fn guild_invites(&self, guild_id: u64) -> Result<Vec<InviteSnapshot>> {
        let invites =
            with_timeout(self.http.get_guild_invites(GuildId::new(guild_id))).await?;
        Ok(invites
            .into_iter()
            .map(|inv| InviteSnapshot {
                code: inv.code,
                inviter_id: inv.inviter.map(|u| u.id.get()),
                uses: inv.uses,
            })
            .collect())
    }

    /// First text channel of the guild in position order — the announcement
    /// fallback used for level-ups.
    pub async fn first_writable_text_channel(&self, guild_id: u64) -> Result<Option<u64>> {
        let mut channels =
            with_timeout(self.http.get_channels(GuildId::new(guild_id))).await?;
        channels.retain(|c| c.kind == ChannelType::Text);
        channels.sort_by_key(|c| c.position);
        Ok(channels.first().map(|c| c.id.get()))
    }

    pub async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<()> {
        with_timeout(GuildId::new(guild_id).kick_with_reason(
            &self.http,
            UserId::new(user_id),
            reason,
        ))
        .await?;
        Ok(())
    }

    pub async fn ban(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<()> {
        with_timeout(GuildId::new(guild_id).ban_with_reason(
            &self.http,
            UserId::new(user_id),
            0,
            reason,
        ))
        .await?;
        Ok(())
    }

    pub async fn unban(&self, guild_id: u64, user_id: u64) -> Result<()> {
        with_timeout(GuildId::new(guild_id).unban(&self.http, UserId::new(user_id))).await?;
        Ok(())
    }

    /// Communication timeout ("mute") until the given unix timestamp.
    pub async fn timeout_member(&self, guild_id: u64, user_id: u64, until_unix: i64) -> Result<()> {
        let ts = Timestamp::from_unix_timestamp(until_unix)
            .map_err(|e| PlatformError::Protocol(e.to_string()))?;
        with_timeout(GuildId::new(guild_id).edit_member(
            &self.http,
            UserId::new(user_id),
            EditMember::new().disable_communication_until_datetime(ts),
        ))
        .await?;
        Ok(())
    }

    pub async fn clear_timeout(&self, guild_id: u64, user_id: u64) -> Result<()> {
        with_timeout(GuildId::new(guild_id).edit_member(
            &self.http,
            UserId::new(user_id),
            EditMember::new().enable_communication(),
        ))
        .await?;
        Ok(())
    }

    /// Ids of the most recent `limit` messages in a channel, newest first.
    pub async fn recent_messages(&self, channel_id: u64, limit: u8) -> Result<Vec<u64>> {
        let messages = with_timeout(
            ChannelId::new(channel_id).messages(&self.http, GetMessages::new().limit(limit)),
        )
        .await?;
        Ok(messages.into_iter().map(|m| m.id.get()).collect())
    }

    pub async fn delete_messages(&self, channel_id: u64, message_ids: &[u64]) -> Result<()> {
        let ids: Vec<MessageId> = message_ids.iter().map(|id| MessageId::new(*id)).collect();
        with_timeout(ChannelId::new(channel_id).delete_messages(&self.http, &ids)).await?;
        Ok(())
    }

    /// Measured REST round-trip latency.
    pub async fn measured_latency(&self) -> Result<Duration> {
        let start = Instant::now();
        with_timeout(self.http.get_current_user()).await?;
        Ok(start.elapsed())
    }
}

/// Run a REST future under the adapter-wide timeout.
async fn with_timeout<T, F>(fut: F) -> Result<T>
where
    F: Future<Output = serenity::Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(REST_TIMEOUT_SECS), fut).await {
        Ok(res) => res.map_err(PlatformError::from),
        Err(_) => Err(PlatformError::Network("request timed out".into())),
    }
}

/// Split `text` into chunks of at most [`CHUNK_MAX`] characters, preferring
/// newline and space boundaries so words survive intact.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.len() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > CHUNK_MAX {
        let window = &remaining[..CHUNK_MAX];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .unwrap_or(CHUNK_MAX);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_chunks("did you mean `!invites`?");
        assert_eq!(chunks, vec!["did you mean `!invites`?"]);
    }

    #[test]
    fn long_reply_splits_on_boundaries() {
        let line = "y".repeat(1200);
        let text = format!("{line}\n{line}\n{line}");
        let chunks = split_chunks(&text);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.len() <= CHUNK_MAX, "chunk too large: {}", c.len());
        }
    }

    #[test]
    fn unbroken_run_still_splits() {
        let text = "z".repeat(5000);
        let chunks = split_chunks(&text);
        assert!(chunks.len() >= 3);
        for c in &chunks {
            assert!(c.len() <= CHUNK_MAX);
        }
    }
}
