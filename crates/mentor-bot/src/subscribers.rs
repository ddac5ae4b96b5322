//! Event-router subscribers: progress tracking, invite attribution, welcome
//! messages, and achievement-role setup.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use mentor_commands::EventSubscriber;
use mentor_core::events::GatewayEvent;
use mentor_progress::catalog::{self, color_for_points};

use crate::services::Services;

/// Message hook for the progress engine (XP, subject counters, secrets).
pub struct ProgressMessages {
    pub services: Arc<Services>,
}

#[async_trait]
impl EventSubscriber for ProgressMessages {
    fn name(&self) -> &'static str {
        "progress-messages"
    }

    async fn handle(&self, event: &GatewayEvent) -> anyhow::Result<()> {
        let GatewayEvent::MessageCreate(msg) = event else {
            return Ok(());
        };
        if msg.author_is_bot {
            return Ok(());
        }
        self.services
            .progress
            .on_message(msg.author_id, msg.channel_id, msg.guild_id, &msg.content)
            .await?;
        Ok(())
    }
}

/// Snapshot every guild's invites once the gateway is ready.
pub struct InviteCachePrimer {
    pub services: Arc<Services>,
}

#[async_trait]
impl EventSubscriber for InviteCachePrimer {
    fn name(&self) -> &'static str {
        "invite-cache-primer"
    }

    async fn handle(&self, event: &GatewayEvent) -> anyhow::Result<()> {
        let GatewayEvent::Ready { guild_ids, .. } = event else {
            return Ok(());
        };
        for &guild_id in guild_ids {
            match self.services.rest.guild_invites(guild_id).await {
                Ok(snapshot) => {
                    self.services
                        .invites
                        .lock()
                        .await
                        .cache_guild(guild_id, snapshot);
                }
                Err(e) => warn!(guild_id, error = %e, "invite snapshot failed"),
            }
        }
        Ok(())
    }
}

/// Track invites created while connected.
pub struct InviteCreated {
    pub services: Arc<Services>,
}

#[async_trait]
impl EventSubscriber for InviteCreated {
    fn name(&self) -> &'static str {
        "invite-created"
    }

    async fn handle(&self, event: &GatewayEvent) -> anyhow::Result<()> {
        let GatewayEvent::InviteCreate {
            guild_id,
            code,
            inviter_id,
            uses,
        } = event
        else {
            return Ok(());
        };
        self.services
            .invites
            .lock()
            .await
            .on_invite_create(*guild_id, code, *inviter_id, *uses);
        Ok(())
    }
}

/// Member join: credit the used invite and post the welcome message. The two
/// sub-flows are independent — a failure in one never skips the other.
pub struct MemberJoined {
    pub services: Arc<Services>,
}

#[async_trait]
impl EventSubscriber for MemberJoined {
    fn name(&self) -> &'static str {
        "member-joined"
    }

    async fn handle(&self, event: &GatewayEvent) -> anyhow::Result<()> {
        let GatewayEvent::MemberJoin {
            guild_id,
            user_id,
            user_name,
        } = event
        else {
            return Ok(());
        };

        // (a) invite attribution
        match self.services.rest.guild_invites(*guild_id).await {
            Ok(fresh) => {
                let credited = self
                    .services
                    .invites
                    .lock()
                    .await
                    .record_join(*guild_id, *user_id, fresh);
                if credited.is_none() {
                    info!(user_id, guild_id, "join could not be attributed to an invite");
                }
            }
            Err(e) => warn!(guild_id, error = %e, "invite diff fetch failed"),
        }

        // (b) welcome message
        if let Some(channel) = self.services.config.channels.welcome {
            let text = format!("👋 Welcome to the server, <@{user_id}>! ({user_name})");
            if let Err(e) = self.services.rest.send_message(channel, &text).await {
                warn!(channel, error = %e, "welcome message failed");
            }
        }

        Ok(())
    }
}

/// Member leave: charge the departure to the inviter.
pub struct MemberLeft {
    pub services: Arc<Services>,
}

#[async_trait]
impl EventSubscriber for MemberLeft {
    fn name(&self) -> &'static str {
        "member-left"
    }

    async fn handle(&self, event: &GatewayEvent) -> anyhow::Result<()> {
        let GatewayEvent::MemberLeave { user_id, .. } = event else {
            return Ok(());
        };
        self.services.invites.lock().await.record_leave(*user_id);
        Ok(())
    }
}

/// Guild join: create missing achievement roles, colored by points, placed
/// just below the bot's top role where permissions allow.
pub struct GuildRoleSetup {
    pub services: Arc<Services>,
}

#[async_trait]
impl EventSubscriber for GuildRoleSetup {
    fn name(&self) -> &'static str {
        "guild-role-setup"
    }

    async fn handle(&self, event: &GatewayEvent) -> anyhow::Result<()> {
        let GatewayEvent::GuildJoin {
            guild_id,
            guild_name,
        } = event
        else {
            return Ok(());
        };

        let existing = self.services.rest.guild_roles(*guild_id).await?;
        let top_position = self
            .services
            .rest
            .bot_top_role_position(*guild_id)
            .await
            .unwrap_or(None);

        for achievement in catalog::catalog() {
            let Some(role_name) = achievement.role_name else {
                continue;
            };
            if existing.iter().any(|(_, name, _)| name == role_name) {
                continue;
            }

            let role_id = match self
                .services
                .rest
                .create_role(*guild_id, role_name, color_for_points(achievement.points))
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    warn!(guild = %guild_name, role = role_name, error = %e, "role creation failed");
                    continue;
                }
            };
            info!(guild = %guild_name, role = role_name, "achievement role created");

            if let Some(top) = top_position {
                if top > 0 {
                    if let Err(e) = self
                        .services
                        .rest
                        .reposition_role(*guild_id, role_id, top - 1)
                        .await
                    {
                        warn!(role = role_name, error = %e, "role reposition failed");
                    }
                }
            }
        }

        Ok(())
    }
}
