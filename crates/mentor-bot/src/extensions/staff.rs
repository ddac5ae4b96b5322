//! Moderation commands: staff channel + staff roles only.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serenity::builder::CreateEmbed;
use serenity::model::colour::Colour;
use tracing::info;

use mentor_commands::{
    ArgSlot, CommandContext, CommandError, CommandHandler, CommandSpec, Registry, RegistryError,
};

use crate::services::Services;

const DEFAULT_MUTE_MINUTES: i64 = 10;

pub fn register(registry: &Registry, services: &Arc<Services>) -> Result<(), RegistryError> {
    let channels: Vec<u64> = services.config.channels.staff.into_iter().collect();
    let roles = services.config.staff.roles.clone();

    let gate = |spec: CommandSpec| spec.channels(channels.clone()).roles(roles.clone());

    registry.register(gate(
        CommandSpec::new("mute", Arc::new(Mute {
            services: Arc::clone(services),
        }))
        .args(vec![ArgSlot::member("user"), ArgSlot::opt_word("minutes")]),
    ))?;

    registry.register(gate(
        CommandSpec::new("unmute", Arc::new(Unmute))
            .args(vec![ArgSlot::member("user")]),
    ))?;

    registry.register(gate(
        CommandSpec::new("kick", Arc::new(Kick))
            .args(vec![ArgSlot::member("user"), ArgSlot::opt_rest("reason")]),
    ))?;

    registry.register(gate(
        CommandSpec::new("ban", Arc::new(Ban))
            .args(vec![ArgSlot::member("user"), ArgSlot::opt_rest("reason")]),
    ))?;

    registry.register(gate(
        CommandSpec::new("unban", Arc::new(Unban))
            .args(vec![ArgSlot::member("user")]),
    ))?;

    registry.register(gate(
        CommandSpec::new("clear", Arc::new(Clear))
            .args(vec![ArgSlot::int("count", 1, 100)]),
    ))?;

    registry.register(gate(
        CommandSpec::new("announce", Arc::new(Announce {
            services: Arc::clone(services),
        }))
        .args(vec![ArgSlot::rest("message")]),
    ))?;

    registry.register(gate(CommandSpec::new("staffhelp", Arc::new(StaffHelp))))?;

    Ok(())
}

fn guild_of(ctx: &CommandContext) -> mentor_commands::Result<u64> {
    ctx.guild_id
        .ok_or_else(|| CommandError::Usage("this command only works inside a server".into()))
}

fn required_member(ctx: &CommandContext) -> mentor_commands::Result<u64> {
    ctx.args
        .member("user")
        .ok_or_else(|| CommandError::Internal("user slot missing".into()))
}

struct Mute {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Mute {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let guild_id = guild_of(&ctx)?;
        let target = required_member(&ctx)?;
        let minutes = ctx
            .args
            .word("minutes")
            .and_then(|m| m.parse::<i64>().ok())
            .unwrap_or(DEFAULT_MUTE_MINUTES)
            .clamp(1, 7 * 24 * 60);

        let until = (Utc::now() + chrono::Duration::minutes(minutes)).timestamp();
        ctx.rest.timeout_member(guild_id, target, until).await?;
        info!(moderator = ctx.user_id, target, minutes, "member muted");
        ctx.reply(&format!("🔇 <@{target}> muted for {minutes} minutes."))
            .await?;

        if let Some(log_channel) = self.services.config.channels.mod_log {
            let _ = ctx
                .rest
                .send_message(
                    log_channel,
                    &format!("🔇 <@{}> muted <@{target}> for {minutes} minutes.", ctx.user_id),
                )
                .await;
        }
        Ok(())
    }
}

struct Unmute;

#[async_trait]
impl CommandHandler for Unmute {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let guild_id = guild_of(&ctx)?;
        let target = required_member(&ctx)?;
        ctx.rest.clear_timeout(guild_id, target).await?;
        ctx.reply(&format!("🔊 <@{target}> unmuted.")).await?;
        Ok(())
    }
}

struct Kick;

#[async_trait]
impl CommandHandler for Kick {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let guild_id = guild_of(&ctx)?;
        let target = required_member(&ctx)?;
        let reason = ctx.args.rest("reason").unwrap_or("No reason given");
        ctx.rest.kick(guild_id, target, reason).await?;
        info!(moderator = ctx.user_id, target, reason, "member kicked");
        ctx.reply(&format!("👢 <@{target}> was kicked. Reason: {reason}"))
            .await?;
        Ok(())
    }
}

struct Ban;

#[async_trait]
impl CommandHandler for Ban {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let guild_id = guild_of(&ctx)?;
        let target = required_member(&ctx)?;
        let reason = ctx.args.rest("reason").unwrap_or("No reason given");
        ctx.rest.ban(guild_id, target, reason).await?;
        info!(moderator = ctx.user_id, target, reason, "member banned");
        ctx.reply(&format!("🔨 <@{target}> was banned. Reason: {reason}"))
            .await?;
        Ok(())
    }
}

struct Unban;

#[async_trait]
impl CommandHandler for Unban {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let guild_id = guild_of(&ctx)?;
        let target = required_member(&ctx)?;
        ctx.rest.unban(guild_id, target).await?;
        ctx.reply(&format!("✅ User {target} unbanned.")).await?;
        Ok(())
    }
}

struct Clear;

#[async_trait]
impl CommandHandler for Clear {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let count = ctx
            .args
            .int("count")
            .ok_or_else(|| CommandError::Internal("count slot missing".into()))? as u8;

        // +1 swallows the invoking message itself.
        let ids = ctx
            .rest
            .recent_messages(ctx.channel_id, count.saturating_add(1))
            .await?;
        ctx.rest.delete_messages(ctx.channel_id, &ids).await?;
        info!(moderator = ctx.user_id, count, channel = ctx.channel_id, "messages cleared");
        Ok(())
    }
}

struct Announce {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Announce {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let message = ctx
            .args
            .rest("message")
            .ok_or_else(|| CommandError::Internal("message slot missing".into()))?
            .to_string();

        // `-r <role mention> <text>` prefixes a role ping.
        let (role, text) = match message.strip_prefix("-r ") {
            Some(rest) => {
                let (role_token, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| CommandError::Usage("!announce -r <role> <message>".into()))?;
                (Some(role_token.to_string()), text.to_string())
            }
            None => (None, message),
        };

        let channel = self
            .services
            .config
            .channels
            .announcement
            .unwrap_or(ctx.channel_id);
        let announcement = match role {
            Some(role) => format!("{role} {text}"),
            None => text,
        };
        ctx.rest.send_message(channel, &announcement).await?;
        ctx.reply("📢 Announcement posted.").await?;
        Ok(())
    }
}

struct StaffHelp;

#[async_trait]
impl CommandHandler for StaffHelp {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let embed = CreateEmbed::new()
            .title("🛠️ Staff Commands")
            .description(
                "```\n\
                 !mute @user [minutes]     Timeout a member\n\
                 !unmute @user             Lift a timeout\n\
                 !kick @user [reason]      Kick a member\n\
                 !ban @user [reason]       Ban a member\n\
                 !unban <user id>          Lift a ban\n\
                 !clear <n>                Delete the last n messages\n\
                 !announce [-r @role] msg  Post an announcement\n\
                 ```",
            )
            .colour(Colour::BLUE);
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}
