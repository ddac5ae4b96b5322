//! Help, latency, and the admin refresh command.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{CreateEmbed, CreateEmbedFooter};
use serenity::model::colour::Colour;
use tracing::info;

use mentor_commands::{
    CommandContext, CommandHandler, CommandSpec, Registry, RegistryError,
};

use crate::services::Services;

pub fn register(registry: &Registry, services: &Arc<Services>) -> Result<(), RegistryError> {
    registry.register(CommandSpec::new("help", Arc::new(Help)))?;
    registry.register(CommandSpec::new("ping", Arc::new(Ping)))?;
    registry.register(
        CommandSpec::new("refresh", Arc::new(Refresh {
            services: Arc::clone(services),
        }))
        .admin(),
    )?;
    Ok(())
}

struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let embed = CreateEmbed::new()
            .title("📚 Mentor Help")
            .description("Your study companion for Class 11 & 12!")
            .field(
                "🎓 Study",
                "```\n\
                 !11 <subject> [topic]   Class 11 practice question\n\
                 !12 <subject> [topic]   Class 12 practice question\n\
                 !subjects               List all subjects\n\
                 !chapters11 <subject>   Class 11 chapters\n\
                 !chapters12 <subject>   Class 12 chapters\n\
                 !flashcard add|review   Flashcards\n\
                 !schedule <subj> <days> Study plan\n\
                 !progress               Your progress\n\
                 ```",
                false,
            )
            .field(
                "🤖 AI",
                "```\n\
                 !ask <question>         Ask anything\n\
                 !explain <topic>        Topic explanation\n\
                 !solve <problem>        Step-by-step solution\n\
                 !practice <subject>     Personalized question\n\
                 !compare <a> vs <b>     Comparison\n\
                 ```",
                false,
            )
            .field(
                "🎵 Music & 📩 Invites",
                "```\n\
                 !play / !pause / !resume / !stop / !queue\n\
                 !volume <0-200> / !seek <forward|back> <s>\n\
                 !invites / !invite-stats / !invite-leaderboard\n\
                 !achievements / !rank\n\
                 ```",
                false,
            )
            .colour(Colour::BLUE)
            .footer(CreateEmbedFooter::new("Example: !11 physics waves"));
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let latency = ctx.rest.measured_latency().await?;
        ctx.reply(&format!("🏓 Pong! {} ms", latency.as_millis()))
            .await?;
        Ok(())
    }
}

/// Re-snapshot the guild's invites — the manual fix when tracking drifts.
struct Refresh {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Refresh {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let Some(guild_id) = ctx.guild_id else {
            ctx.reply("❌ This command only works inside a server.").await?;
            return Ok(());
        };

        let snapshot = ctx.rest.guild_invites(guild_id).await?;
        let count = snapshot.len();
        self.services
            .invites
            .lock()
            .await
            .cache_guild(guild_id, snapshot);

        info!(moderator = ctx.user_id, guild_id, count, "invite cache refreshed");
        ctx.reply(&format!("🔄 Refreshed — {count} invites cached."))
            .await?;
        Ok(())
    }
}
