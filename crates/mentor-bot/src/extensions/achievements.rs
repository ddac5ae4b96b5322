//! Achievement and rank views.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{CreateEmbed, CreateEmbedFooter};
use serenity::model::colour::Colour;

use mentor_commands::{
    CommandContext, CommandError, CommandHandler, CommandSpec, Registry, RegistryError,
};
use mentor_progress::catalog;

use crate::services::Services;

pub fn register(registry: &Registry, services: &Arc<Services>) -> Result<(), RegistryError> {
    registry.register(CommandSpec::new(
        "achievements",
        Arc::new(AchievementsView {
            services: Arc::clone(services),
        }),
    ))?;

    registry.register(CommandSpec::new(
        "rank",
        Arc::new(RankView {
            services: Arc::clone(services),
        }),
    ))?;

    registry.register(
        CommandSpec::new("checkroles", Arc::new(CheckRoles {
            services: Arc::clone(services),
        }))
        .admin(),
    )?;

    Ok(())
}

struct AchievementsView {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for AchievementsView {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let (_, _, rows) = self
            .services
            .progress
            .user_summary(ctx.user_id)
            .map_err(|e| CommandError::Store(e.to_string()))?;

        let earned: Vec<&str> = rows
            .iter()
            .filter(|(_, _, completed)| *completed)
            .map(|(id, _, _)| id.as_str())
            .collect();
        let total_points: u32 = earned
            .iter()
            .filter_map(|id| catalog::find(id))
            .map(|a| a.points)
            .sum();

        let mut embed = CreateEmbed::new()
            .title("🏆 Your Achievements")
            .description(format!(
                "You've earned {} achievements and {} points!",
                earned.len(),
                total_points
            ))
            .colour(Colour::BLUE);

        let earned_text: String = earned
            .iter()
            .filter_map(|id| catalog::find(id))
            .map(|a| format!("{} **{}** (+{})\n➜ {}\n", a.emoji, a.name, a.points, a.description))
            .collect();
        if !earned_text.is_empty() {
            embed = embed.field("🌟 Earned", earned_text, false);
        }

        // Secret achievements stay hidden until unlocked.
        let available_text: String = catalog::catalog()
            .iter()
            .filter(|a| !a.secret && !earned.contains(&a.id))
            .map(|a| format!("{} **{}**\n➜ {}\n", a.emoji, a.name, a.description))
            .collect();
        if !available_text.is_empty() {
            embed = embed.field("📝 Available", available_text, false);
        }

        embed = embed.footer(CreateEmbedFooter::new(
            "Keep studying to unlock more achievements!",
        ));
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

struct RankView {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for RankView {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let (xp, level, _) = self
            .services
            .progress
            .user_summary(ctx.user_id)
            .map_err(|e| CommandError::Store(e.to_string()))?;

        // XP needed for the next level boundary: 100·level².
        let next_level_xp = 100 * (level as u64) * (level as u64);
        let embed = CreateEmbed::new()
            .title(format!("📈 {}'s Rank", ctx.user_name))
            .field("Level", level.to_string(), true)
            .field("XP", format!("{xp} / {next_level_xp}"), true)
            .colour(Colour::BLUE);
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

struct CheckRoles {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for CheckRoles {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let Some(guild_id) = ctx.guild_id else {
            ctx.reply("❌ This command only works inside a server.").await?;
            return Ok(());
        };

        let roles = ctx.rest.guild_roles(guild_id).await?;
        let lines: String = catalog::catalog()
            .iter()
            .filter_map(|a| a.role_name)
            .map(|name| {
                let status = match roles.iter().find(|(_, n, _)| n == name) {
                    Some((_, _, pos)) => format!("✅ created (position {pos})"),
                    None => "❌ missing".to_string(),
                };
                format!("{name}: {status}\n")
            })
            .collect();

        let embed = CreateEmbed::new()
            .title("🔍 Achievement Role Status")
            .description(format!("```{lines}```"))
            .colour(Colour::BLUE);
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}
