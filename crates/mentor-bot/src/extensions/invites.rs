//! Invite tracking commands, restricted to the bot-commands channels.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serenity::builder::{CreateEmbed, CreateEmbedFooter};
use serenity::model::colour::Colour;

use mentor_commands::{
    ArgSlot, CommandContext, CommandError, CommandHandler, CommandSpec, Registry, RegistryError,
};

use crate::services::Services;

pub fn register(registry: &Registry, services: &Arc<Services>) -> Result<(), RegistryError> {
    let channels = services.config.channels.bot_commands.clone();

    registry.register(
        CommandSpec::new("invites", Arc::new(InvitesView {
            services: Arc::clone(services),
        }))
        .channels(channels.clone())
        .cooldown(Duration::from_secs(5)),
    )?;

    registry.register(
        CommandSpec::new("invite-stats", Arc::new(InviteStats {
            services: Arc::clone(services),
        }))
        .channels(channels.clone())
        .cooldown(Duration::from_secs(5))
        .args(vec![ArgSlot::opt_member("user")]),
    )?;

    registry.register(
        CommandSpec::new("invite-history", Arc::new(InviteHistory {
            services: Arc::clone(services),
        }))
        .channels(channels.clone())
        .cooldown(Duration::from_secs(10))
        .args(vec![ArgSlot::opt_member("user")]),
    )?;

    registry.register(
        CommandSpec::new("invite-leaderboard", Arc::new(InviteLeaderboard {
            services: Arc::clone(services),
        }))
        .channels(channels)
        .cooldown(Duration::from_secs(30)),
    )?;

    registry.register(
        CommandSpec::new("addinv", Arc::new(AdjustInvites {
            services: Arc::clone(services),
            add: true,
        }))
        .admin()
        .args(vec![ArgSlot::member("user"), ArgSlot::int("amount", 1, 10_000)]),
    )?;

    registry.register(
        CommandSpec::new("removeinv", Arc::new(AdjustInvites {
            services: Arc::clone(services),
            add: false,
        }))
        .admin()
        .args(vec![ArgSlot::member("user"), ArgSlot::int("amount", 1, 10_000)]),
    )?;

    registry.register(
        CommandSpec::new("reset-invites", Arc::new(ResetInvites {
            services: Arc::clone(services),
        }))
        .admin()
        .args(vec![ArgSlot::member("user")]),
    )?;

    Ok(())
}

fn stats_block(stats: &mentor_invites::InviterStats) -> String {
    format!(
        "👥 Total Invites: {}\n✅ Successful Joins: {}\n❌ Leaves: {}\n🚫 Fake/Invalid: {}",
        stats.count,
        stats.valid(),
        stats.leaves,
        stats.fakes
    )
}

struct InvitesView {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for InvitesView {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let ledger = self.services.invites.lock().await;
        let stats = ledger.stats(ctx.user_id);
        let windows = ledger.time_stats(ctx.user_id, Utc::now());
        drop(ledger);

        let embed = CreateEmbed::new()
            .title("📩 Invitation Hub")
            .description(format!("Here's your invite breakdown, <@{}>!", ctx.user_id))
            .field("📊 Overall Statistics", stats_block(&stats), false)
            .field(
                "⏰ Time-Based Statistics",
                format!(
                    "📆 Today: {}\n📅 Last 3 Days: {}\n🗓 Last 7 Days: {}",
                    windows.today, windows.last_3_days, windows.last_week
                ),
                false,
            )
            .colour(Colour::BLUE)
            .footer(CreateEmbedFooter::new(
                "🏆 Keep inviting and climb the leaderboard!",
            ));
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

struct InviteStats {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for InviteStats {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let target = ctx.args.member("user").unwrap_or(ctx.user_id);
        let ledger = self.services.invites.lock().await;
        let stats = ledger.stats(target);
        let windows = ledger.time_stats(target, Utc::now());
        drop(ledger);

        let embed = CreateEmbed::new()
            .title("📊 Invite Stats")
            .description(format!("Invite breakdown for <@{target}>"))
            .field("📊 Overall Statistics", stats_block(&stats), false)
            .field(
                "⏰ Time-Based Statistics",
                format!(
                    "📆 Today: {}\n📅 Last 3 Days: {}\n🗓 Last 7 Days: {}",
                    windows.today, windows.last_3_days, windows.last_week
                ),
                false,
            )
            .colour(Colour::BLUE);
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

struct InviteHistory {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for InviteHistory {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let target = ctx.args.member("user").unwrap_or(ctx.user_id);
        let stats = self.services.invites.lock().await.stats(target);

        let first = stats.history.iter().min();
        let last = stats.history.iter().max();
        let fmt = |t: Option<&chrono::DateTime<Utc>>| {
            t.map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "No invites yet".to_string())
        };

        let embed = CreateEmbed::new()
            .title("📜 Invite History")
            .description(format!("Invite timeline for <@{target}>"))
            .field(
                "📅 Timeline",
                format!(
                    "🔗 First Invite: {}\n⏳ Last Invite: {}\n📊 Total Invites: {}",
                    fmt(first),
                    fmt(last),
                    stats.count
                ),
                false,
            )
            .field(
                "⚠️ Note",
                "Fake and left invites are not counted in rankings.",
                false,
            )
            .colour(Colour::BLUE);
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

struct InviteLeaderboard {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for InviteLeaderboard {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let board = self.services.invites.lock().await.leaderboard(10);

        if board.is_empty() {
            ctx.reply("🏆 Nobody is on the invite leaderboard yet — start inviting!")
                .await?;
            return Ok(());
        }

        let medals = ["🥇", "🥈", "🥉"];
        let lines: String = board
            .iter()
            .enumerate()
            .map(|(i, (user_id, valid))| {
                let marker = medals.get(i).copied().unwrap_or("🎖");
                format!("{marker} <@{user_id}> — {valid} valid invites\n")
            })
            .collect();

        let embed = CreateEmbed::new()
            .title("🏆 Invite Leaderboard")
            .description(lines)
            .colour(Colour::GOLD)
            .footer(CreateEmbedFooter::new(
                "🔥 Want to see your name here? Start inviting now!",
            ));
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

struct AdjustInvites {
    services: Arc<Services>,
    add: bool,
}

#[async_trait]
impl CommandHandler for AdjustInvites {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let target = ctx
            .args
            .member("user")
            .ok_or_else(|| CommandError::Internal("user slot missing".into()))?;
        let amount = ctx
            .args
            .int("amount")
            .ok_or_else(|| CommandError::Internal("amount slot missing".into()))? as u32;

        let mut ledger = self.services.invites.lock().await;
        if self.add {
            ledger.add_invites(target, amount);
        } else if !ledger.remove_invites(target, amount) {
            drop(ledger);
            ctx.reply("❌ This user has no recorded invites!").await?;
            return Ok(());
        }
        let stats = ledger.stats(target);
        drop(ledger);

        let verb = if self.add { "added to" } else { "removed from" };
        let embed = CreateEmbed::new()
            .title(if self.add { "➕ Add Invites" } else { "➖ Remove Invites" })
            .description(format!("{amount} invites {verb} <@{target}>."))
            .field("Updated Statistics", stats_block(&stats), false)
            .colour(if self.add { Colour::from_rgb(88, 195, 34) } else { Colour::RED });
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

struct ResetInvites {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for ResetInvites {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let target = ctx
            .args
            .member("user")
            .ok_or_else(|| CommandError::Internal("user slot missing".into()))?;

        if !self.services.invites.lock().await.reset(target) {
            ctx.reply("❌ This user has no recorded invites!").await?;
            return Ok(());
        }

        let embed = CreateEmbed::new()
            .title("🔄 Reset Invites")
            .description(format!("<@{target}> is starting fresh with 0 invites."))
            .colour(Colour::ORANGE);
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}
