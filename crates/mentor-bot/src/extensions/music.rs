//! Playback queue commands. The caller must be in a voice channel; track
//! resolution and audio transport stay behind external providers.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::CreateEmbed;
use serenity::model::colour::Colour;
use tracing::warn;

use mentor_commands::{
    ArgSlot, CommandContext, CommandError, CommandHandler, CommandSpec, Registry, RegistryError,
};

use crate::music::Track;
use crate::services::Services;

/// Queue length that unlocks the playlist achievement.
const PLAYLIST_ACHIEVEMENT_LEN: usize = 10;

pub fn register(registry: &Registry, services: &Arc<Services>) -> Result<(), RegistryError> {
    registry.register(
        CommandSpec::new("play", Arc::new(Play {
            services: Arc::clone(services),
        }))
        .args(vec![ArgSlot::rest("query")]),
    )?;

    registry.register(CommandSpec::new("pause", Arc::new(Pause {
        services: Arc::clone(services),
    })))?;
    registry.register(CommandSpec::new("resume", Arc::new(Resume {
        services: Arc::clone(services),
    })))?;
    registry.register(CommandSpec::new("stop", Arc::new(Stop {
        services: Arc::clone(services),
    })))?;

    registry.register(
        CommandSpec::new("volume", Arc::new(Volume {
            services: Arc::clone(services),
        }))
        .args(vec![ArgSlot::int("level", 0, 200)]),
    )?;

    registry.register(
        CommandSpec::new("seek", Arc::new(Seek {
            services: Arc::clone(services),
        }))
        .args(vec![ArgSlot::word("direction"), ArgSlot::int("seconds", 1, 3600)]),
    )?;

    registry.register(CommandSpec::new("queue", Arc::new(QueueView {
        services: Arc::clone(services),
    })))?;

    Ok(())
}

/// Voice gate shared by every playback command.
fn voice_guild(ctx: &CommandContext) -> Option<u64> {
    if !ctx.author_in_voice {
        return None;
    }
    ctx.guild_id
}

async fn reject_no_voice(ctx: &CommandContext) -> mentor_commands::Result<()> {
    ctx.reply("🔈 Join a voice channel first!").await
}

struct Play {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Play {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let Some(guild_id) = voice_guild(&ctx) else {
            return reject_no_voice(&ctx).await;
        };
        let query = ctx
            .args
            .rest("query")
            .ok_or_else(|| CommandError::Internal("query slot missing".into()))?
            .to_string();

        let (started, queued) = self.services.music.enqueue(
            guild_id,
            Track {
                title: query.clone(),
                requested_by: ctx.user_id,
            },
        );

        let embed = if started {
            CreateEmbed::new()
                .title("▶️ Now Playing")
                .description(query)
                .colour(Colour::from_rgb(88, 195, 34))
        } else {
            CreateEmbed::new()
                .title("➕ Added to Queue")
                .description(format!("{query} (position {queued})"))
                .colour(Colour::BLUE)
        };
        ctx.rest.send_embed(ctx.channel_id, embed).await?;

        if queued + 1 >= PLAYLIST_ACHIEVEMENT_LEN {
            if let Err(e) = self
                .services
                .progress
                .award(ctx.user_id, "playlist_master", ctx.guild_id)
                .await
            {
                warn!(user_id = ctx.user_id, error = %e, "playlist achievement failed");
            }
        }
        Ok(())
    }
}

struct Pause {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Pause {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let Some(guild_id) = voice_guild(&ctx) else {
            return reject_no_voice(&ctx).await;
        };
        if self.services.music.pause(guild_id) {
            ctx.reply("⏸️ Paused.").await?;
        } else {
            ctx.reply("❌ Nothing is playing.").await?;
        }
        Ok(())
    }
}

struct Resume {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Resume {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let Some(guild_id) = voice_guild(&ctx) else {
            return reject_no_voice(&ctx).await;
        };
        if self.services.music.resume(guild_id) {
            ctx.reply("▶️ Resumed.").await?;
        } else {
            ctx.reply("❌ Nothing is paused.").await?;
        }
        Ok(())
    }
}

struct Stop {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Stop {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let Some(guild_id) = voice_guild(&ctx) else {
            return reject_no_voice(&ctx).await;
        };
        if self.services.music.stop(guild_id) {
            ctx.reply("⏹️ Stopped and cleared the queue.").await?;
        } else {
            ctx.reply("❌ Nothing is playing.").await?;
        }
        Ok(())
    }
}

struct Volume {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Volume {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let Some(guild_id) = voice_guild(&ctx) else {
            return reject_no_voice(&ctx).await;
        };
        let level = ctx
            .args
            .int("level")
            .ok_or_else(|| CommandError::Internal("level slot missing".into()))? as u8;
        let set = self.services.music.set_volume(guild_id, level);
        ctx.reply(&format!("🔊 Volume set to {set}%.")).await?;
        Ok(())
    }
}

struct Seek {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Seek {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let Some(guild_id) = voice_guild(&ctx) else {
            return reject_no_voice(&ctx).await;
        };
        let direction = ctx
            .args
            .word("direction")
            .ok_or_else(|| CommandError::Internal("direction slot missing".into()))?;
        let seconds = ctx
            .args
            .int("seconds")
            .ok_or_else(|| CommandError::Internal("seconds slot missing".into()))? as u64;

        let forward = match direction {
            "forward" => true,
            "back" => false,
            _ => return Err(CommandError::Usage("!seek <forward|back> <seconds>".into())),
        };

        match self.services.music.seek(guild_id, forward, seconds) {
            Some(position) => {
                ctx.reply(&format!("⏩ Position is now {position}s.")).await?;
            }
            None => {
                ctx.reply("❌ Nothing is playing.").await?;
            }
        }
        Ok(())
    }
}

struct QueueView {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for QueueView {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let Some(guild_id) = ctx.guild_id else {
            ctx.reply("❌ This command only works inside a server.").await?;
            return Ok(());
        };

        let Some((now_playing, queue, paused, volume)) = self.services.music.snapshot(guild_id)
        else {
            ctx.reply("🎵 The queue is empty.").await?;
            return Ok(());
        };

        let mut description = match now_playing {
            Some(track) => format!(
                "{} **{}**\n",
                if paused { "⏸️" } else { "▶️" },
                track.title
            ),
            None => "Nothing playing.\n".to_string(),
        };
        for (i, track) in queue.iter().take(10).enumerate() {
            description.push_str(&format!("{}. {}\n", i + 1, track.title));
        }
        if queue.len() > 10 {
            description.push_str(&format!("…and {} more\n", queue.len() - 10));
        }

        let embed = CreateEmbed::new()
            .title("🎵 Queue")
            .description(description)
            .field("Volume", format!("{volume}%"), true)
            .colour(Colour::BLUE);
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}
