//! Progress notifications delivered over the platform adapter.

use async_trait::async_trait;
use serenity::builder::CreateEmbed;
use serenity::model::colour::Colour;
use tracing::{debug, info, warn};

use mentor_discord::{PlatformError, Rest};
use mentor_progress::catalog::color_for_points;
use mentor_progress::{Achievement, ProgressNotifier};

pub struct DiscordNotifier {
    rest: Rest,
}

impl DiscordNotifier {
    pub fn new(rest: Rest) -> Self {
        Self { rest }
    }

    /// Find or create the achievement's guild role, returning its id.
    async fn ensure_role(&self, guild_id: u64, achievement: &Achievement) -> Option<u64> {
        let role_name = achievement.role_name?;

        let roles = match self.rest.guild_roles(guild_id).await {
            Ok(roles) => roles,
            Err(e) => {
                warn!(guild_id, error = %e, "role listing failed");
                return None;
            }
        };
        if let Some((id, _, _)) = roles.iter().find(|(_, name, _)| name == role_name) {
            return Some(*id);
        }

        match self
            .rest
            .create_role(guild_id, role_name, color_for_points(achievement.points))
            .await
        {
            Ok(id) => {
                info!(guild_id, role = role_name, "achievement role created");
                Some(id)
            }
            Err(PlatformError::Forbidden) => {
                warn!(guild_id, role = role_name, "no permission to create role");
                None
            }
            Err(e) => {
                warn!(guild_id, role = role_name, error = %e, "role creation failed");
                None
            }
        }
    }
}

#[async_trait]
impl ProgressNotifier for DiscordNotifier {
    async fn level_up(&self, guild_id: Option<u64>, user_id: u64, level: u32, xp: u64) {
        let Some(guild_id) = guild_id else { return };

        let channel = match self.rest.first_writable_text_channel(guild_id).await {
            Ok(Some(channel)) => channel,
            Ok(None) => return,
            Err(e) => {
                warn!(guild_id, error = %e, "level-up channel lookup failed");
                return;
            }
        };

        let embed = CreateEmbed::new()
            .title("🎉 Level Up!")
            .description(format!("<@{user_id}> reached **level {level}**! ({xp} XP)"))
            .colour(Colour::from_rgb(88, 195, 34));
        if let Err(e) = self.rest.send_embed(channel, embed).await {
            warn!(guild_id, error = %e, "level-up announcement failed");
        }
    }

    async fn achievement_unlocked(
        &self,
        guild_id: Option<u64>,
        user_id: u64,
        achievement: &Achievement,
    ) {
        let mut embed = CreateEmbed::new()
            .title("🎉 Achievement Unlocked!")
            .description(format!(
                "{} **{}**\n{}\n*+{} points*",
                achievement.emoji, achievement.name, achievement.description, achievement.points
            ))
            .colour(Colour::GOLD);
        if let Some(role) = achievement.role_name {
            embed = embed.field("🏆 Role Awarded", format!("You've earned the `{role}` role!"), false);
        }

        // Closed DMs are normal; anything else is worth a log line.
        match self.rest.dm_embed(user_id, embed).await {
            Ok(()) | Err(PlatformError::Forbidden) => {}
            Err(e) => warn!(user_id, error = %e, "unlock DM failed"),
        }

        let Some(guild_id) = guild_id else { return };
        let Some(role_id) = self.ensure_role(guild_id, achievement).await else {
            return;
        };
        match self
            .rest
            .add_role(guild_id, user_id, role_id, &format!("Earned achievement: {}", achievement.name))
            .await
        {
            Ok(()) => debug!(user_id, role_id, "achievement role assigned"),
            Err(PlatformError::Forbidden) => {
                warn!(user_id, role_id, "bot role too low to assign achievement role");
            }
            Err(e) => warn!(user_id, role_id, error = %e, "role assignment failed"),
        }
    }
}
