//! Flashcards, study schedules, progress summaries, and study tips.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{CreateEmbed, CreateEmbedFooter};
use serenity::model::colour::Colour;

use mentor_commands::{
    ArgSlot, CommandContext, CommandError, CommandHandler, CommandSpec, Registry, RegistryError,
};
use mentor_study::subjects;

use crate::services::Services;

pub fn register(registry: &Registry, services: &Arc<Services>) -> Result<(), RegistryError> {
    registry.register(
        CommandSpec::new("flashcard", Arc::new(FlashcardCommand {
            services: Arc::clone(services),
        }))
        .args(vec![ArgSlot::word("action"), ArgSlot::opt_rest("details")]),
    )?;

    registry.register(
        CommandSpec::new("schedule", Arc::new(ScheduleCommand {
            services: Arc::clone(services),
        }))
        .args(vec![ArgSlot::word("subject"), ArgSlot::int("days", 1, 365)]),
    )?;

    registry.register(CommandSpec::new(
        "progress",
        Arc::new(ProgressCommand {
            services: Arc::clone(services),
        }),
    ))?;

    registry.register(
        CommandSpec::new("complete", Arc::new(CompleteTopic {
            services: Arc::clone(services),
        }))
        .args(vec![ArgSlot::rest("topic")]),
    )?;

    registry.register(
        CommandSpec::new("studytip", Arc::new(TipCommand {
            services: Arc::clone(services),
        }))
        .args(vec![ArgSlot::opt_word("category")]),
    )?;

    Ok(())
}

struct FlashcardCommand {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for FlashcardCommand {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let action = ctx
            .args
            .word("action")
            .ok_or_else(|| CommandError::Internal("action slot missing".into()))?
            .to_string();

        match action.as_str() {
            // !flashcard add <subject> <front> | <back>
            "add" => {
                let details = ctx.args.rest("details").unwrap_or_default().to_string();
                let parts = split_card_details(&details).ok_or_else(|| {
                    CommandError::Usage(
                        "!flashcard add <subject> <front text> | <back text>".into(),
                    )
                })?;
                let (subject, front, back) = parts;
                let subject = subjects::normalize(&subject)
                    .ok_or_else(|| CommandError::Usage("unknown subject".into()))?;

                self.services
                    .study
                    .add_flashcard(ctx.user_id, subject, &front, &back)
                    .map_err(|e| CommandError::Store(e.to_string()))?;
                let total = self
                    .services
                    .study
                    .flashcard_count(ctx.user_id)
                    .map_err(|e| CommandError::Store(e.to_string()))?;
                ctx.reply(&format!("🗂️ Card saved — you now have {total} flashcards."))
                    .await?;
            }
            "review" => {
                let subject = ctx
                    .args
                    .rest("details")
                    .and_then(|s| subjects::normalize(s.trim()));
                let card = self
                    .services
                    .study
                    .next_flashcard(ctx.user_id, subject)
                    .map_err(|e| CommandError::Store(e.to_string()))?;

                let Some(card) = card else {
                    ctx.reply("🗂️ No flashcards yet — add one with `!flashcard add`.")
                        .await?;
                    return Ok(());
                };

                let embed = CreateEmbed::new()
                    .title(format!("🗂️ Flashcard — {}", subjects::display_name(&card.subject)))
                    .description(card.front.clone())
                    .field("Answer", format!("||{}||", card.back), false)
                    .colour(Colour::BLUE)
                    .footer(CreateEmbedFooter::new(format!(
                        "Reviewed {} times",
                        card.review_count
                    )));
                ctx.rest.dm_embed(ctx.user_id, embed).await?;
                self.services
                    .study
                    .record_flashcard_review(card.id)
                    .map_err(|e| CommandError::Store(e.to_string()))?;
                ctx.reply("📨 Sent you a flashcard — check your DMs!").await?;
            }
            _ => {
                return Err(CommandError::Usage(
                    "!flashcard <add|review> …".into(),
                ));
            }
        }
        Ok(())
    }
}

/// `<subject> <front> | <back>`.
fn split_card_details(details: &str) -> Option<(String, String, String)> {
    let details = details.trim();
    let (subject, rest) = details.split_once(char::is_whitespace)?;
    let (front, back) = rest.split_once('|')?;
    let (front, back) = (front.trim(), back.trim());
    if front.is_empty() || back.is_empty() {
        return None;
    }
    Some((subject.to_string(), front.to_string(), back.to_string()))
}

struct ScheduleCommand {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for ScheduleCommand {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let raw_subject = ctx
            .args
            .word("subject")
            .ok_or_else(|| CommandError::Internal("subject slot missing".into()))?;
        let days = ctx
            .args
            .int("days")
            .ok_or_else(|| CommandError::Internal("days slot missing".into()))? as u32;

        let Some(subject) = subjects::normalize(raw_subject) else {
            ctx.reply("❌ Unknown subject. Use `!subjects` to see what's available.")
                .await?;
            return Ok(());
        };

        // Chapter list as the default plan; the AI fills in when asked for
        // more days than the curriculum has chapters.
        let chapters = subjects::chapters(11, subject).unwrap_or_default();
        let mut topics: Vec<String> = chapters
            .iter()
            .take(days as usize)
            .map(|c| c.to_string())
            .collect();
        if topics.len() < days as usize {
            let prompt = format!(
                "Create a {days}-day study plan for {subject}. Respond with a JSON \
                 array of {days} short daily topic strings and nothing else."
            );
            if let Ok(raw) = self.services.ai.generate(&prompt).await {
                if let Ok(generated) = serde_json::from_str::<Vec<String>>(raw.trim()) {
                    topics = generated.into_iter().take(days as usize).collect();
                }
            }
        }
        if topics.is_empty() {
            return Err(CommandError::Provider("no study plan available".into()));
        }

        let schedule = self
            .services
            .study
            .create_schedule(ctx.user_id, subject, days, topics)
            .map_err(|e| CommandError::Store(e.to_string()))?;

        let mut embed = CreateEmbed::new()
            .title(format!("📚 Your {} Study Schedule", subjects::display_name(subject)))
            .description(format!("Here's your {days}-day study plan:"))
            .colour(Colour::BLUE);
        for (i, topic) in schedule.daily_topics.iter().take(5).enumerate() {
            embed = embed.field(format!("Day {}", i + 1), topic.clone(), false);
        }
        if schedule.daily_topics.len() > 5 {
            embed = embed.field(
                "…",
                format!("*{} more days planned*", schedule.daily_topics.len() - 5),
                false,
            );
        }
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

struct ProgressCommand {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for ProgressCommand {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let schedules = self
            .services
            .study
            .active_schedules(ctx.user_id)
            .map_err(|e| CommandError::Store(e.to_string()))?;
        let topics = self
            .services
            .study
            .progress_summary(ctx.user_id)
            .map_err(|e| CommandError::Store(e.to_string()))?;

        if schedules.is_empty() && topics.is_empty() {
            ctx.reply("You don't have any study activity yet. Try `!11 <subject>` or `!schedule`!")
                .await?;
            return Ok(());
        }

        let mut embed = CreateEmbed::new()
            .title("📊 Your Study Progress")
            .colour(Colour::BLUE);

        for schedule in &schedules {
            let done = schedule.completed_topics.len();
            let total = schedule.daily_topics.len().max(1);
            embed = embed.field(
                format!("{} schedule", subjects::display_name(&schedule.subject)),
                format!(
                    "Progress: {:.0}% — {done}/{total} topics, ends {}",
                    done as f64 / total as f64 * 100.0,
                    schedule.end_date
                ),
                false,
            );
        }

        if !topics.is_empty() {
            let lines = topics
                .iter()
                .take(10)
                .map(|t| {
                    format!(
                        "{} / {} — {} attempts",
                        subjects::display_name(&t.subject),
                        if t.topic.is_empty() { "general" } else { t.topic.as_str() },
                        t.total_attempts
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            embed = embed.field("Question practice", lines, false);
        }

        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

/// Mark a topic done in the user's most recent active schedule.
struct CompleteTopic {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for CompleteTopic {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let topic = ctx
            .args
            .rest("topic")
            .ok_or_else(|| CommandError::Internal("topic slot missing".into()))?
            .to_string();

        let schedules = self
            .services
            .study
            .active_schedules(ctx.user_id)
            .map_err(|e| CommandError::Store(e.to_string()))?;
        let Some(schedule) = schedules.last() else {
            ctx.reply("📅 No active schedule — create one with `!schedule <subject> <days>`.")
                .await?;
            return Ok(());
        };

        let Some(matched) = schedule
            .daily_topics
            .iter()
            .find(|t| t.eq_ignore_ascii_case(&topic))
        else {
            ctx.reply("❌ That topic isn't on your schedule. Use `!progress` to see it.")
                .await?;
            return Ok(());
        };

        self.services
            .study
            .complete_topic(schedule.id, matched)
            .map_err(|e| CommandError::Store(e.to_string()))?;
        ctx.reply(&format!("✅ Marked **{matched}** as completed. Keep going!"))
            .await?;
        Ok(())
    }
}

struct TipCommand {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for TipCommand {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let category = ctx.args.word("category").map(|c| c.to_lowercase());
        let tip = self
            .services
            .study
            .any_tip(category.as_deref())
            .map_err(|e| CommandError::Store(e.to_string()))?;

        match tip {
            Some(tip) => ctx.reply(&format!("💡 {tip}")).await?,
            None => ctx.reply("💡 No tips in that category yet.").await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_details_split_on_pipe() {
        let (subject, front, back) =
            split_card_details("physics What is F? | F = ma").unwrap();
        assert_eq!(subject, "physics");
        assert_eq!(front, "What is F?");
        assert_eq!(back, "F = ma");
    }

    #[test]
    fn malformed_card_details_rejected() {
        assert!(split_card_details("physics").is_none());
        assert!(split_card_details("physics no pipe here").is_none());
        assert!(split_card_details("physics front |").is_none());
    }
}
