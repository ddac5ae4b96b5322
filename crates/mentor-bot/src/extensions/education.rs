//! Practice questions and the curriculum views.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::builder::{CreateEmbed, CreateEmbedFooter};
use serenity::model::colour::Colour;
use tracing::warn;

use mentor_commands::{
    ArgSlot, CommandContext, CommandError, CommandHandler, CommandSpec, Registry, RegistryError,
};
use mentor_discord::PlatformError;
use mentor_study::provider::Question;
use mentor_study::subjects;
use mentor_study::StudyError;

use crate::services::Services;

/// Delay before the answer embed follows the question into the DM.
const ANSWER_REVEAL_SECS: u64 = 60;
const QUESTION_COOLDOWN_SECS: u64 = 5;

pub fn register(registry: &Registry, services: &Arc<Services>) -> Result<(), RegistryError> {
    let subject_channels = services.config.channels.subject_channels();

    for (verb, class_level) in [("11", 11u8), ("12", 12u8)] {
        registry.register(
            CommandSpec::new(verb, Arc::new(ClassQuestion {
                class_level,
                services: Arc::clone(services),
            }))
            .channels(subject_channels.clone())
            .cooldown(Duration::from_secs(QUESTION_COOLDOWN_SECS))
            .args(vec![ArgSlot::word("subject"), ArgSlot::opt_rest("topic")]),
        )?;
    }

    registry.register(CommandSpec::new(
        "subjects",
        Arc::new(SubjectsView),
    ))?;

    for (verb, class_level) in [("chapters11", 11u8), ("chapters12", 12u8)] {
        registry.register(
            CommandSpec::new(verb, Arc::new(ChaptersView { class_level }))
                .args(vec![ArgSlot::opt_word("subject")]),
        )?;
    }

    Ok(())
}

struct ClassQuestion {
    class_level: u8,
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for ClassQuestion {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let raw_subject = ctx
            .args
            .word("subject")
            .ok_or_else(|| CommandError::Internal("subject slot missing".into()))?
            .to_string();
        let topic = ctx.args.rest("topic").map(|t| t.to_string());

        if subjects::normalize(&raw_subject).is_none() {
            let available = subjects::SUBJECTS
                .iter()
                .map(|s| subjects::display_name(s))
                .collect::<Vec<_>>()
                .join(", ");
            ctx.reply(&format!("❌ Invalid subject. Available subjects: {available}"))
                .await?;
            return Ok(());
        }

        let question = self
            .services
            .questions
            .next_question(&raw_subject, topic.as_deref(), self.class_level, ctx.user_id)
            .await
            .map_err(|e| match e {
                StudyError::Timeout => CommandError::Provider("generation timed out".into()),
                other => CommandError::Provider(other.to_string()),
            })?;

        // Deliver over DM; fall back to an in-channel hint when DMs are closed.
        match ctx.rest.dm_embed(ctx.user_id, question_embed(&question)).await {
            Ok(()) => {}
            Err(PlatformError::Forbidden) => {
                let embed = CreateEmbed::new()
                    .title("❌ Cannot Send Private Message")
                    .description(
                        "Please enable direct messages from server members:\n\
                         right-click the server icon → Privacy Settings → \
                         allow direct messages.",
                    )
                    .colour(Colour::RED);
                ctx.rest.send_embed(ctx.channel_id, embed).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let confirmation = CreateEmbed::new()
            .title("📨 Question Generated!")
            .description("Check your DMs — the question is waiting for you.")
            .colour(Colour::from_rgb(88, 195, 34))
            .footer(CreateEmbedFooter::new(format!(
                "The answer follows in {ANSWER_REVEAL_SECS} seconds."
            )));
        ctx.rest.send_embed(ctx.channel_id, confirmation).await?;

        // Answer reveal after the delay; cancelled cleanly on shutdown.
        let rest = ctx.rest.clone();
        let shutdown = ctx.shutdown.clone();
        let user_id = ctx.user_id;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(ANSWER_REVEAL_SECS)) => {}
                _ = shutdown.cancelled() => return,
            }
            if let Err(e) = rest.dm_embed(user_id, answer_embed(&question)).await {
                warn!(user_id, error = %e, "answer reveal DM failed");
            }
        });

        Ok(())
    }
}

fn question_embed(question: &Question) -> CreateEmbed {
    CreateEmbed::new()
        .title("📝 Practice Question")
        .description(question.question.clone())
        .field(
            "Options:",
            format!("```{}```", question.options.join("\n")),
            false,
        )
        .colour(Colour::BLUE)
        .footer(CreateEmbedFooter::new(
            "💫 The answer will be revealed in 60 seconds... 💫",
        ))
}

fn answer_embed(question: &Question) -> CreateEmbed {
    let mut text = format!("✅ The correct answer is **{}**", question.correct_answer);
    if !question.explanation.is_empty() {
        text.push_str(&format!("\n\n**Explanation:**\n{}", question.explanation));
    }
    CreateEmbed::new()
        .title("✨ Answer Revealed! ✨")
        .description(text)
        .colour(Colour::GOLD)
}

struct SubjectsView;

#[async_trait]
impl CommandHandler for SubjectsView {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let listing = subjects::SUBJECTS
            .iter()
            .map(|s| format!("• {}", subjects::display_name(s)))
            .collect::<Vec<_>>()
            .join("\n");
        let embed = CreateEmbed::new()
            .title("📚 Available Subjects")
            .description("Here are all the subjects you can study:")
            .field("Subjects:", format!("```{listing}```"), false)
            .field(
                "How to Use:",
                "```!11 physics waves\n!12 chemistry organic\n!11 mathematics integration```",
                false,
            )
            .colour(Colour::BLUE)
            .footer(CreateEmbedFooter::new(
                "Use these subjects with !11 or !12 to get practice questions! 📚",
            ));
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}

struct ChaptersView {
    class_level: u8,
}

#[async_trait]
impl CommandHandler for ChaptersView {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let Some(raw_subject) = ctx.args.word("subject") else {
            let listing = subjects::SUBJECTS
                .iter()
                .map(|s| format!("• {}", subjects::display_name(s)))
                .collect::<Vec<_>>()
                .join("\n");
            let embed = CreateEmbed::new()
                .title(format!("📚 Class {} Subjects", self.class_level))
                .description(format!(
                    "Please specify a subject: `!chapters{} <subject>`",
                    self.class_level
                ))
                .field("Subjects:", format!("```{listing}```"), false)
                .colour(Colour::BLUE);
            ctx.rest.send_embed(ctx.channel_id, embed).await?;
            return Ok(());
        };

        let Some(subject) = subjects::normalize(raw_subject) else {
            ctx.reply("❌ Invalid subject. Use `!subjects` to see what's available.")
                .await?;
            return Ok(());
        };
        let Some(chapters) = subjects::chapters(self.class_level, subject) else {
            ctx.reply("❌ No chapter list for that subject.").await?;
            return Ok(());
        };

        let listing = chapters
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {c}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let embed = CreateEmbed::new()
            .title(format!(
                "📖 Class {} {} Chapters",
                self.class_level,
                subjects::display_name(subject)
            ))
            .field("Chapters", format!("```{listing}```"), false)
            .colour(Colour::from_rgb(88, 195, 34))
            .footer(CreateEmbedFooter::new(format!(
                "Use !{} {subject} <chapter> to get questions!",
                self.class_level
            )));
        ctx.rest.send_embed(ctx.channel_id, embed).await?;
        Ok(())
    }
}
