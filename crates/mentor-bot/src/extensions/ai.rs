//! AI conversation commands, gated to the configured AI channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use mentor_commands::{
    ArgSlot, CommandContext, CommandError, CommandHandler, CommandSpec, Registry, RegistryError,
};
use mentor_study::subjects;
use mentor_study::StudyError;

use crate::services::Services;

const AI_COOLDOWN_SECS: u64 = 5;
/// Replies under this length replace the placeholder in place; longer ones
/// are sent as fresh chunked messages.
const EDIT_LIMIT: usize = 1900;

pub fn register(registry: &Registry, services: &Arc<Services>) -> Result<(), RegistryError> {
    let ai_channels: Vec<u64> = services.config.channels.ai.into_iter().collect();

    let specs: [(&'static str, Mode, &'static str); 4] = [
        ("ask", Mode::Ask, "prompt"),
        ("explain", Mode::Explain, "topic"),
        ("solve", Mode::Solve, "problem"),
        ("compare", Mode::Compare, "items"),
    ];
    for (verb, mode, slot) in specs {
        registry.register(
            CommandSpec::new(verb, Arc::new(Generate {
                mode,
                services: Arc::clone(services),
            }))
            .channels(ai_channels.clone())
            .cooldown(Duration::from_secs(AI_COOLDOWN_SECS))
            .args(vec![ArgSlot::rest(slot)]),
        )?;
    }

    registry.register(
        CommandSpec::new("practice", Arc::new(Practice {
            services: Arc::clone(services),
        }))
        .channels(ai_channels)
        .cooldown(Duration::from_secs(AI_COOLDOWN_SECS))
        .args(vec![ArgSlot::word("subject")]),
    )?;

    Ok(())
}

#[derive(Clone, Copy)]
enum Mode {
    Ask,
    Explain,
    Solve,
    Compare,
}

struct Generate {
    mode: Mode,
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Generate {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let input = ctx
            .args
            .rest("prompt")
            .or_else(|| ctx.args.rest("topic"))
            .or_else(|| ctx.args.rest("problem"))
            .or_else(|| ctx.args.rest("items"))
            .ok_or_else(|| CommandError::Internal("input slot missing".into()))?
            .to_string();

        let prompt = match self.mode {
            Mode::Ask => input.clone(),
            Mode::Explain => format!(
                "Explain the following topic for a class 11/12 student, with a \
                 short summary and the key points: {input}"
            ),
            Mode::Solve => format!(
                "Solve this problem step by step. Identify the problem type, \
                 list the given values, show each step, and state the final \
                 answer: {input}"
            ),
            Mode::Compare => {
                let Some((a, b)) = input.split_once(" vs ") else {
                    return Err(CommandError::Usage("!compare <a> vs <b>".into()));
                };
                format!(
                    "Compare and contrast \"{}\" and \"{}\" for a class 11/12 \
                     student, ending with a short summary table.",
                    a.trim(),
                    b.trim()
                )
            }
        };

        let placeholder = ctx.rest.send_message(ctx.channel_id, "🤔 Thinking…").await?;
        let response = self
            .services
            .ai
            .generate(&prompt)
            .await
            .map_err(map_study_error)?;

        if response.len() <= EDIT_LIMIT {
            ctx.rest
                .edit_message(ctx.channel_id, placeholder, &response)
                .await?;
        } else {
            ctx.rest.send_message(ctx.channel_id, &response).await?;
        }
        Ok(())
    }
}

struct Practice {
    services: Arc<Services>,
}

#[async_trait]
impl CommandHandler for Practice {
    async fn run(&self, ctx: CommandContext) -> mentor_commands::Result<()> {
        let raw_subject = ctx
            .args
            .word("subject")
            .ok_or_else(|| CommandError::Internal("subject slot missing".into()))?;
        let Some(subject) = subjects::normalize(raw_subject) else {
            ctx.reply("❌ Unknown subject. Use `!subjects` to see what's available.")
                .await?;
            return Ok(());
        };

        // Personalize toward the user's weakest topic when we know one.
        let weakest = self
            .services
            .study
            .weakest_topic(ctx.user_id, subject)
            .map_err(|e| CommandError::Store(e.to_string()))?;

        let prompt = match weakest {
            Some(progress) if progress.total_attempts > 0 => {
                let accuracy =
                    progress.correct_answers as f64 / progress.total_attempts as f64 * 100.0;
                format!(
                    "Generate one {subject} practice question about {} for a \
                     student currently at {accuracy:.0}% accuracy on that topic. \
                     Slightly challenging, plain text.",
                    if progress.topic.is_empty() { "the basics" } else { &progress.topic },
                )
            }
            _ => format!(
                "Generate one introductory {subject} practice question suitable \
                 for a beginner, plain text."
            ),
        };

        let placeholder = ctx
            .rest
            .send_message(ctx.channel_id, "🤔 Preparing your personalized question…")
            .await?;
        let response = self
            .services
            .ai
            .generate(&prompt)
            .await
            .map_err(map_study_error)?;

        if response.len() <= EDIT_LIMIT {
            ctx.rest
                .edit_message(ctx.channel_id, placeholder, &response)
                .await?;
        } else {
            ctx.rest.send_message(ctx.channel_id, &response).await?;
        }
        Ok(())
    }
}

fn map_study_error(e: StudyError) -> CommandError {
    match e {
        StudyError::Timeout => CommandError::Provider("generation timed out".into()),
        other => CommandError::Provider(other.to_string()),
    }
}
