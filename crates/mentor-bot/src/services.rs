use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use mentor_commands::CommandHook;
use mentor_core::config::MentorConfig;
use mentor_discord::Rest;
use mentor_invites::InviteLedger;
use mentor_progress::ProgressEngine;
use mentor_study::ai::AiAdapter;
use mentor_study::services::StudyServices;
use mentor_study::QuestionProvider;

use crate::music::MusicState;

/// Everything the command handlers and event subscribers share. Built once
/// at startup; components talk to each other only through these narrow
/// handles, never by holding whole components.
pub struct Services {
    pub config: MentorConfig,
    pub rest: Rest,
    pub progress: Arc<ProgressEngine>,
    pub invites: Arc<tokio::sync::Mutex<InviteLedger>>,
    pub questions: Arc<QuestionProvider>,
    pub study: Arc<StudyServices>,
    pub ai: Arc<dyn AiAdapter>,
    pub music: Arc<MusicState>,
}

/// Dispatcher → progress engine bridge for command events.
pub struct ProgressCommandHook {
    pub progress: Arc<ProgressEngine>,
}

#[async_trait]
impl CommandHook for ProgressCommandHook {
    async fn command_completed(
        &self,
        user_id: u64,
        verb: &str,
        channel_id: u64,
        guild_id: Option<u64>,
    ) {
        if let Err(e) = self
            .progress
            .on_command(user_id, verb, channel_id, guild_id)
            .await
        {
            warn!(user_id, verb, error = %e, "progress command hook failed");
        }
    }
}

/// Fallback adapter when no AI key is configured.
pub struct NullAi;

#[async_trait]
impl AiAdapter for NullAi {
    async fn generate(&self, _prompt: &str) -> mentor_study::Result<String> {
        Err(mentor_study::StudyError::Provider(
            "no AI provider configured — set ai.api_key in mentor.toml".into(),
        ))
    }
}
