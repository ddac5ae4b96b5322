use tokio_util::sync::CancellationToken;

use mentor_core::events::MessageEvent;
use mentor_discord::Rest;

use crate::parse::ParsedArgs;

/// Everything a handler gets: who asked, where, the bound arguments, the
/// REST surface for replies, and the shutdown signal for cooperative
/// cancellation at I/O boundaries.
#[derive(Clone)]
pub struct CommandContext {
    pub user_id: u64,
    pub user_name: String,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub author_roles: Vec<u64>,
    pub author_in_voice: bool,
    pub args: ParsedArgs,
    pub rest: Rest,
    pub shutdown: CancellationToken,
}

impl CommandContext {
    pub fn from_event(
        event: &MessageEvent,
        args: ParsedArgs,
        rest: Rest,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            user_id: event.author_id,
            user_name: event.author_name.clone(),
            channel_id: event.channel_id,
            guild_id: event.guild_id,
            author_roles: event.author_roles.clone(),
            author_in_voice: event.author_in_voice,
            args,
            rest,
            shutdown,
        }
    }

    /// Reply in the originating channel.
    pub async fn reply(&self, text: &str) -> crate::error::Result<()> {
        self.rest.send_message(self.channel_id, text).await?;
        Ok(())
    }
}
