use std::sync::Arc;

use serenity::all::ActivityData;
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::guild::{Guild, Member};
use serenity::model::id::GuildId;
use serenity::model::user::User;
use serenity::prelude::{Context, EventHandler};
use tokio::sync::mpsc;
use tracing::{debug, info};

use mentor_core::events::{GatewayEvent, MessageEvent};

use crate::session::SessionState;

/// Serenity event handler: translates raw gateway events into typed
/// [`GatewayEvent`]s and forwards them to the primary event loop.
pub struct DiscordHandler {
    pub tx: mpsc::Sender<GatewayEvent>,
    pub state: Arc<SessionState>,
    pub activity: Option<String>,
}

impl DiscordHandler {
    async fn forward(&self, event: GatewayEvent) {
        self.state.touch();
        if self.tx.send(event).await.is_err() {
            debug!("event loop closed — dropping gateway event");
        }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        self.state.mark_ready();

        if let Some(ref name) = self.activity {
            ctx.set_activity(Some(ActivityData::playing(name)));
        }

        info!(name = %ready.user.name, guilds = ready.guilds.len(), "gateway session ready");

        self.forward(GatewayEvent::Ready {
            bot_user_id: ready.user.id.get(),
            bot_name: ready.user.name.clone(),
            guild_ids: ready.guilds.iter().map(|g| g.id.get()).collect(),
        })
        .await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Voice presence is resolved here while the cache is at hand; the
        // dispatcher never touches serenity types.
        let author_in_voice = msg
            .guild_id
            .and_then(|gid| {
                ctx.cache
                    .guild(gid)
                    .map(|g| g.voice_states.contains_key(&msg.author.id))
            })
            .unwrap_or(false);

        let author_roles: Vec<u64> = msg
            .member
            .as_ref()
            .map(|m| m.roles.iter().map(|r| r.get()).collect())
            .unwrap_or_default();

        let author_is_admin = msg
            .guild_id
            .and_then(|gid| {
                ctx.cache.guild(gid).map(|g| {
                    g.owner_id == msg.author.id
                        || g.roles.iter().any(|(id, role)| {
                            author_roles.contains(&id.get())
                                && role.permissions.administrator()
                        })
                })
            })
            .unwrap_or(false);

        self.forward(GatewayEvent::MessageCreate(MessageEvent {
            message_id: msg.id.get(),
            channel_id: msg.channel_id.get(),
            guild_id: msg.guild_id.map(|g| g.get()),
            author_id: msg.author.id.get(),
            author_name: msg.author.name.clone(),
            author_is_bot: msg.author.bot,
            author_roles,
            author_is_admin,
            author_in_voice,
            content: msg.content.clone(),
        }))
        .await;
    }

    async fn guild_member_addition(&self, _ctx: Context, member: Member) {
        self.forward(GatewayEvent::MemberJoin {
            guild_id: member.guild_id.get(),
            user_id: member.user.id.get(),
            user_name: member.user.name.clone(),
        })
        .await;
    }

    async fn guild_member_removal(
        &self,
        _ctx: Context,
        guild_id: GuildId,
        user: User,
        _member: Option<Member>,
    ) {
        self.forward(GatewayEvent::MemberLeave {
            guild_id: guild_id.get(),
            user_id: user.id.get(),
            user_name: user.name.clone(),
        })
        .await;
    }

    async fn invite_create(
        &self,
        _ctx: Context,
        event: serenity::model::event::InviteCreateEvent,
    ) {
        let Some(guild_id) = event.guild_id else {
            return;
        };
        self.forward(GatewayEvent::InviteCreate {
            guild_id: guild_id.get(),
            code: event.code.clone(),
            inviter_id: event.inviter.as_ref().map(|u| u.id.get()),
            uses: event.uses,
        })
        .await;
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        // Fired for every guild at startup and on real joins. Subscribers
        // (achievement role setup) are idempotent, so both are forwarded.
        self.forward(GatewayEvent::GuildJoin {
            guild_id: guild.id.get(),
            guild_name: guild.name.clone(),
        })
        .await;
    }
}
