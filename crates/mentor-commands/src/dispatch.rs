use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use mentor_core::config::COOLDOWN_SWEEP_MAX_AGE_SECS;
use mentor_core::events::MessageEvent;
use mentor_discord::{PlatformError, Rest};

use crate::context::CommandContext;
use crate::error::CommandError;
use crate::parse;
use crate::registry::{CommandSpec, Registry};

/// Fired after a command completes successfully (fire-and-forget); the
/// progress engine hangs off this.
#[async_trait]
pub trait CommandHook: Send + Sync {
    async fn command_completed(
        &self,
        user_id: u64,
        verb: &str,
        channel_id: u64,
        guild_id: Option<u64>,
    );
}

/// How one message moved through the gate pipeline. Returned for tests and
/// debug logging; user-visible effects have already happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command (bot author, or no prefix).
    Ignored,
    UnknownVerb,
    WrongChannel,
    NoPermission,
    ParseError,
    /// Same (user, verb) already running — dropped silently.
    InFlight,
    /// Local cooldown not yet elapsed — dropped silently.
    CooldownHit,
    Completed,
    HandlerError,
}

type InvocationKey = (u64, String);

/// Turns message events into handler invocations.
///
/// Owns the invocation and cooldown maps exclusively. The central invariant:
/// for any (user, verb) at most one handler runs at a time; extra arrivals
/// are dropped, never queued.
pub struct Dispatcher {
    prefix: String,
    registry: Arc<Registry>,
    rest: Rest,
    inflight: Arc<DashMap<InvocationKey, ()>>,
    cooldowns: DashMap<InvocationKey, DateTime<Utc>>,
    hook: Option<Arc<dyn CommandHook>>,
    shutdown: CancellationToken,
    active: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub fn new(
        prefix: String,
        registry: Arc<Registry>,
        rest: Rest,
        hook: Option<Arc<dyn CommandHook>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            prefix,
            registry,
            rest,
            inflight: Arc::new(DashMap::new()),
            cooldowns: DashMap::new(),
            hook,
            shutdown,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run one message through the pipeline:
    /// resolve → channel gate → role gate → arg binding → in-flight gate →
    /// cooldown gate → execute → translate errors → progress hook.
    pub async fn dispatch(&self, event: MessageEvent) -> DispatchOutcome {
        if event.author_is_bot || !event.content.starts_with(&self.prefix) {
            return DispatchOutcome::Ignored;
        }

        let body = &event.content[self.prefix.len()..];
        let mut parts = body.splitn(2, char::is_whitespace);
        let verb = match parts.next() {
            Some(v) if !v.is_empty() => v.to_lowercase(),
            _ => return DispatchOutcome::Ignored,
        };
        let arg_input = parts.next().unwrap_or("").trim();

        let Some(spec) = self.registry.resolve(&verb) else {
            self.reply_unknown(&event, &verb).await;
            return DispatchOutcome::UnknownVerb;
        };

        // Channel gate. Does not count as a cooldown use.
        if let Some(ref allowed) = spec.channel_allow_list {
            if !allowed.contains(&event.channel_id) {
                let hint = allowed
                    .iter()
                    .map(|id| format!("<#{id}>"))
                    .collect::<Vec<_>>()
                    .join(" or ");
                self.reply_best_effort(
                    event.channel_id,
                    &format!("❌ `{}{verb}` only works in {hint}.", self.prefix),
                )
                .await;
                return DispatchOutcome::WrongChannel;
            }
        }

        // Role gate. Does not count as a cooldown use.
        if !self.author_may_run(&event, &spec) {
            self.reply_best_effort(
                event.channel_id,
                "❌ You don't have permission to use this command.",
            )
            .await;
            return DispatchOutcome::NoPermission;
        }

        // Argument binding. Usage replies never count against cooldown.
        let args = match parse::bind(&spec.args, arg_input) {
            Ok(args) => args,
            Err(reason) => {
                let usage = parse::usage_line(&self.prefix, spec.verb, &spec.args);
                self.reply_best_effort(
                    event.channel_id,
                    &format!("❌ {reason} — usage: `{usage}`"),
                )
                .await;
                return DispatchOutcome::ParseError;
            }
        };

        // In-flight gate: at most one invocation per (user, verb).
        let key: InvocationKey = (event.author_id, verb.clone());
        if self.inflight.insert(key.clone(), ()).is_some() {
            debug!(user_id = event.author_id, %verb, "duplicate in-flight invocation dropped");
            return DispatchOutcome::InFlight;
        }
        let _guard = InflightGuard {
            map: Arc::clone(&self.inflight),
            key: key.clone(),
            active: Arc::clone(&self.active),
        };
        self.active.fetch_add(1, Ordering::SeqCst);

        // Local cooldown gate, on top of any platform-side cooldown.
        if let Some(last) = self.cooldowns.get(&key) {
            let elapsed = Utc::now()
                .signed_duration_since(*last)
                .to_std()
                .unwrap_or_default();
            if elapsed < spec.local_cooldown {
                debug!(user_id = event.author_id, %verb, "local cooldown hit — dropped");
                return DispatchOutcome::CooldownHit;
            }
        }

        let ctx = CommandContext::from_event(
            &event,
            args,
            self.rest.clone(),
            self.shutdown.clone(),
        );

        info!(user_id = event.author_id, %verb, channel_id = event.channel_id, "command dispatched");

        let outcome = match spec.handler.run(ctx).await {
            Ok(()) => DispatchOutcome::Completed,
            Err(err) => {
                self.reply_handler_error(&event, &verb, err).await;
                DispatchOutcome::HandlerError
            }
        };

        // Execution finished either way — record the cooldown stamp.
        self.cooldowns.insert(key, Utc::now());

        if outcome == DispatchOutcome::Completed {
            if let Some(ref hook) = self.hook {
                let hook = Arc::clone(hook);
                let verb_owned = verb.clone();
                let (user_id, channel_id, guild_id) =
                    (event.author_id, event.channel_id, event.guild_id);
                tokio::spawn(async move {
                    hook.command_completed(user_id, &verb_owned, channel_id, guild_id)
                        .await;
                });
            }
        }

        outcome
    }

    fn author_may_run(&self, event: &MessageEvent, spec: &CommandSpec) -> bool {
        if spec.admin_only && !event.author_is_admin {
            return false;
        }
        if let Some(ref required) = spec.required_roles {
            if event.author_is_admin {
                return true;
            }
            return required.iter().any(|r| event.author_roles.contains(r));
        }
        true
    }

    async fn reply_unknown(&self, event: &MessageEvent, verb: &str) {
        let text = match self.registry.suggest(verb) {
            Some(candidate) => format!(
                "❓ Unknown command `{p}{verb}`. Did you mean `{p}{candidate}`?",
                p = self.prefix
            ),
            None => format!(
                "❓ Unknown command `{p}{verb}`. Try `{p}help`.",
                p = self.prefix
            ),
        };
        self.reply_best_effort(event.channel_id, &text).await;
    }

    /// Translate a handler failure into a single reply. Failures here must
    /// never escape — a broken handler cannot take the dispatcher down.
    async fn reply_handler_error(&self, event: &MessageEvent, verb: &str, err: CommandError) {
        let text = match &err {
            CommandError::Usage(usage) => format!("❌ Usage: `{usage}`"),
            CommandError::Platform(PlatformError::RateLimited { retry_after }) => format!(
                "⏳ Please wait {} seconds before using this command again.",
                retry_after.as_secs()
            ),
            CommandError::Platform(PlatformError::Forbidden) => {
                "❌ You don't have permission to use this command.".to_string()
            }
            CommandError::Platform(PlatformError::NotFound) => {
                "❌ Not found — check the mention or id and try again.".to_string()
            }
            CommandError::Provider(reason) => {
                warn!(%verb, %reason, "provider failure");
                "❌ Couldn't generate a response right now. Please try again later.".to_string()
            }
            other => {
                error!(user_id = event.author_id, %verb, error = %other, "command handler failed");
                "❌ An error occurred while processing your command.".to_string()
            }
        };
        self.reply_best_effort(event.channel_id, &text).await;
    }

    async fn reply_best_effort(&self, channel_id: u64, text: &str) {
        if let Err(e) = self.rest.send_message(channel_id, text).await {
            warn!(channel_id, error = %e, "reply failed");
        }
    }

    /// Drop cooldown stamps older than the sweep horizon. Invoked from the
    /// supervisor's liveness tick.
    pub fn prune_cooldowns(&self) {
        let horizon = Utc::now()
            - chrono::Duration::seconds(COOLDOWN_SWEEP_MAX_AGE_SECS as i64);
        let before = self.cooldowns.len();
        self.cooldowns.retain(|_, stamp| *stamp > horizon);
        let removed = before - self.cooldowns.len();
        if removed > 0 {
            debug!(removed, "cooldown entries pruned");
        }
    }

    pub fn active_invocations(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for in-flight invocations to finish, up to `deadline`.
    pub async fn drain(&self, deadline: Duration) {
        let start = std::time::Instant::now();
        while self.active_invocations() > 0 && start.elapsed() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let remaining = self.active_invocations();
        if remaining > 0 {
            warn!(remaining, "shutdown deadline reached with invocations still running");
        }
    }
}

/// Releases the in-flight slot on every exit path, panics included.
struct InflightGuard {
    map: Arc<DashMap<InvocationKey, ()>>,
    key: InvocationKey,
    active: Arc<AtomicUsize>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.key);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ArgSlot;
    use crate::registry::{CommandHandler, CommandSpec};
    use crate::error::Result;
    use std::sync::atomic::AtomicU32;

    struct CountingHandler {
        runs: Arc<AtomicU32>,
        delay: Duration,
    }

    #[async_trait]
    impl CommandHandler for CountingHandler {
        async fn run(&self, _ctx: CommandContext) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl CommandHandler for FailingHandler {
        async fn run(&self, _ctx: CommandContext) -> Result<()> {
            Err(CommandError::Internal("boom".into()))
        }
    }

    fn test_rest() -> Rest {
        Rest::new(Arc::new(serenity::http::Http::new("test-token")))
    }

    fn message(user_id: u64, channel_id: u64, content: &str) -> MessageEvent {
        MessageEvent {
            message_id: 1,
            channel_id,
            guild_id: Some(7),
            author_id: user_id,
            author_name: "tester".into(),
            author_is_bot: false,
            author_roles: vec![],
            author_is_admin: false,
            author_in_voice: false,
            content: content.into(),
        }
    }

    fn dispatcher_with(
        specs: Vec<CommandSpec>,
        hook: Option<Arc<dyn CommandHook>>,
    ) -> Dispatcher {
        let registry = Arc::new(Registry::new());
        for spec in specs {
            registry.register(spec).unwrap();
        }
        registry.freeze();
        Dispatcher::new(
            "!".into(),
            registry,
            test_rest(),
            hook,
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn non_prefixed_and_bot_messages_are_ignored() {
        let d = dispatcher_with(vec![], None);
        assert_eq!(
            d.dispatch(message(1, 1, "hello there")).await,
            DispatchOutcome::Ignored
        );
        let mut bot_msg = message(1, 1, "!help");
        bot_msg.author_is_bot = true;
        assert_eq!(d.dispatch(bot_msg).await, DispatchOutcome::Ignored);
    }

    #[tokio::test]
    async fn duplicate_in_flight_invocation_is_dropped() {
        let runs = Arc::new(AtomicU32::new(0));
        let handler = Arc::new(CountingHandler {
            runs: Arc::clone(&runs),
            delay: Duration::from_millis(200),
        });
        let d = Arc::new(dispatcher_with(
            vec![CommandSpec::new("ping", handler).cooldown(Duration::ZERO)],
            None,
        ));

        let d1 = Arc::clone(&d);
        let first = tokio::spawn(async move { d1.dispatch(message(5, 1, "!ping")).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = d.dispatch(message(5, 1, "!ping")).await;

        assert_eq!(second, DispatchOutcome::InFlight);
        assert_eq!(first.await.unwrap(), DispatchOutcome::Completed);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(d.active_invocations(), 0);
    }

    #[tokio::test]
    async fn same_verb_different_users_run_concurrently() {
        let runs = Arc::new(AtomicU32::new(0));
        let handler = Arc::new(CountingHandler {
            runs: Arc::clone(&runs),
            delay: Duration::from_millis(100),
        });
        let d = Arc::new(dispatcher_with(
            vec![CommandSpec::new("ping", handler).cooldown(Duration::ZERO)],
            None,
        ));

        let d1 = Arc::clone(&d);
        let a = tokio::spawn(async move { d1.dispatch(message(1, 1, "!ping")).await });
        let d2 = Arc::clone(&d);
        let b = tokio::spawn(async move { d2.dispatch(message(2, 1, "!ping")).await });

        assert_eq!(a.await.unwrap(), DispatchOutcome::Completed);
        assert_eq!(b.await.unwrap(), DispatchOutcome::Completed);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cooldown_drops_rapid_repeat() {
        let runs = Arc::new(AtomicU32::new(0));
        let handler = Arc::new(CountingHandler {
            runs: Arc::clone(&runs),
            delay: Duration::ZERO,
        });
        let d = dispatcher_with(
            vec![CommandSpec::new("ping", handler).cooldown(Duration::from_secs(60))],
            None,
        );

        assert_eq!(d.dispatch(message(9, 1, "!ping")).await, DispatchOutcome::Completed);
        assert_eq!(d.dispatch(message(9, 1, "!ping")).await, DispatchOutcome::CooldownHit);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrong_channel_records_no_cooldown() {
        let runs = Arc::new(AtomicU32::new(0));
        let handler = Arc::new(CountingHandler {
            runs: Arc::clone(&runs),
            delay: Duration::ZERO,
        });
        let d = dispatcher_with(
            vec![CommandSpec::new("ping", handler)
                .channels(vec![42])
                .cooldown(Duration::from_secs(60))],
            None,
        );

        assert_eq!(
            d.dispatch(message(9, 1, "!ping")).await,
            DispatchOutcome::WrongChannel
        );
        // The right channel still works immediately: no cooldown was recorded.
        assert_eq!(
            d.dispatch(message(9, 42, "!ping")).await,
            DispatchOutcome::Completed
        );
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn role_gate_blocks_without_required_role() {
        let runs = Arc::new(AtomicU32::new(0));
        let handler = Arc::new(CountingHandler {
            runs: Arc::clone(&runs),
            delay: Duration::ZERO,
        });
        let d = dispatcher_with(
            vec![CommandSpec::new("clear", handler)
                .roles(vec![1000])
                .args(vec![ArgSlot::int("n", 1, 100)])],
            None,
        );

        assert_eq!(
            d.dispatch(message(9, 1, "!clear 10")).await,
            DispatchOutcome::NoPermission
        );
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let mut staff_msg = message(9, 1, "!clear 10");
        staff_msg.author_roles = vec![1000];
        assert_eq!(d.dispatch(staff_msg).await, DispatchOutcome::Completed);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn parse_failure_is_reported_not_executed() {
        let runs = Arc::new(AtomicU32::new(0));
        let handler = Arc::new(CountingHandler {
            runs: Arc::clone(&runs),
            delay: Duration::ZERO,
        });
        let d = dispatcher_with(
            vec![CommandSpec::new("clear", handler).args(vec![ArgSlot::int("n", 1, 100)])],
            None,
        );

        assert_eq!(
            d.dispatch(message(9, 1, "!clear lots")).await,
            DispatchOutcome::ParseError
        );
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_failure_is_contained() {
        let d = dispatcher_with(vec![CommandSpec::new("boom", Arc::new(FailingHandler))], None);
        assert_eq!(
            d.dispatch(message(9, 1, "!boom")).await,
            DispatchOutcome::HandlerError
        );
        // The in-flight slot is released even after a failure.
        assert_eq!(d.active_invocations(), 0);
    }

    #[tokio::test]
    async fn hook_fires_on_completion_only() {
        struct RecordingHook {
            fired: Arc<AtomicU32>,
        }

        #[async_trait]
        impl CommandHook for RecordingHook {
            async fn command_completed(
                &self,
                _user_id: u64,
                _verb: &str,
                _channel_id: u64,
                _guild_id: Option<u64>,
            ) {
                self.fired.fetch_add(1, Ordering::SeqCst);
            }
        }

        let fired = Arc::new(AtomicU32::new(0));
        let runs = Arc::new(AtomicU32::new(0));
        let handler = Arc::new(CountingHandler {
            runs,
            delay: Duration::ZERO,
        });
        let d = dispatcher_with(
            vec![
                CommandSpec::new("ok", handler).cooldown(Duration::ZERO),
                CommandSpec::new("boom", Arc::new(FailingHandler)),
            ],
            Some(Arc::new(RecordingHook {
                fired: Arc::clone(&fired),
            })),
        );

        d.dispatch(message(1, 1, "!ok")).await;
        d.dispatch(message(1, 1, "!boom")).await;
        // Hook task is spawned; give it a beat.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn prune_removes_stale_cooldowns() {
        let handler = Arc::new(CountingHandler {
            runs: Arc::new(AtomicU32::new(0)),
            delay: Duration::ZERO,
        });
        let d = dispatcher_with(vec![CommandSpec::new("ping", handler)], None);
        d.dispatch(message(1, 1, "!ping")).await;

        // A fresh stamp survives the sweep.
        d.prune_cooldowns();
        assert_eq!(d.cooldowns.len(), 1);

        // Backdate it past the horizon and sweep again.
        let key = (1u64, "ping".to_string());
        d.cooldowns.insert(
            key,
            Utc::now() - chrono::Duration::seconds(COOLDOWN_SWEEP_MAX_AGE_SECS as i64 + 10),
        );
        d.prune_cooldowns();
        assert!(d.cooldowns.is_empty());
    }
}
