use std::sync::Arc;
use std::time::{Duration, Instant};

use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mentor_core::config::{
    BASE_RETRY_DELAY_SECS, LIVENESS_INTERVAL_SECS, LIVENESS_STALL_SECS, MAX_RETRIES,
    MAX_RETRY_DELAY_SECS, RATE_LIMIT_COOLDOWN_SECS, RETRY_JITTER_MAX_SECS, RETRY_MULTIPLIER,
};
use mentor_core::events::GatewayEvent;

use crate::handler::DiscordHandler;
use crate::session::{SessionPhase, SessionState};

/// Owns the one gateway session: connects, watches it die, reconnects with
/// bounded backoff, and backs off hard (30 min) when the platform keeps
/// rejecting us. Nothing else may start or close the session.
pub struct Supervisor {
    token: String,
    activity: Option<String>,
    state: Arc<SessionState>,
    tx: mpsc::Sender<GatewayEvent>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(
        token: String,
        activity: Option<String>,
        tx: mpsc::Sender<GatewayEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            token,
            activity,
            state: Arc::new(SessionState::new()),
            tx,
            cancel,
        }
    }

    pub fn state(&self) -> Arc<SessionState> {
        Arc::clone(&self.state)
    }

    /// Drive the session until shutdown. Never returns earlier on its own.
    pub async fn run(self) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.state.set_phase(SessionPhase::Connecting);
            info!("gateway connecting");

            let cause = match self.run_session().await {
                SessionExit::Shutdown => break,
                SessionExit::Failed(cause) => cause,
            };

            self.state.set_phase(SessionPhase::Disconnected);
            let _ = self
                .tx
                .send(GatewayEvent::Disconnect {
                    cause: cause.clone(),
                })
                .await;

            // DNS-style failures mean the network itself is gone. Waiting the
            // full cap without consuming a retry avoids burning the retry
            // budget on an outage no backoff schedule can fix.
            if is_dns_failure(&cause) {
                warn!(%cause, "network outage suspected, sleeping {}s", MAX_RETRY_DELAY_SECS);
                if self.sleep_or_cancel(Duration::from_secs(MAX_RETRY_DELAY_SECS)).await {
                    break;
                }
                continue;
            }

            let failures = self.state.record_failure();
            if failures > MAX_RETRIES {
                let cooldown = Duration::from_secs(RATE_LIMIT_COOLDOWN_SECS);
                error!(
                    failures,
                    "max retries exceeded — rate-limit cooldown for {}s",
                    cooldown.as_secs()
                );
                self.state.enter_rate_limited(Instant::now() + cooldown);
                if self.sleep_or_cancel(cooldown).await {
                    break;
                }
                self.state.leave_rate_limited();
                continue;
            }

            let delay = jittered(delay_for_attempt(failures));
            warn!(%cause, attempt = failures, "gateway reconnect in {:.1}s", delay.as_secs_f64());
            if self.sleep_or_cancel(delay).await {
                break;
            }
        }

        self.state.set_phase(SessionPhase::Disconnected);
        info!("connection supervisor stopped");
    }

    /// Build a client and run it until the gateway drops or shutdown.
    async fn run_session(&self) -> SessionExit {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::GUILD_INVITES
            | GatewayIntents::GUILD_VOICE_STATES;

        let handler = DiscordHandler {
            tx: self.tx.clone(),
            state: Arc::clone(&self.state),
            activity: self.activity.clone(),
        };

        let mut client = match Client::builder(&self.token, intents)
            .event_handler(handler)
            .await
        {
            Ok(c) => c,
            Err(e) => return SessionExit::Failed(e.to_string()),
        };

        let shard_manager = client.shard_manager.clone();

        tokio::select! {
            res = client.start() => match res {
                Ok(()) => SessionExit::Failed("gateway stopped cleanly".to_string()),
                Err(e) => SessionExit::Failed(e.to_string()),
            },
            _ = self.cancel.cancelled() => {
                info!("shutdown requested — closing gateway session");
                shard_manager.shutdown_all().await;
                SessionExit::Shutdown
            }
        }
    }

    /// Sleep for `dur`, returning true if shutdown arrived first.
    async fn sleep_or_cancel(&self, dur: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(dur) => false,
            _ = self.cancel.cancelled() => true,
        }
    }
}

enum SessionExit {
    Shutdown,
    Failed(String),
}

/// Backoff delay for the k-th consecutive reconnect attempt (1-based),
/// before jitter: `min(base · multiplier^(k-1), cap)`.
pub fn delay_for_attempt(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(10);
    let secs = BASE_RETRY_DELAY_SECS.saturating_mul((RETRY_MULTIPLIER as u64).pow(exp));
    Duration::from_secs(secs.min(MAX_RETRY_DELAY_SECS))
}

fn jittered(base: Duration) -> Duration {
    use rand::Rng;
    let jitter = rand::rng().random_range(0.0..RETRY_JITTER_MAX_SECS);
    base + Duration::from_secs_f64(jitter)
}

fn is_dns_failure(cause: &str) -> bool {
    let lower = cause.to_lowercase();
    lower.contains("dns") || lower.contains("lookup") || lower.contains("name resolution")
}

/// Periodic liveness probe. Logs when the timer itself stalled (the process
/// was starved) and invokes `on_tick` for housekeeping owned by other
/// components (cooldown pruning). Reconnection is left to the gateway's own
/// disconnect signal.
pub async fn liveness_loop(
    state: Arc<SessionState>,
    cancel: CancellationToken,
    on_tick: Box<dyn Fn() + Send + Sync>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(LIVENESS_INTERVAL_SECS));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick completes immediately.
    interval.tick().await;
    let mut last_fire = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let since_last = last_fire.elapsed();
                last_fire = Instant::now();

                if since_last > Duration::from_secs(LIVENESS_STALL_SECS) {
                    warn!(
                        gap_secs = since_last.as_secs(),
                        "liveness timer stalled — waiting for the gateway's own disconnect signal"
                    );
                }

                if state.phase() == SessionPhase::Ready
                    && state.last_event_age() > Duration::from_secs(LIVENESS_STALL_SECS)
                {
                    warn!(
                        quiet_secs = state.last_event_age().as_secs(),
                        "gateway has been quiet"
                    );
                }

                on_tick();
            }
            _ = cancel.cancelled() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_schedule_matches_policy() {
        assert_eq!(delay_for_attempt(1), Duration::from_secs(5));
        assert_eq!(delay_for_attempt(2), Duration::from_secs(15));
        assert_eq!(delay_for_attempt(3), Duration::from_secs(45));
        // Capped well before overflow territory.
        assert_eq!(delay_for_attempt(4), Duration::from_secs(135));
        assert_eq!(delay_for_attempt(5), Duration::from_secs(405));
        assert_eq!(delay_for_attempt(6), Duration::from_secs(600));
        assert_eq!(delay_for_attempt(20), Duration::from_secs(600));
    }

    #[test]
    fn backoff_is_monotonic_up_to_cap() {
        for k in 1..10 {
            assert!(delay_for_attempt(k + 1) >= delay_for_attempt(k));
        }
    }

    #[test]
    fn jitter_stays_in_window() {
        for _ in 0..100 {
            let d = jittered(Duration::from_secs(5));
            assert!(d >= Duration::from_secs(5));
            assert!(d < Duration::from_secs(5) + Duration::from_secs_f64(RETRY_JITTER_MAX_SECS));
        }
    }

    #[test]
    fn dns_failures_are_recognised() {
        assert!(is_dns_failure("error trying to connect: dns error"));
        assert!(is_dns_failure("failed to lookup address information"));
        assert!(!is_dns_failure("connection reset by peer"));
    }
}
