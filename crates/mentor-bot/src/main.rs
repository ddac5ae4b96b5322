use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mentor_commands::{Dispatcher, Registry, Router};
use mentor_core::config::MentorConfig;
use mentor_core::events::{EventKind, GatewayEvent};
use mentor_discord::{supervisor, Rest, Supervisor};
use mentor_invites::InviteLedger;
use mentor_progress::ProgressEngine;
use mentor_study::ai::AiAdapter;
use mentor_study::services::StudyServices;
use mentor_study::{OpenAiChat, QuestionProvider};

mod app;
mod auth;
mod extensions;
mod music;
mod notify;
mod services;
mod subscribers;

use services::{NullAi, ProgressCommandHook, Services};

/// Grace period for in-flight commands at shutdown.
const DRAIN_DEADLINE_SECS: u64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::args().nth(1);
    let config =
        MentorConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    // SQLite: one file, one connection per subsystem, WAL for concurrency.
    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let progress_conn = open_db(&db_path)?;
    let study_conn = open_db(&db_path)?;

    let rest = Rest::new(Arc::new(serenity::http::Http::new(&config.bot.token)));

    let ai: Arc<dyn AiAdapter> = match config.ai.api_key.clone() {
        Some(key) => {
            info!(model = %config.ai.model, "AI provider configured");
            Arc::new(OpenAiChat::new(
                key,
                config.ai.base_url.clone(),
                config.ai.model.clone(),
            ))
        }
        None => {
            warn!("no AI key configured — generation commands will report an error");
            Arc::new(NullAi)
        }
    };

    let backup_path = Path::new(&db_path)
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("achievements.json");
    let progress = Arc::new(ProgressEngine::new(
        progress_conn,
        Arc::new(notify::DiscordNotifier::new(rest.clone())),
        backup_path,
    )?);
    let study = Arc::new(StudyServices::new(study_conn)?);
    let questions = Arc::new(QuestionProvider::new(Arc::clone(&ai)));

    let services = Arc::new(Services {
        config: config.clone(),
        rest: rest.clone(),
        progress: Arc::clone(&progress),
        invites: Arc::new(tokio::sync::Mutex::new(InviteLedger::new())),
        questions,
        study,
        ai,
        music: Arc::new(music::MusicState::new()),
    });

    // Extension loading: every subsystem contributes its command descriptors,
    // then the registry is frozen for the lifetime of the process.
    let registry = Arc::new(Registry::new());
    extensions::register_all(&registry, &services).context("command registration failed")?;
    registry.freeze();
    info!(commands = registry.verbs().len(), "command registry frozen");

    let shutdown = CancellationToken::new();
    let dispatcher = Arc::new(Dispatcher::new(
        config.bot.prefix.clone(),
        Arc::clone(&registry),
        rest.clone(),
        Some(Arc::new(ProgressCommandHook {
            progress: Arc::clone(&progress),
        })),
        shutdown.clone(),
    ));

    let mut router = Router::new();
    router.subscribe(
        EventKind::Message,
        Arc::new(subscribers::ProgressMessages {
            services: Arc::clone(&services),
        }),
    );
    router.subscribe(
        EventKind::Ready,
        Arc::new(subscribers::InviteCachePrimer {
            services: Arc::clone(&services),
        }),
    );
    router.subscribe(
        EventKind::InviteCreate,
        Arc::new(subscribers::InviteCreated {
            services: Arc::clone(&services),
        }),
    );
    router.subscribe(
        EventKind::MemberJoin,
        Arc::new(subscribers::MemberJoined {
            services: Arc::clone(&services),
        }),
    );
    router.subscribe(
        EventKind::MemberLeave,
        Arc::new(subscribers::MemberLeft {
            services: Arc::clone(&services),
        }),
    );
    router.subscribe(
        EventKind::GuildJoin,
        Arc::new(subscribers::GuildRoleSetup {
            services: Arc::clone(&services),
        }),
    );

    // Health + OAuth server. A port we cannot bind is fatal — external
    // liveness probes depend on it.
    let app_state = Arc::new(app::AppState::new(config.clone()));
    let http_router = app::build_router(app_state);
    let addr: SocketAddr = format!("{}:{}", config.health.bind, config.health.port)
        .parse()
        .context("bad health bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind health endpoint on {addr}"))?;
    info!(%addr, "health endpoint listening");
    let http_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, http_router)
            .with_graceful_shutdown(http_shutdown.cancelled_owned())
            .await
        {
            warn!(error = %e, "health server stopped");
        }
    });

    // Primary event loop: commands dispatch on their own tasks, everything
    // else fans out through the router.
    let (event_tx, mut event_rx) = mpsc::channel::<GatewayEvent>(256);
    let loop_dispatcher = Arc::clone(&dispatcher);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                GatewayEvent::MessageCreate(msg) => {
                    router.dispatch(GatewayEvent::MessageCreate(msg.clone()));
                    let dispatcher = Arc::clone(&loop_dispatcher);
                    tokio::spawn(async move {
                        dispatcher.dispatch(msg).await;
                    });
                }
                other => router.dispatch(other),
            }
        }
    });

    // Gateway session, supervised.
    let gateway = Supervisor::new(
        config.bot.token.clone(),
        config.bot.activity.clone(),
        event_tx,
        shutdown.clone(),
    );
    let session_state = gateway.state();
    tokio::spawn(gateway.run());

    let liveness_dispatcher = Arc::clone(&dispatcher);
    tokio::spawn(supervisor::liveness_loop(
        session_state,
        shutdown.clone(),
        Box::new(move || liveness_dispatcher.prune_cooldowns()),
    ));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");

    shutdown.cancel();
    dispatcher.drain(Duration::from_secs(DRAIN_DEADLINE_SECS)).await;
    info!("shutdown complete");
    Ok(())
}

fn open_db(path: &str) -> anyhow::Result<rusqlite::Connection> {
    let conn = rusqlite::Connection::open(path)
        .with_context(|| format!("failed to open database at {path}"))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
