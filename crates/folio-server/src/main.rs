mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use folio_api::{AppStateInner, DbSessionStore, MemorySessionStore, SessionStore, build_router};
use folio_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "folio=debug,folio_api=debug,folio_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    // A database file gets persistent sessions; otherwise everything lives in memory.
    let (db, sessions): (Arc<Database>, Arc<dyn SessionStore>) = match &config.db_path {
        Some(path) => {
            let db = Arc::new(Database::open(path)?);
            let pruned = db.prune_expired_sessions(chrono::Utc::now())?;
            if pruned > 0 {
                info!("Pruned {} expired sessions", pruned);
            }
            (db.clone(), Arc::new(DbSessionStore::new(db)))
        }
        None => {
            (
                Arc::new(Database::open_in_memory()?),
                Arc::new(MemorySessionStore::new()),
            )
        }
    };

    let state = AppStateInner::new(db, sessions, config.api.clone());

    let mut app = build_router(state);
    if let Some(dir) = &config.static_dir {
        info!("Serving static files from {}", dir.display());
        let spa = ServeDir::new(dir).not_found_service(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(spa);
    }
    let app = app.layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        "Folio server listening on {} ({})",
        addr,
        if config.production { "production" } else { "development" }
    );
    info!(
        "Visitor replies: {} per conversation, {}s cooldown",
        config.api.reply_policy.max_visitor_replies,
        config.api.reply_policy.cooldown.num_seconds()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            },
            Err(e) => {
                tracing::warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
