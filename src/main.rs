use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use garment_factory_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Outbound messaging push (optional)
    let messaging = api::webhooks::MessagingClient::from_config(&cfg)?;
    if messaging.is_some() {
        info!("Messaging push enabled");
    } else {
        info!("Messaging push not configured; notifications are stored only");
    }
    if cfg.messaging_channel_secret.is_none() {
        warn!("No messaging channel secret configured; inbound webhook signatures are not checked");
    }

    // Init events
    let (event_sender, event_rx) = api::events::channel(cfg.event_channel_capacity);

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        Some(event_sender),
        messaging,
        &cfg,
    );

    // Spawn event processor; it stops once every sender is dropped
    let handler: Arc<dyn api::events::EventHandler> = services.notifications.clone();
    tokio::spawn(api::events::process_events(event_rx, handler));

    let cors = api::cors_layer(&cfg).map_err(|e| {
        error!("{}", e);
        e
    })?;

    let app_state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        services,
    };
    let app = api::build_router(app_state, cors);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!("garment-factory-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
