//! # Tutor Booking Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database, and runs
//! the Telegram bot alongside the HTTP API serving the booking mini-app.

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutor_booking_bot::bot::handlers::{BotContext, BotHandler};
use tutor_booking_bot::config::Config;
use tutor_booking_bot::database::connection::{ensure_parent_dir, DatabaseManager};
use tutor_booking_bot::services::api::{ApiService, ApiState};
use tutor_booking_bot::services::health::HealthService;
use tutor_booking_bot::services::ledger::SlotLedger;
use tutor_booking_bot::services::notifier::Notifier;
use tutor_booking_bot::utils::datetime::{Clock, LocalClock};
use tutor_booking_bot::utils::logging::log_system_event;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutor_booking_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Tutor Booking Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, admin notifications: {}",
        config.database_url,
        config.http_port,
        config.admin_chat_id.is_some()
    );

    // Initialize database
    info!("Initializing database connection...");
    ensure_parent_dir(&config.database_url)?;
    let db_manager = DatabaseManager::with_timeout(&config.database_url, config.db_timeout).await?;
    db_manager.run_migrations().await?;
    let db_arc = Arc::new(db_manager);
    info!("Database initialized successfully");

    let bot = Bot::new(&config.telegram_bot_token);
    let ledger = SlotLedger::new(db_arc.as_ref().clone()).with_timeout(config.db_timeout);
    let notifier = Notifier::new(bot.clone(), config.admin_chat_id);
    let clock: Arc<dyn Clock> = Arc::new(LocalClock);

    let handler = BotHandler::new(BotContext {
        ledger: ledger.clone(),
        notifier: notifier.clone(),
        clock: clock.clone(),
        webapp_url: config.webapp_url.clone(),
    });

    let api = ApiService::new(ApiState {
        ledger,
        notifier,
        clock,
        hours: config.working_hours,
    });
    let health = HealthService::new(db_arc.clone());

    let app = api
        .router
        .merge(health.router)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    log_system_event(
        "http server starting",
        Some(&format!("port {}, static dir {}", config.http_port, config.static_dir)),
    );

    // Run both the bot and the HTTP server concurrently
    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let http_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    // Wait for either task to complete (which would indicate shutdown)
    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = http_task => {
            if let Err(e) = result {
                tracing::error!("HTTP task error: {}", e);
            }
        }
    }

    log_system_event("application stopped", None);
    Ok(())
}
