use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use valet_core::{
    create_authenticator, load_config, validate_config, Authenticator, PaymentIntentService,
    PaymentProvider, SmsSender, SqliteTicketStore, StripeClient, TicketFeed, TicketRequestHandler,
    TicketStore, TwilioSender, WebhookAuth, WebhookReconciler,
};
use valet_server::{create_router, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("VALET_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Operator auth method: {:?}", config.ops.method);
    info!("Database path: {:?}", config.database.path);

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.ops).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Live feed first so the store can publish into it
    let feed = TicketFeed::new(config.live.channel_capacity);

    let ticket_store: Arc<dyn TicketStore> = Arc::new(
        SqliteTicketStore::new(&config.database.path)
            .context("Failed to create ticket store")?
            .with_feed(feed.clone()),
    );
    info!("Ticket store initialized");

    let provider: Arc<dyn PaymentProvider> =
        Arc::new(StripeClient::new(&config.stripe).context("Failed to create Stripe client")?);
    let intents = PaymentIntentService::new(Arc::clone(&ticket_store), provider, &config.stripe);

    let webhook_auth = WebhookAuth::from_config(&config.stripe);
    if matches!(webhook_auth, WebhookAuth::Unsigned) {
        warn!("Webhook signature verification is DISABLED; do not run this way in production");
    }
    let reconciler = WebhookReconciler::new(
        Arc::clone(&ticket_store),
        webhook_auth,
        &config.stripe.currency,
    );

    let requests = TicketRequestHandler::new(Arc::clone(&ticket_store));

    let sms: Option<Arc<dyn SmsSender>> = match &config.sms {
        Some(sms_config) => {
            info!("Initializing Twilio SMS sender");
            Some(Arc::new(
                TwilioSender::new(sms_config.clone()).context("Failed to create SMS sender")?,
            ))
        }
        None => {
            info!("SMS not configured");
            None
        }
    };

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        ticket_store,
        feed,
        intents,
        reconciler,
        requests,
        sms,
    ));

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
