use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use token_rotation::config::{Config, NotifierBackend, StoreBackend};
use token_rotation::http::{router, AppState};
use token_rotation::notify::{LogNotifier, Notifier, WebhookNotifier};
use token_rotation::shutdown::{drain_with_timeout, shutdown_channel};
use token_rotation::storage::{CredentialStore, MemoryCredentialStore, RedisCredentialStore};
use token_rotation::telemetry::{init_tracing, TracingConfig};
use token_rotation::RotationEngine;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    init_tracing(&TracingConfig::from(&config));

    info!("Starting token rotation service");

    let store: Arc<dyn CredentialStore> = match &config.store {
        StoreBackend::Memory => {
            warn!("Using in-memory credential store; state is lost on restart");
            Arc::new(MemoryCredentialStore::new())
        }
        StoreBackend::Redis { url } => Arc::new(
            RedisCredentialStore::new(url)
                .await
                .context("failed to connect to Redis")?,
        ),
    };

    for user in &config.seed_users {
        store
            .provision_user(user.id, &user.guid)
            .await
            .with_context(|| format!("failed to provision user {}", user.id))?;
    }
    if !config.seed_users.is_empty() {
        info!(count = config.seed_users.len(), "Provisioned seed users");
    }

    let notifier: Arc<dyn Notifier> = match &config.notifier {
        NotifierBackend::Log => Arc::new(LogNotifier),
        NotifierBackend::Webhook { url, timeout } => Arc::new(
            WebhookNotifier::new(url.clone(), *timeout).context("failed to build webhook client")?,
        ),
    };

    let engine = Arc::new(RotationEngine::from_config(&config, store, notifier)?);
    let app = router(AppState::new(engine, &config));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid HOST/PORT")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "Token rotation service listening");

    let (trigger, signalled) = shutdown_channel();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(trigger);

    drain_with_timeout(
        std::future::IntoFuture::into_future(server),
        signalled,
        config.shutdown_timeout,
    )
    .await?;

    info!("Shutdown complete");
    Ok(())
}
