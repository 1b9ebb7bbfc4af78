mod events;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;
use sqlx::postgres::PgPoolOptions;

use biolink_core::{BotConfig, ModerationConfig, StorageKind, SystemClock};
use biolink_database::{CacheService, Database, MIGRATOR};
use biolink_moderation::ModerationController;
use biolink_telegram::{InboundEvent, TelegramGateway, UpdatePoller};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        let target = metadata.target();

        let within_info_level = *metadata.level() <= tracing::Level::INFO;
        if !within_info_level {
            return false;
        }

        !(target.starts_with("hyper") || target.starts_with("reqwest"))
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    // Load the .env file
    dotenvy::dotenv().ok();

    let config = BotConfig::from_env()?;
    let moderation = ModerationConfig::from_env()?;
    info!(
        warning_threshold = moderation.warning_threshold,
        warning_expiry_secs = moderation.warning_expiry.as_secs(),
        gateway_timeout_ms = moderation.gateway_timeout.as_millis() as u64,
        "moderation policy configured."
    );

    let db = connect_database(&config).await?;

    let gateway = TelegramGateway::from_config(&config)?;
    match gateway.get_me().await {
        Ok(me) => info!(bot_id = me.id, username = ?me.username, "Telegram identity confirmed."),
        Err(source) => warn!(?source, "getMe failed; continuing and relying on polling."),
    }

    let controller = Arc::new(ModerationController::new(
        db,
        Arc::new(gateway.clone()),
        Arc::new(SystemClock),
        moderation,
    ));

    let mut poller = UpdatePoller::new(gateway, config.poll_timeout);
    info!("Bio-link guard is polling for updates...");

    loop {
        let batch = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested; stopping update loop.");
                break;
            }
            batch = poller.next_batch() => batch,
        };

        let updates = match batch {
            Ok(updates) => updates,
            Err(source) => {
                warn!(?source, offset = poller.offset(), "getUpdates failed; retrying shortly.");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for update in &updates {
            let Some(event) = InboundEvent::from_update(update) else {
                continue;
            };

            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                events::handle_event(&controller, event).await;
            });
        }
    }

    Ok(())
}

async fn connect_database(config: &BotConfig) -> anyhow::Result<Database> {
    let database_url = match (config.storage, config.database_url.as_deref()) {
        (StorageKind::Memory, _) => {
            warn!("STORAGE_BACKEND=memory: warnings and policies are lost on restart.");
            return Ok(Database::in_memory());
        }
        (StorageKind::Postgres, Some(url)) => url,
        (StorageKind::Postgres, None) => anyhow::bail!("DATABASE_URL is required"),
    };

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    info!("PostgreSQL connection established.");

    if config.auto_run_migrations {
        MIGRATOR.run(&db_pool).await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    let cache = connect_cache(config).await;
    Ok(Database::with_cache(db_pool, cache))
}

async fn connect_cache(config: &BotConfig) -> CacheService {
    let prefix = config.redis_key_prefix.clone();

    if !config.redis_enabled {
        info!("Redis cache disabled (set REDIS_ENABLED=true to enable).");
        return CacheService::disabled(prefix);
    }

    let Some(redis_url) = config.redis_url.as_deref() else {
        warn!(
            key_prefix = %prefix,
            "REDIS_ENABLED=true but REDIS_URL is missing; continuing with DB-only mode."
        );
        return CacheService::disabled(prefix);
    };

    let cache = match CacheService::redis(redis_url, prefix.clone()) {
        Ok(cache) => {
            info!(key_prefix = %prefix, "Redis cache enabled.");
            cache
        }
        Err(err) => {
            warn!(
                ?err,
                key_prefix = %prefix,
                "Failed to initialize Redis cache; continuing with DB-only mode."
            );
            CacheService::disabled(prefix)
        }
    };

    if cache.is_redis_enabled() {
        match cache.ping().await {
            Ok(()) => info!("Redis cache health check passed."),
            Err(err) => error!(
                ?err,
                "Redis cache ping failed; cache operations will continue with fallback behavior."
            ),
        }
    }

    cache
}
