use std::{process, sync::Arc, time::Duration};

use narnia::{
    application::{
        capes::CapeService, content::ContentService, descriptor::DescriptorService,
        error::AppError, hashing::HashBackfiller, invalidation::CacheAdminService,
        repos::HealthRepo,
    },
    cache::{CacheAside, CacheConfig, CacheStore, MemoryCacheStore},
    config,
    infra::{
        blob::{BlobFetcher, S3BlobStore},
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        redis::RedisCacheStore,
        telemetry,
    },
};
use tokio::{signal, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

struct ApplicationContext {
    http_state: HttpState,
    admin_state: AdminState,
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings.database).await?;
    let cache_store = init_cache_store(&settings.cache)?;
    let blob_store = S3BlobStore::new(&settings.storage)
        .await
        .map_err(|err| InfraError::blob(err.to_string()))?;

    let app = build_application_context(repositories, cache_store, Arc::new(blob_store), &settings);
    serve_http(&settings, app).await
}

async fn init_repositories(
    database: &config::DatabaseSettings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let url = database.url.as_deref().ok_or_else(|| {
        InfraError::configuration("database.url must be provided via config, env, or CLI")
    })?;

    let pool = PostgresRepositories::connect(
        url,
        database.max_connections.get(),
        database.acquire_timeout,
    )
    .await
    .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn init_cache_store(cache: &config::CacheSettings) -> Result<Arc<dyn CacheStore>, AppError> {
    match cache.redis_url.as_deref() {
        Some(url) => {
            let store = RedisCacheStore::connect(url, cache.redis_pool_size.get() as usize)
                .map_err(|err| InfraError::cache(err.to_string()))?;
            info!(backend = "redis", "cache backend ready");
            Ok(Arc::new(store))
        }
        None => {
            let capacity = cache.memory_capacity.get() as usize;
            info!(backend = "memory", capacity, "cache backend ready");
            Ok(Arc::new(MemoryCacheStore::new(capacity)))
        }
    }
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    cache_store: Arc<dyn CacheStore>,
    blob_store: Arc<S3BlobStore>,
    settings: &config::Settings,
) -> ApplicationContext {
    let timeout = settings.upstream.timeout;
    let cache = CacheAside::new(cache_store, CacheConfig::from(&settings.cache), timeout);
    let blobs = BlobFetcher::new(blob_store, timeout);

    let capes = Arc::new(CapeService::new(
        repositories.clone(),
        repositories.clone(),
        cache.clone(),
        timeout,
    ));
    let content = Arc::new(ContentService::new(
        repositories.clone(),
        blobs,
        cache.clone(),
        timeout,
    ));
    let hashes = Arc::new(HashBackfiller::new(
        repositories.clone(),
        content.clone(),
        cache.clone(),
        timeout,
    ));
    let descriptors = Arc::new(DescriptorService::new(
        capes.clone(),
        content.clone(),
        hashes,
        settings.public.base_url.clone(),
    ));
    let cache_admin = Arc::new(CacheAdminService::new(
        repositories.clone(),
        repositories.clone(),
        cache,
        timeout,
    ));

    let health: Arc<dyn HealthRepo> = repositories;

    ApplicationContext {
        http_state: HttpState {
            capes,
            content,
            descriptors,
            health: health.clone(),
        },
        admin_state: AdminState {
            cache_admin,
            health,
        },
    }
}

async fn serve_http(settings: &config::Settings, app: ApplicationContext) -> Result<(), AppError> {
    let public_router = http::build_router(app.http_state);
    let admin_router = http::build_admin_router(app.admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        "listeners bound"
    );

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        result = async { try_join!(public_server, admin_server) } => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline(settings.server.graceful_shutdown) => {
            warn!("graceful shutdown timed out; dropping open connections");
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl-C) or, on unix, SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!(signal = "SIGINT", "shutdown signal received"),
        _ = terminate => info!(signal = "SIGTERM", "shutdown signal received"),
    }
}

/// Resolves once a shutdown was requested and the drain window has elapsed.
async fn drain_deadline(grace: Duration) {
    shutdown_signal().await;
    info!(grace_secs = grace.as_secs(), "shutdown requested");
    tokio::time::sleep(grace).await;
}
