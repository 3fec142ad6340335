use std::{process, sync::Arc, time::Duration};

use tally::{
    application::{
        error::AppError,
        reactions::{ReactionOptions, ReactionService},
        repos::{AggregatesRepo, HealthCheck, ParticipantsRepo},
    },
    cache::{CacheConfig, build_snapshot_cache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};
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
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, settings.database.run_migrations).await?;
    let state = build_api_state(repositories, &settings);
    serve_http(&settings, state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings, true).await?;
    info!(target = "tally::migrate", "Migrations applied");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
    migrate: bool,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    if migrate {
        PostgresRepositories::run_migrations(&pool)
            .await
            .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;
    }

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_api_state(repositories: Arc<PostgresRepositories>, settings: &config::Settings) -> ApiState {
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = build_snapshot_cache(&cache_config);

    let participants: Arc<dyn ParticipantsRepo> = repositories.clone();
    let aggregates: Arc<dyn AggregatesRepo> = repositories.clone();
    let health: Arc<dyn HealthCheck> = repositories;

    let options = ReactionOptions {
        cache_ttl: cache_config.ttl(),
        serialize_toggles: settings.reactions.serialize_toggles,
        operation_timeout: settings.reactions.operation_timeout,
        max_batch_targets: settings.reactions.max_batch_targets.get() as usize,
    };

    info!(
        target = "tally::serve",
        cache_enabled = cache_config.enabled,
        cache_capacity = cache_config.capacity,
        serialize_toggles = options.serialize_toggles,
        operation_timeout_ms = options
            .operation_timeout
            .map(|timeout| timeout.as_millis() as u64)
            .unwrap_or(0),
        "Reaction engine configured"
    );

    ApiState {
        reactions: Arc::new(ReactionService::new(
            participants,
            aggregates,
            cache.clone(),
            options,
        )),
        health,
        cache,
        request_timeout: settings.reactions.operation_timeout,
    }
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let addr = settings.server.addr;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::from(InfraError::bind(addr, err)))?;

    info!(target = "tally::serve", addr = %addr, "Listening");

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

/// Resolves on ctrl-c, then arms a hard deadline for in-flight requests.
async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target = "tally::serve", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    info!(
        target = "tally::serve",
        grace_seconds = grace.as_secs(),
        "Shutdown requested; draining connections"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target = "tally::serve", "Graceful shutdown timed out");
        process::exit(1);
    });
}
