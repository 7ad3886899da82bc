/*
 * Responsibility
 * - Config読み込み → 依存生成 (backend / HAL builder / event bus / controller) → Router 組み立て
 * - Middleware の適用 (CORS / request-id / timeout / trace)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result, anyhow};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use crate::{
    api,
    config::{BackendKind, Config},
    dispatch::ResourceController,
    middleware,
    repos::{MemoryBackend, PgBackend, ResourceBackend},
    services::{events::EventBus, hal::HalBuilder},
    state::AppState,
};

pub const API_PREFIX: &str = "/api/v1";

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,resource_dispatch=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing; stderr may be hidden.
        tracing::error!(?info, "panic");

        // Development: crash the whole process. Production: default behavior.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {} (resource: {}, backend: {:?})",
        config.app_env,
        config.addr,
        config.route.name(),
        config.backend,
    );

    let backend = build_backend(&config).await?;
    let state = build_state(&config, backend)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_backend(config: &Config) -> Result<Arc<dyn ResourceBackend>> {
    let identifier = config.route.identifier_name();
    match config.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryBackend::new(identifier))),
        BackendKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("connecting to postgres")?;
            let backend = PgBackend::new(pool, config.route.name(), identifier);
            backend
                .ensure_schema()
                .await
                .map_err(|e| anyhow!("preparing resources table: {e}"))?;
            Ok(Arc::new(backend))
        }
    }
}

/// Base URL that HAL links are built from: `PUBLIC_BASE_URL` + `/api/v1`.
pub fn links_base(config: &Config) -> Result<Url> {
    let mut base = config.public_base_url.clone();
    base.path_segments_mut()
        .map_err(|_| anyhow!("PUBLIC_BASE_URL cannot be a base URL"))?
        .pop_if_empty()
        .extend(API_PREFIX.split('/').filter(|s| !s.is_empty()));
    Ok(base)
}

/// Wire the controller. Wiring errors abort startup.
pub fn build_state(config: &Config, backend: Arc<dyn ResourceBackend>) -> Result<AppState> {
    let events = EventBus::builder()
        .on_every(|event| {
            tracing::debug!(event = %event, source = event.source, "resource event");
        })
        .build();

    let mut builder = ResourceController::builder()
        .backend(backend)
        .hypermedia(Arc::new(HalBuilder::new(links_base(config)?)))
        .events(events)
        .route(config.route.clone())
        .collection_methods(config.collection_methods.clone())
        .entity_methods(config.entity_methods.clone())
        .page_size(config.page_size.clone());
    if let Some(name) = &config.collection_name {
        builder = builder.collection_name(name.clone());
    }

    let controller = builder.build()?;
    Ok(AppState::new(Arc::new(controller)))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .nest(API_PREFIX, api::v1::routes(&config.route))
        .with_state(state);

    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}
