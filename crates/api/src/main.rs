//! CPSU API
//!
//! HTTP entry point for the department site backend.
//! Handles:
//! - Request routing for news, courses, personnel, subjects and calendars
//! - Multipart decoding and request validation
//! - Observability (logging, metrics, request ids)

mod extract;
mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use cpsu_common::{
    config::AppConfig,
    db::{DbSupervisor, Repository},
    metrics,
    scopus::{CitationSource, ScopusClient},
    storage::{BlobStore, S3BlobStore},
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbSupervisor,
    pub storage: Arc<dyn BlobStore>,
    pub citations: Arc<dyn CitationSource>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Repository over the current pool; taken once per request
    pub async fn repo(&self) -> Repository {
        Repository::new(self.db.handle().await)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting CPSU API v{}",
        cpsu_common::VERSION
    );

    // Initialize metrics
    let prometheus = PrometheusBuilder::new()
        .set_buckets(metrics::LATENCY_BUCKETS)?
        .install_recorder()?;
    metrics::register_metrics();

    // Initialize database connection
    let db = DbSupervisor::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }
    let keepalive = config
        .database
        .keepalive_interval()
        .map(|interval| db.spawn_keepalive(interval));

    let storage: Arc<dyn BlobStore> = Arc::new(S3BlobStore::from_config(&config.storage).await);
    let citations: Arc<dyn CitationSource> = Arc::new(ScopusClient::new(&config.scopus)?);

    let state = AppState {
        config: config.clone(),
        db,
        storage,
        citations,
        metrics: Some(prometheus),
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = keepalive {
        task.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.observability.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    use handlers::{calendars, courses, documents, news, personnel, subjects};

    let server = &state.config.server;

    // CORS configuration; any origin when none are listed
    let origins: Vec<HeaderValue> = server
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    }
    .allow_methods(Any)
    .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout = TimeoutLayer::new(state.config.request_timeout());
    let sync_timeout = TimeoutLayer::new(state.config.scopus.sync_timeout());
    let body_limit = RequestBodyLimitLayer::new(server.max_upload_bytes);

    let api_routes = Router::new()
        // News
        .route("/news", get(news::list_news).post(news::create_news))
        .route(
            "/news/{id}",
            get(news::get_news).put(news::update_news).delete(news::delete_news),
        )
        // Courses
        .route("/courses", get(courses::list_courses).post(courses::create_course))
        .route(
            "/courses/{id}",
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        // Roadmaps and course structures
        .route(
            "/roadmaps",
            get(documents::list_roadmaps).post(documents::create_roadmap),
        )
        .route(
            "/roadmaps/{id}",
            get(documents::get_roadmap).delete(documents::delete_roadmap),
        )
        .route(
            "/course-structures",
            get(documents::list_course_structures).post(documents::create_course_structure),
        )
        .route(
            "/course-structures/{id}",
            get(documents::get_course_structure).delete(documents::delete_course_structure),
        )
        // Personnel and research
        .route(
            "/personnel",
            get(personnel::list_personnel).post(personnel::create_personnel),
        )
        .route(
            "/personnel/{id}",
            get(personnel::get_personnel)
                .put(personnel::update_personnel)
                .delete(personnel::delete_personnel),
        )
        .route("/research", get(personnel::list_research))
        // Subjects
        .route("/subjects", get(subjects::list_subjects).post(subjects::create_subject))
        .route("/subjects/batch", post(subjects::create_subjects))
        .route("/subjects/import", post(subjects::import_subjects))
        .route(
            "/subjects/{id}",
            get(subjects::get_subject)
                .put(subjects::update_subject)
                .delete(subjects::delete_subject),
        )
        // Calendar events
        .route(
            "/calendars",
            get(calendars::list_calendars).post(calendars::create_calendar),
        )
        .route(
            "/calendars/{id}",
            get(calendars::get_calendar)
                .put(calendars::update_calendar)
                .delete(calendars::delete_calendar),
        )
        .layer(timeout.clone());

    // Research sync makes one citation API call per personnel and gets its
    // own, longer timeout
    let sync_routes = Router::new()
        .route("/personnel/{id}/research/sync", post(personnel::sync_research))
        .route("/research/sync", post(personnel::sync_all_research))
        .layer(sync_timeout);

    let health_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        .layer(timeout);

    // Compose the app
    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_routes.merge(sync_routes))
        .layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
        .layer(DefaultBodyLimit::disable())
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
