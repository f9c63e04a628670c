//! HTTP glue: router, handlers, and the serving loop.
//!
//! The handlers contain no caching logic of their own; every lookup goes
//! through the [`QueryService`], and the watcher task keeps the cache
//! honest underneath it.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::cache::ContentCache;
use crate::config::Settings;
use crate::service::QueryService;
use crate::store::FileStore;
use crate::watcher::DataWatcher;

/// Build the API router around a query service.
pub fn app(service: Arc<QueryService>) -> Router {
    // GET-only API, any origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/api/grades", get(get_grades))
        .route("/api/version/grade/{id}", get(get_grade_version))
        .route("/api/questions/grade/{id}", get(get_grade_questions))
        .route("/api/questions", get(get_questions))
        .route("/api/version", get(get_bank_version))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(service)
}

/// Run the server until ctrl-c.
///
/// Watcher setup failure aborts startup: serving without invalidation
/// would pin stale data for the life of the process.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    crate::logging::init_with_config(&settings.logging);

    let store = Arc::new(FileStore::new(&settings.data_dir));
    let cache = Arc::new(ContentCache::new());

    // Prime whichever layout is present so the first request is warm.
    // Neither file is required at startup; a missing one just means the
    // other layout is in use.
    match store.read_manifest().await {
        Ok(config) => {
            crate::log_event!("http", "manifest loaded", "{} grades", config.grades.len());
            cache.put_manifest(Arc::new(config));
        }
        Err(e) => crate::debug_event!("http", "no manifest at startup", "{e}"),
    }

    let ct = CancellationToken::new();
    let watcher = DataWatcher::new(
        store.clone(),
        cache.clone(),
        settings.file_watch.debounce_ms,
        ct.clone(),
    )?;
    tokio::spawn(async move {
        if let Err(e) = watcher.watch().await {
            tracing::error!("[watcher] terminated: {e}");
        }
    });
    crate::log_event!(
        "watcher",
        "watching",
        "{} (debounce {}ms)",
        settings.data_dir.display(),
        settings.file_watch.debounce_ms
    );

    let service = Arc::new(QueryService::new(store, cache));
    let router = app(service);

    let listener = tokio::net::TcpListener::bind(&settings.server.bind).await?;
    crate::log_event!("http", "listening", "http://{}", listener.local_addr()?);

    let server = axum::serve(listener, router);

    tokio::select! {
        result = server => {
            result?;
        }
        _ = shutdown_signal() => {
            crate::log_event!("http", "shutting down");
            ct.cancel();
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");
}

async fn health_check() -> &'static str {
    "OK"
}

/// `GET /api/grades`: the manifest, or JSON `null` if none has ever
/// loaded. Never an error status; clients fall back to their own cache.
async fn get_grades(State(service): State<Arc<QueryService>>) -> Response {
    match service.manifest().await {
        Ok(config) => Json((*config).clone()).into_response(),
        Err(_) => Json(serde_json::Value::Null).into_response(),
    }
}

/// `GET /api/version/grade/{id}`: the grade's current version token.
async fn get_grade_version(
    State(service): State<Arc<QueryService>>,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_grade_id(&id) else {
        return invalid_grade_id();
    };

    match service.grade_version(id).await {
        Ok(version) => Json(json!({ "gradeId": id, "version": version })).into_response(),
        Err(_) => grade_not_found(),
    }
}

/// `GET /api/questions/grade/{id}`: the full grade document.
async fn get_grade_questions(
    State(service): State<Arc<QueryService>>,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_grade_id(&id) else {
        return invalid_grade_id();
    };

    match service.grade(id).await {
        Ok(entry) => Json((*entry.data).clone()).into_response(),
        Err(_) => grade_not_found(),
    }
}

/// `GET /api/questions`: the flat bank with its tag index.
async fn get_questions(State(service): State<Arc<QueryService>>) -> Response {
    match service.bank_view().await {
        Ok(view) => Json(view).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "question bank unavailable"),
    }
}

/// `GET /api/version`: the flat bank's version token.
async fn get_bank_version(State(service): State<Arc<QueryService>>) -> Response {
    match service.bank_version().await {
        Ok(version) => Json(json!({ "version": version })).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "question bank unavailable"),
    }
}

fn parse_grade_id(raw: &str) -> Option<u32> {
    raw.parse().ok()
}

fn invalid_grade_id() -> Response {
    error_response(StatusCode::BAD_REQUEST, "invalid grade id")
}

fn grade_not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "grade not found")
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
