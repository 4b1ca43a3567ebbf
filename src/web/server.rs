use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::catalog::handle::{BackboneListener, IndexHandle, IndexReloader};
use crate::catalog::snapshot::SnapshotFile;
use crate::cli::ServeArgs;
use crate::core::classification::{Classification, HigherRank};
use crate::core::types::{Rank, UsageKey};
use crate::matching::authorship::AuthorComparator;
use crate::matching::engine::{MatchError, MatchingConfig, MatchingEngine, NameQuery};
use crate::similarity::Metric;
use crate::utils::validation::{non_empty, validate_name};

/// Request bodies are tiny; only the reload endpoint accepts POST
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Shared application state
pub struct AppState {
    pub handle: IndexHandle,
    pub config: MatchingConfig,
    pub authors: AuthorComparator,
    /// Rebuilds the index on a backbone change; reloading is disabled without one
    pub reloader: Option<Arc<dyn BackboneListener>>,
}

impl AppState {
    #[must_use]
    pub fn new(handle: IndexHandle) -> Self {
        Self {
            handle,
            config: MatchingConfig::default(),
            authors: AuthorComparator::default(),
            reloader: None,
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

/// Create a safe error response that prevents information disclosure
/// while logging detailed errors server-side for debugging
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    if let Some(internal_msg) = internal_error {
        tracing::error!("Internal error ({}): {}", error_type, internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None,
    }
}

fn error_response(status: StatusCode, error_type: &str, message: &str) -> Response {
    (
        status,
        Json(create_safe_error_response(error_type, message, None)),
    )
        .into_response()
}

fn index_unavailable() -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "index_unavailable",
        "The backbone index is not loaded",
    )
}

/// Run the web server
///
/// # Errors
///
/// Returns an error if the backbone cannot be loaded, the tokio runtime cannot be created or
/// the server fails to start.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let snapshot = SnapshotFile::new(&args.backbone.backbone)?;
    let handle = IndexHandle::from_index(snapshot.load_index()?);
    let state = AppState {
        config: args.backbone.load_config()?,
        authors: args.backbone.load_authors()?,
        reloader: Some(Arc::new(IndexReloader::new(handle.clone(), snapshot))),
        handle,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args, state).await })
}

/// Create the application router with all routes and middleware configured.
///
/// Rate limiting keys on the client address, so it needs a server started with connect info.
#[allow(clippy::missing_panics_doc)] // Panics only on invalid governor config (constants are valid)
pub fn create_router(state: AppState, rate_limit: bool) -> Router {
    let state = Arc::new(state);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/match", get(match_handler))
        .route("/api/usage/{key}", get(usage_handler))
        .route("/api/index", get(index_handler))
        .route("/api/similarity", get(similarity_handler))
        .route("/api/reload", post(reload_handler))
        .with_state(state);

    let app = if rate_limit {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(50)
            .finish()
            .expect("valid rate limit constants");
        app.layer(GovernorLayer {
            config: Arc::new(governor_conf),
        })
    } else {
        app
    };

    app.layer(
        ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            ))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(30),
            ))
            .layer(ConcurrencyLimitLayer::new(100))
            .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
    )
}

async fn run_server(args: ServeArgs, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state, true);

    let addr = format!("{}:{}", args.address, args.port);
    info!("Starting nub-matcher server at http://{addr}");
    println!("Starting nub-matcher server at http://{addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "index_loaded": state.handle.is_loaded(),
    }))
}

#[derive(Debug, Deserialize)]
struct MatchParams {
    name: String,
    authorship: Option<String>,
    rank: Option<String>,
    kingdom: Option<String>,
    phylum: Option<String>,
    class: Option<String>,
    order: Option<String>,
    family: Option<String>,
    genus: Option<String>,
    subgenus: Option<String>,
}

impl MatchParams {
    fn classification(&self) -> Classification {
        let mut classification = Classification::new();
        let values = [
            (HigherRank::Kingdom, &self.kingdom),
            (HigherRank::Phylum, &self.phylum),
            (HigherRank::Class, &self.class),
            (HigherRank::Order, &self.order),
            (HigherRank::Family, &self.family),
            (HigherRank::Genus, &self.genus),
            (HigherRank::Subgenus, &self.subgenus),
        ];
        for (rank, value) in values {
            classification.set(rank, non_empty(value.as_deref()));
        }
        classification
    }
}

async fn match_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MatchParams>,
) -> Response {
    let rank = match params.rank.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => match r.parse::<Rank>() {
            Ok(rank) => Some(rank),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, "invalid_rank", &e.to_string()),
        },
        None => None,
    };

    let Ok(index) = state.handle.current() else {
        return index_unavailable();
    };

    let query = NameQuery {
        scientific_name: params.name.clone(),
        authorship: non_empty(params.authorship.as_deref()),
        rank,
        classification: params.classification(),
    };

    // Fuzzy lookups can scan large buckets of the index
    let matched = tokio::task::spawn_blocking(move || {
        MatchingEngine::with_config(&index, state.config.clone())
            .with_authors(state.authors.clone())
            .match_name(&query)
    })
    .await;

    match matched {
        Ok(Ok(result)) => Json(result).into_response(),
        Ok(Err(MatchError::InvalidQuery(e))) => {
            error_response(StatusCode::BAD_REQUEST, "invalid_query", &e.to_string())
        }
        Ok(Err(MatchError::IndexUnavailable)) => index_unavailable(),
        Err(e) => {
            let body = create_safe_error_response(
                "match_failed",
                "Failed to match the name",
                Some(&e.to_string()),
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn usage_handler(State(state): State<Arc<AppState>>, Path(key): Path<u64>) -> Response {
    let Ok(index) = state.handle.current() else {
        return index_unavailable();
    };
    match index.lookup_by_key(UsageKey(key)) {
        Some(usage) => Json(usage).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            &format!("Usage {key} not found"),
        ),
    }
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let Ok(index) = state.handle.current() else {
        return index_unavailable();
    };
    Json(serde_json::json!({
        "usages": index.len(),
        "names": index.name_count(),
        "homonyms": index.homonym_count(),
        "strict_threshold": state.config.strict_threshold,
        "doubtful_threshold": state.config.doubtful_threshold,
        "fuzzy": state.config.fuzzy,
        "author_abbreviations": state.authors.author_map_len(),
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct SimilarityParams {
    a: String,
    b: String,
    #[serde(default)]
    metric: Metric,
}

async fn similarity_handler(Query(params): Query<SimilarityParams>) -> Response {
    if let Err(e) = validate_name(&params.a).and_then(|()| validate_name(&params.b)) {
        return error_response(StatusCode::BAD_REQUEST, "invalid_query", &e.to_string());
    }
    let metric = params.metric.build();
    Json(serde_json::json!({
        "a": params.a,
        "b": params.b,
        "metric": metric.name(),
        "similarity": metric.similarity(&params.a, &params.b),
    }))
    .into_response()
}

/// Backbone changed notification: rebuild the index and swap it in
async fn reload_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(reloader) = state.reloader.clone() else {
        return error_response(
            StatusCode::NOT_IMPLEMENTED,
            "reload_unavailable",
            "This server has no backbone source to reload from",
        );
    };

    match tokio::task::spawn_blocking(move || reloader.backbone_changed()).await {
        Ok(Ok(usages)) => Json(serde_json::json!({ "reloaded": true, "usages": usages })).into_response(),
        Ok(Err(e)) => {
            let body = create_safe_error_response(
                "reload_failed",
                "Failed to reload the backbone; the previous index is still served",
                Some(&e.to_string()),
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
        Err(e) => {
            let body = create_safe_error_response(
                "reload_failed",
                "Failed to reload the backbone",
                Some(&e.to_string()),
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}
