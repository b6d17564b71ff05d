use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lexio_core::builder::build_index;
use lexio_core::config::Config;
use lexio_core::error::{BuildError, SearchError};
use lexio_core::language::{self, Language};
use lexio_core::pipeline;
use lexio_core::search::Searcher;
use lexio_core::SearchHit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Swapped wholesale under the write lock after a successful build;
    /// queries only ever see a fully published index.
    pub searcher: Arc<RwLock<Option<Arc<Searcher>>>>,
}

pub fn build_app(config: Config) -> Router {
    let searcher = Searcher::open(config.index_dir()).ok();
    if searcher.is_some() {
        tracing::info!(index_dir = %config.index_dir().display(), "loaded existing index");
    }
    let state = AppState {
        config: Arc::new(config),
        searcher: Arc::new(RwLock::new(searcher.map(Arc::new))),
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(tower_http::cors::AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/index", post(index_handler))
        .route("/search", get(search_handler))
        .route("/lexical_analysis", post(lexical_analysis_handler))
        .route("/tokenize", post(tokenize_handler))
        .route("/remove_stopwords", post(remove_stopwords_handler))
        .route("/stem", post(stem_handler))
        .route("/detect_language", post(detect_language_handler))
        .with_state(state)
        .layer(cors)
}

type ApiError = (StatusCode, String);

#[derive(Deserialize, Default)]
pub struct IndexRequest {
    pub corpus_path: Option<String>,
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub ok: bool,
    pub indexed_docs: u64,
    pub rejected_docs: u64,
    pub vocab_size: u64,
    pub index_path: String,
}

async fn index_handler(
    State(state): State<AppState>,
    Json(req): Json<IndexRequest>,
) -> Result<Json<IndexResponse>, ApiError> {
    let corpus = req
        .corpus_path
        .map(PathBuf::from)
        .unwrap_or_else(|| state.config.default_corpus_path());
    let index_root = state.config.index_dir();
    let config = state.config.clone();

    let summary = tokio::task::spawn_blocking(move || build_index(&corpus, &index_root, &config))
        .await
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
        .map_err(build_error_response)?;

    let reloaded = Searcher::open(state.config.index_dir())
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    *state.searcher.write().await = Some(Arc::new(reloaded));

    Ok(Json(IndexResponse {
        ok: true,
        indexed_docs: summary.indexed_docs,
        rejected_docs: summary.rejected_docs,
        vocab_size: summary.vocab_size,
        index_path: summary.index_path,
    }))
}

fn build_error_response(err: BuildError) -> ApiError {
    let status = match err {
        BuildError::CorpusMissing(_) => StatusCode::NOT_FOUND,
        BuildError::EmptyCorpus => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Fallback when the query's language detects as unknown.
    pub default_language: Option<Language>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let searcher = state.searcher.read().await.clone();
    let Some(searcher) = searcher else {
        return Err((
            StatusCode::BAD_REQUEST,
            "index not built; run POST /index first".to_string(),
        ));
    };
    let results = searcher
        .search(&params.q, params.default_language, &state.config)
        .map_err(|err| match err {
            SearchError::EmptyQuery => (StatusCode::BAD_REQUEST, err.to_string()),
            SearchError::IndexMissing => (StatusCode::BAD_REQUEST, err.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        })?;
    Ok(Json(SearchResponse {
        query: params.q,
        results,
    }))
}

// --- Preprocessing debug surface ---

#[derive(Deserialize)]
pub struct TextRequest {
    pub document: String,
}

#[derive(Serialize)]
pub struct NormalizedResponse {
    pub normalized: String,
}

#[derive(Deserialize)]
pub struct TokensRequest {
    pub tokens: Vec<String>,
    pub language: Option<Language>,
}

#[derive(Serialize)]
pub struct TokensResponse {
    pub tokens: Vec<String>,
}

#[derive(Serialize)]
pub struct DetectResponse {
    pub language: String,
    pub confidence: f64,
}

async fn lexical_analysis_handler(Json(req): Json<TextRequest>) -> Json<NormalizedResponse> {
    Json(NormalizedResponse {
        normalized: pipeline::normalize(&req.document),
    })
}

async fn tokenize_handler(Json(req): Json<TextRequest>) -> Json<TokensResponse> {
    Json(TokensResponse {
        tokens: pipeline::tokenize(&pipeline::normalize(&req.document)),
    })
}

async fn remove_stopwords_handler(
    State(state): State<AppState>,
    Json(req): Json<TokensRequest>,
) -> Json<TokensResponse> {
    let language = req.language.unwrap_or(state.config.default_language);
    Json(TokensResponse {
        tokens: pipeline::remove_stopwords(req.tokens, language),
    })
}

async fn stem_handler(
    State(state): State<AppState>,
    Json(req): Json<TokensRequest>,
) -> Json<TokensResponse> {
    let language = req.language.unwrap_or(state.config.default_language);
    Json(TokensResponse {
        tokens: pipeline::stem(req.tokens, language),
    })
}

async fn detect_language_handler(Json(req): Json<TextRequest>) -> Json<DetectResponse> {
    let (detected, confidence) = language::detect(&req.document);
    Json(DetectResponse {
        language: detected
            .map(|l| l.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        confidence,
    })
}
