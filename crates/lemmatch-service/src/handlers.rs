use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use dashmap::DashMap;
use lemmatch_reference::{LoadError, ReferenceSet, parse_word_list};
use lemmatch_types::{Match, MatchResult, MatchStatistics, PosShare};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::task::{JoinError, spawn_blocking};
use tracing::info;

use crate::session::{
    BatchError, DEFAULT_BATCH_SIZE, InputSummary, MatchingSession, Progress, ReferenceSummary,
};

pub type SessionId = u64;

pub const DEFAULT_MAX_PAGE_SIZE: usize = 500;
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;
pub const DEFAULT_MAX_SESSIONS: usize = 1024;
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_PAGE_SIZE: usize = 50;
const TSV_CONTENT_TYPE: &str = "text/tab-separated-values; charset=utf-8";

/// A live session and when a request last touched it.
pub struct SessionSlot {
    pub session: MatchingSession,
    pub last_used: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<DashMap<SessionId, SessionSlot>>,
    pub next_id: Arc<AtomicU64>,
    pub batch_size: NonZeroUsize,
    pub max_page_size: usize,
    pub max_body_bytes: usize,
    pub max_sessions: usize,
    /// Sessions untouched for this long are dropped by [`AppState::evict_idle`].
    pub session_ttl: Duration,
    /// Preloaded reference handed to every new session.
    pub reference: Option<Arc<ReferenceSet>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            batch_size: DEFAULT_BATCH_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_ttl: DEFAULT_SESSION_TTL,
            reference: None,
        }
    }
}

impl AppState {
    fn open_session(
        &self,
        batch_size: NonZeroUsize,
    ) -> Result<(SessionId, Option<ReferenceSummary>), ApiError> {
        if self.sessions.len() >= self.max_sessions {
            self.evict_idle(Instant::now());
            if self.sessions.len() >= self.max_sessions {
                return Err(ApiError::SessionLimit(self.max_sessions));
            }
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = match &self.reference {
            Some(reference) => MatchingSession::with_reference(batch_size, Arc::clone(reference)),
            None => MatchingSession::new(batch_size),
        };
        let summary = session.reference_summary();
        self.sessions.insert(
            id,
            SessionSlot {
                session,
                last_used: Instant::now(),
            },
        );
        Ok((id, summary))
    }

    /// Drop sessions idle for at least `session_ttl` as of `now`; returns how
    /// many went.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, slot| now.saturating_duration_since(slot.last_used) < self.session_ttl);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            info!("evicted {evicted} idle sessions");
        }
        evicted
    }

    fn ensure_session(&self, id: SessionId) -> Result<(), ApiError> {
        if self.sessions.contains_key(&id) {
            Ok(())
        } else {
            Err(ApiError::SessionNotFound(id))
        }
    }

    /// Run `f` with exclusive access to one session. Keep `f` short: the
    /// map shard stays locked while it runs.
    fn with_session<T>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut MatchingSession) -> T,
    ) -> Result<T, ApiError> {
        let mut slot = self
            .sessions
            .get_mut(&id)
            .ok_or(ApiError::SessionNotFound(id))?;
        slot.last_used = Instant::now();
        Ok(f(&mut slot.session))
    }
}

#[derive(Deserialize)]
pub struct CreateSessionQuery {
    pub batch_size: Option<usize>,
}

#[derive(Deserialize)]
pub struct ResultsQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub word: Option<String>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub include_unmatched: Option<bool>,
}

#[derive(Serialize)]
struct SessionCreated {
    session: SessionId,
    batch_size: usize,
    reference: Option<ReferenceSummary>,
}

#[derive(Serialize)]
struct SessionOverview {
    session: SessionId,
    reference: Option<ReferenceSummary>,
    input: InputSummary,
    progress: Progress,
}

#[derive(Serialize)]
struct BatchReport {
    batch: usize,
    results: Vec<MatchResult>,
    statistics: MatchStatistics,
    progress: Progress,
    has_more: bool,
}

#[derive(Serialize)]
struct ResultsPage {
    page: usize,
    page_size: usize,
    total: usize,
    has_more: bool,
    items: Vec<MatchResult>,
}

#[derive(Serialize)]
struct StatsResponse {
    statistics: MatchStatistics,
    pos_distribution: Vec<PosShare>,
    progress: Progress,
}

#[derive(Serialize)]
struct LookupResponse {
    word: String,
    matches: Vec<Match>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/sessions", post(create_session))
        .route(
            "/v1/sessions/{id}",
            get(session_overview).delete(delete_session),
        )
        .route(
            "/v1/sessions/{id}/reference",
            put(load_reference).delete(reset_reference),
        )
        .route(
            "/v1/sessions/{id}/words",
            put(parse_words).delete(reset_words),
        )
        .route("/v1/sessions/{id}/batches/next", post(next_batch))
        .route("/v1/sessions/{id}/batches/{n}", post(numbered_batch))
        .route("/v1/sessions/{id}/results", get(results))
        .route("/v1/sessions/{id}/stats", get(stats))
        .route("/v1/sessions/{id}/lookup", get(lookup))
        .route("/v1/sessions/{id}/export", get(export))
        .layer(body_limit)
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn create_session(
    State(state): State<AppState>,
    Query(params): Query<CreateSessionQuery>,
) -> Result<Response, ApiError> {
    let batch_size = match params.batch_size {
        None => state.batch_size,
        Some(n) => {
            NonZeroUsize::new(n).ok_or_else(|| ApiError::bad_request("batch_size must be >= 1"))?
        }
    };
    let (session, reference) = state.open_session(batch_size)?;
    info!("opened session {session}");
    let body = SessionCreated {
        session,
        batch_size: batch_size.get(),
        reference,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn session_overview(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionOverview>, ApiError> {
    state.with_session(id, |session| {
        Json(SessionOverview {
            session: id,
            reference: session.reference_summary(),
            input: session.input_summary(),
            progress: session.progress(),
        })
    })
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(&id)
        .ok_or(ApiError::SessionNotFound(id))?;
    info!("closed session {id}");
    Ok(StatusCode::NO_CONTENT)
}

async fn load_reference(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    body: String,
) -> Result<Json<ReferenceSummary>, ApiError> {
    state.ensure_session(id)?;
    let set = spawn_blocking(move || ReferenceSet::parse(&body)).await??;
    let summary = state.with_session(id, |session| session.set_reference(Arc::new(set)))?;
    Ok(Json(summary))
}

async fn reset_reference(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    state.with_session(id, MatchingSession::reset_reference)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn parse_words(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    body: String,
) -> Result<Json<InputSummary>, ApiError> {
    state.ensure_session(id)?;
    let records = spawn_blocking(move || parse_word_list(&body)).await??;
    let summary = state.with_session(id, |session| session.set_word_list(records))?;
    Ok(Json(summary))
}

async fn reset_words(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    state.with_session(id, MatchingSession::reset_input)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn next_batch(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<BatchReport>, ApiError> {
    state.with_session(id, |session| -> Result<_, ApiError> {
        let outcome = session.process_next_batch()?;
        Ok(Json(batch_report(session, outcome.batch, outcome.range)))
    })?
}

async fn numbered_batch(
    State(state): State<AppState>,
    Path((id, n)): Path<(SessionId, usize)>,
) -> Result<Json<BatchReport>, ApiError> {
    state.with_session(id, |session| -> Result<_, ApiError> {
        let outcome = session.process_batch(n)?;
        Ok(Json(batch_report(session, outcome.batch, outcome.range)))
    })?
}

fn batch_report(
    session: &MatchingSession,
    batch: usize,
    range: std::ops::Range<usize>,
) -> BatchReport {
    BatchReport {
        batch,
        results: session.results()[range].to_vec(),
        statistics: session.statistics().clone(),
        progress: session.progress(),
        has_more: session.has_more_batches(),
    }
}

async fn results(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Query(params): Query<ResultsQuery>,
) -> Result<Json<ResultsPage>, ApiError> {
    let page = params.page.unwrap_or(1);
    if page == 0 {
        return Err(ApiError::bad_request("page must be >= 1"));
    }
    let mut page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err(ApiError::bad_request("page_size must be >= 1"));
    }
    if page_size > state.max_page_size {
        page_size = state.max_page_size;
    }

    state.with_session(id, |session| {
        let all = session.results();
        let start = (page - 1).saturating_mul(page_size).min(all.len());
        let end = start.saturating_add(page_size).min(all.len());
        Json(ResultsPage {
            page,
            page_size,
            total: all.len(),
            has_more: end < all.len(),
            items: all[start..end].to_vec(),
        })
    })
}

async fn stats(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<StatsResponse>, ApiError> {
    state.with_session(id, |session| {
        let statistics = session.statistics().clone();
        Json(StatsResponse {
            pos_distribution: statistics.pos_distribution(),
            statistics,
            progress: session.progress(),
        })
    })
}

async fn lookup(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Query(params): Query<LookupQuery>,
) -> Result<Json<LookupResponse>, ApiError> {
    let word = params.word.unwrap_or_default();
    if word.trim().is_empty() {
        return Err(ApiError::bad_request("word is required"));
    }
    let matches = state.with_session(id, |session| session.lookup(&word))?;
    Ok(Json(LookupResponse { word, matches }))
}

async fn export(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Query(params): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let include_unmatched = params.include_unmatched.unwrap_or(false);
    let tsv = state.with_session(id, |session| session.export(include_unmatched))?;
    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static(TSV_CONTENT_TYPE),
        )],
        tsv,
    )
        .into_response())
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error("session limit of {0} reached; delete a session or retry later")]
    SessionLimit(usize),
    #[error("internal server error")]
    Internal(#[from] JoinError),
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
            }
            ApiError::SessionNotFound(_) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { error: message })).into_response()
            }
            ApiError::Load(LoadError::SchemaDetection(err)) => {
                let expected: Vec<_> = err
                    .expected()
                    .into_iter()
                    .map(|(schema, headers)| json!({ "format": schema.label(), "headers": headers }))
                    .collect();
                let body = Json(json!({
                    "error": message,
                    "found": err.found,
                    "expected": expected,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Load(_) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
            }
            ApiError::Batch(_) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { error: message })).into_response()
            }
            ApiError::SessionLimit(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, HeaderValue::from_static("60"))],
                Json(ErrorResponse { error: message }),
            )
                .into_response(),
            ApiError::Internal(err) => {
                tracing::error!("background task failed: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: message }))
                    .into_response()
            }
        }
    }
}
