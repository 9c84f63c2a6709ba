use crate::catalog::{search_catalog, SearchHit};
use crate::config::Config;
use crate::enrich::{prepare_draft, DraftOutcome};
use crate::library::{collection_stats, CollectionQuery, CollectionStats};
use crate::models::{ContentKind, DraftRecord};
use crate::notify::NoticeLog;
use crate::records::{self, RecordNotFound, Submission, ValidationError};
use crate::supabase::{BackendApi, Session, SignUpOutcome, SupabaseClient};
use crate::tmdb::{CatalogResult, TmdbApi, TmdbClient};
use crate::transfer::{self, ExportBundle, ImportSummary};
use anyhow::Result;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, FromRequest, FromRequestParts, Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Option<Arc<dyn TmdbApi>>,
    pub backend: Option<Arc<dyn BackendApi>>,
    pub max_import_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let tmdb = config
            .tmdb_api_key
            .as_ref()
            .map(|key| Arc::new(TmdbClient::new(key.clone())) as Arc<dyn TmdbApi>);
        let backend = config.supabase.as_ref().map(|s| {
            Arc::new(SupabaseClient::new(s.url.clone(), s.anon_key.clone())) as Arc<dyn BackendApi>
        });
        Self {
            tmdb,
            backend,
            max_import_bytes: config.max_import_bytes,
        }
    }
}

/// JSON error body shared by every route.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Sessão inválida ou expirada.")
    }

    fn disabled(feature: &str) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("{feature} unavailable: backend credentials are not configured"),
        )
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(invalid) = err.downcast_ref::<ValidationError>() {
            return Self::new(StatusCode::BAD_REQUEST, invalid.to_string());
        }
        if let Some(missing) = err.downcast_ref::<RecordNotFound>() {
            return Self::new(StatusCode::NOT_FOUND, missing.to_string());
        }
        error!("Upstream request failed: {:#}", err);
        Self::new(
            StatusCode::BAD_GATEWAY,
            "Não foi possível concluir a operação. Tente novamente.",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::new(status, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "status": "error", "message": self.message })),
        )
            .into_response()
    }
}

// Request extractors that fail with the JSON error body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct JsonBody<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
struct QueryParams<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
struct PathParams<T>(T);

pub async fn run_server(config: Config) -> Result<()> {
    config.report();
    let state = AppState::from_config(&config);
    let app = build_router(state);

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_import_bytes;
    Router::new()
        .route("/health", get(health))
        .route("/api/features", get(features))
        .route("/api/tmdb/search", get(search))
        .route("/api/drafts", post(create_draft))
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route("/api/records", get(list_records).post(create_record))
        .route(
            "/api/records/:kind/:id",
            put(update_record).delete(delete_record),
        )
        .route("/api/stats", get(stats))
        .route("/api/export", get(export))
        .route("/api/import", post(import))
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not found")
}

async fn health() -> &'static str {
    "OK"
}

async fn features(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "search": state.tmdb.is_some(),
        "collection": state.backend.is_some(),
    }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
    #[serde(rename = "type")]
    kind: ContentKind,
}

async fn search(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchParams>,
) -> Json<Value> {
    let notices = NoticeLog::new();
    let results = search_catalog(state.tmdb.as_deref(), &params.query, params.kind, &notices).await;
    let hits: Vec<SearchHit> = results
        .into_iter()
        .map(|r| SearchHit::new(r, params.kind))
        .collect();
    Json(json!({ "results": hits, "notices": notices.take() }))
}

#[derive(Debug, Deserialize)]
struct DraftRequest {
    #[serde(rename = "type")]
    kind: ContentKind,
    result: CatalogResult,
}

async fn create_draft(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<DraftRequest>,
) -> Json<DraftOutcome> {
    debug!(tmdb_id = req.result.id, kind = %req.kind, "Preparing draft");
    Json(prepare_draft(state.tmdb.as_deref(), &req.result, req.kind).await)
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    fn check(&self) -> Result<(), ApiError> {
        if !self.email.trim().contains('@') {
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "invalid email address"));
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("password must have at least {MIN_PASSWORD_CHARS} characters"),
            ));
        }
        Ok(())
    }
}

fn backend(state: &AppState) -> Result<Arc<dyn BackendApi>, ApiError> {
    state
        .backend
        .clone()
        .ok_or_else(|| ApiError::disabled("accounts"))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(creds): JsonBody<Credentials>,
) -> Result<Json<Session>, ApiError> {
    creds.check()?;
    let backend = backend(&state)?;
    match backend.sign_in(creds.email.trim(), &creds.password).await? {
        Some(session) => {
            info!("User {} signed in", session.user_id);
            Ok(Json(session))
        }
        None => {
            warn!("Rejected sign-in");
            Err(ApiError::new(StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos."))
        }
    }
}

async fn signup(
    State(state): State<AppState>,
    JsonBody(creds): JsonBody<Credentials>,
) -> Result<Json<SignUpOutcome>, ApiError> {
    creds.check()?;
    let backend = backend(&state)?;
    let outcome = backend.sign_up(creds.email.trim(), &creds.password).await?;
    info!("New account registered");
    Ok(Json(outcome))
}

type BearerAuth = Option<TypedHeader<Authorization<Bearer>>>;

/// Resolves the bearer token to the owning user.
async fn session(
    state: &AppState,
    auth: BearerAuth,
) -> Result<(Arc<dyn BackendApi>, Session), ApiError> {
    let backend = state
        .backend
        .clone()
        .ok_or_else(|| ApiError::disabled("collection"))?;
    let Some(TypedHeader(auth)) = auth else {
        return Err(ApiError::unauthorized());
    };
    let token = auth.token().to_string();
    match backend.current_user(&token).await? {
        Some(user_id) => Ok((
            backend,
            Session {
                access_token: token,
                user_id,
            },
        )),
        None => Err(ApiError::unauthorized()),
    }
}

async fn list_records(
    State(state): State<AppState>,
    auth: BearerAuth,
    QueryParams(query): QueryParams<CollectionQuery>,
) -> Result<Json<Value>, ApiError> {
    let (backend, session) = session(&state, auth).await?;
    let records = records::list_collection(backend.as_ref(), &session).await?;
    Ok(Json(json!({ "records": query.apply(records) })))
}

async fn create_record(
    State(state): State<AppState>,
    auth: BearerAuth,
    JsonBody(draft): JsonBody<DraftRecord>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (backend, session) = session(&state, auth).await?;
    records::submit(backend.as_ref(), &session, Submission::Create(draft)).await?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "success" }))))
}

async fn update_record(
    State(state): State<AppState>,
    auth: BearerAuth,
    PathParams((kind, id)): PathParams<(ContentKind, String)>,
    JsonBody(draft): JsonBody<DraftRecord>,
) -> Result<Json<Value>, ApiError> {
    if draft.kind() != kind {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("record is a {} but the path says {}", draft.kind(), kind),
        ));
    }
    let (backend, session) = session(&state, auth).await?;
    records::submit(backend.as_ref(), &session, Submission::Update { id, draft }).await?;
    Ok(Json(json!({ "status": "success" })))
}

async fn delete_record(
    State(state): State<AppState>,
    auth: BearerAuth,
    PathParams((kind, id)): PathParams<(ContentKind, String)>,
) -> Result<StatusCode, ApiError> {
    let (backend, session) = session(&state, auth).await?;
    records::delete_record(backend.as_ref(), &session, kind, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stats(
    State(state): State<AppState>,
    auth: BearerAuth,
) -> Result<Json<CollectionStats>, ApiError> {
    let (backend, session) = session(&state, auth).await?;
    let records = records::list_collection(backend.as_ref(), &session).await?;
    Ok(Json(collection_stats(&records)))
}

async fn export(State(state): State<AppState>, auth: BearerAuth) -> Result<Response, ApiError> {
    let (backend, session) = session(&state, auth).await?;
    let now = Utc::now();
    let bundle: ExportBundle = transfer::export_collection(backend.as_ref(), &session, now).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        transfer::export_file_name(now)
    );
    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(bundle)).into_response())
}

async fn import(
    State(state): State<AppState>,
    auth: BearerAuth,
    JsonBody(document): JsonBody<Value>,
) -> Result<Json<ImportSummary>, ApiError> {
    let (backend, session) = session(&state, auth).await?;
    let summary = transfer::import_collection(backend.as_ref(), &session, &document).await?;
    Ok(Json(summary))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
