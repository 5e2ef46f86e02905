use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::{get, patch, post, put},
    Json, Router,
};
use shared::{
    error::{ApiError, ErrorCode, FormError},
    protocol::{
        ApplyPaletteRequest, Catalog, SessionSnapshot, SetFieldRequest, SubmitResponse,
        ToggleSectionResponse, UpdateNavLinkRequest,
    },
};
use storage::open_store;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use uuid::Uuid;

mod api;
mod app_state;
mod config;
mod pages;

use api::ApiContext;
use app_state::AppState;
use config::load_settings;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let store = open_store(&settings.store).await.map_err(|error| {
        error!(
            backend = ?settings.store.backend,
            %error,
            "failed to open document store; check the [store] settings"
        );
        error
    })?;
    let api = ApiContext::new(
        store,
        settings.max_open_sessions,
        Duration::from_millis(settings.success_delay_ms),
    )
    .with_session_idle_timeout(Duration::from_secs(settings.session_idle_timeout_secs));

    let state = AppState { api };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/form", get(form_page))
        .route("/healthz", get(healthz))
        .route("/api/catalog", get(http_catalog))
        .route("/api/sessions", post(http_open_session))
        .route(
            "/api/sessions/:session_id",
            get(http_session_snapshot).delete(http_close_session),
        )
        .route("/api/sessions/:session_id/fields/:field", put(http_set_field))
        .route("/api/sessions/:session_id/palette", post(http_apply_palette))
        .route("/api/sessions/:session_id/nav-links", post(http_add_nav_link))
        .route(
            "/api/sessions/:session_id/nav-links/:index",
            patch(http_update_nav_link).delete(http_remove_nav_link),
        )
        .route(
            "/api/sessions/:session_id/sections/:section",
            post(http_toggle_section),
        )
        .route("/api/sessions/:session_id/submit", post(http_submit))
        .route(
            "/api/sessions/:session_id/acknowledge",
            post(http_acknowledge_failure),
        )
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

fn error_response(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation
            if err
                .errors
                .iter()
                .any(|e| matches!(e, FormError::RequiredFieldMissing { .. })) =>
        {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

async fn landing_page() -> Html<&'static str> {
    Html(pages::LANDING_PAGE)
}

async fn form_page() -> Html<&'static str> {
    Html(pages::FORM_PAGE)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_catalog() -> Json<Catalog> {
    Json(api::catalog())
}

async fn http_open_session(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<SessionSnapshot>)> {
    let snapshot = api::open_session(&state.api)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn http_session_snapshot(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let snapshot = api::session_snapshot(&state.api, session_id)
        .await
        .map_err(error_response)?;
    Ok(Json(snapshot))
}

async fn http_close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    api::close_session(&state.api, session_id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_set_field(
    State(state): State<Arc<AppState>>,
    Path((session_id, field)): Path<(Uuid, String)>,
    Json(req): Json<SetFieldRequest>,
) -> ApiResult<Json<SessionSnapshot>> {
    let snapshot = api::set_field(&state.api, session_id, &field, req.value)
        .await
        .map_err(error_response)?;
    Ok(Json(snapshot))
}

async fn http_apply_palette(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ApplyPaletteRequest>,
) -> ApiResult<Json<SessionSnapshot>> {
    let snapshot = api::apply_palette(&state.api, session_id, &req.name)
        .await
        .map_err(error_response)?;
    Ok(Json(snapshot))
}

async fn http_add_nav_link(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let snapshot = api::add_nav_link(&state.api, session_id)
        .await
        .map_err(error_response)?;
    Ok(Json(snapshot))
}

async fn http_update_nav_link(
    State(state): State<Arc<AppState>>,
    Path((session_id, index)): Path<(Uuid, usize)>,
    Json(req): Json<UpdateNavLinkRequest>,
) -> ApiResult<Json<SessionSnapshot>> {
    let snapshot = api::update_nav_link(&state.api, session_id, index, req.field, req.value)
        .await
        .map_err(error_response)?;
    Ok(Json(snapshot))
}

async fn http_remove_nav_link(
    State(state): State<Arc<AppState>>,
    Path((session_id, index)): Path<(Uuid, usize)>,
) -> ApiResult<Json<SessionSnapshot>> {
    let snapshot = api::remove_nav_link(&state.api, session_id, index)
        .await
        .map_err(error_response)?;
    Ok(Json(snapshot))
}

async fn http_toggle_section(
    State(state): State<Arc<AppState>>,
    Path((session_id, section)): Path<(Uuid, String)>,
) -> ApiResult<Json<ToggleSectionResponse>> {
    let toggled = api::toggle_section(&state.api, session_id, &section)
        .await
        .map_err(error_response)?;
    Ok(Json(toggled))
}

async fn http_submit(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SubmitResponse>> {
    let submitted = api::submit(&state.api, session_id)
        .await
        .map_err(error_response)?;
    Ok(Json(submitted))
}

async fn http_acknowledge_failure(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let snapshot = api::acknowledge_failure(&state.api, session_id)
        .await
        .map_err(error_response)?;
    Ok(Json(snapshot))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
