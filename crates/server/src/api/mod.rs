use std::{collections::HashMap, sync::Arc, time::Duration};

use intake_core::{FormController, FormSession, SessionClosed, SubmitError};
use shared::{
    domain::{find_palette, is_hex_color, FormField, NavLinkField, SectionId},
    error::{ApiError, ErrorCode, FormError},
    protocol::{Catalog, Route, SessionSnapshot, SubmitResponse, ToggleSectionResponse},
};
use storage::DocumentStore;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

pub type SessionId = Uuid;

/// Open sessions untouched for this long are evicted when a new one opens.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn DocumentStore>,
    pub sessions: Arc<RwLock<HashMap<SessionId, Arc<FormSession>>>>,
    pub max_open_sessions: usize,
    pub success_delay: Duration,
    pub session_idle_timeout: Duration,
}

impl ApiContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        max_open_sessions: usize,
        success_delay: Duration,
    ) -> Self {
        Self {
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_open_sessions,
            success_delay,
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }

    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }
}

pub fn catalog() -> Catalog {
    Catalog::get()
}

/// Opens a fresh form view. Sessions that already finished and went back to
/// the landing page, or that sat idle past `session_idle_timeout` with no
/// write in flight, are evicted first; past that the number of open sessions
/// is capped.
pub async fn open_session(ctx: &ApiContext) -> Result<SessionSnapshot, ApiError> {
    let (session_id, session, evicted) = {
        let mut sessions = ctx.sessions.write().await;
        let mut stale = Vec::new();
        for (id, session) in sessions.iter() {
            if session.route() == Route::Landing {
                stale.push(*id);
            } else if session
                .idle_for()
                .await
                .is_some_and(|idle| idle >= ctx.session_idle_timeout)
            {
                info!(session_id = %id, "api: evicting idle form session");
                stale.push(*id);
            }
        }
        let evicted: Vec<Arc<FormSession>> = stale
            .iter()
            .filter_map(|id| sessions.remove(id))
            .collect();

        if sessions.len() >= ctx.max_open_sessions {
            warn!(open = sessions.len(), "api: session limit reached");
            return Err(ApiError::new(
                ErrorCode::RateLimited,
                "too many open forms, try again later",
            ));
        }

        let session_id = Uuid::new_v4();
        let session = FormSession::with_options(
            Arc::clone(&ctx.store),
            FormController::new(),
            ctx.success_delay,
        );
        sessions.insert(session_id, Arc::clone(&session));
        (session_id, session, evicted)
    };

    for finished in evicted {
        finished.close().await;
    }
    info!(%session_id, "api: form session opened");
    Ok(snapshot_of(session_id, &session).await)
}

pub async fn session_snapshot(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<SessionSnapshot, ApiError> {
    let session = lookup(ctx, session_id).await?;
    Ok(snapshot_of(session_id, &session).await)
}

pub async fn close_session(ctx: &ApiContext, session_id: SessionId) -> Result<(), ApiError> {
    let session = ctx
        .sessions
        .write()
        .await
        .remove(&session_id)
        .ok_or_else(|| session_not_found(session_id))?;
    session.close().await;
    info!(%session_id, "api: form session closed");
    Ok(())
}

pub async fn set_field(
    ctx: &ApiContext,
    session_id: SessionId,
    field: &str,
    value: String,
) -> Result<SessionSnapshot, ApiError> {
    let field: FormField = field
        .parse()
        .map_err(|_| ApiError::new(ErrorCode::NotFound, format!("unknown field '{field}'")))?;
    if field.is_color() && !is_hex_color(value.trim()) {
        return Err(form_error(FormError::InvalidValue { field, value }));
    }

    let session = lookup(ctx, session_id).await?;
    session
        .update(|form| form.set_field(field, value))
        .await
        .map_err(|SessionClosed| session_not_found(session_id))?
        .map_err(form_error)?;
    Ok(snapshot_of(session_id, &session).await)
}

pub async fn apply_palette(
    ctx: &ApiContext,
    session_id: SessionId,
    name: &str,
) -> Result<SessionSnapshot, ApiError> {
    let palette = find_palette(name).ok_or_else(|| {
        ApiError::new(ErrorCode::Validation, format!("unknown palette '{name}'"))
    })?;
    let session = lookup(ctx, session_id).await?;
    session
        .update(|form| form.apply_palette(palette))
        .await
        .map_err(|SessionClosed| session_not_found(session_id))?;
    Ok(snapshot_of(session_id, &session).await)
}

pub async fn add_nav_link(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<SessionSnapshot, ApiError> {
    let session = lookup(ctx, session_id).await?;
    session
        .update(|form| form.add_nav_link())
        .await
        .map_err(|SessionClosed| session_not_found(session_id))?;
    Ok(snapshot_of(session_id, &session).await)
}

pub async fn update_nav_link(
    ctx: &ApiContext,
    session_id: SessionId,
    index: usize,
    field: NavLinkField,
    value: String,
) -> Result<SessionSnapshot, ApiError> {
    let session = lookup(ctx, session_id).await?;
    session
        .update(|form| form.update_nav_link(index, field, value))
        .await
        .map_err(|SessionClosed| session_not_found(session_id))?
        .map_err(form_error)?;
    Ok(snapshot_of(session_id, &session).await)
}

pub async fn remove_nav_link(
    ctx: &ApiContext,
    session_id: SessionId,
    index: usize,
) -> Result<SessionSnapshot, ApiError> {
    let session = lookup(ctx, session_id).await?;
    session
        .update(|form| form.remove_nav_link(index))
        .await
        .map_err(|SessionClosed| session_not_found(session_id))?
        .map_err(form_error)?;
    Ok(snapshot_of(session_id, &session).await)
}

pub async fn toggle_section(
    ctx: &ApiContext,
    session_id: SessionId,
    section: &str,
) -> Result<ToggleSectionResponse, ApiError> {
    let section: SectionId = section
        .parse()
        .map_err(|_| ApiError::new(ErrorCode::NotFound, format!("unknown section '{section}'")))?;
    let session = lookup(ctx, session_id).await?;
    let selected = session
        .update(|form| form.toggle_section(section))
        .await
        .map_err(|SessionClosed| session_not_found(session_id))?;
    Ok(ToggleSectionResponse { section, selected })
}

pub async fn submit(ctx: &ApiContext, session_id: SessionId) -> Result<SubmitResponse, ApiError> {
    let session = lookup(ctx, session_id).await?;
    let created = session.submit().await.map_err(|err| match err {
        SubmitError::Invalid(failure) => {
            ApiError::new(ErrorCode::Validation, failure.to_string()).with_errors(failure.errors)
        }
        SubmitError::Busy { phase } => ApiError::new(
            ErrorCode::Conflict,
            format!("cannot submit while the form is {phase}"),
        ),
        SubmitError::Closed => session_not_found(session_id),
        SubmitError::Write(write) => {
            ApiError::new(ErrorCode::Upstream, format!("failed to save project: {write}"))
        }
    })?;
    Ok(SubmitResponse {
        record_id: created.id,
        phase: session.phase().await,
    })
}

pub async fn acknowledge_failure(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<SessionSnapshot, ApiError> {
    let session = lookup(ctx, session_id).await?;
    session
        .acknowledge_failure()
        .await
        .map_err(|SessionClosed| session_not_found(session_id))?;
    Ok(snapshot_of(session_id, &session).await)
}

async fn lookup(ctx: &ApiContext, session_id: SessionId) -> Result<Arc<FormSession>, ApiError> {
    ctx.sessions
        .read()
        .await
        .get(&session_id)
        .cloned()
        .ok_or_else(|| session_not_found(session_id))
}

async fn snapshot_of(session_id: SessionId, session: &FormSession) -> SessionSnapshot {
    SessionSnapshot {
        session_id: session_id.to_string(),
        form: session.snapshot().await,
    }
}

fn session_not_found(session_id: SessionId) -> ApiError {
    ApiError::new(
        ErrorCode::NotFound,
        format!("form session {session_id} not found"),
    )
}

fn form_error(err: FormError) -> ApiError {
    ApiError::new(ErrorCode::Validation, err.to_string()).with_errors(vec![err])
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
