//! Submission pipeline: owns one form, writes it to the document store and
//! walks the submission phase through idle, submitting, success or failure.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use shared::{
    error::ValidationFailure,
    protocol::{
        field_error_views, CreatedRecord, FormSnapshot, Route, SubmissionPhase, SubmittedProject,
        PROJECTS_COLLECTION,
    },
};
use storage::{DocumentStore, WriteError};
use thiserror::Error;
use tokio::{
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::form::FormController;

/// How long the success confirmation stays up before the form resets.
pub const SUCCESS_DISPLAY_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(SubmissionPhase),
    /// The draft was cleared after a successful submission.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("form session is closed")]
pub struct SessionClosed;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationFailure),
    #[error("cannot submit while the form is {phase}")]
    Busy { phase: &'static str },
    #[error("form session is closed")]
    Closed,
    #[error(transparent)]
    Write(#[from] WriteError),
}

struct SessionState {
    form: FormController,
    phase: SubmissionPhase,
    in_flight: bool,
    closed: bool,
    generation: u64,
    reset_task: Option<JoinHandle<()>>,
    last_activity: Instant,
}

pub struct FormSession {
    store: Arc<dyn DocumentStore>,
    success_delay: Duration,
    state: Mutex<SessionState>,
    route: watch::Sender<Route>,
    events: broadcast::Sender<SessionEvent>,
}

impl FormSession {
    pub fn new(store: Arc<dyn DocumentStore>) -> Arc<Self> {
        Self::with_options(store, FormController::new(), SUCCESS_DISPLAY_DELAY)
    }

    pub fn with_options(
        store: Arc<dyn DocumentStore>,
        form: FormController,
        success_delay: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        let (route, _) = watch::channel(Route::Form);
        Arc::new(Self {
            store,
            success_delay,
            state: Mutex::new(SessionState {
                form,
                phase: SubmissionPhase::Idle,
                in_flight: false,
                closed: false,
                generation: 0,
                reset_task: None,
                last_activity: Instant::now(),
            }),
            route,
            events,
        })
    }

    pub fn success_delay(&self) -> Duration {
        self.success_delay
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_route(&self) -> watch::Receiver<Route> {
        self.route.subscribe()
    }

    pub fn route(&self) -> Route {
        *self.route.borrow()
    }

    pub async fn phase(&self) -> SubmissionPhase {
        self.state.lock().await.phase.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Time since the session was last used. `None` while a write is in
    /// flight.
    pub async fn idle_for(&self) -> Option<Duration> {
        let state = self.state.lock().await;
        if state.in_flight {
            return None;
        }
        Some(state.last_activity.elapsed())
    }

    /// Runs one edit against the form. Edits are accepted in every phase,
    /// including while a write is in flight; the record being written was
    /// already captured and is not affected.
    pub async fn update<R>(
        &self,
        edit: impl FnOnce(&mut FormController) -> R,
    ) -> Result<R, SessionClosed> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(SessionClosed);
        }
        state.last_activity = Instant::now();
        Ok(edit(&mut state.form))
    }

    pub async fn snapshot(&self) -> FormSnapshot {
        let mut state = self.state.lock().await;
        state.last_activity = Instant::now();
        FormSnapshot {
            route: self.route().path().to_string(),
            phase: state.phase.clone(),
            submit_enabled: !state.closed && !state.in_flight && state.phase.accepts_submit(),
            draft: state.form.draft().clone(),
            field_errors: field_error_views(&state.form.field_errors()),
        }
    }

    /// Validates the draft and writes it to the projects collection.
    ///
    /// At most one write is in flight per session. The state lock is released
    /// for the duration of the write. On success the form resets after
    /// `success_delay` and the route moves back to the landing page; on
    /// failure the draft is kept so the user can retry.
    ///
    /// The write runs on its own task, so dropping the returned future does
    /// not abandon the attempt: the phase still settles on success or
    /// failure.
    pub async fn submit(self: &Arc<Self>) -> Result<CreatedRecord, SubmitError> {
        let record = self.begin_submit().await?;
        let session = Arc::clone(self);
        let attempt = tokio::spawn(async move {
            info!(project_name = %record.project_name, "form: submitting project");
            let result = session.store.create_record(PROJECTS_COLLECTION, &record).await;
            session.finish_submit(result).await
        });
        match attempt.await {
            Ok(result) => result,
            Err(join_error) => {
                warn!(error = %join_error, "form: write task ended abnormally");
                self.finish_submit(Err(WriteError::Unavailable(format!(
                    "write task failed: {join_error}"
                ))))
                .await
            }
        }
    }

    async fn begin_submit(&self) -> Result<SubmittedProject, SubmitError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(SubmitError::Closed);
        }
        state.last_activity = Instant::now();
        if state.in_flight || !state.phase.accepts_submit() {
            return Err(SubmitError::Busy {
                phase: state.phase.as_str(),
            });
        }
        let record = match state.form.build_submission_record() {
            Ok(record) => record,
            Err(failure) => {
                debug!(missing = failure.errors.len(), "form: submission rejected");
                state.form.record_validation_failure(&failure);
                return Err(failure.into());
            }
        };
        state.in_flight = true;
        self.set_phase(&mut state, SubmissionPhase::Submitting);
        Ok(record)
    }

    async fn finish_submit(
        self: &Arc<Self>,
        result: Result<CreatedRecord, WriteError>,
    ) -> Result<CreatedRecord, SubmitError> {
        let mut state = self.state.lock().await;
        if !state.in_flight {
            return result.map_err(Into::into);
        }
        state.in_flight = false;
        state.last_activity = Instant::now();
        if state.closed {
            debug!("form: session closed during submission");
            return result.map_err(Into::into);
        }

        match result {
            Ok(created) => {
                info!(record_id = %created.id, "form: project stored");
                self.set_phase(
                    &mut state,
                    SubmissionPhase::Success {
                        record_id: created.id.clone(),
                    },
                );
                self.schedule_reset(&mut state);
                Ok(created)
            }
            Err(err) => {
                warn!(error = %err, "form: submission failed");
                self.set_phase(
                    &mut state,
                    SubmissionPhase::Failed {
                        message: err.to_string(),
                    },
                );
                Err(err.into())
            }
        }
    }

    /// Clears a failure notice without resubmitting. Returns whether the
    /// phase changed.
    pub async fn acknowledge_failure(&self) -> Result<bool, SessionClosed> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(SessionClosed);
        }
        state.last_activity = Instant::now();
        if !matches!(state.phase, SubmissionPhase::Failed { .. }) {
            return Ok(false);
        }
        self.set_phase(&mut state, SubmissionPhase::Idle);
        Ok(true)
    }

    /// Stops the session. A pending reset is cancelled and later edits or
    /// submissions are refused.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if state.closed {
            return;
        }
        state.closed = true;
        state.generation += 1;
        if let Some(task) = state.reset_task.take() {
            task.abort();
        }
        debug!(phase = state.phase.as_str(), "form: session closed");
    }

    fn set_phase(&self, state: &mut SessionState, phase: SubmissionPhase) {
        debug!(from = state.phase.as_str(), to = phase.as_str(), "form: phase change");
        state.phase = phase.clone();
        let _ = self.events.send(SessionEvent::PhaseChanged(phase));
    }

    fn schedule_reset(self: &Arc<Self>, state: &mut SessionState) {
        state.generation += 1;
        let generation = state.generation;
        let delay = self.success_delay;
        let session: Weak<Self> = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(session) = session.upgrade() {
                session.complete_reset(generation).await;
            }
        });
        if let Some(previous) = state.reset_task.replace(task) {
            previous.abort();
        }
    }

    async fn complete_reset(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if state.closed || state.generation != generation {
            return;
        }
        state.reset_task = None;
        state.form.reset();
        self.set_phase(&mut state, SubmissionPhase::Idle);
        let _ = self.events.send(SessionEvent::Reset);
        self.route.send_replace(Route::Landing);
        info!("form: reset after successful submission");
    }
}

impl Drop for FormSession {
    fn drop(&mut self) {
        if let Some(task) = self.state.get_mut().reset_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
