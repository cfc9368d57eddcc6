//! Pending/result/error state machine wrapping one backend call.
//!
//! Every panel owns one [`ActionController`] per control. A call is started
//! with [`ActionController::perform`], which flips `pending` on and spawns the
//! request on the runtime. The request task always reports back through the
//! event channel, even if the future panics, and the owning panel hands the
//! outcome to [`ActionController::settle`], which flips `pending` off.

use std::future::Future;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::error::ApiError;

/// Why an action was not started. No request is made in any of these cases.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Refusal {
    #[error("already in progress")]
    Busy,
    #[error("nothing to send")]
    EmptyInput,
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("backend offline")]
    Offline,
}

/// Last terminal outcome of a control. At most one of `result` and `error` is set.
#[derive(Debug, Clone)]
pub struct ActionState<T> {
    pub pending: bool,
    pub result: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> Default for ActionState<T> {
    fn default() -> Self {
        Self {
            pending: false,
            result: None,
            error: None,
        }
    }
}

#[derive(Debug)]
pub struct ActionController<T> {
    label: &'static str,
    state: ActionState<T>,
    runs: u64,
}

impl<T> ActionController<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            state: ActionState::default(),
            runs: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending
    }

    pub fn result(&self) -> Option<&T> {
        self.state.result.as_ref()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.state.error.as_ref()
    }

    /// Number of calls started so far.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Mark the control as in flight.
    pub fn begin(&mut self) -> Result<(), Refusal> {
        if self.state.pending {
            warn!(action = self.label, "refused: already pending");
            return Err(Refusal::Busy);
        }
        self.state.pending = true;
        self.runs += 1;
        info!(action = self.label, run = self.runs, "action started");
        Ok(())
    }

    /// Record the terminal outcome and re-enable the control.
    pub fn settle(&mut self, outcome: Result<T, ApiError>) {
        if !self.state.pending {
            debug!(action = self.label, "settle without a pending call");
        }
        match outcome {
            Ok(value) => {
                info!(action = self.label, "action succeeded");
                self.state.result = Some(value);
                self.state.error = None;
            }
            Err(e) => {
                warn!(action = self.label, error = %e, "action failed");
                self.state.result = None;
                self.state.error = Some(e);
            }
        }
        self.state.pending = false;
    }
}

impl<T: Send + 'static> ActionController<T> {
    /// Begin the action and run `request` on the runtime. Once it finishes,
    /// `wrap` turns the outcome into an event for the UI loop. The caller is
    /// expected to pass that outcome back into [`Self::settle`].
    pub fn perform<Fut, E, W>(
        &mut self,
        events: &UnboundedSender<E>,
        request: Fut,
        wrap: W,
    ) -> Result<(), Refusal>
    where
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        E: Send + 'static,
        W: FnOnce(Result<T, ApiError>) -> E + Send + 'static,
    {
        self.begin()?;
        self.launch(events, request, wrap);
        Ok(())
    }

    /// Spawn the request for a call already marked with [`Self::begin`].
    /// Panels that do optimistic work between the two steps use this.
    pub fn launch<Fut, E, W>(&self, events: &UnboundedSender<E>, request: Fut, wrap: W)
    where
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        E: Send + 'static,
        W: FnOnce(Result<T, ApiError>) -> E + Send + 'static,
    {
        let label = self.label;
        let events = events.clone();
        tokio::spawn(async move {
            let outcome = match tokio::spawn(request).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => Err(ApiError::Aborted("request task panicked".to_string())),
                Err(_) => Err(ApiError::Aborted("request task cancelled".to_string())),
            };
            if events.send(wrap(outcome)).is_err() {
                debug!(action = label, "event loop gone; dropping outcome");
            }
        });
    }
}
