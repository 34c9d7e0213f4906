//! Analysis session state machine.
//!
//! All request lifecycle decisions live here: which actions are valid in which state, what is
//! retained between requests, and what happens when a request completes. At most one request is
//! in flight; actions issued while busy are refused, never queued.
//!
//! Actions (`submit`, `recalculate`, `manual_override`, `retry`) only transition the state and
//! hand back a [`Dispatch`]. The caller performs the request (inline with [`AnalysisSession::run`]
//! or on a spawned task) and reports back through [`AnalysisSession::complete`].

use crate::domain::errors::{ActionError, AnalysisError};
use crate::domain::models::{AnalysisInput, AnalysisResult, InputDraft, NormalizedPoint};
use crate::services::client::AnalysisService;
use crate::services::gate::offers_override;
use crate::services::geometry::ensure_within_image;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestKind {
    Submit,
    Recalculate,
    ManualOverride(NormalizedPoint),
}

impl RequestKind {
    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::Submit => "submit",
            RequestKind::Recalculate => "recalculate",
            RequestKind::ManualOverride(_) => "manual override",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Empty,
    Pending {
        input: AnalysisInput,
    },
    Ready {
        result: AnalysisResult,
        input: AnalysisInput,
    },
    Recalculating {
        result: AnalysisResult,
        input: AnalysisInput,
    },
    /// `last_result` is the most recent good result, kept so it can still be shown.
    Failed {
        message: String,
        input: Option<AnalysisInput>,
        last_result: Option<AnalysisResult>,
        failed_action: Option<RequestKind>,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Empty => "empty",
            SessionState::Pending { .. } => "pending",
            SessionState::Ready { .. } => "ready",
            SessionState::Recalculating { .. } => "recalculating",
            SessionState::Failed { .. } => "failed",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::Pending { .. } | SessionState::Recalculating { .. }
        )
    }

    /// Result to display: current, in-recalculation, or last good one after a failure.
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            SessionState::Ready { result, .. } | SessionState::Recalculating { result, .. } => {
                Some(result)
            }
            SessionState::Failed { last_result, .. } => last_result.as_ref(),
            _ => None,
        }
    }

    pub fn input(&self) -> Option<&AnalysisInput> {
        match self {
            SessionState::Empty => None,
            SessionState::Pending { input }
            | SessionState::Ready { input, .. }
            | SessionState::Recalculating { input, .. } => Some(input),
            SessionState::Failed { input, .. } => input.as_ref(),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            SessionState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Manual override is offered only from `Ready` and only when the gate says so.
    pub fn offers_override(&self) -> bool {
        match self {
            SessionState::Ready { result, .. } => offers_override(result.warnings.as_slice()),
            _ => false,
        }
    }
}

/// A request the caller must now perform.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub token: RequestToken,
    pub kind: RequestKind,
    pub request: AnalysisInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    token: RequestToken,
    kind: RequestKind,
}

#[derive(Debug, Default)]
pub struct AnalysisSession {
    state: SessionState,
    last_token: u64,
    in_flight: Option<InFlight>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn ensure_idle(&self, action: &'static str) -> Result<(), ActionError> {
        if self.state.is_busy() {
            tracing::debug!(action, state = self.state.name(), "action refused: busy");
            return Err(ActionError::InProgress);
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> ActionError {
        ActionError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    pub fn submit(&mut self, draft: &InputDraft) -> Result<Dispatch, ActionError> {
        self.ensure_idle("submit")?;
        if !matches!(
            self.state,
            SessionState::Empty | SessionState::Failed { .. }
        ) {
            return Err(self.invalid("submit"));
        }
        let input = draft.to_input()?;
        Ok(self.dispatch(RequestKind::Submit, input, None))
    }

    pub fn recalculate(&mut self) -> Result<Dispatch, ActionError> {
        self.ensure_idle("recalculate")?;
        let (input, prior) = self.retained("recalculate")?;
        Ok(self.dispatch(RequestKind::Recalculate, input, prior))
    }

    pub fn manual_override(&mut self, point: NormalizedPoint) -> Result<Dispatch, ActionError> {
        self.ensure_idle("override")?;
        let SessionState::Ready { result, input } = &self.state else {
            return Err(self.invalid("override"));
        };
        if !offers_override(result.warnings.as_slice()) {
            return Err(ActionError::OverrideUnavailable);
        }
        let point = ensure_within_image(point)?;
        let (input, prior) = (input.clone(), Some(result.clone()));
        Ok(self.dispatch(RequestKind::ManualOverride(point), input, prior))
    }

    /// Replays whatever action last failed, with the same input.
    pub fn retry(&mut self) -> Result<Dispatch, ActionError> {
        self.ensure_idle("retry")?;
        let SessionState::Failed {
            input: Some(input),
            last_result,
            failed_action: Some(kind),
            ..
        } = &self.state
        else {
            return Err(ActionError::NothingToRetry);
        };
        let (kind, input, prior) = (*kind, input.clone(), last_result.clone());
        Ok(self.dispatch(kind, input, prior))
    }

    pub fn reset(&mut self) -> Result<(), ActionError> {
        self.ensure_idle("reset")?;
        self.state = SessionState::Empty;
        Ok(())
    }

    fn retained(
        &self,
        action: &'static str,
    ) -> Result<(AnalysisInput, Option<AnalysisResult>), ActionError> {
        match &self.state {
            SessionState::Ready { result, input } => Ok((input.clone(), Some(result.clone()))),
            SessionState::Failed {
                input: Some(input),
                last_result,
                ..
            } => Ok((input.clone(), last_result.clone())),
            _ => Err(self.invalid(action)),
        }
    }

    fn dispatch(
        &mut self,
        kind: RequestKind,
        input: AnalysisInput,
        prior: Option<AnalysisResult>,
    ) -> Dispatch {
        self.last_token += 1;
        let token = RequestToken(self.last_token);
        let input = input.without_override();
        let request = match kind {
            RequestKind::ManualOverride(point) => input.with_override(point),
            _ => input.clone(),
        };
        self.state = match prior {
            Some(result) if kind != RequestKind::Submit => {
                SessionState::Recalculating { result, input }
            }
            _ => SessionState::Pending { input },
        };
        self.in_flight = Some(InFlight { token, kind });
        tracing::info!(
            token = token.0,
            action = kind.label(),
            state = self.state.name(),
            "dispatching analysis request"
        );
        Dispatch {
            token,
            kind,
            request,
        }
    }

    /// Applies the outcome of the request identified by `token`.
    ///
    /// Outcomes for any other token are discarded so a late response can never overwrite the
    /// state produced by a newer request.
    pub fn complete(
        &mut self,
        token: RequestToken,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> Completion {
        let Some(in_flight) = self.in_flight.filter(|f| f.token == token) else {
            tracing::warn!(token = token.0, "discarding stale analysis response");
            return Completion::Stale;
        };
        self.in_flight = None;
        let (input, prior) = match std::mem::take(&mut self.state) {
            SessionState::Pending { input } => (input, None),
            SessionState::Recalculating { result, input } => (input, Some(result)),
            other => {
                tracing::warn!(state = other.name(), "completion without a busy state");
                self.state = other;
                return Completion::Stale;
            }
        };
        self.state = match outcome {
            Ok(result) => {
                tracing::info!(
                    token = token.0,
                    warnings = result.warnings.len(),
                    "analysis ready"
                );
                SessionState::Ready { result, input }
            }
            Err(err) => {
                tracing::warn!(token = token.0, error = %err, "analysis request failed");
                SessionState::Failed {
                    message: err.to_string(),
                    input: Some(input),
                    last_result: prior,
                    failed_action: Some(in_flight.kind),
                }
            }
        };
        Completion::Applied
    }

    /// Performs `dispatch` inline and applies its outcome.
    pub async fn run<S: AnalysisService>(
        &mut self,
        service: &S,
        dispatch: Dispatch,
    ) -> &SessionState {
        let outcome = service.analyze(&dispatch.request).await;
        self.complete(dispatch.token, outcome);
        &self.state
    }
}
