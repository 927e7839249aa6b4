//! The acknowledgment owner.
//!
//! The platform expects the initial response to one interaction within a
//! few seconds of delivery. [`AckOwner`] is the task that holds that window
//! open: it takes whatever the handler hands off first, performs the
//! `create_response` call and reports the outcome back. When nothing arrives
//! before the handler's timeout it sends a deferral itself, so the token
//! stays valid and a late handler degrades to follow-ups.
//!
//! ```text
//! handler task                  owner task                    platform
//!     │  initial handoff  ───────▶  │
//!     │                             │  create_response  ───────▶ │
//!     │  ◀─────── outcome           │  mark acknowledged          │
//!     │  edit handoff     ───────▶  │  edit_original    ───────▶ │   (can_edit_original)
//!     │  follow-ups  ─────────────────────────────────────────▶  │
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use wicket_core::{
    ApiError, ApplicationId, InitialResponse, Interaction, InteractionApi, InteractionId,
    InteractionKind,
};
use wicket_framework::{Handoff, ResponseReceiver};

/// What the owner needs to address one interaction.
#[derive(Debug, Clone)]
pub struct AckTarget {
    pub interaction_id: InteractionId,
    pub application_id: ApplicationId,
    pub token: String,
    pub kind: InteractionKind,
}

impl AckTarget {
    pub fn of(interaction: &Interaction) -> Self {
        Self {
            interaction_id: interaction.id,
            application_id: interaction.application_id,
            token: interaction.token.clone(),
            kind: interaction.kind(),
        }
    }

    /// The deferral sent on the handler's behalf.
    fn fallback(&self) -> InitialResponse {
        if self.kind.is_component() {
            InitialResponse::DeferredUpdate
        } else {
            InitialResponse::DeferredMessage { ephemeral: false }
        }
    }
}

/// How the initial acknowledgment ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// The handler's response was sent; carries its kind.
    Responded(&'static str),
    /// The handler finished without responding; a deferral was sent.
    Deferred,
    /// Nothing arrived before the timeout; a deferral was sent.
    TimedOut,
    /// The acknowledgment call failed.
    Failed(ApiError),
}

impl fmt::Display for AckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Responded(kind) => write!(f, "responded ({kind})"),
            Self::Deferred => f.write_str("deferred"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Owns the synchronous acknowledgment cycle of interactions.
#[derive(Clone)]
pub struct AckOwner {
    api: Arc<dyn InteractionApi>,
}

impl AckOwner {
    pub fn new(api: Arc<dyn InteractionApi>) -> Self {
        Self { api }
    }

    /// Runs the acknowledgment cycle of one interaction.
    ///
    /// Waits up to `timeout` for the initial handoff. With
    /// `can_edit_original`, the edit slot stays open until the same deadline.
    /// Both slots are closed on return.
    pub async fn run(
        &self,
        target: &AckTarget,
        mut receiver: ResponseReceiver,
        timeout: Duration,
        can_edit_original: bool,
    ) -> AckOutcome {
        let deadline = Instant::now() + timeout;

        let initial = timeout_at(deadline, receiver.initial.recv()).await;
        let outcome = match initial {
            Ok(Some(handoff)) => self.respond(target, &receiver, handoff).await,
            Ok(None) => {
                debug!(kind = target.kind.as_str(), "Handler finished without responding");
                self.defer(target, &receiver, AckOutcome::Deferred).await
            }
            // A handoff may have landed between the timer firing and the close.
            Err(_) => match receiver.initial.close() {
                Some(handoff) => self.respond(target, &receiver, handoff).await,
                None => {
                    debug!(
                        kind = target.kind.as_str(),
                        timeout_ms = timeout.as_millis() as u64,
                        "No initial response before timeout, deferring"
                    );
                    self.defer(target, &receiver, AckOutcome::TimedOut).await
                }
            },
        };

        if can_edit_original && !matches!(outcome, AckOutcome::Failed(_)) {
            let edit = match timeout_at(deadline, receiver.edit.recv()).await {
                Ok(edit) => edit,
                Err(_) => receiver.edit.close(),
            };
            if let Some(handoff) = edit {
                let result = self
                    .api
                    .edit_original(target.application_id, &target.token, handoff.payload())
                    .await;
                if let Err(e) = &result {
                    warn!(error = %e, "Failed to edit original response");
                }
                handoff.complete(result);
            }
        }

        outcome
    }

    async fn respond(
        &self,
        target: &AckTarget,
        receiver: &ResponseReceiver,
        handoff: Handoff<InitialResponse>,
    ) -> AckOutcome {
        let kind = handoff.payload().name();
        let result = self
            .api
            .create_response(target.interaction_id, &target.token, handoff.payload())
            .await;
        receiver.mark_acknowledged();

        let outcome = match &result {
            Ok(()) => AckOutcome::Responded(kind),
            Err(e) => {
                warn!(response = kind, error = %e, "Initial response failed");
                AckOutcome::Failed(e.clone())
            }
        };
        handoff.complete(result);
        outcome
    }

    async fn defer(
        &self,
        target: &AckTarget,
        receiver: &ResponseReceiver,
        outcome: AckOutcome,
    ) -> AckOutcome {
        let result = self
            .api
            .create_response(target.interaction_id, &target.token, &target.fallback())
            .await;
        receiver.mark_acknowledged();
        match result {
            Ok(()) => outcome,
            Err(e) => {
                warn!(error = %e, "Fallback deferral failed");
                AckOutcome::Failed(e)
            }
        }
    }
}

impl fmt::Debug for AckOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckOwner").finish_non_exhaustive()
    }
}
