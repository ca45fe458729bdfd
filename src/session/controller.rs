use std::sync::Arc;

use super::gate::{self, GateOutcome};
use crate::client::{ChatReply, ChatRequest, ChatService};
use crate::core::attachment::Attachment;
use crate::core::credentials::CredentialStore;
use crate::core::error::{ChatError, CredentialError};
use crate::core::history;
use crate::core::turn::Turn;
use crate::render::{PlaceholderHandle, TranscriptView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingState {
    #[default]
    Idle,
    AwaitingReply,
}

/// An accepted submission whose request has not been answered yet.
///
/// Produced by [`SessionController::begin`] and consumed by
/// [`SessionController::finish`].
#[derive(Debug)]
pub struct PendingRequest {
    placeholder: PlaceholderHandle,
    token: String,
    request: ChatRequest,
}

impl PendingRequest {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    /// Issue the request. This is the only suspension point of a submission.
    pub async fn dispatch(&self, service: &dyn ChatService) -> Result<ChatReply, ChatError> {
        self.request.send(service, &self.token).await
    }
}

/// Drives the send flow: at most one request in flight, user turn rendered
/// up front, exactly one outcome turn afterwards.
pub struct SessionController {
    service: Arc<dyn ChatService>,
    credentials: Arc<dyn CredentialStore>,
    pending: PendingState,
    input_enabled: bool,
    uploads_enabled: bool,
    selection: Option<Attachment>,
}

impl SessionController {
    pub fn new(service: Arc<dyn ChatService>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            service,
            credentials,
            pending: PendingState::Idle,
            input_enabled: true,
            uploads_enabled: true,
            selection: None,
        }
    }

    pub fn service(&self) -> Arc<dyn ChatService> {
        Arc::clone(&self.service)
    }

    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.credentials)
    }

    pub fn pending_state(&self) -> PendingState {
        self.pending
    }

    pub fn is_busy(&self) -> bool {
        self.pending == PendingState::AwaitingReply
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn uploads_enabled(&self) -> bool {
        self.uploads_enabled
    }

    pub fn selected_attachment(&self) -> Option<&Attachment> {
        self.selection.as_ref()
    }

    /// Remember a file for the next submission. Refused when uploads are
    /// hidden for this account.
    pub fn select_attachment(&mut self, attachment: Attachment) -> bool {
        if !self.uploads_enabled {
            return false;
        }
        self.selection = Some(attachment);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Whether the send control should be enabled for this draft.
    pub fn can_submit(&self, text: &str) -> bool {
        self.input_enabled
            && !self.is_busy()
            && (!text.trim().is_empty() || self.selection.is_some())
    }

    /// Apply a status-gate result. Gates only ever close.
    pub fn apply_gate(&mut self, outcome: GateOutcome) {
        if !outcome.input_enabled {
            self.lock_input();
        }
        if !outcome.uploads_enabled {
            self.uploads_enabled = false;
            self.selection = None;
        }
    }

    fn lock_input(&mut self) {
        if self.input_enabled {
            tracing::info!("conversation concluded; input disabled");
        }
        self.input_enabled = false;
    }

    /// Forget the stored credential. Later submissions fail with
    /// `NotAuthenticated` until a new token is stored.
    pub fn logout(&mut self) -> Result<(), CredentialError> {
        self.credentials.remove()?;
        self.selection = None;
        tracing::info!("credential removed");
        Ok(())
    }

    /// Run the status gate once and apply its outcome.
    pub async fn check_status(&mut self) -> GateOutcome {
        let outcome = gate::check_status(self.service.as_ref(), self.credentials.as_ref()).await;
        self.apply_gate(outcome);
        outcome
    }

    /// Fetch, normalize and render the stored conversation. Returns the
    /// number of turns appended.
    pub async fn load_history(&self, view: &mut dyn TranscriptView) -> Result<usize, ChatError> {
        let token = self.credentials.get().ok_or(ChatError::NotAuthenticated)?;
        let records = self.service.history(&token).await?;
        let turns = history::normalize(&records);
        for turn in &turns {
            view.append_turn(turn);
        }
        view.scroll_to_latest();
        tracing::debug!("replayed {} history turns", turns.len());
        Ok(turns.len())
    }

    /// Accept a submission and render its user side.
    ///
    /// Returns `None` when the submission is rejected (nothing changes) or
    /// when it already failed locally (the error turn is rendered). An explicit
    /// `attachment` takes precedence over the current selection.
    pub fn begin(
        &mut self,
        view: &mut dyn TranscriptView,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Option<PendingRequest> {
        if self.is_busy() {
            tracing::debug!("submission ignored: awaiting reply");
            return None;
        }
        if !self.input_enabled {
            tracing::debug!("submission ignored: input disabled");
            return None;
        }

        let text = text.trim();
        let attachment = attachment.or_else(|| self.selection.clone());
        if text.is_empty() && attachment.is_none() {
            return None;
        }
        if attachment.is_some() && !self.uploads_enabled {
            tracing::debug!("submission ignored: uploads disabled");
            return None;
        }

        self.pending = PendingState::AwaitingReply;
        view.append_turn(&Turn::user(
            Some(text.to_string()).filter(|t| !t.is_empty()),
            attachment.as_ref().map(|a| a.name.clone()),
        ));
        let placeholder = view.append_placeholder();
        let request = ChatRequest::new(text.to_string(), attachment);

        match self.credentials.get() {
            Some(token) => Some(PendingRequest {
                placeholder,
                token,
                request,
            }),
            None => {
                self.settle(view, placeholder, Err(ChatError::NotAuthenticated));
                None
            }
        }
    }

    /// Reconcile the outcome of a request started by [`begin`](Self::begin).
    pub fn finish(
        &mut self,
        view: &mut dyn TranscriptView,
        pending: PendingRequest,
        outcome: Result<ChatReply, ChatError>,
    ) {
        self.settle(view, pending.placeholder, outcome);
    }

    fn settle(
        &mut self,
        view: &mut dyn TranscriptView,
        placeholder: PlaceholderHandle,
        outcome: Result<ChatReply, ChatError>,
    ) {
        view.remove_placeholder(placeholder);
        match outcome {
            Ok(reply) => {
                view.append_turn(&Turn::assistant(reply.content));
                if reply.decision.as_ref().is_some_and(|d| d.is_final()) {
                    self.lock_input();
                }
            }
            Err(e) => {
                tracing::warn!("chat request failed: {e}");
                view.append_turn(&Turn::error(e.transcript_message()));
            }
        }
        self.pending = PendingState::Idle;
        self.selection = None;
    }

    /// Begin, dispatch and finish in one go.
    pub async fn submit(
        &mut self,
        view: &mut dyn TranscriptView,
        text: &str,
        attachment: Option<Attachment>,
    ) {
        let Some(pending) = self.begin(view, text, attachment) else {
            return;
        };
        let service = self.service();
        let outcome = pending.dispatch(service.as_ref()).await;
        self.finish(view, pending, outcome);
    }
}
