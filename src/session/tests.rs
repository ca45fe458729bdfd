use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::*;
use crate::client::{ChatReply, ChatRequest, ChatService};
use crate::core::attachment::Attachment;
use crate::core::block::ContentBlock;
use crate::core::credentials::{CredentialStore, MemoryCredentialStore};
use crate::core::error::ChatError;
use crate::core::history::{RawRecord, WELCOME_GREETING};
use crate::core::status::{AccountStatus, Decision};
use crate::core::turn::Turn;
use crate::render::{Entry, PlaceholderHandle, Transcript, TranscriptView};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Chat(String),
    Upload(String, Option<String>),
    History,
    Status,
}

/// Scripted service that records every call it receives.
#[derive(Default)]
struct FakeService {
    calls: Mutex<Vec<Call>>,
    replies: Mutex<Vec<Result<ChatReply, ChatError>>>,
    history: Vec<RawRecord>,
    status: Option<Result<AccountStatus, ChatError>>,
}

impl FakeService {
    fn replying(reply: Result<ChatReply, ChatError>) -> Self {
        Self {
            replies: Mutex::new(vec![reply]),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Result<ChatReply, ChatError> {
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(ChatError::RequestFailed("no scripted reply".into())))
    }
}

#[async_trait]
impl ChatService for FakeService {
    async fn chat(&self, _token: &str, query: &str) -> Result<ChatReply, ChatError> {
        self.calls.lock().unwrap().push(Call::Chat(query.into()));
        self.next_reply()
    }

    async fn upload(
        &self,
        _token: &str,
        attachment: &Attachment,
        query: Option<&str>,
    ) -> Result<ChatReply, ChatError> {
        self.calls.lock().unwrap().push(Call::Upload(
            attachment.name.clone(),
            query.map(str::to_string),
        ));
        self.next_reply()
    }

    async fn history(&self, _token: &str) -> Result<Vec<RawRecord>, ChatError> {
        self.calls.lock().unwrap().push(Call::History);
        Ok(self.history.clone())
    }

    async fn account_status(&self, _token: &str) -> Result<AccountStatus, ChatError> {
        self.calls.lock().unwrap().push(Call::Status);
        self.status
            .clone()
            .unwrap_or_else(|| Ok(AccountStatus::default()))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ViewEvent {
    Turn(Turn),
    Placeholder,
    RemovePlaceholder,
}

/// Wraps a real transcript and logs the operations applied to it.
#[derive(Default)]
struct RecordingView {
    inner: Transcript,
    events: Vec<ViewEvent>,
}

impl TranscriptView for RecordingView {
    fn append_turn(&mut self, turn: &Turn) {
        self.events.push(ViewEvent::Turn(turn.clone()));
        self.inner.append_turn(turn);
    }

    fn append_placeholder(&mut self) -> PlaceholderHandle {
        self.events.push(ViewEvent::Placeholder);
        self.inner.append_placeholder()
    }

    fn remove_placeholder(&mut self, handle: PlaceholderHandle) {
        self.events.push(ViewEvent::RemovePlaceholder);
        self.inner.remove_placeholder(handle);
    }

    fn scroll_to_latest(&mut self) {
        self.inner.scroll_to_latest();
    }
}

fn controller(service: Arc<FakeService>, token: Option<&str>) -> SessionController {
    let creds: Arc<dyn CredentialStore> =
        Arc::new(MemoryCredentialStore::new(token.map(str::to_string)));
    SessionController::new(service, creds)
}

fn reply(blocks: Vec<ContentBlock>) -> Result<ChatReply, ChatError> {
    Ok(ChatReply {
        content: blocks,
        decision: None,
    })
}

#[tokio::test]
async fn test_text_submission_happy_path() {
    let service = Arc::new(FakeService::replying(reply(vec![
        ContentBlock::text("hello"),
        ContentBlock::code("int x;", Some("c".into())),
    ])));
    let mut ctl = controller(service.clone(), Some("tok"));
    let mut view = RecordingView::default();

    ctl.submit(&mut view, "  hi  ", None).await;

    assert_eq!(service.calls(), vec![Call::Chat("hi".into())]);
    assert_eq!(
        view.events,
        vec![
            ViewEvent::Turn(Turn::user(Some("hi".into()), None)),
            ViewEvent::Placeholder,
            ViewEvent::RemovePlaceholder,
            ViewEvent::Turn(Turn::assistant(vec![
                ContentBlock::text("hello"),
                ContentBlock::code("int x;", Some("c".into())),
            ])),
        ]
    );
    assert_eq!(ctl.pending_state(), PendingState::Idle);
    assert!(!view.inner.has_placeholder());
}

#[tokio::test]
async fn test_empty_submission_is_noop() {
    let service = Arc::new(FakeService::default());
    let mut ctl = controller(service.clone(), Some("tok"));
    let mut view = RecordingView::default();

    ctl.submit(&mut view, "   ", None).await;

    assert!(view.events.is_empty());
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_submission_while_awaiting_reply_is_noop() {
    let service = Arc::new(FakeService::replying(reply(vec![])));
    let mut ctl = controller(service.clone(), Some("tok"));
    let mut view = RecordingView::default();

    let pending = ctl.begin(&mut view, "first", None).expect("accepted");
    assert_eq!(ctl.pending_state(), PendingState::AwaitingReply);
    let entries_before = view.inner.entries().len();
    let turns_before = view.inner.turn_count();

    assert!(ctl.begin(&mut view, "second", None).is_none());
    ctl.submit(&mut view, "third", None).await;

    assert_eq!(view.inner.entries().len(), entries_before);
    assert_eq!(view.inner.turn_count(), turns_before);
    assert_eq!(ctl.pending_state(), PendingState::AwaitingReply);
    assert!(service.calls().is_empty());

    let outcome = pending.dispatch(service.as_ref()).await;
    ctl.finish(&mut view, pending, outcome);
    assert_eq!(ctl.pending_state(), PendingState::Idle);
    assert_eq!(service.calls(), vec![Call::Chat("first".into())]);
}

#[tokio::test]
async fn test_missing_credential_fails_locally() {
    let service = Arc::new(FakeService::default());
    let mut ctl = controller(service.clone(), None);
    let mut view = RecordingView::default();

    ctl.submit(&mut view, "hi", None).await;

    assert!(service.calls().is_empty());
    assert_eq!(
        view.events.last(),
        Some(&ViewEvent::Turn(Turn::error("Error: Not authenticated".into())))
    );
    // the user's message stays
    assert_eq!(
        view.events.first(),
        Some(&ViewEvent::Turn(Turn::user(Some("hi".into()), None)))
    );
    assert_eq!(ctl.pending_state(), PendingState::Idle);
    assert!(!view.inner.has_placeholder());
}

#[tokio::test]
async fn test_logout_forgets_credential() {
    let service = Arc::new(FakeService::default());
    let mut ctl = controller(service.clone(), Some("tok"));
    let mut view = RecordingView::default();

    ctl.logout().unwrap();
    assert!(ctl.credentials().get().is_none());

    ctl.submit(&mut view, "hi", None).await;
    assert!(service.calls().is_empty());
    assert_eq!(
        view.events.last(),
        Some(&ViewEvent::Turn(Turn::error("Error: Not authenticated".into())))
    );
}

#[tokio::test]
async fn test_request_failure_appends_error_after_user_turn() {
    let service = Arc::new(FakeService::replying(Err(ChatError::RequestFailed(
        "This interview has already been concluded.".into(),
    ))));
    let mut ctl = controller(service, Some("tok"));
    let mut view = RecordingView::default();

    ctl.submit(&mut view, "hello?", None).await;

    let turns = view.inner.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].user_text.as_deref(), Some("hello?"));
    assert_eq!(
        turns[1].blocks(),
        &[ContentBlock::text(
            "Error: This interview has already been concluded."
        )]
    );
    assert_eq!(ctl.pending_state(), PendingState::Idle);
}

#[tokio::test]
async fn test_malformed_response_surfaces_as_error_turn() {
    let service = Arc::new(FakeService::replying(Err(ChatError::MalformedResponse(
        "reply has no `content` array".into(),
    ))));
    let mut ctl = controller(service, Some("tok"));
    let mut view = RecordingView::default();

    ctl.submit(&mut view, "q", None).await;

    let last = view.inner.turns().last().unwrap();
    match &last.blocks()[0] {
        ContentBlock::Text { body } => assert!(body.starts_with("Error: Malformed response")),
        other => panic!("expected text, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_content_renders_empty_assistant_turn() {
    let service = Arc::new(FakeService::replying(reply(vec![])));
    let mut ctl = controller(service, Some("tok"));
    let mut view = RecordingView::default();

    ctl.submit(&mut view, "q", None).await;

    assert_eq!(
        view.events.last(),
        Some(&ViewEvent::Turn(Turn::assistant(vec![])))
    );
    assert!(matches!(
        view.inner.entries().last(),
        Some(Entry::Assistant { fragments, .. }) if fragments.is_empty()
    ));
}

#[tokio::test]
async fn test_attachment_uses_upload_with_query() {
    let service = Arc::new(FakeService::replying(reply(vec![ContentBlock::image(
        "/graphs/cfg/main.png",
        Some("cfg"),
    )])));
    let mut ctl = controller(service.clone(), Some("tok"));
    let mut view = RecordingView::default();

    let file = Attachment::new("main.c", b"int main;".to_vec());
    ctl.submit(&mut view, "graph this", Some(file)).await;

    assert_eq!(
        service.calls(),
        vec![Call::Upload("main.c".into(), Some("graph this".into()))]
    );
    assert_eq!(
        view.inner.turns()[0],
        Turn::user(Some("graph this".into()), Some("main.c".into()))
    );
}

#[tokio::test]
async fn test_attachment_only_submission_is_accepted() {
    let service = Arc::new(FakeService::replying(reply(vec![])));
    let mut ctl = controller(service.clone(), Some("tok"));
    let mut view = RecordingView::default();

    assert!(ctl.select_attachment(Attachment::new("a.py", b"x = 1".to_vec())));
    assert!(ctl.can_submit(""));
    ctl.submit(&mut view, "", None).await;

    assert_eq!(service.calls(), vec![Call::Upload("a.py".into(), None)]);
    assert_eq!(view.inner.turns()[0], Turn::user(None, Some("a.py".into())));
}

#[tokio::test]
async fn test_selection_is_cleared_after_success_and_failure() {
    let service = Arc::new(FakeService::replying(Err(ChatError::RequestFailed(
        "down".into(),
    ))));
    let mut ctl = controller(service.clone(), Some("tok"));
    let mut view = RecordingView::default();

    ctl.select_attachment(Attachment::new("a.py", b"1".to_vec()));
    ctl.submit(&mut view, "first", None).await;
    assert!(ctl.selected_attachment().is_none());

    // the next send must not reuse the stale file
    service.replies.lock().unwrap().push(reply(vec![]));
    ctl.submit(&mut view, "second", None).await;
    assert_eq!(
        service.calls(),
        vec![
            Call::Upload("a.py".into(), Some("first".into())),
            Call::Chat("second".into()),
        ]
    );
    assert!(ctl.selected_attachment().is_none());
}

#[tokio::test]
async fn test_placeholder_removed_before_every_outcome() {
    let service = Arc::new(FakeService::default());
    {
        let mut replies = service.replies.lock().unwrap();
        replies.push(reply(vec![ContentBlock::text("3")]));
        replies.push(Err(ChatError::RequestFailed("2".into())));
        replies.push(reply(vec![ContentBlock::text("1")]));
    }
    let mut ctl = controller(service, Some("tok"));
    let mut view = RecordingView::default();

    for q in ["a", "b", "c"] {
        ctl.submit(&mut view, q, None).await;
    }

    let mut open = false;
    let mut removals = 0;
    for event in &view.events {
        match event {
            ViewEvent::Placeholder => {
                assert!(!open);
                open = true;
            }
            ViewEvent::RemovePlaceholder => {
                assert!(open);
                open = false;
                removals += 1;
            }
            ViewEvent::Turn(turn) if turn.assistant.is_some() => assert!(!open),
            ViewEvent::Turn(_) => {}
        }
    }
    assert_eq!(removals, 3);
}

#[tokio::test]
async fn test_concluding_reply_locks_input() {
    let service = Arc::new(FakeService::replying(Ok(ChatReply {
        content: vec![ContentBlock::text("Thank you, we will be in touch.")],
        decision: Some(Decision::Approved),
    })));
    let mut ctl = controller(service.clone(), Some("tok"));
    let mut view = RecordingView::default();

    ctl.submit(&mut view, "done", None).await;
    assert!(!ctl.input_enabled());

    ctl.submit(&mut view, "anything else?", None).await;
    assert_eq!(service.calls().len(), 1);
}

#[tokio::test]
async fn test_pending_decision_keeps_input_open() {
    let service = Arc::new(FakeService::replying(Ok(ChatReply {
        content: vec![],
        decision: Some(Decision::from("N/A".to_string())),
    })));
    let mut ctl = controller(service, Some("tok"));
    let mut view = RecordingView::default();

    ctl.submit(&mut view, "q", None).await;
    assert!(ctl.input_enabled());
}

#[tokio::test]
async fn test_status_gate_approved_locks_permanently() {
    let service = Arc::new(FakeService {
        status: Some(Ok(AccountStatus {
            role: None,
            decision: Some(Decision::Approved),
        })),
        ..Default::default()
    });
    let mut ctl = controller(service.clone(), Some("tok"));
    let mut view = RecordingView::default();

    let outcome = ctl.check_status().await;
    assert!(!outcome.input_enabled);
    assert!(!ctl.input_enabled());
    assert!(!ctl.can_submit("hello"));

    ctl.submit(&mut view, "hello", None).await;
    assert!(view.events.is_empty());

    // an open outcome later cannot re-enable
    ctl.apply_gate(GateOutcome::OPEN);
    assert!(!ctl.input_enabled());
    assert_eq!(service.calls(), vec![Call::Status]);
}

#[tokio::test]
async fn test_status_gate_rejected_locks() {
    let service = Arc::new(FakeService {
        status: Some(Ok(AccountStatus {
            role: None,
            decision: Some(Decision::Rejected),
        })),
        ..Default::default()
    });
    let mut ctl = controller(service, Some("tok"));
    ctl.check_status().await;
    assert!(!ctl.input_enabled());
}

#[tokio::test]
async fn test_status_gate_failure_leaves_input_enabled() {
    let service = Arc::new(FakeService {
        status: Some(Err(ChatError::RequestFailed("Could not validate".into()))),
        ..Default::default()
    });
    let mut ctl = controller(service, Some("tok"));
    assert_eq!(ctl.check_status().await, GateOutcome::OPEN);
    assert!(ctl.input_enabled());
    assert!(ctl.uploads_enabled());
}

#[tokio::test]
async fn test_status_gate_without_credential_makes_no_call() {
    let service = Arc::new(FakeService::default());
    let mut ctl = controller(service.clone(), None);
    assert_eq!(ctl.check_status().await, GateOutcome::OPEN);
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_restricted_role_hides_uploads_only() {
    let service = Arc::new(FakeService {
        status: Some(Ok(AccountStatus {
            role: Some("restricted".into()),
            decision: None,
        })),
        replies: Mutex::new(vec![reply(vec![])]),
        ..Default::default()
    });
    let mut ctl = controller(service.clone(), Some("tok"));
    let mut view = RecordingView::default();

    ctl.check_status().await;
    assert!(ctl.input_enabled());
    assert!(!ctl.uploads_enabled());
    assert!(!ctl.select_attachment(Attachment::new("a.c", vec![])));

    ctl.submit(&mut view, "q", Some(Attachment::new("a.c", vec![])))
        .await;
    assert_eq!(service.calls(), vec![Call::Status]);

    ctl.submit(&mut view, "q", None).await;
    assert_eq!(service.calls(), vec![Call::Status, Call::Chat("q".into())]);
}

#[tokio::test]
async fn test_load_history_replays_in_order() {
    let service = Arc::new(FakeService {
        history: vec![
            RawRecord::new(None, Some(WELCOME_GREETING)),
            RawRecord::new(Some("hi"), Some("hello")),
            RawRecord::new(Some("and?"), None),
        ],
        ..Default::default()
    });
    let ctl = controller(service, Some("tok"));
    let mut view = RecordingView::default();

    let count = ctl.load_history(&mut view).await.unwrap();

    assert_eq!(count, 3);
    let turns = view.inner.turns();
    assert!(turns[0].is_welcome());
    assert_eq!(
        turns[1],
        Turn::exchange(Some("hi".into()), vec![ContentBlock::text("hello")])
    );
    assert_eq!(turns[2], Turn::exchange(Some("and?".into()), vec![]));
}

#[tokio::test]
async fn test_load_history_without_credential() {
    let service = Arc::new(FakeService::default());
    let ctl = controller(service.clone(), None);
    let mut view = RecordingView::default();

    let err = ctl.load_history(&mut view).await.unwrap_err();
    assert_eq!(err, ChatError::NotAuthenticated);
    assert!(service.calls().is_empty());
}

#[test]
fn test_pending_request_exposes_variant() {
    let service = Arc::new(FakeService::default());
    let mut ctl = controller(service, Some("tok"));
    let mut view = Transcript::new();
    let pending = ctl.begin(&mut view, "q", None).unwrap();
    assert_eq!(pending.request(), &ChatRequest::Text { query: "q".into() });
    assert!(view.has_placeholder());
}
