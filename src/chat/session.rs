//! Core chat session management.
//!
//! This module provides the [`ChatSessionClient`] which owns the selected role, the active
//! backend thread, and the transcript, and drives the backend through its lifecycle:
//!
//! ```text
//! NoSession --select_role/start ok--> SessionActive --select_role | end_session--> NoSession
//! ```
//!
//! Sending a message is not a state of its own; it is a single request gated on the session
//! being active.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::chat::config::ClientConfig;
use crate::chat::transcript::Transcript;
use crate::client::ChatBackend;
use crate::error::{Error, InputError, Result};
use crate::observability::{
    MESSAGES_REJECTED, MESSAGES_SENT, REQUESTS_ABORTED, SESSIONS_ENDED, SESSIONS_STARTED,
};
use crate::preferences::{MemoryStore, PreferenceStore, ThemeController};
use crate::render::Renderer;
use crate::types::{ChatRequest, ChatResponse, Message, Role, SessionRequest, Theme, ThreadId};

/// Notice appended when a new session begins.
pub const SESSION_STARTED_NOTICE: &str = "New conversation started. How can I assist you today?";

/// An open backend thread.
#[derive(Debug)]
struct Session {
    thread_id: ThreadId,
    role: Role,
    cancel: CancellationToken,
}

impl Session {
    fn request(&self) -> SessionRequest {
        SessionRequest::new(self.thread_id.clone(), self.role.clone())
    }
}

type InFlight = Arc<Mutex<Option<CancellationToken>>>;

/// Cancels the chat request that is currently in flight, if any.
///
/// The handle is `Send + Sync` and may be used from a signal handler thread.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    in_flight: InFlight,
}

impl AbortHandle {
    /// Cancels the pending request.  Returns true if there was one.
    pub fn abort(&self) -> bool {
        match self.in_flight.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(token) => {
                    token.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}

/// Browser-style chat client: role selection, one backend thread at a time, and a transcript.
///
/// Input that cannot be sent is rejected locally without touching the backend:
///
/// ```
/// # use rolechat::{ChatSessionClient, ClientConfig, HttpBackend, InputError, PlainTextRenderer};
/// # tokio_test::block_on(async {
/// let backend = HttpBackend::new("http://127.0.0.1:5000/").unwrap();
/// let mut client = ChatSessionClient::new(backend, ClientConfig::new().without_color());
/// let mut renderer = PlainTextRenderer::with_color(false);
///
/// let err = client.send_message("Hello", &mut renderer).await.unwrap_err();
/// assert_eq!(err.input_kind(), Some(InputError::NoRole));
/// assert!(client.transcript().is_empty());
/// # });
/// ```
pub struct ChatSessionClient<B: ChatBackend> {
    backend: B,
    config: ClientConfig,
    role: Option<Role>,
    session: Option<Session>,
    transcript: Transcript,
    theme: ThemeController<Arc<dyn PreferenceStore>>,
    in_flight: InFlight,
}

impl<B: ChatBackend> ChatSessionClient<B> {
    /// Creates a client whose theme preference lives only in memory.
    pub fn new(backend: B, config: ClientConfig) -> Self {
        Self::with_preferences(backend, config, Arc::new(MemoryStore::new()), None)
    }

    /// Creates a client with a persistent preference store.
    ///
    /// The initial theme is the stored one, else `os_theme`, else light.  A theme set in
    /// `config` is applied on top and persisted.
    pub fn with_preferences(
        backend: B,
        config: ClientConfig,
        store: Arc<dyn PreferenceStore>,
        os_theme: Option<Theme>,
    ) -> Self {
        let mut theme = ThemeController::load(store, os_theme);
        if let Some(forced) = config.theme
            && let Err(err) = theme.set(forced)
        {
            tracing::warn!(error = %err, "could not persist configured theme");
        }
        Self {
            backend,
            config,
            role: None,
            session: None,
            transcript: Transcript::new(),
            theme,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Switches to `role`, ending any active session first.
    ///
    /// Exactly one `/end_session` is issued for the previous thread, and it completes (or
    /// fails, which is only logged) before `/start` is requested.  On success the transcript is
    /// replaced by a single notice.  On failure the error is logged and returned; the role stays
    /// selected, no session is active, and the transcript is untouched.
    pub async fn select_role(&mut self, role: Role, renderer: &mut dyn Renderer) -> Result<()> {
        if let Some(previous) = self.session.take() {
            self.release(previous).await;
        }
        self.role = Some(role.clone());

        let started = match self.backend.start(&role).await {
            Ok(started) => started,
            Err(err) => {
                tracing::error!(role = %role, error = %err, "failed to start session");
                return Err(err);
            }
        };

        SESSIONS_STARTED.click();
        tracing::info!(role = %role, thread_id = %started.thread_id, "session started");
        self.session = Some(Session {
            thread_id: started.thread_id,
            role,
            cancel: CancellationToken::new(),
        });
        self.transcript.clear();
        renderer.clear_transcript();
        self.append(Message::system(SESSION_STARTED_NOTICE), renderer);
        Ok(())
    }

    /// Sends one user turn and appends the reply.
    ///
    /// Input is rejected with an alert, and without any request, when no role is selected, no
    /// session is active, or `text` is blank.  The user message is shown before the request is
    /// made.  When the request fails the loading indicator is cleared, the error is logged, and
    /// no assistant message is appended.
    pub async fn send_message(&mut self, text: &str, renderer: &mut dyn Renderer) -> Result<()> {
        let text = text.trim();
        let Some(session) = self.session.as_ref().filter(|_| self.role.is_some()) else {
            let kind = if self.role.is_none() {
                InputError::NoRole
            } else {
                InputError::NoSession
            };
            return Err(reject(kind, renderer));
        };
        if text.is_empty() {
            return Err(reject(InputError::EmptyMessage, renderer));
        }

        let request = ChatRequest::new(session.thread_id.clone(), text, session.role.clone());
        let token = session.cancel.child_token();
        let thread_id = session.thread_id.clone();

        self.append(Message::user(text, self.config.escape_user_text), renderer);
        renderer.set_loading(true);
        self.set_in_flight(Some(token.clone()));

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::abort("chat request cancelled")),
            response = self.backend.chat(&request) => response.and_then(ChatResponse::into_text),
        };

        self.set_in_flight(None);
        renderer.set_loading(false);

        match outcome {
            Ok(reply) => {
                MESSAGES_SENT.click();
                tracing::debug!(thread_id = %thread_id, "reply received");
                let message = Message::assistant(reply, self.config.escape_assistant_text);
                self.append(message, renderer);
                Ok(())
            }
            Err(err) => {
                self.report_failure("chat", &err, renderer);
                Err(err)
            }
        }
    }

    /// Ends the active session.
    ///
    /// In-flight work for the session is cancelled, local state and the transcript are cleared,
    /// and `/end_session` is posted.  Its outcome is only logged.  Returns false when there was
    /// no session to end.
    pub async fn end_session(&mut self, renderer: &mut dyn Renderer) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        self.transcript.clear();
        renderer.clear_transcript();
        self.release(session).await;
        true
    }

    /// Replaces the displayed transcript with one saved by [`Transcript::save_json`].
    ///
    /// Only the local view changes; the backend thread, if any, is untouched.  On error the
    /// current transcript is kept.  Returns the number of messages loaded.
    pub fn load_transcript<P: AsRef<Path>>(
        &mut self,
        path: P,
        renderer: &mut dyn Renderer,
    ) -> Result<usize> {
        let loaded = Transcript::load_json(path)?;
        self.transcript.clear();
        renderer.clear_transcript();
        for message in loaded.messages() {
            self.append(message.clone(), renderer);
        }
        Ok(self.transcript.len())
    }

    /// Requests a summary of the active session and appends it as a system entry.
    pub async fn review_session(&mut self, renderer: &mut dyn Renderer) -> Result<()> {
        if !self.config.enable_review_summary {
            return Err(reject(InputError::FeatureDisabled, renderer));
        }
        let request = match (&self.role, &self.session) {
            (None, _) => return Err(reject(InputError::NoRole, renderer)),
            (Some(_), None) => return Err(reject(InputError::NoSession, renderer)),
            (Some(_), Some(session)) => session.request(),
        };

        renderer.set_loading(true);
        let outcome = self.backend.review_session(&request).await;
        renderer.set_loading(false);

        match outcome {
            Ok(review) => {
                self.append(Message::system_html(review.summary), renderer);
                Ok(())
            }
            Err(err) => {
                self.report_failure("review_session", &err, renderer);
                Err(err)
            }
        }
    }

    /// Applies the light or dark theme and persists the choice.
    ///
    /// The theme is applied even if persisting fails; the persistence error is returned.
    pub fn toggle_theme(&mut self, dark: bool, renderer: &mut dyn Renderer) -> Result<()> {
        self.set_theme(Theme::from_dark(dark), renderer)
    }

    /// Applies `theme` and persists it.
    pub fn set_theme(&mut self, theme: Theme, renderer: &mut dyn Renderer) -> Result<()> {
        renderer.apply_theme(theme);
        self.theme.set(theme).inspect_err(|err| {
            tracing::warn!(theme = %theme, error = %err, "could not persist theme");
        })
    }

    /// The theme currently in effect.
    pub fn theme(&self) -> Theme {
        self.theme.theme()
    }

    /// The selected role, if any.
    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    /// The active thread id, if a session is open.
    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.session.as_ref().map(|session| &session.thread_id)
    }

    /// Returns true while a session is open.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// The messages displayed for the current session.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The backend this client talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns a handle that cancels the in-flight chat request.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    fn append(&mut self, message: Message, renderer: &mut dyn Renderer) {
        renderer.append_message(&message);
        self.transcript.push(message);
    }

    fn set_in_flight(&self, token: Option<CancellationToken>) {
        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = token;
        }
    }

    /// Cancels the session's pending work and tells the backend, best effort.
    async fn release(&self, session: Session) {
        session.cancel.cancel();
        SESSIONS_ENDED.click();
        match self.backend.end_session(&session.request()).await {
            Ok(response) => tracing::info!(
                role = %session.role,
                thread_id = %session.thread_id,
                status = response.status.as_deref().unwrap_or("unknown"),
                "session ended"
            ),
            Err(err) => tracing::warn!(
                role = %session.role,
                thread_id = %session.thread_id,
                error = %err,
                "error ending session"
            ),
        }
    }

    fn report_failure(&mut self, operation: &str, err: &Error, renderer: &mut dyn Renderer) {
        match err {
            Error::Abort { .. } => {
                REQUESTS_ABORTED.click();
                tracing::info!(operation, "request cancelled");
                return;
            }
            Error::Backend { message } => {
                tracing::error!(operation, error = %err, "backend reported an error");
                if self.config.surface_backend_errors {
                    renderer.alert(message);
                }
            }
            _ => tracing::error!(operation, error = %err, "request failed"),
        }
        if self.config.append_error_messages {
            self.append(Message::system(format!("Error: {err}")), renderer);
        }
    }
}

fn reject(kind: InputError, renderer: &mut dyn Renderer) -> Error {
    MESSAGES_REJECTED.click();
    tracing::debug!(reason = ?kind, "input rejected");
    renderer.alert(kind.user_message());
    Error::input(kind)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::preferences::THEME_KEY;
    use crate::types::{EndSessionResponse, ReviewSummary, Sender, StartResponse};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start(String),
        Chat(ChatRequest),
        End(SessionRequest),
        Review(SessionRequest),
    }

    #[derive(Default)]
    struct ScriptedBackend {
        calls: Mutex<Vec<Call>>,
        starts: Mutex<VecDeque<Result<StartResponse>>>,
        chats: Mutex<VecDeque<Result<ChatResponse>>>,
        ends: Mutex<VecDeque<Result<EndSessionResponse>>>,
        hang_chat: bool,
    }

    impl ScriptedBackend {
        fn hanging() -> Self {
            Self {
                hang_chat: true,
                ..Self::default()
            }
        }

        fn push_start(&self, result: Result<StartResponse>) {
            self.starts.lock().unwrap().push_back(result);
        }

        fn push_chat(&self, result: Result<ChatResponse>) {
            self.chats.lock().unwrap().push_back(result);
        }

        fn push_end(&self, result: Result<EndSessionResponse>) {
            self.ends.lock().unwrap().push_back(result);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn start(&self, role: &Role) -> Result<StartResponse> {
            self.record(Call::Start(role.to_string()));
            let count = self.calls().len();
            self.starts.lock().unwrap().pop_front().unwrap_or_else(|| {
                Ok(StartResponse {
                    thread_id: ThreadId::new(format!("thread_{count}")),
                })
            })
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.record(Call::Chat(request.clone()));
            if self.hang_chat {
                return std::future::pending().await;
            }
            self.chats
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::connection("no scripted reply", None)))
        }

        async fn end_session(&self, request: &SessionRequest) -> Result<EndSessionResponse> {
            self.record(Call::End(request.clone()));
            self.ends
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(EndSessionResponse::default()))
        }

        async fn review_session(&self, request: &SessionRequest) -> Result<ReviewSummary> {
            self.record(Call::Review(request.clone()));
            Ok(ReviewSummary {
                summary: "<p>Two turns so far.</p>".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        appended: Vec<Sender>,
        alerts: Vec<String>,
        loading: Vec<bool>,
        clears: usize,
        theme: Option<Theme>,
    }

    impl Renderer for RecordingRenderer {
        fn append_message(&mut self, message: &Message) {
            self.appended.push(message.sender);
        }

        fn clear_transcript(&mut self) {
            self.clears += 1;
        }

        fn set_loading(&mut self, loading: bool) {
            self.loading.push(loading);
        }

        fn alert(&mut self, warning: &str) {
            self.alerts.push(warning.to_string());
        }

        fn apply_theme(&mut self, theme: Theme) {
            self.theme = Some(theme);
        }

        fn print_error(&mut self, _: &str) {}

        fn print_info(&mut self, _: &str) {}
    }

    fn role(name: &str) -> Role {
        Role::new(name).unwrap()
    }

    fn client(backend: Arc<ScriptedBackend>) -> ChatSessionClient<Arc<ScriptedBackend>> {
        ChatSessionClient::new(backend, ClientConfig::new())
    }

    #[tokio::test]
    async fn send_without_role_makes_no_request() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();

        let err = client.send_message("Hello", &mut renderer).await.unwrap_err();
        assert_eq!(err.input_kind(), Some(InputError::NoRole));
        assert_eq!(
            renderer.alerts,
            vec!["Please select a role before sending a message.".to_string()]
        );
        assert!(backend.calls().is_empty());
        assert!(client.transcript().is_empty());
    }

    #[tokio::test]
    async fn start_leaves_single_notice() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();

        client
            .select_role(role("village_chief"), &mut renderer)
            .await
            .unwrap();
        assert!(client.has_session());
        assert_eq!(client.transcript().len(), 1);
        let notice = client.transcript().last().unwrap();
        assert_eq!(notice.sender, Sender::System);
        assert_eq!(notice.text, SESSION_STARTED_NOTICE);
        assert_eq!(renderer.clears, 1);
    }

    #[tokio::test]
    async fn hello_round_trip() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_start(Ok(StartResponse {
            thread_id: ThreadId::new("thread_abc"),
        }));
        backend.push_chat(Ok(ChatResponse::reply("**Hi**")));
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();

        client
            .select_role(role("village_chief"), &mut renderer)
            .await
            .unwrap();
        client.send_message("  Hello ", &mut renderer).await.unwrap();

        let messages = client.transcript().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[1].text, "Hello");
        assert_eq!(messages[2].sender, Sender::Assistant);
        assert!(messages[2].html.contains("<strong>Hi</strong>"));
        assert_eq!(renderer.loading, vec![true, false]);
        assert_eq!(
            backend.calls()[1],
            Call::Chat(ChatRequest::new(
                ThreadId::new("thread_abc"),
                "Hello",
                role("village_chief")
            ))
        );
    }

    #[tokio::test]
    async fn blank_message_rejected() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();
        client.select_role(role("farmer"), &mut renderer).await.unwrap();

        let err = client.send_message("   ", &mut renderer).await.unwrap_err();
        assert_eq!(err.input_kind(), Some(InputError::EmptyMessage));
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(client.transcript().len(), 1);
    }

    #[tokio::test]
    async fn ended_session_blocks_sending() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();
        client.select_role(role("farmer"), &mut renderer).await.unwrap();

        assert!(client.end_session(&mut renderer).await);
        assert!(client.thread_id().is_none());
        assert!(client.transcript().is_empty());
        assert_eq!(client.role(), Some(&role("farmer")));

        let err = client.send_message("Hello", &mut renderer).await.unwrap_err();
        assert_eq!(err.input_kind(), Some(InputError::NoSession));
        assert!(!backend.calls().iter().any(|c| matches!(c, Call::Chat(_))));

        assert!(!client.end_session(&mut renderer).await);
        client.select_role(role("farmer"), &mut renderer).await.unwrap();
        backend.push_chat(Ok(ChatResponse::reply("ok")));
        client.send_message("Hello", &mut renderer).await.unwrap();
    }

    #[tokio::test]
    async fn role_change_ends_previous_thread_first() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_start(Ok(StartResponse {
            thread_id: ThreadId::new("thread_a"),
        }));
        backend.push_start(Ok(StartResponse {
            thread_id: ThreadId::new("thread_b"),
        }));
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();

        client.select_role(role("farmer"), &mut renderer).await.unwrap();
        client.select_role(role("merchant"), &mut renderer).await.unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                Call::Start("farmer".to_string()),
                Call::End(SessionRequest::new(ThreadId::new("thread_a"), role("farmer"))),
                Call::Start("merchant".to_string()),
            ]
        );
        assert_eq!(client.thread_id(), Some(&ThreadId::new("thread_b")));
    }

    #[tokio::test]
    async fn failed_end_does_not_block_role_change() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_start(Ok(StartResponse {
            thread_id: ThreadId::new("thread_a"),
        }));
        backend.push_start(Ok(StartResponse {
            thread_id: ThreadId::new("thread_b"),
        }));
        backend.push_end(Err(Error::api(500, "Internal Server Error")));
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();

        client.select_role(role("farmer"), &mut renderer).await.unwrap();
        client.select_role(role("merchant"), &mut renderer).await.unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                Call::Start("farmer".to_string()),
                Call::End(SessionRequest::new(ThreadId::new("thread_a"), role("farmer"))),
                Call::Start("merchant".to_string()),
            ]
        );
        assert!(client.has_session());
        assert_eq!(client.thread_id(), Some(&ThreadId::new("thread_b")));
        assert_eq!(client.role(), Some(&role("merchant")));
        assert_eq!(client.transcript().len(), 1);
        assert_eq!(
            client.transcript().last().unwrap().text,
            SESSION_STARTED_NOTICE
        );
    }

    #[tokio::test]
    async fn saved_transcript_loads_back() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Ok(ChatResponse::reply("**Hi**")));
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();
        client
            .select_role(role("village_chief"), &mut renderer)
            .await
            .unwrap();
        client.send_message("Hello", &mut renderer).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chief.json");
        client.transcript().save_json(&path).unwrap();
        client.end_session(&mut renderer).await;
        assert!(client.transcript().is_empty());

        let mut viewer = RecordingRenderer::default();
        assert_eq!(client.load_transcript(&path, &mut viewer).unwrap(), 3);
        assert_eq!(viewer.clears, 1);
        assert_eq!(
            viewer.appended,
            vec![Sender::System, Sender::User, Sender::Assistant]
        );
        assert!(client.transcript().last().unwrap().html.contains("<strong>Hi</strong>"));

        std::fs::write(&path, "{").unwrap();
        assert!(client.load_transcript(&path, &mut viewer).is_err());
        assert_eq!(client.transcript().len(), 3);
    }

    struct ReadOnlyStore;

    impl PreferenceStore for ReadOnlyStore {
        fn get(&self, _: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _: &str, _: &str) -> Result<()> {
            Err(Error::config("read-only"))
        }
    }

    #[test]
    fn unsaved_theme_still_applies() {
        let mut client = ChatSessionClient::with_preferences(
            Arc::new(ScriptedBackend::default()),
            ClientConfig::new(),
            Arc::new(ReadOnlyStore),
            None,
        );
        let mut renderer = RecordingRenderer::default();

        assert!(client.set_theme(Theme::Dark, &mut renderer).is_err());
        assert_eq!(client.theme(), Theme::Dark);
        assert_eq!(renderer.theme, Some(Theme::Dark));
    }

    #[tokio::test]
    async fn failed_start_keeps_transcript() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();
        client.select_role(role("farmer"), &mut renderer).await.unwrap();

        backend.push_start(Err(Error::connection("refused", None)));
        let err = client
            .select_role(role("merchant"), &mut renderer)
            .await
            .unwrap_err();
        assert!(err.is_connection());
        assert_eq!(client.role(), Some(&role("merchant")));
        assert!(!client.has_session());
        assert_eq!(client.transcript().len(), 1);
    }

    #[tokio::test]
    async fn failed_chat_leaves_no_reply() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();
        client.select_role(role("farmer"), &mut renderer).await.unwrap();

        let err = client.send_message("Hello", &mut renderer).await.unwrap_err();
        assert!(err.is_connection());
        assert_eq!(client.transcript().len(), 2);
        assert_eq!(client.transcript().last().unwrap().sender, Sender::User);
        assert_eq!(renderer.loading, vec![true, false]);
        assert!(renderer.alerts.is_empty());

        backend.push_chat(Ok(ChatResponse::reply("still here")));
        client.send_message("Again", &mut renderer).await.unwrap();
        assert_eq!(client.transcript().len(), 4);
    }

    #[tokio::test]
    async fn backend_error_alerts_and_optionally_appends() {
        let backend = Arc::new(ScriptedBackend::default());
        let config = ClientConfig::new().with_append_error_messages(true);
        let mut client = ChatSessionClient::new(Arc::clone(&backend), config);
        let mut renderer = RecordingRenderer::default();
        client.select_role(role("farmer"), &mut renderer).await.unwrap();

        backend.push_chat(Ok(ChatResponse::failure("No active conversation for this role")));
        let err = client.send_message("Hello", &mut renderer).await.unwrap_err();
        assert!(err.is_backend());
        assert_eq!(
            renderer.alerts,
            vec!["No active conversation for this role".to_string()]
        );
        let last = client.transcript().last().unwrap();
        assert_eq!(last.sender, Sender::System);
        assert!(last.text.contains("No active conversation"));
    }

    #[tokio::test]
    async fn backend_error_silent_when_configured() {
        let backend = Arc::new(ScriptedBackend::default());
        let config = ClientConfig::new().with_surface_backend_errors(false);
        let mut client = ChatSessionClient::new(Arc::clone(&backend), config);
        let mut renderer = RecordingRenderer::default();
        client.select_role(role("farmer"), &mut renderer).await.unwrap();

        backend.push_chat(Ok(ChatResponse::failure("nope")));
        assert!(client.send_message("Hello", &mut renderer).await.is_err());
        assert!(renderer.alerts.is_empty());
        assert_eq!(client.transcript().len(), 2);
    }

    #[tokio::test]
    async fn abort_handle_cancels_pending_chat() {
        let backend = Arc::new(ScriptedBackend::hanging());
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();
        client.select_role(role("farmer"), &mut renderer).await.unwrap();

        let handle = client.abort_handle();
        assert!(!handle.abort());
        let aborter = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            handle.abort()
        });

        let err = client.send_message("Hello", &mut renderer).await.unwrap_err();
        assert!(err.is_abort());
        assert!(aborter.await.unwrap());
        assert_eq!(client.transcript().last().unwrap().sender, Sender::User);
        assert_eq!(renderer.loading, vec![true, false]);
        assert!(client.has_session());
    }

    #[tokio::test]
    async fn review_requires_flag_and_session() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut client = client(Arc::clone(&backend));
        let mut renderer = RecordingRenderer::default();
        client.select_role(role("farmer"), &mut renderer).await.unwrap();
        let err = client.review_session(&mut renderer).await.unwrap_err();
        assert_eq!(err.input_kind(), Some(InputError::FeatureDisabled));

        let backend = Arc::new(ScriptedBackend::default());
        let config = ClientConfig::new().with_review_summary(true);
        let mut client = ChatSessionClient::new(Arc::clone(&backend), config);
        let err = client.review_session(&mut renderer).await.unwrap_err();
        assert_eq!(err.input_kind(), Some(InputError::NoRole));

        client.select_role(role("farmer"), &mut renderer).await.unwrap();
        client.review_session(&mut renderer).await.unwrap();
        let last = client.transcript().last().unwrap();
        assert_eq!(last.html, "<p>Two turns so far.</p>");
        assert!(matches!(backend.calls().last(), Some(Call::Review(_))));
    }

    #[tokio::test]
    async fn theme_survives_reconstruction() {
        let store: Arc<dyn PreferenceStore> = Arc::new(MemoryStore::new());
        let mut renderer = RecordingRenderer::default();
        let backend = Arc::new(ScriptedBackend::default());

        let mut first = ChatSessionClient::with_preferences(
            Arc::clone(&backend),
            ClientConfig::new(),
            Arc::clone(&store),
            None,
        );
        assert_eq!(first.theme(), Theme::Light);
        first.toggle_theme(true, &mut renderer).unwrap();
        assert_eq!(renderer.theme, Some(Theme::Dark));
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));

        let second = ChatSessionClient::with_preferences(
            backend,
            ClientConfig::new(),
            store,
            Some(Theme::Light),
        );
        assert_eq!(second.theme(), Theme::Dark);
    }
}
