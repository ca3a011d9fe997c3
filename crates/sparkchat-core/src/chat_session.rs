//! Chat session state machine.
//!
//! A send is split in three steps so the front end can keep handling input while the
//! request runs:
//!
//! 1. [`ChatSession::begin_send`] validates the input, appends the user message
//!    immediately and hands out a [`PendingCompletion`].
//! 2. [`PendingCompletion::run`] performs the single network call, bounded by the request
//!    timeout and the session's cancellation token. It does not borrow the session.
//! 3. [`ChatSession::finish_send`] appends the assistant reply or raises an error
//!    notification, and returns the session to `Idle`.
//!
//! Only one request may be in flight; a second `begin_send` while `Sending` is rejected.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core_types::{ChatMessage, Notification, Role, WireMessage};
use crate::credentials::{CredentialStore, Credentials, API_KEY_NAME, SYSTEM_PROMPT_NAME};
use crate::errors::ChatError;
use crate::llm::ChatCompletion;
use crate::session::Session;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const REQUEST_FAILED_DESCRIPTION: &str = "Failed to get response from OpenAI. Check your API key.";

fn describe_wait(waited: Duration) -> String {
    if waited.subsec_nanos() == 0 {
        match waited.as_secs() {
            1 => "1 second".to_string(),
            secs => format!("{} seconds", secs),
        }
    } else {
        format!("{} ms", waited.as_millis())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    Sending,
}

#[derive(Debug)]
struct InFlight {
    request_id: u64,
    cancel: CancellationToken,
}

/// A request that has been accepted by the session but not yet sent.
#[derive(Debug)]
pub struct PendingCompletion {
    request_id: u64,
    api_key: String,
    messages: Vec<WireMessage>,
    timeout: Duration,
    cancel: CancellationToken,
}

/// Result of running a [`PendingCompletion`], to be fed back into [`ChatSession::finish_send`].
#[derive(Debug)]
pub struct CompletionOutcome {
    request_id: u64,
    result: Result<String, ChatError>,
}

impl CompletionOutcome {
    pub fn result(&self) -> &Result<String, ChatError> {
        &self.result
    }
}

impl PendingCompletion {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// The ordered request payload: system prompt, prior history, new user message.
    pub fn messages(&self) -> &[WireMessage] {
        &self.messages
    }

    pub async fn run(self, client: &dyn ChatCompletion) -> CompletionOutcome {
        let timeout = self.timeout;
        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(ChatError::Cancelled),
            res = tokio::time::timeout(timeout, client.complete(&self.api_key, &self.messages)) => {
                match res {
                    Ok(inner) => inner,
                    Err(_) => Err(ChatError::Timeout(timeout)),
                }
            }
        };

        CompletionOutcome {
            request_id: self.request_id,
            result,
        }
    }
}

pub struct ChatSession {
    session: Session,
    credentials: Credentials,
    store: Box<dyn CredentialStore>,
    notifications: mpsc::UnboundedSender<Notification>,
    request_timeout: Duration,
    in_flight: Option<InFlight>,
    next_request_id: u64,
}

impl ChatSession {
    /// Starts a fresh session, reading the current credentials from `store`.
    pub fn new(
        store: Box<dyn CredentialStore>,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Result<Self, ChatError> {
        let credentials = Credentials::load(store.as_ref())?;
        let session = Session::new();
        log::info!(
            "Chat session {} started (api key configured: {})",
            session.id(),
            credentials.has_api_key()
        );

        Ok(Self {
            session,
            credentials,
            store,
            notifications,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            in_flight: None,
            next_request_id: 1,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.session.messages()
    }

    pub fn state(&self) -> ChatState {
        if self.in_flight.is_some() {
            ChatState::Sending
        } else {
            ChatState::Idle
        }
    }

    pub fn is_sending(&self) -> bool {
        self.state() == ChatState::Sending
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn has_credential(&self) -> bool {
        self.credentials.has_api_key()
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            log::debug!("Notification receiver dropped for session {}", self.session.id());
        }
    }

    pub fn begin_send(&mut self, text: &str) -> Result<PendingCompletion, ChatError> {
        // A missing key is reported even for blank input.
        if !self.credentials.has_api_key() {
            log::warn!("Send rejected: no API key configured");
            self.notify(Notification::error(
                "API Key Required",
                "Please add your OpenAI API key in settings.",
            ));
            return Err(ChatError::MissingCredential);
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        if self.in_flight.is_some() {
            log::warn!("Send rejected: a request is already in flight");
            self.notify(Notification::info(
                "Still Waiting",
                "A response is still pending. Press Ctrl+C to cancel it.",
            ));
            return Err(ChatError::RequestInFlight);
        }

        let mut messages = Vec::with_capacity(self.session.len() + 2);
        messages.push(WireMessage::system(self.credentials.system_prompt.clone()));
        messages.extend(self.session.wire_history());
        messages.push(WireMessage::user(text));

        self.session.append(Role::User, text);

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            request_id,
            cancel: cancel.clone(),
        });

        log::info!(
            "Session {} -> Sending (request {}, {} messages)",
            self.session.id(),
            request_id,
            messages.len()
        );

        Ok(PendingCompletion {
            request_id,
            api_key: self.credentials.api_key.clone(),
            messages,
            timeout: self.request_timeout,
            cancel,
        })
    }

    /// Applies the outcome of the in-flight request and returns to `Idle`.
    ///
    /// Outcomes for any request other than the current one are dropped with
    /// [`ChatError::StaleOutcome`]; the session state is left untouched.
    pub fn finish_send(&mut self, outcome: CompletionOutcome) -> Result<&ChatMessage, ChatError> {
        match &self.in_flight {
            Some(in_flight) if in_flight.request_id == outcome.request_id => {}
            _ => {
                log::warn!(
                    "Dropping outcome for stale request {} in session {}",
                    outcome.request_id,
                    self.session.id()
                );
                return Err(ChatError::StaleOutcome(outcome.request_id));
            }
        }
        self.in_flight = None;

        match outcome.result {
            Ok(content) => {
                log::info!(
                    "Session {} -> Idle (request {} succeeded)",
                    self.session.id(),
                    outcome.request_id
                );
                Ok(self.session.append(Role::Assistant, &content))
            }
            Err(err) => {
                log::error!(
                    "Session {} -> Idle (request {} failed: {})",
                    self.session.id(),
                    outcome.request_id,
                    err
                );
                let description = match &err {
                    ChatError::Timeout(waited) => {
                        format!("No response from OpenAI after {}.", describe_wait(*waited))
                    }
                    ChatError::Cancelled => "The request was cancelled.".to_string(),
                    _ => REQUEST_FAILED_DESCRIPTION.to_string(),
                };
                self.notify(Notification::error("Error", &description));
                Err(err)
            }
        }
    }

    /// Runs a whole send: optimistic append, network call, reply or notification.
    pub async fn send_message(
        &mut self,
        text: &str,
        client: &dyn ChatCompletion,
    ) -> Result<&ChatMessage, ChatError> {
        let pending = self.begin_send(text)?;
        let outcome = pending.run(client).await;
        self.finish_send(outcome)
    }

    /// Cancels the in-flight request, if any. Returns whether there was one.
    pub fn cancel(&self) -> bool {
        match &self.in_flight {
            Some(in_flight) => {
                log::info!("Cancelling request {}", in_flight.request_id);
                in_flight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn clear_session(&mut self) {
        self.session.clear();
        log::info!("Session {} cleared", self.session.id());
        self.notify(Notification::info(
            "Chat Cleared",
            "All messages have been removed.",
        ));
    }

    pub fn save_credential(&mut self, key: &str) -> Result<(), ChatError> {
        self.store.set(API_KEY_NAME, key)?;
        self.credentials.api_key = key.to_string();
        Ok(())
    }

    pub fn save_system_prompt(&mut self, prompt: &str) -> Result<(), ChatError> {
        self.store.set(SYSTEM_PROMPT_NAME, prompt)?;
        self.credentials.system_prompt = prompt.to_string();
        Ok(())
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.cancel();
        log::debug!("Chat session {} ended", self.session.id());
    }
}
