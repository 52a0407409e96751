//! Chat transcript and its state machine.
//!
//! ```text
//! Idle --submit--> Submitting --Ok--> Rendering --finish_render--> Idle
//!                      |
//!                      +--Err--> Idle (system message appended)
//! ```
//!
//! [`ChatState`] holds no I/O; [`ChatSession`] pairs it with a [`ProxyClient`].

use crate::client::{ChatError, ProxyClient, SearchReply};
use crate::data_models::{Message, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting { query: String },
    Rendering,
}

#[derive(Debug, Clone)]
pub struct ChatState {
    messages: Vec<Message>,
    input: String,
    phase: Phase,
    error: Option<String>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            phase: Phase::Idle,
            error: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Input and submit are disabled while a request is in flight.
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Submit `text`, or the current input when `None`.
    ///
    /// Appends the user message and clears the input before anything is
    /// sent. Returns the query to send, or `None` when busy or blank.
    pub fn submit(&mut self, text: Option<&str>) -> Option<String> {
        if self.is_busy() {
            return None;
        }
        let query = text.map(str::to_string).unwrap_or_else(|| self.input.clone());
        if query.trim().is_empty() {
            return None;
        }

        self.messages.push(Message::user(&query));
        self.input.clear();
        self.error = None;
        self.phase = Phase::Submitting {
            query: query.clone(),
        };
        Some(query)
    }

    /// Apply the outcome of the request started by [`ChatState::submit`].
    /// Outcomes that arrive while nothing is in flight are dropped.
    pub fn apply_reply(&mut self, reply: Result<SearchReply, ChatError>) {
        let query = match &self.phase {
            Phase::Submitting { query } => query.clone(),
            _ => {
                log::warn!("dropping reply received with no request in flight");
                return;
            }
        };
        self.phase = Phase::Idle;

        match reply {
            Ok(reply) => {
                self.messages
                    .push(Message::bot(&query, reply.results, reply.summary));
                self.phase = Phase::Rendering;
            }
            Err(err) => {
                log::error!("search error: {err}");
                let text = match &err {
                    ChatError::EndpointNotFound(path) => {
                        self.error = Some(
                            "API endpoint not found (404). Please check the server route."
                                .to_string(),
                        );
                        format!("Error: API endpoint {path} not found (404).")
                    }
                    other => {
                        self.error = Some(other.to_string());
                        format!("Error searching for \"{query}\": {other}")
                    }
                };
                self.messages.push(Message::system(text));
            }
        }
    }

    pub fn finish_render(&mut self) {
        if self.phase == Phase::Rendering {
            self.phase = Phase::Idle;
        }
    }

    /// Most recent bot reply, if any.
    pub fn last_bot_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.sender == Sender::Bot)
    }
}

/// A chat transcript bound to a proxy.
pub struct ChatSession {
    state: ChatState,
    client: ProxyClient,
    last_reply: Option<SearchReply>,
}

impl ChatSession {
    pub fn new(client: ProxyClient) -> Self {
        Self {
            state: ChatState::new(),
            client,
            last_reply: None,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn client(&self) -> &ProxyClient {
        &self.client
    }

    /// Query/session pair of the last successful search.
    pub fn last_session(&self) -> Option<(&str, &str)> {
        let reply = self.last_reply.as_ref()?;
        Some((reply.query_id.as_deref()?, reply.session_id.as_deref()?))
    }

    /// Send one query and wait for the transcript to settle back to idle.
    /// Returns the number of messages appended.
    pub async fn send(&mut self, text: &str) -> usize {
        let before = self.state.messages().len();
        let Some(query) = self.state.submit(Some(text)) else {
            return 0;
        };

        let reply = self.client.search(&query).await;
        if let Ok(reply) = &reply {
            self.last_reply = Some(reply.clone());
        }
        self.state.apply_reply(reply);
        self.state.finish_render();

        self.state.messages().len() - before
    }
}
