//! Chat orchestration: one exchange with the model at a time.
//!
//! The orchestrator is a plain state machine. `submit` hands back what has to
//! be sent to the model, and `resolve` applies the outcome, so the front end
//! decides where the request actually runs.

use anyhow::Result;
use std::future::Future;

use crate::state::{Author, ChatMessage, Conversation, MessageContent};

/// Assistant text shown when the model call fails
pub const ERROR_REPLY: &str = "I'm sorry, an error occurred. Please try again.";

/// Produces a reply from prior history plus the new user text
pub trait LlmCollaborator {
    fn reply(
        &self,
        history: &[ChatMessage],
        text: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    AwaitingReply,
}

/// Everything the model needs for one exchange
#[derive(Debug, Clone)]
pub struct PendingExchange {
    pub exchange: u64,
    pub history: Vec<ChatMessage>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ChatOrchestrator {
    conversation: Conversation,
    state: ExchangeState,
    exchanges: u64,
}

impl ChatOrchestrator {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            state: ExchangeState::Idle,
            exchanges: 0,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.state == ExchangeState::AwaitingReply
    }

    /// Record the user's message and start an exchange.
    ///
    /// Returns `None` without touching the conversation while another
    /// exchange is in flight or when the text is blank.
    pub fn submit(&mut self, text: &str) -> Option<PendingExchange> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.is_awaiting_reply() {
            tracing::debug!("ignoring submission while awaiting a reply");
            return None;
        }

        let history = self.conversation.history();
        self.conversation
            .push(Author::User, MessageContent::Text(text.to_string()));
        self.exchanges += 1;
        self.state = ExchangeState::AwaitingReply;

        Some(PendingExchange {
            exchange: self.exchanges,
            history,
            text: text.to_string(),
        })
    }

    /// Apply the model's outcome for `exchange`. Returns `false` if no such
    /// exchange is awaiting a reply.
    pub fn resolve(&mut self, exchange: u64, reply: Result<String>) -> bool {
        if !self.is_awaiting_reply() || exchange != self.exchanges {
            return false;
        }

        match reply {
            Ok(raw) => {
                self.conversation
                    .push(Author::Assistant, MessageContent::rendered(&raw));
            }
            Err(error) => {
                tracing::error!("model request failed: {:#}", error);
                self.conversation
                    .push(Author::Assistant, MessageContent::Text(ERROR_REPLY.to_string()));
            }
        }

        self.state = ExchangeState::Idle;
        true
    }

    /// Append a locally produced message without contacting the model
    pub fn push_system(&mut self, content: MessageContent) -> String {
        self.conversation.push(Author::System, content)
    }

    /// Close `exchange` with an assistant notice instead of a model reply
    pub fn resolve_with_notice(&mut self, exchange: u64, notice: &str) -> bool {
        if !self.is_awaiting_reply() || exchange != self.exchanges {
            return false;
        }
        self.conversation
            .push(Author::Assistant, MessageContent::Text(notice.to_string()));
        self.state = ExchangeState::Idle;
        true
    }

    /// Submit and await a full exchange with `llm`
    pub async fn exchange<L: LlmCollaborator>(&mut self, llm: &L, text: &str) -> bool {
        let Some(pending) = self.submit(text) else {
            return false;
        };
        let reply = llm.reply(&pending.history, &pending.text).await;
        self.resolve(pending.exchange, reply)
    }
}
