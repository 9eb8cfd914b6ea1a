//! UI-agnostic conversation state
//!
//! The conversation is an append-only log: messages are never edited or
//! removed once pushed, and ids are assigned from a counter.

use serde::{Deserialize, Serialize};

use crate::directive::RenderNode;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    User,
    Assistant,
    /// Produced locally (slash commands, notices); never sent to the model
    System,
}

impl Author {
    pub fn display_name(&self) -> &'static str {
        match self {
            Author::User => "You",
            Author::Assistant => "Dr. Rhesus",
            Author::System => "System",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    Text(String),
    /// A reply split into text and widgets, with the raw text kept for history
    Rendered { raw: String, nodes: Vec<RenderNode> },
}

impl MessageContent {
    pub fn rendered(raw: &str) -> Self {
        MessageContent::Rendered {
            raw: raw.to_string(),
            nodes: crate::directive::render(raw),
        }
    }

    /// The text as exchanged with the model
    pub fn raw(&self) -> &str {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Rendered { raw, .. } => raw,
        }
    }

    /// Render nodes; plain text is a single text node
    pub fn nodes(&self) -> Vec<RenderNode> {
        match self {
            MessageContent::Text(text) => vec![RenderNode::Text(text.clone())],
            MessageContent::Rendered { nodes, .. } => nodes.clone(),
        }
    }

    pub fn widgets(&self) -> impl Iterator<Item = &RenderNode> {
        let nodes: &[RenderNode] = match self {
            MessageContent::Text(_) => &[],
            MessageContent::Rendered { nodes, .. } => nodes,
        };
        nodes.iter().filter(|node| node.is_widget())
    }
}

/// One turn of history as sent to a language model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author: Author,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an assistant greeting
    pub fn with_greeting(greeting: &str) -> Self {
        let mut conversation = Self::new();
        conversation.push(Author::Assistant, MessageContent::Text(greeting.to_string()));
        conversation
    }

    /// Append a message and return its id
    pub fn push(&mut self, author: Author, content: MessageContent) -> String {
        self.next_id += 1;
        let id = format!("msg-{}", self.next_id);
        self.messages.push(Message {
            id: id.clone(),
            author,
            content,
        });
        id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// History in model form: System messages are local only, and
    /// assistant messages before the first user message (the greeting)
    /// are skipped.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .skip_while(|m| m.author != Author::User)
            .filter_map(|m| {
                let role = match m.author {
                    Author::User => ChatRole::User,
                    Author::Assistant => ChatRole::Assistant,
                    Author::System => return None,
                };
                Some(ChatMessage {
                    role,
                    content: m.content.raw().to_string(),
                })
            })
            .collect()
    }
}
