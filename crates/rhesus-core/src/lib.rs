pub mod ai;
pub mod chat;
pub mod config;
pub mod directive;
pub mod download;
pub mod prompt;
pub mod provider;
pub mod state;
pub mod structure;

// Re-export main types for convenience
pub use ai::{ClaudeClient, GeminiClient, OllamaClient, OpenAIClient};
pub use chat::{ChatOrchestrator, ExchangeState, LlmCollaborator, PendingExchange, ERROR_REPLY};
pub use config::Config;
pub use directive::{render, Directive, RenderNode, TokenKind};
pub use provider::{LlmClient, Provider};
pub use state::{Author, ChatMessage, ChatRole, Conversation, Message, MessageContent};
pub use structure::{
    LoadState, PresentationMode, RcsbClient, SceneRecorder, SequenceView, StructureRequest,
    StructureSource, StructureViewer,
};
