use anyhow::{anyhow, Result};

use crate::ai::{ClaudeClient, GeminiClient, OllamaClient, OpenAIClient};
use crate::chat::LlmCollaborator;
use crate::config::Config;
use crate::prompt::SYSTEM_INSTRUCTION;
use crate::state::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Claude,
    OpenAI,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Claude => "claude",
            Provider::OpenAI => "openai",
            Provider::Ollama => "ollama",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Some(Provider::Gemini),
            "claude" => Some(Provider::Claude),
            "openai" => Some(Provider::OpenAI),
            "ollama" => Some(Provider::Ollama),
            _ => None,
        }
    }

    pub fn all() -> Vec<Provider> {
        vec![Provider::Gemini, Provider::Claude, Provider::OpenAI, Provider::Ollama]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini (Google)",
            Provider::Claude => "Claude (Anthropic)",
            Provider::OpenAI => "ChatGPT (OpenAI)",
            Provider::Ollama => "Ollama (Local)",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash",
            Provider::Claude => "claude-sonnet-4-20250514",
            Provider::OpenAI => "gpt-4o",
            Provider::Ollama => "llama3.2",
        }
    }

    /// Environment variable holding this provider's key
    pub fn key_variable(&self) -> Option<&'static str> {
        match self {
            Provider::Gemini => Some("GEMINI_API_KEY"),
            Provider::Claude => Some("ANTHROPIC_API_KEY"),
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Ollama => None,
        }
    }

    /// Assistant text shown when no key is configured
    pub fn missing_key_message(&self) -> String {
        format!(
            "No API key is configured for {}. Set {} or add it to config.json, then try again.",
            self.display_name(),
            self.key_variable().unwrap_or("a key")
        )
    }
}

#[derive(Clone)]
enum Backend {
    Gemini(GeminiClient),
    Claude(ClaudeClient),
    OpenAI(OpenAIClient),
    Ollama(OllamaClient),
}

/// The configured model behind the chat, with the system instruction attached
#[derive(Clone)]
pub struct LlmClient {
    provider: Provider,
    model: String,
    system: String,
    backend: Backend,
}

impl LlmClient {
    /// Build a client for `provider`. Fails when a hosted provider has no key.
    pub fn new(provider: Provider, model: &str, config: &Config) -> Result<Self> {
        let key = || {
            config
                .api_key(provider)
                .ok_or_else(|| anyhow!(provider.missing_key_message()))
        };

        let backend = match provider {
            Provider::Gemini => Backend::Gemini(GeminiClient::new(&key()?)),
            Provider::Claude => Backend::Claude(ClaudeClient::new(&key()?)),
            Provider::OpenAI => Backend::OpenAI(OpenAIClient::new(&key()?)),
            Provider::Ollama => Backend::Ollama(OllamaClient::new(&config.ollama_url)),
        };

        Ok(Self {
            provider,
            model: model.to_string(),
            system: SYSTEM_INSTRUCTION.to_string(),
            backend,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.provider(), &config.model(), config)
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LlmCollaborator for LlmClient {
    async fn reply(&self, history: &[ChatMessage], text: &str) -> Result<String> {
        tracing::info!(
            "sending message to {} ({}), {} turns of history",
            self.provider.as_str(),
            self.model,
            history.len()
        );

        match &self.backend {
            Backend::Gemini(client) => client.chat(&self.model, &self.system, history, text).await,
            Backend::Claude(client) => client.chat(&self.model, &self.system, history, text).await,
            Backend::OpenAI(client) => client.chat(&self.model, &self.system, history, text).await,
            Backend::Ollama(client) => client.chat(&self.model, &self.system, history, text).await,
        }
    }
}

/// Models offered in the picker for `provider`
pub async fn available_models(provider: Provider, config: &Config) -> Result<Vec<String>> {
    match provider {
        Provider::Gemini => Ok(GeminiClient::list_models()),
        Provider::Claude => Ok(ClaudeClient::list_models()),
        Provider::OpenAI => Ok(OpenAIClient::list_models()),
        Provider::Ollama => OllamaClient::new(&config.ollama_url).list_models().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for provider in Provider::all() {
            assert_eq!(Provider::from_str(provider.as_str()), Some(provider));
        }
        assert_eq!(Provider::from_str("GEMINI"), Some(Provider::Gemini));
        assert_eq!(Provider::from_str("bard"), None);
    }

    #[test]
    fn ollama_needs_no_key() {
        let client = LlmClient::new(Provider::Ollama, "llama3.2", &Config::new()).unwrap();
        assert_eq!(client.provider(), Provider::Ollama);
        assert_eq!(client.model(), "llama3.2");
    }

    #[test]
    fn missing_key_message_names_provider() {
        let message = Provider::Claude.missing_key_message();
        assert!(message.contains("Claude"));
        assert!(message.contains("ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn hosted_models_are_listed_offline() {
        let models = available_models(Provider::Gemini, &Config::new()).await.unwrap();
        assert_eq!(models[0], "gemini-2.5-flash");
    }
}
