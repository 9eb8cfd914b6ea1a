use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::state::{ChatMessage, ChatRole};

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn chat(
        &self,
        model: &str,
        system: &str,
        history: &[ChatMessage],
        text: &str,
    ) -> Result<String> {
        let request = OpenAIRequest {
            model: model.to_string(),
            messages: messages(system, history, text),
        };

        let response = self.client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, text));
        }

        let openai_response: OpenAIResponse = response.json().await?;
        Ok(openai_response.choices.into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4o".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4-turbo".to_string(),
        ]
    }
}

/// Chat-completions shape shared with Ollama's `/api/chat`
pub(crate) fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn messages(system: &str, history: &[ChatMessage], text: &str) -> Vec<OpenAIMessage> {
    let mut messages = vec![OpenAIMessage {
        role: "system".to_string(),
        content: system.to_string(),
    }];
    messages.extend(history.iter().map(|m| OpenAIMessage {
        role: role_name(m.role).to_string(),
        content: m.content.clone(),
    }));
    messages.push(OpenAIMessage {
        role: "user".to_string(),
        content: text.to_string(),
    });
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_comes_first() {
        let history = vec![ChatMessage {
            role: ChatRole::Assistant,
            content: "earlier".to_string(),
        }];
        let messages = messages("persona", &history, "now");
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "assistant", "user"]);
        assert_eq!(messages[2].content, "now");
    }
}
