use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::openai::role_name;
use crate::state::ChatMessage;

#[derive(Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[allow(dead_code)]
    done: bool,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn chat(
        &self,
        model: &str,
        system: &str,
        history: &[ChatMessage],
        text: &str,
    ) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let mut messages = vec![OllamaMessage {
            role: "system".to_string(),
            content: system.to_string(),
        }];
        messages.extend(history.iter().map(|m| OllamaMessage {
            role: role_name(m.role).to_string(),
            content: m.content.clone(),
        }));
        messages.push(OllamaMessage {
            role: "user".to_string(),
            content: text.to_string(),
        });

        let request = OllamaChatRequest {
            model: model.to_string(),
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Ollama request failed with status: {}. Make sure Ollama is running with: ollama serve",
                response.status()
            ));
        }

        let ollama_response: OllamaChatResponse = response.json().await?;
        Ok(ollama_response.message.content)
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to list models: {}", response.status()));
        }

        let models_response: OllamaModelsResponse = response.json().await?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_response() {
        let body = r#"{"model":"llama3.2","message":{"role":"assistant","content":"[PDB_VIEW:1TUP]"},"done":true}"#;
        let response: OllamaChatResponse = serde_json::from_str(body).expect("parse");
        assert_eq!(response.message.content, "[PDB_VIEW:1TUP]");
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        let client = OllamaClient::new("http://127.0.0.1:9/");
        assert!(client.chat("llama3.2", "sys", &[], "hi").await.is_err());
    }
}
