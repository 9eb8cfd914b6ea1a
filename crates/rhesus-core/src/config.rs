use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::provider::Provider;
use crate::structure::fetch::DEFAULT_STRUCTURE_BASE_URL;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_url: String,
    pub structure_base_url: String,
    pub download_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Gemini.as_str().to_string()),
            default_model: None,
            gemini_api_key: None,
            claude_api_key: None,
            openai_api_key: None,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            structure_base_url: DEFAULT_STRUCTURE_BASE_URL.to_string(),
            download_dir: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Configured provider, falling back to Gemini for unknown names
    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::Gemini)
    }

    pub fn model(&self) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| self.provider().default_model().to_string())
    }

    /// API key for `provider`; environment variables take precedence
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        self.api_key_with(provider, |name| std::env::var(name).ok())
    }

    fn api_key_with(
        &self,
        provider: Provider,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        let (vars, stored): (&[&str], &Option<String>) = match provider {
            Provider::Gemini => (&["GEMINI_API_KEY", "API_KEY"], &self.gemini_api_key),
            Provider::Claude => (&["ANTHROPIC_API_KEY"], &self.claude_api_key),
            Provider::OpenAI => (&["OPENAI_API_KEY"], &self.openai_api_key),
            Provider::Ollama => return None,
        };

        vars.iter()
            .filter_map(|name| env(name))
            .chain(stored.clone())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }

    /// Where mutation downloads are written
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("rhesus"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.provider(), Provider::Gemini);
        assert_eq!(config.model(), "gemini-2.5-flash");
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.structure_base_url, "https://files.rcsb.org/view");
    }

    #[test]
    fn save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.provider = Some("ollama".to_string());
        config.default_model = Some("llama3.2".to_string());
        config.download_dir = Some(dir.path().to_path_buf());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.provider(), Provider::Ollama);
        assert_eq!(loaded.model(), "llama3.2");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"provider":"claude"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider(), Provider::Claude);
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn environment_overrides_stored_keys() {
        let mut config = Config::new();
        config.gemini_api_key = Some("stored".to_string());
        config.claude_api_key = Some("claude-stored".to_string());

        let env = |name: &str| match name {
            "API_KEY" => Some("fallback".to_string()),
            _ => None,
        };
        assert_eq!(config.api_key_with(Provider::Gemini, env).as_deref(), Some("fallback"));
        assert_eq!(
            config.api_key_with(Provider::Claude, env).as_deref(),
            Some("claude-stored")
        );
        assert_eq!(config.api_key_with(Provider::OpenAI, env), None);
        assert_eq!(config.api_key_with(Provider::Ollama, env), None);
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let mut config = Config::new();
        config.openai_api_key = Some("   ".to_string());
        assert_eq!(config.api_key_with(Provider::OpenAI, |_| None), None);
    }
}
