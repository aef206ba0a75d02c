//! Chat command - send one message to the chat companion.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use moodscan_adapters::{GeminiClient, GeminiConfig};
use moodscan_core::{ChatRequest, ChatResponder};
use tracing::info;

use crate::config::AppConfig;

/// Arguments for the chat command.
#[derive(Args, Clone)]
pub struct ChatArgs {
    /// Message to send
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,

    /// Emotion attached to the message, e.g. the output of `detect`
    #[arg(short, long, default_value = "neutral")]
    pub emotion: String,

    /// Generative model name (overrides config)
    #[arg(long)]
    pub model: Option<String>,

    /// Generative-text settings (populated by `with_config`, not from CLI).
    #[arg(skip)]
    settings: GeminiConfig,
}

impl ChatArgs {
    /// Apply configuration file values, respecting CLI precedence.
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.settings = gemini_config(config);
        if let Some(ref model) = self.model {
            self.settings.model.clone_from(model);
        }
        self
    }
}

/// Builds client settings from the `[chat]` config section.
#[must_use]
pub fn gemini_config(config: &AppConfig) -> GeminiConfig {
    let defaults = GeminiConfig::default();
    let chat = &config.chat;
    GeminiConfig {
        endpoint: chat.endpoint.clone().unwrap_or(defaults.endpoint),
        model: chat.model.clone().unwrap_or(defaults.model),
        temperature: chat.temperature.unwrap_or(defaults.temperature),
        api_key_env: chat.api_key_env.clone().unwrap_or(defaults.api_key_env),
        timeout: chat
            .timeout_secs
            .map_or(defaults.timeout, Duration::from_secs),
    }
}

/// Run the chat command and print the reply to stdout.
pub fn run(args: &ChatArgs) -> Result<()> {
    let client = GeminiClient::from_env(args.settings.clone())?;
    info!("Sending chat message to {}", client.config().model);
    let responder = ChatResponder::new(client);

    let request = ChatRequest {
        user_input: args.message.join(" "),
        emotion: args.emotion.clone(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let reply = runtime.block_on(responder.respond(&request))?;

    println!("{}", reply.bot_response);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_config_defaults() {
        assert_eq!(gemini_config(&AppConfig::default()), GeminiConfig::default());
    }

    #[test]
    fn test_gemini_config_from_file() {
        let config: AppConfig = toml::from_str(
            r"
[chat]
endpoint = 'http://localhost:8081/v1beta'
temperature = 0.2
api_key_env = 'MOODSCAN_KEY'
timeout_secs = 5
",
        )
        .unwrap();
        let settings = gemini_config(&config);

        assert_eq!(settings.endpoint, "http://localhost:8081/v1beta");
        assert_eq!(settings.model, GeminiConfig::default().model);
        assert_eq!(settings.api_key_env, "MOODSCAN_KEY");
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_cli_model_overrides_config() {
        let config: AppConfig = toml::from_str("[chat]\nmodel = 'from-config'\n").unwrap();
        let args = ChatArgs {
            message: vec!["hello".into()],
            emotion: "sad".into(),
            model: Some("from-cli".into()),
            settings: GeminiConfig::default(),
        }
        .with_config(&config);

        assert_eq!(args.settings.model, "from-cli");
    }
}
