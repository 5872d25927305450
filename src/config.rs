//! Configuration types for the assistant pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AssistError, Result};

/// Default environment variable holding the inference API bearer token.
pub const DEFAULT_API_KEY_ENV: &str = "HUGGINGFACE_API_KEY";

/// Default persona used as the fixed system instruction of every conversation.
pub const DEFAULT_PERSONA: &str = "You are DevAssist, a personalized AI learning mentor and productivity assistant. Your goal is to help the user improve their skills, manage their time effectively, and make progress on their learning journey.

When asked for guidance, you will:
1. Suggest specific learning paths and resources
2. Recommend pomodoro sessions and break timing
3. Help prioritize learning topics based on importance
4. Provide motivational support
5. Recommend skill-building activities

Be specific, practical, and supportive.";

/// Placeholder substituted with the user's text in plain prompt templates.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Top-level configuration for the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Inference API settings shared by all endpoints.
    pub api: ApiConfig,
    /// Ranked text-generation endpoints, tried in order.
    pub endpoints: Vec<EndpointConfig>,
    /// Retry policy for the primary endpoint.
    pub retry: RetryConfig,
    /// Persona and conversation settings.
    pub assistant: PersonaConfig,
    /// Speech synthesis settings.
    pub speech: SpeechOutputConfig,
    /// Speech-to-text session settings.
    pub capture: CaptureConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            endpoints: default_endpoints(),
            retry: RetryConfig::default(),
            assistant: PersonaConfig::default(),
            speech: SpeechOutputConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

/// Inference API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Environment variable the bearer token is read from.
    pub key_env: String,
    /// Upper bound on a single endpoint call, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key_env: DEFAULT_API_KEY_ENV.to_owned(),
            request_timeout_secs: 15,
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read the API key from the configured environment variable.
    ///
    /// Returns `None` (and logs an error) when the variable is missing or
    /// blank; every model call then fails with the authentication class.
    pub fn resolve_api_key(&self) -> Option<String> {
        match std::env::var(&self.key_env) {
            Ok(value) if !value.trim().is_empty() => Some(value.trim().to_owned()),
            _ => {
                tracing::error!(
                    env = self.key_env.as_str(),
                    "missing inference API key; model calls will fail authentication"
                );
                None
            }
        }
    }
}

/// How the prompt for an endpoint is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Persona plus conversation, delimited with role markers.
    #[default]
    Chat,
    /// `template` with [`INPUT_PLACEHOLDER`] replaced by the user's text.
    Plain,
}

/// One ranked text-generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Short label used in logs.
    pub name: String,
    /// Full POST URL of the inference endpoint.
    pub url: String,
    /// Prompt construction for this endpoint.
    #[serde(default)]
    pub prompt: PromptStyle,
    /// Template for [`PromptStyle::Plain`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Maximum number of generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling probability mass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Whether sampling is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<bool>,
}

impl EndpointConfig {
    /// Create a chat-style endpoint with no sampling parameters.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            prompt: PromptStyle::Chat,
            template: None,
            max_new_tokens: None,
            temperature: None,
            top_p: None,
            do_sample: None,
        }
    }

    /// Switch to a plain prompt built from `template`.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.prompt = PromptStyle::Plain;
        self.template = Some(template.into());
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_new_tokens(mut self, tokens: u32) -> Self {
        self.max_new_tokens = Some(tokens);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top-p and enable sampling.
    pub fn with_sampling(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self.do_sample = Some(true);
        self
    }

    /// Whether any generation parameter is set.
    pub fn has_parameters(&self) -> bool {
        self.max_new_tokens.is_some()
            || self.temperature.is_some()
            || self.top_p.is_some()
            || self.do_sample.is_some()
    }
}

/// The three ranked endpoints of the hosted inference API.
pub fn default_endpoints() -> Vec<EndpointConfig> {
    vec![
        EndpointConfig::new(
            "phi-3-mini",
            "https://api-inference.huggingface.co/models/microsoft/Phi-3-mini-4k-instruct",
        )
        .with_max_new_tokens(250)
        .with_temperature(0.7)
        .with_sampling(0.9),
        EndpointConfig::new(
            "flan-t5-large",
            "https://api-inference.huggingface.co/models/google/flan-t5-large",
        )
        .with_template(
            "You are a learning mentor and productivity assistant. Provide specific, actionable advice for this question: {input}",
        )
        .with_max_new_tokens(150)
        .with_temperature(0.7),
        EndpointConfig::new(
            "flan-t5-small",
            "https://api-inference.huggingface.co/models/google/flan-t5-small",
        )
        .with_template("You are a learning assistant. Give a brief helpful answer to: {input}"),
    ]
}

/// Retry policy for the primary endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// Whether terminally failed exchanges are kept in conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Only generated replies (and their user turns) are recorded.
    #[default]
    SuccessesOnly,
    /// Fallback messages are recorded as assistant turns too.
    RecordFailures,
}

/// Persona and conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Name the voice assistant answers to.
    pub name: String,
    /// Fixed system instruction.
    pub persona: String,
    /// History handling for failed exchanges.
    pub history_policy: HistoryPolicy,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "Jarvis".to_owned(),
            persona: DEFAULT_PERSONA.to_owned(),
            history_policy: HistoryPolicy::default(),
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechOutputConfig {
    /// Speaking rate multiplier (1.0 = normal).
    pub rate: f32,
    /// Pitch multiplier (1.0 = normal).
    pub pitch: f32,
    /// Volume in `[0.0, 1.0]`.
    pub volume: f32,
    /// System TTS program (`say`, `espeak`); `None` picks a platform default.
    pub command: Option<String>,
}

impl Default for SpeechOutputConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            command: None,
        }
    }
}

/// Speech-to-text session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Quiet period after which a live transcript is treated as final.
    pub pause_ms: u64,
    /// Ignore always-on transcripts that do not mention the assistant name
    /// until a conversation is under way.
    pub require_wake_name: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            pause_ms: 1500,
            require_wake_name: true,
        }
    }
}

impl CaptureConfig {
    /// Pause as a [`Duration`].
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| AssistError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AssistError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    ///
    /// `DEVASSIST_CONFIG_DIR` overrides the platform config directory.
    pub fn default_config_path() -> PathBuf {
        if let Some(dir) = std::env::var_os("DEVASSIST_CONFIG_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        dirs::config_dir()
            .map(|d| d.join("devassist"))
            .unwrap_or_else(|| PathBuf::from("/tmp/devassist-config"))
            .join("config.toml")
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(AssistError::Config(
                "at least one endpoint must be configured".to_owned(),
            ));
        }
        for endpoint in &self.endpoints {
            url::Url::parse(&endpoint.url).map_err(|e| {
                AssistError::Config(format!(
                    "endpoint '{}' has invalid url '{}': {e}",
                    endpoint.name, endpoint.url
                ))
            })?;
            if endpoint.prompt == PromptStyle::Plain {
                let has_placeholder = endpoint
                    .template
                    .as_deref()
                    .is_some_and(|t| t.contains(INPUT_PLACEHOLDER));
                if !has_placeholder {
                    return Err(AssistError::Config(format!(
                        "endpoint '{}' uses a plain prompt without an {INPUT_PLACEHOLDER} template",
                        endpoint.name
                    )));
                }
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(AssistError::Config(
                "retry.max_attempts must be at least 1".to_owned(),
            ));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(AssistError::Config(
                "api.request_timeout_secs must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}
