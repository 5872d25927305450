//! Response generation with cascading endpoint fallback.
//!
//! [`ResponseGenerator`] turns user text into a display-ready reply. It never
//! fails: every error path resolves to one of the fixed messages in
//! [`messages`].
//!
//! # Fallback policy
//!
//! 1. The primary endpoint runs under a [`RetryController`]; only "model is
//!    loading" is retried.
//! 2. Authentication, timeout and offline failures of the primary end the
//!    request with their specific message.
//! 3. Any other primary failure cascades through the remaining endpoints in
//!    rank order. The last endpoint's failure is classified the same way,
//!    falling back to a generic apology.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{AssistantConfig, DEFAULT_PERSONA, EndpointConfig, HistoryPolicy};
use crate::connectivity::{AlwaysOnline, Connectivity};
use crate::conversation::{Conversation, ConversationMessage};
use crate::error::GenerationError;
use crate::inference::{GenerationBackend, GenerationRequest};
use crate::prompt::{build_prompt, clean_reply};
use crate::retry::{RetryController, RetryError, RetryPolicy};

/// Fixed user-facing messages.
pub mod messages {
    /// Empty or whitespace-only input.
    pub const DIDNT_CATCH: &str = "I didn't catch that. Could you please speak again?";
    /// HTTP 401 or missing API key.
    pub const AUTHENTICATION: &str = "I'm having trouble authenticating with my AI service. Please check the API key configuration.";
    /// The primary model stayed in the loading state for every attempt.
    pub const STILL_LOADING: &str =
        "I'm having trouble thinking right now. Please try again in a moment.";
    /// A call exceeded the request timeout.
    pub const TIMEOUT: &str = "I'm taking too long to think. Please try again.";
    /// The host is offline.
    pub const OFFLINE: &str = "I can't connect to the internet. Please check your connection.";
    /// Every endpoint failed.
    pub const EXHAUSTED: &str =
        "I apologize, but I encountered an error processing your request.";
}

/// Terminal failure classes surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Authentication with the inference service failed.
    Authentication,
    /// The primary model was loading on every attempt.
    ModelLoading,
    /// A call timed out.
    Timeout,
    /// The host is offline.
    Offline,
    /// All endpoints failed.
    Exhausted,
}

impl FailureKind {
    /// The user-facing message for this failure.
    pub fn message(self) -> &'static str {
        match self {
            Self::Authentication => messages::AUTHENTICATION,
            Self::ModelLoading => messages::STILL_LOADING,
            Self::Timeout => messages::TIMEOUT,
            Self::Offline => messages::OFFLINE,
            Self::Exhausted => messages::EXHAUSTED,
        }
    }
}

/// How a reply was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Input was empty; no endpoint was called.
    EmptyInput,
    /// An endpoint produced the reply.
    Generated {
        /// Endpoint name.
        endpoint: String,
        /// Zero-based rank of the endpoint.
        rank: usize,
    },
    /// The request failed; the reply is a fixed message.
    Failed(FailureKind),
}

/// A display-ready reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Text to display or speak.
    pub text: String,
    /// How the text was produced.
    pub outcome: ReplyOutcome,
}

impl Reply {
    fn empty_input() -> Self {
        Self {
            text: messages::DIDNT_CATCH.to_owned(),
            outcome: ReplyOutcome::EmptyInput,
        }
    }

    fn failed(kind: FailureKind) -> Self {
        Self {
            text: kind.message().to_owned(),
            outcome: ReplyOutcome::Failed(kind),
        }
    }

    /// Whether an endpoint produced the text.
    pub fn is_generated(&self) -> bool {
        matches!(self.outcome, ReplyOutcome::Generated { .. })
    }
}

/// Produces replies from a ranked list of text-generation endpoints.
pub struct ResponseGenerator {
    backend: Arc<dyn GenerationBackend>,
    endpoints: Vec<EndpointConfig>,
    persona: String,
    retry: RetryPolicy,
    history_policy: HistoryPolicy,
    connectivity: Arc<dyn Connectivity>,
}

impl std::fmt::Debug for ResponseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.endpoints.iter().map(|e| e.name.as_str()).collect();
        f.debug_struct("ResponseGenerator")
            .field("endpoints", &names)
            .field("retry", &self.retry)
            .field("history_policy", &self.history_policy)
            .finish()
    }
}

impl ResponseGenerator {
    /// Create a generator over `endpoints`, ranked first to last.
    pub fn new(backend: Arc<dyn GenerationBackend>, endpoints: Vec<EndpointConfig>) -> Self {
        Self {
            backend,
            endpoints,
            persona: DEFAULT_PERSONA.to_owned(),
            retry: RetryPolicy::default(),
            history_policy: HistoryPolicy::default(),
            connectivity: Arc::new(AlwaysOnline),
        }
    }

    /// Create a generator from the full configuration.
    pub fn from_config(config: &AssistantConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        Self::new(backend, config.endpoints.clone())
            .with_persona(config.assistant.persona.clone())
            .with_retry_policy(RetryPolicy::from(&config.retry))
            .with_history_policy(config.assistant.history_policy)
    }

    /// Set the system persona used for new conversations and single-shot calls.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// Set the retry policy for the primary endpoint.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set how failed exchanges are recorded.
    pub fn with_history_policy(mut self, policy: HistoryPolicy) -> Self {
        self.history_policy = policy;
        self
    }

    /// Set the host connectivity source.
    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// The configured persona.
    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Start a conversation seeded with the persona.
    pub fn new_conversation(&self) -> Conversation {
        Conversation::new(self.persona.clone())
    }

    /// Reply to `text` in the context of `conversation`, recording the
    /// exchange according to the history policy.
    pub async fn respond(&self, conversation: &mut Conversation, text: &str) -> Reply {
        let text = text.trim();
        if text.is_empty() {
            return Reply::empty_input();
        }

        info!(session = %conversation.id(), turns = conversation.turns().len(), "generating reply");
        let reply = self
            .generate(conversation.system_instruction(), conversation.turns(), text)
            .await;

        let record = match reply.outcome {
            ReplyOutcome::Generated { .. } => true,
            ReplyOutcome::Failed(_) => self.history_policy == HistoryPolicy::RecordFailures,
            ReplyOutcome::EmptyInput => false,
        };
        if record {
            conversation.record_exchange(text, reply.text.clone());
        }
        reply
    }

    /// Reply to `text` with no prior conversation.
    pub async fn respond_once(&self, text: &str) -> Reply {
        let text = text.trim();
        if text.is_empty() {
            return Reply::empty_input();
        }
        self.generate(&self.persona, &[], text).await
    }

    async fn generate(&self, persona: &str, history: &[ConversationMessage], text: &str) -> Reply {
        let Some((primary, fallbacks)) = self.endpoints.split_first() else {
            warn!("no endpoints configured");
            return Reply::failed(FailureKind::Exhausted);
        };

        let mut controller = RetryController::new(self.retry);
        let first = controller
            .run(move |attempt| {
                debug!(endpoint = primary.name.as_str(), attempt, "primary attempt");
                self.call(primary, persona, history, text)
            })
            .await;

        let mut last_error = match first {
            Ok(raw) => return self.generated(0, primary, &raw),
            Err(RetryError::Exhausted { attempts, .. }) => {
                warn!(attempts, "primary model still loading after all attempts");
                return Reply::failed(FailureKind::ModelLoading);
            }
            Err(RetryError::Aborted { error, .. }) => {
                if let Some(kind) = self.terminal_failure(&error) {
                    warn!(error = %error, ?kind, "primary endpoint failed terminally");
                    return Reply::failed(kind);
                }
                warn!(
                    endpoint = primary.name.as_str(),
                    error = %error,
                    "primary endpoint failed, trying fallback"
                );
                error
            }
        };

        for (offset, endpoint) in fallbacks.iter().enumerate() {
            match self.call(endpoint, persona, history, text).await {
                Ok(raw) => return self.generated(offset + 1, endpoint, &raw),
                Err(error) => {
                    warn!(
                        endpoint = endpoint.name.as_str(),
                        error = %error,
                        "fallback endpoint failed"
                    );
                    last_error = error;
                }
            }
        }

        let kind = self
            .terminal_failure(&last_error)
            .unwrap_or(FailureKind::Exhausted);
        warn!(error = %last_error, ?kind, "all endpoints failed");
        Reply::failed(kind)
    }

    async fn call(
        &self,
        endpoint: &EndpointConfig,
        persona: &str,
        history: &[ConversationMessage],
        text: &str,
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(endpoint, persona, history, text);
        let request = GenerationRequest::for_endpoint(endpoint, prompt);
        self.backend.generate(endpoint, &request).await
    }

    fn generated(&self, rank: usize, endpoint: &EndpointConfig, raw: &str) -> Reply {
        info!(endpoint = endpoint.name.as_str(), rank, "reply generated");
        Reply {
            text: clean_reply(raw),
            outcome: ReplyOutcome::Generated {
                endpoint: endpoint.name.clone(),
                rank,
            },
        }
    }

    /// Failures that end the request instead of cascading.
    fn terminal_failure(&self, error: &GenerationError) -> Option<FailureKind> {
        match error {
            GenerationError::Auth(_) => Some(FailureKind::Authentication),
            GenerationError::Timeout(_) => Some(FailureKind::Timeout),
            GenerationError::Offline(_) => Some(FailureKind::Offline),
            _ if !self.connectivity.is_online() => Some(FailureKind::Offline),
            _ => None,
        }
    }
}
