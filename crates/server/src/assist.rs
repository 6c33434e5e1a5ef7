//! Chat assist collaborator. The provider is an opaque text-generation call;
//! when it is unavailable or returns something unusable, the caller degrades
//! to the deterministic engine's output instead of failing the request.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use plateful_core::config::AssistConfig;
use plateful_core::errors::ApplicationError;
use plateful_core::Intent;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("assist provider unavailable: {0}")]
    Unavailable(String),
    #[error("assist response invalid: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait AssistProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AssistError>;
}

pub struct HttpAssistProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpAssistProvider {
    pub fn from_config(config: &AssistConfig) -> Result<Option<Self>, ApplicationError> {
        if !config.enabled {
            return Ok(None);
        }
        let base_url = config.base_url.clone().ok_or_else(|| {
            ApplicationError::Configuration("assist enabled without a base url".to_owned())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
        Ok(Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        }))
    }
}

#[derive(Deserialize)]
struct CompletionBody {
    text: String,
}

#[async_trait]
impl AssistProvider for HttpAssistProvider {
    async fn complete(&self, prompt: &str) -> Result<String, AssistError> {
        let mut request = self
            .client
            .post(format!("{}/v1/complete", self.base_url))
            .json(&serde_json::json!({ "prompt": prompt }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }
        let response = request
            .send()
            .await
            .map_err(|error| AssistError::Unavailable(error.to_string()))?;
        if !response.status().is_success() {
            return Err(AssistError::Unavailable(format!(
                "provider returned status {}",
                response.status()
            )));
        }
        let body: CompletionBody = response
            .json()
            .await
            .map_err(|error| AssistError::InvalidResponse(error.to_string()))?;
        Ok(body.text)
    }
}

/// Bounded retry: unavailability is retried at most `max_retries` times
/// (deployments keep this at one); an invalid response is not, since the
/// provider already answered.
pub async fn complete_with_retry(
    provider: &dyn AssistProvider,
    prompt: &str,
    max_retries: u32,
) -> Result<String, AssistError> {
    let mut attempts_left = max_retries;
    loop {
        match provider.complete(prompt).await {
            Ok(text) => return Ok(text),
            Err(AssistError::Unavailable(reason)) if attempts_left > 0 => {
                attempts_left -= 1;
                warn!(
                    event_name = "assist.provider.retry",
                    reason = %reason,
                    attempts_left,
                    "assist provider unavailable, retrying once"
                );
            }
            Err(error) => return Err(error),
        }
    }
}

/// Structured part of a provider reply: the conversational text plus an
/// optional intent hint for the deterministic engine.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistReply {
    pub reply: Option<String>,
    pub intent_hint: Option<String>,
}

impl AssistReply {
    /// Providers answer in JSON when they can; anything else is treated as
    /// plain conversational text with no hint.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<AssistReply>(raw) {
            Ok(reply) => reply,
            Err(_) => AssistReply { reply: Some(raw.to_owned()), intent_hint: None },
        }
    }

    /// The hinted intent, when present and recognised. Unknown hints are
    /// ignored rather than failing the request.
    pub fn intent(&self) -> Option<Intent> {
        self.intent_hint.as_deref().and_then(|hint| hint.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        failures_before_success: AtomicU32,
    }

    #[async_trait]
    impl AssistProvider for FlakyProvider {
        async fn complete(&self, _prompt: &str) -> Result<String, AssistError> {
            if self.failures_before_success.fetch_update(
                Ordering::SeqCst,
                Ordering::SeqCst,
                |n| n.checked_sub(1),
            ).is_ok()
            {
                Err(AssistError::Unavailable("connection refused".to_owned()))
            } else {
                Ok("{\"reply\": \"try Amala Hub\", \"intentHint\": \"cheap\"}".to_owned())
            }
        }
    }

    #[tokio::test]
    async fn one_retry_recovers_from_a_single_failure() {
        let provider = FlakyProvider { failures_before_success: AtomicU32::new(1) };
        let text = complete_with_retry(&provider, "lunch?", 1).await.expect("retried");
        let reply = AssistReply::parse(&text);
        assert_eq!(reply.intent(), Some(Intent::Cheap));
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let provider = FlakyProvider { failures_before_success: AtomicU32::new(2) };
        let result = complete_with_retry(&provider, "lunch?", 1).await;
        assert!(matches!(result, Err(AssistError::Unavailable(_))));
    }

    #[test]
    fn plain_text_replies_carry_no_hint() {
        let reply = AssistReply::parse("Just order the jollof.");
        assert_eq!(reply.reply.as_deref(), Some("Just order the jollof."));
        assert_eq!(reply.intent(), None);
    }

    #[test]
    fn unknown_intent_hint_is_ignored() {
        let reply = AssistReply::parse("{\"reply\": \"ok\", \"intentHint\": \"spicy\"}");
        assert_eq!(reply.intent(), None);
    }
}
