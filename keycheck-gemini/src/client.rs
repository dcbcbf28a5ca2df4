//! Gemini REST client
//!
//! Issues single `generateContent` calls and classifies the response by
//! status code, so the diagnostics can tell a bad key from a missing model or
//! an exhausted quota.

use std::time::Duration;

use keycheck_core::{Credential, KeycheckConfig, KeycheckError, KeycheckResult};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use crate::types::{ApiErrorBody, GenerateContentRequest, GenerateContentResponse};

/// Classified result of one `generateContent` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// 200 with at least one candidate carrying text
    Success { text: String },
    /// 200 without a `candidates` field
    NoCandidates,
    /// 403: the key is invalid, expired or not allowed to use the API
    Forbidden { body: String },
    /// 404: the model does not exist or is not available to this key
    NotFound { body: String },
    /// 429: quota exhausted
    RateLimited { body: String },
    /// Any other status
    Failed { status: u16, body: String },
}

impl CallOutcome {
    /// Classify a raw HTTP response
    pub fn from_response(status: StatusCode, body: &str) -> KeycheckResult<Self> {
        match status {
            StatusCode::OK => {
                let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
                    KeycheckError::parse(format!("Failed to parse generateContent response: {}", e))
                })?;

                if response.candidates.is_none() {
                    return Ok(CallOutcome::NoCandidates);
                }

                let text = response.first_text().ok_or_else(|| {
                    KeycheckError::parse("Candidate has no text part")
                })?;

                Ok(CallOutcome::Success {
                    text: text.to_string(),
                })
            }
            StatusCode::FORBIDDEN => Ok(CallOutcome::Forbidden {
                body: body.to_string(),
            }),
            StatusCode::NOT_FOUND => Ok(CallOutcome::NotFound {
                body: body.to_string(),
            }),
            StatusCode::TOO_MANY_REQUESTS => Ok(CallOutcome::RateLimited {
                body: body.to_string(),
            }),
            other => Ok(CallOutcome::Failed {
                status: other.as_u16(),
                body: body.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }

    /// HTTP status the outcome was classified from
    pub fn status(&self) -> u16 {
        match self {
            CallOutcome::Success { .. } | CallOutcome::NoCandidates => 200,
            CallOutcome::Forbidden { .. } => 403,
            CallOutcome::NotFound { .. } => 404,
            CallOutcome::RateLimited { .. } => 429,
            CallOutcome::Failed { status, .. } => *status,
        }
    }

    /// Raw error body, empty for 200 outcomes
    pub fn body(&self) -> &str {
        match self {
            CallOutcome::Success { .. } | CallOutcome::NoCandidates => "",
            CallOutcome::Forbidden { body }
            | CallOutcome::NotFound { body }
            | CallOutcome::RateLimited { body }
            | CallOutcome::Failed { body, .. } => body,
        }
    }

    /// Vendor error message when the body is a Google error envelope,
    /// otherwise the raw body
    pub fn error_message(&self) -> String {
        let body = self.body();
        serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| body.to_string())
    }
}

/// Gemini REST client bound to one API key
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    credential: Credential,
}

impl GeminiClient {
    /// Create a client using the configured base URL and request timeout
    pub fn new(credential: Credential, config: &KeycheckConfig) -> KeycheckResult<Self> {
        Self::with_timeout(credential, &config.rest_base_url, config.request_timeout)
    }

    pub fn with_timeout(
        credential: Credential,
        base_url: &str,
        timeout: Duration,
    ) -> KeycheckResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeycheckError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// `generateContent` URL for a model, without the key
    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    /// Send a single text prompt to `model`.
    ///
    /// Non-200 statuses are returned as [`CallOutcome`] variants; only
    /// transport failures and unreadable 200 bodies are errors.
    #[instrument(skip(self, prompt))]
    pub async fn generate_content(&self, model: &str, prompt: &str) -> KeycheckResult<CallOutcome> {
        let url = self.endpoint(model);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.credential.expose())])
            .json(&GenerateContentRequest::text(prompt))
            .send()
            .await
            .map_err(|e| KeycheckError::network(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KeycheckError::network(format!("Failed to read response body: {}", e.without_url())))?;

        debug!("{} answered {}", model, status);
        CallOutcome::from_response(status, &body)
    }
}
