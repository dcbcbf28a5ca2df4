//! Gemini API wire types
//!
//! Only the fields the diagnostics read or write are modelled. Everything
//! else in the vendor payloads is ignored on deserialization.

use serde::{Deserialize, Serialize};

// ============================================================================
// generateContent (REST)
// ============================================================================

/// Body of a `models/{model}:generateContent` call
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// Single text prompt with no role or generation settings
    pub fn text(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: None,
                parts: vec![Part::text(prompt)],
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    /// Absent when the prompt was blocked or nothing was generated
    pub candidates: Option<Vec<Candidate>>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

/// Google API error envelope: `{"error": {"code", "message", "status"}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub status: Option<String>,
}

// ============================================================================
// Live session: client -> server
// ============================================================================

/// First frame of a live session
#[derive(Debug, Clone, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: ModelSelection,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelSelection {
    /// Fully qualified, e.g. `models/gemini-2.0-flash-exp`
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

/// User turn sent once the setup is acknowledged
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContentMessage {
    pub client_content: ClientContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

// ============================================================================
// Live session: server -> client
// ============================================================================

/// Any frame the live endpoint sends.
///
/// The server does not tag its messages; which top-level key is present
/// decides what the frame means.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
    pub error: Option<LiveError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: bool,
}

impl ServerContent {
    /// First text part of the model turn, if any
    pub fn first_text(&self) -> Option<&str> {
        self.model_turn
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.text.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveError {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub status: Option<String>,
}

impl LiveError {
    /// 403 or `PERMISSION_DENIED`: the key itself was refused
    pub fn is_permission_denied(&self) -> bool {
        self.code == Some(403) || self.status.as_deref() == Some("PERMISSION_DENIED")
    }
}
