use std::env;

use anyhow::{bail, Context};
use serde_json::{json, Value};
use voicecheck_contracts::request::EncodedAudio;

use crate::transport::{Transport, WireReply};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The real transport: one HTTPS POST to `generateContent`, key supplied as a
/// query parameter. No retry logic lives here; the executor owns that.
pub struct GeminiTransport {
    api_base: String,
    model: String,
    api_key: String,
    http: reqwest::Client,
}

impl GeminiTransport {
    /// Reads `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) and `GEMINI_API_BASE`
    /// from the environment. A missing key is refused here; a wrong key is
    /// not — that surfaces as an auth failure from the endpoint.
    pub fn from_env() -> anyhow::Result<Self> {
        let Some(api_key) = Self::api_key() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        Ok(Self::new(api_key, DEFAULT_MODEL))
    }

    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_base: env::var("GEMINI_API_BASE")
                .ok()
                .map(|value| value.trim().trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: model.into(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        let trimmed = self.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn api_key() -> Option<String> {
        non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"))
    }
}

impl Transport for GeminiTransport {
    async fn send(&self, payload: &Value) -> anyhow::Result<WireReply> {
        let endpoint = self.endpoint();
        tracing::debug!(%endpoint, "posting comparison request");
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Gemini response body read failed")?;
        Ok(WireReply { status, body })
    }
}

/// Request body for one comparison: both instruction texts plus the two
/// inline audio payloads, asking for a JSON-typed reply. Part order matters:
/// the prompt names File A first, File B second.
pub fn build_payload(
    system_instruction: &str,
    user_instruction: &str,
    reference: &EncodedAudio,
    candidate: &EncodedAudio,
) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": system_instruction }],
        },
        "contents": [{
            "role": "user",
            "parts": [
                { "text": user_instruction },
                { "inlineData": { "mimeType": reference.mime_type, "data": reference.data } },
                { "inlineData": { "mimeType": candidate.mime_type, "data": candidate.data } },
            ],
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
        },
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(data: &str, mime: &str) -> EncodedAudio {
        EncodedAudio {
            data: data.to_string(),
            mime_type: mime.to_string(),
        }
    }

    #[test]
    fn payload_carries_instructions_and_both_inline_parts_in_order() {
        let payload = build_payload(
            "system text",
            "user text",
            &encoded("QUFB", "audio/wav"),
            &encoded("QkJC", "audio/mpeg"),
        );

        assert_eq!(
            payload["systemInstruction"]["parts"][0]["text"],
            "system text"
        );
        let parts = payload["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], "user text");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "audio/wav");
        assert_eq!(parts[1]["inlineData"]["data"], "QUFB");
        assert_eq!(parts[2]["inlineData"]["mimeType"], "audio/mpeg");
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_model_names() {
        let bare = GeminiTransport::new("k", "gemini-2.5-flash");
        assert!(bare
            .endpoint()
            .ends_with("/models/gemini-2.5-flash:generateContent"));

        let prefixed = GeminiTransport::new("k", "models/gemini-2.5-flash");
        assert!(prefixed
            .endpoint()
            .ends_with("/models/gemini-2.5-flash:generateContent"));
    }
}
