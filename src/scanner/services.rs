use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::config::ScannerConfig;

const PROMPT: &str = r#"Analyze this image of an artifact, sculpture, painting, or historical object. Provide detailed information in the following JSON format:
{
  "name": "Full name of the artifact",
  "description": "Detailed description (2-3 sentences)",
  "period": "Historical period or date",
  "significance": "Cultural and historical significance (2-3 sentences)",
  "museum": "Museum or location where it's displayed (if known)",
  "materials": "Materials used (if identifiable)",
  "artist": "Artist or creator (if known)",
  "isArtifact": true/false
}

Focus on Indian artifacts, sculptures, and paintings. If it's not an artifact or historical object, set "isArtifact" to false. Be specific and accurate with historical details."#;

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("OpenRouter API key not configured")]
    NotConfigured,
    #[error("vision service unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("vision service returned {status}")]
    Upstream { status: StatusCode, body: String },
    #[error("no response from vision service")]
    EmptyResponse,
}

/// An image ready to be embedded as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub base64: String,
}

impl ImagePayload {
    /// Accepts `data:image/<type>;base64,<data>` or bare base64 (taken as JPEG).
    pub fn from_data_url(input: &str) -> Option<Self> {
        lazy_static! {
            static ref DATA_URL_RE: Regex =
                Regex::new(r"^data:(image/[a-zA-Z0-9.+-]+);base64,(.+)$").unwrap();
            static ref PREFIX_RE: Regex = Regex::new(r"^data:image/[a-z]+;base64,").unwrap();
        }
        let input = input.trim();
        let (mime_type, base64) = match DATA_URL_RE.captures(input) {
            Some(caps) => (caps[1].to_string(), caps[2].to_string()),
            None => (
                "image/jpeg".to_string(),
                PREFIX_RE.replace(input, "").into_owned(),
            ),
        };
        if base64.is_empty() {
            return None;
        }
        Some(Self { mime_type, base64 })
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// What the scanner page shows for an identified object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "unknown")]
    pub period: String,
    #[serde(default)]
    pub significance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub museum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default = "yes")]
    pub is_artifact: bool,
}

fn unknown() -> String {
    "Unknown".into()
}

fn yes() -> bool {
    true
}

impl ArtifactInfo {
    fn fallback(text: &str) -> Self {
        Self {
            name: "Artifact Detected".into(),
            description: text.to_string(),
            period: unknown(),
            significance: "This appears to be a cultural or historical artifact.".into(),
            museum: None,
            materials: None,
            artist: None,
            is_artifact: true,
        }
    }
}

/// Parses the first `{` .. last `}` span of a model answer; anything that
/// does not fit becomes a minimal record carrying the raw text.
pub fn parse_artifact_info(text: &str) -> ArtifactInfo {
    lazy_static! {
        static ref JSON_SPAN_RE: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
    }
    let Some(span) = JSON_SPAN_RE.find(text) else {
        return ArtifactInfo::fallback(text);
    };
    match serde_json::from_str::<ArtifactInfo>(span.as_str()) {
        Ok(info) => info,
        Err(e) => {
            debug!(error = %e, "model answer is not artifact json; using fallback");
            ArtifactInfo::fallback(text)
        }
    }
}

/// Pulls the answer text out of an OpenAI-style chat completion body.
pub fn extract_text(body: &Value) -> Option<String> {
    let content = body.pointer("/choices/0/message/content")?;
    let text = match content {
        Value::String(s) => Some(s.as_str()),
        Value::Array(parts) => parts
            .iter()
            .find(|p| p.get("type").and_then(Value::as_str) == Some("text"))
            .or_else(|| parts.first())
            .and_then(|p| p.get("text"))
            .and_then(Value::as_str),
        _ => None,
    }?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// External vision model that describes a photographed object.
#[async_trait]
pub trait ArtifactIdentifier: Send + Sync {
    async fn identify(&self, image: &ImagePayload) -> Result<String, ScannerError>;
}

pub struct OpenRouterIdentifier {
    client: Client,
    config: ScannerConfig,
}

impl OpenRouterIdentifier {
    pub fn new(config: ScannerConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("build http client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ArtifactIdentifier for OpenRouterIdentifier {
    async fn identify(&self, image: &ImagePayload) -> Result<String, ScannerError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ScannerError::NotConfigured)?;

        let request = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": PROMPT },
                    { "type": "image_url", "image_url": { "url": image.data_url() } }
                ]
            }]
        });

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(api_key)
            .header(header::REFERER, &self.config.site_url)
            .header("X-Title", &self.config.app_name)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "vision service error");
            return Err(ScannerError::Upstream { status, body });
        }

        let body: Value = response.json().await?;
        extract_text(&body).ok_or_else(|| {
            warn!(model = %self.config.model, "vision service answered without text");
            ScannerError::EmptyResponse
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_keeps_declared_mime() {
        let img = ImagePayload::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(img.base64, "iVBORw0KGgo=");
        assert_eq!(img.data_url(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn bare_base64_defaults_to_jpeg() {
        let img = ImagePayload::from_data_url("/9j/4AAQSkZJRg==").unwrap();
        assert_eq!(img.mime_type, "image/jpeg");
        assert_eq!(img.base64, "/9j/4AAQSkZJRg==");
    }

    #[test]
    fn empty_image_is_rejected() {
        assert!(ImagePayload::from_data_url("").is_none());
        assert!(ImagePayload::from_data_url("data:image/jpeg;base64,").is_none());
    }

    #[test]
    fn parses_json_wrapped_in_markdown() {
        let answer = "Here you go:\n```json\n{\"name\":\"Nataraja\",\"description\":\"Shiva dancing\",\
                      \"period\":\"Chola, 11th century\",\"significance\":\"Icon of cosmic dance\",\
                      \"materials\":\"Bronze\",\"isArtifact\":true}\n```";
        let info = parse_artifact_info(answer);
        assert_eq!(info.name, "Nataraja");
        assert_eq!(info.materials.as_deref(), Some("Bronze"));
        assert_eq!(info.artist, None);
        assert!(info.is_artifact);
    }

    #[test]
    fn not_an_artifact_is_passed_through() {
        let info = parse_artifact_info(r#"{"name":"Coffee mug","isArtifact":false}"#);
        assert!(!info.is_artifact);
        assert_eq!(info.period, "Unknown");
    }

    #[test]
    fn free_text_falls_back_to_minimal_record() {
        let info = parse_artifact_info("A sandstone yakshi figure, probably Mauryan.");
        assert_eq!(info.name, "Artifact Detected");
        assert_eq!(info.description, "A sandstone yakshi figure, probably Mauryan.");
        assert!(info.is_artifact);

        let broken = parse_artifact_info("{ name: unquoted }");
        assert_eq!(broken.name, "Artifact Detected");
        assert_eq!(broken.description, "{ name: unquoted }");
    }

    #[test]
    fn extracts_string_and_part_contents() {
        let plain = json!({"choices":[{"message":{"content":"hello"}}]});
        assert_eq!(extract_text(&plain).as_deref(), Some("hello"));

        let parts = json!({"choices":[{"message":{"content":[
            {"type":"image_url","image_url":{"url":"x"}},
            {"type":"text","text":"described"}
        ]}}]});
        assert_eq!(extract_text(&parts).as_deref(), Some("described"));

        let empty = json!({"choices":[{"message":{"content":"   "}}]});
        assert_eq!(extract_text(&empty), None);
        assert_eq!(extract_text(&json!({"error":"quota"})), None);
    }

    #[tokio::test]
    async fn identify_without_key_is_not_configured() {
        let identifier = OpenRouterIdentifier::new(ScannerConfig {
            api_key: None,
            model: "m".into(),
            url: "http://127.0.0.1:9/unused".into(),
            site_url: "http://localhost".into(),
            app_name: "test".into(),
            max_tokens: 10,
        })
        .unwrap();
        let img = ImagePayload::from_data_url("abc").unwrap();
        assert!(matches!(
            identifier.identify(&img).await,
            Err(ScannerError::NotConfigured)
        ));
    }
}
