//! Google Gemini `generateContent` client.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{instruction, parse_estimate, EstimationError, MealEstimate, MealEstimator, MealInput};
use crate::config::EstimatorConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: Blob },
}

#[derive(Debug, Serialize)]
struct Blob {
    mime_type: String,
    /// Base64 payload.
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

pub struct GeminiEstimator {
    api_key: String,
    client: Client,
    model: String,
    base_url: String,
    instruction: String,
}

impl GeminiEstimator {
    pub fn new(config: &EstimatorConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build estimator http client")?;
        Ok(Self {
            api_key: config.api_key.clone(),
            client,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            instruction: instruction(&config.cuisine),
        })
    }

    /// Endpoint URL. The key travels in a header, never in the URL.
    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, input: MealInput) -> GeminiRequest {
        let payload = match input {
            MealInput::Text(text) => RequestPart::Text { text },
            MealInput::Image { bytes, mime_type } => RequestPart::InlineData {
                inline_data: Blob {
                    mime_type,
                    data: Base64::encode_string(&bytes),
                },
            },
        };
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![
                    RequestPart::Text {
                        text: self.instruction.clone(),
                    },
                    payload,
                ],
            }],
        }
    }

    /// First text part of the first candidate.
    fn extract_text(response: GeminiResponse) -> Result<String, EstimationError> {
        response
            .candidates
            .into_iter()
            .flatten()
            .next()
            .and_then(|c| c.content)
            .into_iter()
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(EstimationError::EmptyResponse)
    }

    fn api_error(status: u16, body: &str) -> EstimationError {
        let message = serde_json::from_str::<GeminiResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| body.to_string(), |e| e.message);
        EstimationError::Api { status, message }
    }
}

#[async_trait]
impl MealEstimator for GeminiEstimator {
    #[instrument(skip(self, input), fields(model = %self.model, mode = ?input.mode()))]
    async fn estimate(&self, input: MealInput) -> Result<MealEstimate, EstimationError> {
        let request = self.build_request(input);

        let response = self
            .client
            .post(self.url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(%status, "gemini request rejected");
            return Err(Self::api_error(status.as_u16(), &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "unreadable gemini response");
            EstimationError::EmptyResponse
        })?;
        if let Some(err) = parsed.error {
            return Err(EstimationError::Api {
                status: status.as_u16(),
                message: err.message,
            });
        }

        let text = Self::extract_text(parsed)?;
        debug!(reply = %text.trim(), "gemini reply");
        parse_estimate(&text)
    }
}
