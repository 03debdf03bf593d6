use std::collections::HashMap;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use tally_core::service::ServiceStatus;

use crate::api::{decode, expect_ok};
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub text: String,
    pub user_id: String,
    pub tts_mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatReply {
    pub reply: String,
    pub emotion: Option<String>,
    /// Base64-encoded speech audio, passed through opaquely.
    pub audio_b64: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StatusEntry {
    status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Transcript {
    text: String,
}

/// Client for the gateway service: orchestration endpoints plus status and
/// lifecycle of the services it fronts.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base: String,
}

impl GatewayClient {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    /// Full status snapshot of the services behind the gateway. Status
    /// strings outside the known vocabulary read as offline.
    pub async fn service_statuses(&self) -> Result<HashMap<String, ServiceStatus>, ApiError> {
        let resp = self
            .client
            .get(format!("{}/services/status", self.base))
            .send()
            .await?;
        let raw: HashMap<String, StatusEntry> = decode(expect_ok(resp).await?).await?;
        Ok(raw
            .into_iter()
            .map(|(id, entry)| {
                let status = ServiceStatus::parse(entry.status.as_deref().unwrap_or(""));
                (id, status)
            })
            .collect())
    }

    /// Starts one service through the gateway's routing.
    pub async fn start_service(&self, id: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(format!("{}/services/{id}/start", self.base))
            .send()
            .await?;
        expect_ok(resp).await?;
        Ok(())
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let resp = self
            .client
            .post(format!("{}/orchestrate/chat", self.base))
            .json(request)
            .send()
            .await?;
        decode(expect_ok(resp).await?).await
    }

    /// Uploads recorded audio for transcription and returns the recognized
    /// text.
    pub async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String, ApiError> {
        let part = Part::bytes(audio).file_name(filename.to_owned());
        let form = Form::new().part("audio", part);
        let resp = self
            .client
            .post(format!("{}/orchestrate/stt", self.base))
            .multipart(form)
            .send()
            .await?;
        let transcript: Transcript = decode(expect_ok(resp).await?).await?;
        Ok(transcript.text)
    }
}
