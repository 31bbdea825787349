//! HTTP client for a running stream-recorder service.

use crate::api::{RecordRequest, RecordResponse};
use crate::recorder::RecordingInfo;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub struct RecorderClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RecordingsBody {
    recordings: Vec<RecordingInfo>,
}

impl RecorderClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn start(&self, platform: &str, channel: &str) -> Result<RecordResponse> {
        self.post_record("record/start", platform, channel).await
    }

    pub async fn stop(&self, platform: &str, channel: &str) -> Result<RecordResponse> {
        self.post_record("record/stop", platform, channel).await
    }

    pub async fn list(&self) -> Result<Vec<RecordingInfo>> {
        let response = self
            .client
            .get(self.url("recordings"))
            .send()
            .await
            .context("Failed to reach stream-recorder service")?;

        let body: RecordingsBody = Self::parse(response).await?;
        Ok(body.recordings)
    }

    async fn post_record(&self, path: &str, platform: &str, channel: &str) -> Result<RecordResponse> {
        let request = RecordRequest {
            platform: platform.to_string(),
            channel: channel.to_string(),
        };

        let response = self
            .client
            .post(self.url(path))
            .json(&request)
            .send()
            .await
            .context("Failed to reach stream-recorder service")?;

        Self::parse(response).await
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.to_string(),
            };
            return Err(anyhow!("Service returned {}: {}", status.as_u16(), message));
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse service response")
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }
}
