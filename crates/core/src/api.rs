use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::{
    config::Config,
    error::ApiError,
    types::{CaptionListing, CaptionRecord, GenerationRequest, ModelListing, Video},
};

/// The captioning backend as seen by the orchestration layer.
#[async_trait]
pub trait CaptionApi: Send + Sync {
    async fn list_videos(&self) -> Result<Vec<Video>, ApiError>;

    async fn list_models(&self) -> Result<ModelListing, ApiError>;

    async fn generate_caption(&self, request: &GenerationRequest)
    -> Result<CaptionRecord, ApiError>;

    /// Every current caption for the video, one per model at most.
    async fn list_captions(&self, filename: &str) -> Result<Vec<CaptionRecord>, ApiError>;

    async fn video_info(&self, filename: &str) -> Result<Video, ApiError> {
        self.list_videos()
            .await?
            .into_iter()
            .find(|video| video.filename == filename)
            .ok_or_else(|| ApiError::Status {
                status: 404,
                detail: "Video not found".to_string(),
            })
    }

    async fn delete_caption(&self, filename: &str) -> Result<(), ApiError>;

    async fn health(&self) -> Result<serde_json::Value, ApiError>;

    fn stream_url(&self, filename: &str) -> Result<Url, ApiError>;
}

pub struct HttpCaptionApi {
    client: Client,
    base: Url,
    generation_timeout: Duration,
}

impl HttpCaptionApi {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base: config.api_url.clone(),
            generation_timeout: config.generation_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn videos_url(&self, tail: &[&str]) -> Result<Url, ApiError> {
        let mut segments = vec!["api", "videos"];
        segments.extend_from_slice(tail);
        endpoint(&self.base, &segments)
    }
}

/// Joins `segments` onto `base`, percent-encoding each one, so a filename is
/// always a single opaque path segment.
pub fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Pulls FastAPI's `{"detail": ...}` out of an error body.
fn error_detail(body: &str, status: reqwest::StatusCode) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.trim().to_string(),
        },
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        detail: error_detail(&body, status),
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl CaptionApi for HttpCaptionApi {
    #[instrument(skip(self))]
    async fn list_videos(&self) -> Result<Vec<Video>, ApiError> {
        let url = self.videos_url(&[])?;
        decode(self.client.get(url).send().await?).await
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> Result<ModelListing, ApiError> {
        let url = self.videos_url(&["available-models"])?;
        decode(self.client.get(url).send().await?).await
    }

    #[instrument(skip(self, request), fields(request_id = %request.id, filename = %request.filename, model = %request.model_key))]
    async fn generate_caption(
        &self,
        request: &GenerationRequest,
    ) -> Result<CaptionRecord, ApiError> {
        let url = self.videos_url(&[request.filename.as_str(), "caption"])?;
        let body = match &request.prompt {
            Some(prompt) => serde_json::json!({ "prompt": prompt }),
            None => serde_json::json!({}),
        };

        debug!(regenerate = request.regenerate, "posting caption request");
        let response = self
            .client
            .post(url)
            .query(&[
                ("model", request.model_key.as_str()),
                ("regenerate", if request.regenerate { "true" } else { "false" }),
            ])
            .timeout(self.generation_timeout)
            .json(&body)
            .send()
            .await?;

        let mut record: CaptionRecord = decode(response).await?;
        if record.model_key.is_empty() {
            record.model_key = request.model_key.clone();
        }
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn list_captions(&self, filename: &str) -> Result<Vec<CaptionRecord>, ApiError> {
        let url = self.videos_url(&[filename, "all-captions"])?;
        let listing: CaptionListing = decode(self.client.get(url).send().await?).await?;
        Ok(listing.captions)
    }

    #[instrument(skip(self))]
    async fn video_info(&self, filename: &str) -> Result<Video, ApiError> {
        let url = self.videos_url(&[filename])?;
        decode(self.client.get(url).send().await?).await
    }

    #[instrument(skip(self))]
    async fn delete_caption(&self, filename: &str) -> Result<(), ApiError> {
        let url = self.videos_url(&[filename, "caption"])?;
        check(self.client.delete(url).send().await?).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health(&self) -> Result<serde_json::Value, ApiError> {
        let url = endpoint(&self.base, &["health"])?;
        decode(self.client.get(url).send().await?).await
    }

    fn stream_url(&self, filename: &str) -> Result<Url, ApiError> {
        self.videos_url(&[filename, "stream"])
    }
}
