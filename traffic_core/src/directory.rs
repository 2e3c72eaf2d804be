use crate::{
    camera::Camera,
    error::UpstreamError,
    region::{filter_by_box, BoundingBox},
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_DIRECTORY_URL: &str = "https://511on.ca/api/v2/get/cameras";

#[async_trait]
pub trait CameraDirectory: Send + Sync + 'static {
    /// Every camera the directory currently publishes.
    async fn fetch_all(&self) -> Result<Vec<Camera>, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct HttpCameraDirectory {
    client: Client,
    url: String,
}

impl HttpCameraDirectory {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl CameraDirectory for HttpCameraDirectory {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_all(&self) -> Result<Vec<Camera>, UpstreamError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let cameras: Vec<Camera> = response.json().await?;
        tracing::debug!("Directory returned {} cameras", cameras.len());
        Ok(cameras)
    }
}

/// Cameras inside `bbox`, sorted by location. An unreachable or malformed
/// directory yields an empty list.
pub async fn cameras_in_box(directory: &dyn CameraDirectory, bbox: &BoundingBox) -> Vec<Camera> {
    tracing::info!("Searching for cameras in {}", bbox.name);
    match directory.fetch_all().await {
        Ok(cameras) => filter_by_box(cameras, bbox),
        Err(e) => {
            tracing::warn!(kind = e.kind().as_str(), "Camera directory unavailable: {}", e);
            Vec::new()
        }
    }
}
