use crate::detector::VehicleDetector;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use traffic_core::{filter_by_radius, CameraDirectory, Coordinate, ImageSource};

/// One directional view of a camera near the origin.
#[derive(Debug, Clone, Serialize)]
pub struct CameraFeed {
    pub label: String,
    pub distance_km: f64,
    pub vehicle_count: u32,
    #[serde(skip)]
    pub image: Bytes,
}

/// What a single scan saw. Lives for one request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrafficSnapshot {
    pub total_vehicles: u32,
    pub feeds: Vec<CameraFeed>,
}

/// Counts vehicles in every view of every camera within a radius.
pub struct CameraScanner {
    directory: Arc<dyn CameraDirectory>,
    images: Arc<dyn ImageSource>,
    detector: Arc<dyn VehicleDetector>,
    min_image_bytes: usize,
}

impl CameraScanner {
    pub fn new(
        directory: Arc<dyn CameraDirectory>,
        images: Arc<dyn ImageSource>,
        detector: Arc<dyn VehicleDetector>,
        min_image_bytes: usize,
    ) -> Self {
        Self {
            directory,
            images,
            detector,
            min_image_bytes,
        }
    }

    /// Views are processed one after another. An unreachable directory gives
    /// an empty snapshot; a view that fails to download or decode is skipped.
    #[instrument(skip(self))]
    pub async fn scan(&self, center: Coordinate, radius_km: f64) -> TrafficSnapshot {
        let cameras = match self.directory.fetch_all().await {
            Ok(cameras) => cameras,
            Err(e) => {
                tracing::warn!(kind = e.kind().as_str(), "Camera directory unavailable: {}", e);
                return TrafficSnapshot::default();
            }
        };

        let nearby = filter_by_radius(cameras, center, radius_km);
        tracing::info!("Scanning {} cameras within {} km", nearby.len(), radius_km);

        let mut snapshot = TrafficSnapshot::default();
        for entry in nearby {
            let distance_km = (entry.distance_km * 10.0).round() / 10.0;
            for view in &entry.camera.views {
                let Some(url) = view.url.as_deref() else {
                    continue;
                };

                let image = match self.images.fetch(url).await {
                    Ok(image) => image,
                    Err(e) => {
                        tracing::warn!(url, "Skipping view: {}", e);
                        continue;
                    }
                };
                if image.len() < self.min_image_bytes {
                    tracing::debug!(url, size = image.len(), "Skipping placeholder image");
                    continue;
                }

                let vehicle_count = match self.detector.detect(image.clone()).await {
                    Ok(detections) => detections.len() as u32,
                    Err(e) => {
                        tracing::warn!(url, "Detection failed: {}", e);
                        continue;
                    }
                };

                snapshot.total_vehicles += vehicle_count;
                snapshot.feeds.push(CameraFeed {
                    label: format!("{} ({})", entry.camera.location, view.label()),
                    distance_km,
                    vehicle_count,
                    image,
                });
            }
        }

        snapshot
            .feeds
            .sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        snapshot
    }
}
