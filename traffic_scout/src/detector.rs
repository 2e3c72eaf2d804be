use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Image decoding failed: {0}")]
    Decode(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Inference task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One object found in a camera still, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Detection {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn intersection(&self, other: &Detection) -> f32 {
        let w = self.x2.min(other.x2) - self.x1.max(other.x1);
        let h = self.y2.min(other.y2) - self.y1.max(other.y1);
        w.max(0.0) * h.max(0.0)
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let intersection = self.intersection(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Greedy suppression: keeps the most confident box and drops every box
/// overlapping a kept one by `iou_threshold` or more.
pub fn non_max_suppression(mut boxes: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::new();
    for candidate in boxes {
        if kept
            .iter()
            .all(|existing| existing.iou(&candidate) < iou_threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}

/// Vehicle detector over a still image; only vehicle classes are returned.
#[async_trait]
pub trait VehicleDetector: Send + Sync + 'static {
    async fn detect(&self, image: Bytes) -> Result<Vec<Detection>, DetectionError>;
}
