use crate::{
    config::ModelConfig,
    detector::{non_max_suppression, Detection, DetectionError, VehicleDetector},
};
use async_trait::async_trait;
use bytes::Bytes;
use image::{imageops::FilterType, GenericImageView};
use ndarray::{s, Array, ArrayD, Axis, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

const INPUT_SIZE: u32 = 640;
const IOU_THRESHOLD: f32 = 0.7;

fn transform_image(image_data: &[u8]) -> Result<(Array<f32, Ix4>, u32, u32), DetectionError> {
    let image_reader = image::ImageReader::new(std::io::Cursor::new(image_data))
        .with_guessed_format()
        .map_err(|e| DetectionError::Decode(e.to_string()))?;

    let original_img = image_reader
        .decode()
        .map_err(|e| DetectionError::Decode(e.to_string()))?;

    let (img_width, img_height) = original_img.dimensions();
    let img = original_img.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);

    let size = INPUT_SIZE as usize;
    let mut input = Array::zeros((1, 3, size, size));
    for pixel in img.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    Ok((input, img_height, img_width))
}

/// Decodes a YOLOv8 `[1, 4 + classes, anchors]` output into vehicle boxes
/// scaled back to the source image.
pub fn parse_detections(
    output: &ArrayD<f32>,
    img_width: u32,
    img_height: u32,
    min_probability: f32,
    vehicle_classes: &[u32],
) -> Result<Vec<Detection>, DetectionError> {
    if output.ndim() != 3 || output.shape()[1] <= 4 {
        return Err(DetectionError::Inference(format!(
            "unexpected output shape {:?}",
            output.shape()
        )));
    }

    let scale_x = img_width as f32 / INPUT_SIZE as f32;
    let scale_y = img_height as f32 / INPUT_SIZE as f32;

    let output = output.t();
    let output = output.slice(s![.., .., 0]);

    let mut boxes = Vec::new();
    for row in output.axis_iter(Axis(0)) {
        let row: Vec<f32> = row.iter().copied().collect();
        let best = row
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .reduce(|accum, entry| if entry.1 > accum.1 { entry } else { accum });
        let Some((class_index, prob)) = best else {
            continue;
        };

        let class_id = class_index as u32;
        if prob < min_probability || !vehicle_classes.contains(&class_id) {
            continue;
        }

        let xc = row[0] * scale_x;
        let yc = row[1] * scale_y;
        let w = row[2] * scale_x;
        let h = row[3] * scale_y;

        boxes.push(Detection {
            class_id,
            confidence: prob,
            x1: xc - w / 2.,
            y1: yc - h / 2.,
            x2: xc + w / 2.,
            y2: yc + h / 2.,
        });
    }

    Ok(non_max_suppression(boxes, IOU_THRESHOLD))
}

/// YOLOv8 on ONNX Runtime with a small pool of sessions used round-robin.
#[derive(Clone)]
pub struct OrtVehicleDetector {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    min_probability: f32,
    vehicle_classes: Arc<Vec<u32>>,
}

impl OrtVehicleDetector {
    pub fn new(model_config: &ModelConfig) -> Result<Self, ort::Error> {
        let num_instances = model_config.num_instances.max(1);
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(model_config.get_path())?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!("Created {} ONNX sessions", num_instances);

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
            min_probability: model_config.min_probability,
            vehicle_classes: Arc::new(model_config.vehicle_classes.clone()),
        })
    }

    fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<ArrayD<f32>, DetectionError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = self.sessions[index].lock();
        tracing::debug!("Handling image with session {}", index);

        let tensor_ref = TensorRef::from_array_view(input.view())
            .map_err(|e| DetectionError::Inference(format!("failed to build tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![tensor_ref])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let (shape, data) = outputs["output0"]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectionError::Inference(format!("failed to extract tensor: {}", e)))?;

        ArrayD::from_shape_vec(shape.to_ixdyn(), data.to_vec())
            .map_err(|e| DetectionError::Inference(format!("invalid tensor shape: {}", e)))
    }

    fn detect_blocking(&self, image: &[u8]) -> Result<Vec<Detection>, DetectionError> {
        let (input, img_height, img_width) = transform_image(image)?;
        let output = self.run_inference(&input)?;
        parse_detections(
            &output,
            img_width,
            img_height,
            self.min_probability,
            &self.vehicle_classes,
        )
    }
}

#[async_trait]
impl VehicleDetector for OrtVehicleDetector {
    async fn detect(&self, image: Bytes) -> Result<Vec<Detection>, DetectionError> {
        let detector = self.clone();
        tokio::task::spawn_blocking(move || detector.detect_blocking(&image)).await?
    }
}
