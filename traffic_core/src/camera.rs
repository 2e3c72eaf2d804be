use crate::geo::Coordinate;
use serde::Deserialize;

/// One record of the public camera directory. The directory is the source of
/// truth, so every field tolerates absence.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Camera {
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub views: Vec<CameraView>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct CameraView {
    pub url: Option<String>,
    pub description: Option<String>,
}

impl Camera {
    /// The camera position, if the directory published a usable one.
    /// Zero is what the directory sends for an unknown coordinate.
    pub fn coordinate(&self) -> Option<Coordinate> {
        let lat = self.latitude.filter(|v| v.is_finite() && *v != 0.0)?;
        let lon = self.longitude.filter(|v| v.is_finite() && *v != 0.0)?;
        Some(Coordinate::new(lat, lon))
    }

    pub fn primary_image_url(&self) -> Option<&str> {
        self.views.first().and_then(|view| view.url.as_deref())
    }
}

impl CameraView {
    pub fn label(&self) -> &str {
        match self.description.as_deref() {
            Some(description) if !description.trim().is_empty() => description,
            _ => "Main",
        }
    }
}
