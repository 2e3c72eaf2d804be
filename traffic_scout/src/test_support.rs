use crate::{
    config::ScanConfig,
    detector::{Detection, DetectionError, VehicleDetector},
    geocode::Geocoder,
    planner::{TripPlanner, TripRequest},
    routing::{Route, RouteProvider},
    scanner::CameraScanner,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{collections::HashMap, sync::Arc};
use traffic_core::{
    polyline, Camera, CameraDirectory, CameraView, Coordinate, ImageSource, TrafficWeightPolicy,
    UpstreamError,
};

pub fn camera_with_views(
    location: &str,
    lat: f64,
    lon: f64,
    views: &[(&str, Option<&str>)],
) -> Camera {
    Camera {
        location: location.to_string(),
        latitude: Some(lat),
        longitude: Some(lon),
        views: views
            .iter()
            .map(|(url, description)| CameraView {
                url: Some(url.to_string()),
                description: description.map(str::to_string),
            })
            .collect(),
    }
}

pub struct MockDirectory {
    cameras: Option<Vec<Camera>>,
}

impl MockDirectory {
    pub fn with(cameras: Vec<Camera>) -> Self {
        Self {
            cameras: Some(cameras),
        }
    }

    pub fn down() -> Self {
        Self { cameras: None }
    }
}

#[async_trait]
impl CameraDirectory for MockDirectory {
    async fn fetch_all(&self) -> Result<Vec<Camera>, UpstreamError> {
        self.cameras.clone().ok_or_else(|| UpstreamError::Status {
            url: "directory".into(),
            status: 503,
        })
    }
}

/// Serves zero-filled images of a fixed size per URL; unknown URLs are 404.
#[derive(Default)]
pub struct MockImages {
    sizes: HashMap<String, usize>,
}

impl MockImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, size: usize) -> Self {
        self.sizes.insert(url.to_string(), size);
        self
    }
}

#[async_trait]
impl ImageSource for MockImages {
    async fn fetch(&self, url: &str) -> Result<Bytes, UpstreamError> {
        self.sizes
            .get(url)
            .map(|size| Bytes::from(vec![0u8; *size]))
            .ok_or_else(|| UpstreamError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Reports a vehicle count keyed on the image size.
pub struct MockDetector {
    counts: HashMap<usize, usize>,
}

impl MockDetector {
    pub fn by_size(counts: &[(usize, usize)]) -> Self {
        Self {
            counts: counts.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl VehicleDetector for MockDetector {
    async fn detect(&self, image: Bytes) -> Result<Vec<Detection>, DetectionError> {
        let count = self
            .counts
            .get(&image.len())
            .copied()
            .ok_or_else(|| DetectionError::Decode("unrecognised image".into()))?;
        Ok((0..count)
            .map(|i| Detection {
                class_id: 2,
                confidence: 0.9,
                x1: i as f32 * 10.0,
                y1: 0.0,
                x2: i as f32 * 10.0 + 5.0,
                y2: 5.0,
            })
            .collect())
    }
}

/// An empty gazetteer answers every lookup with a 503.
pub struct MockGeocoder {
    places: Option<HashMap<String, Coordinate>>,
}

impl MockGeocoder {
    pub fn with(places: &[(&str, Coordinate)]) -> Self {
        Self {
            places: Some(
                places
                    .iter()
                    .map(|(name, coordinate)| (name.to_string(), *coordinate))
                    .collect(),
            ),
        }
    }

    pub fn down() -> Self {
        Self { places: None }
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn locate(&self, place: &str) -> Result<Option<Coordinate>, UpstreamError> {
        match &self.places {
            Some(places) => Ok(places.get(place).copied()),
            None => Err(UpstreamError::Status {
                url: "https://geocoder.invalid/search".into(),
                status: 503,
            }),
        }
    }
}

pub struct MockRouter {
    pub route: Option<Route>,
}

#[async_trait]
impl RouteProvider for MockRouter {
    async fn route(
        &self,
        _from: Coordinate,
        _to: Coordinate,
    ) -> Result<Option<Route>, UpstreamError> {
        Ok(self.route.clone())
    }
}

pub fn kitchener() -> Coordinate {
    Coordinate::new(43.4516, -80.4925)
}

pub fn guelph() -> Coordinate {
    Coordinate::new(43.5448, -80.2482)
}

pub fn fixture_route() -> Route {
    Route {
        duration: 600.0,
        geometry: polyline::encode(&[kitchener(), guelph()]),
    }
}

pub fn fixture_request() -> TripRequest {
    TripRequest {
        origin: "Kitchener City Hall".into(),
        destination: "Guelph Central Station".into(),
        radius_km: Some(20.0),
    }
}

/// Two single-view cameras near Kitchener, each reporting
/// `vehicles_per_view` vehicles.
pub fn fixture_planner(route: Option<Route>, vehicles_per_view: usize) -> TripPlanner {
    planner_with_geocoder(
        MockGeocoder::with(&[
            ("Kitchener City Hall", kitchener()),
            ("Guelph Central Station", guelph()),
        ]),
        route,
        vehicles_per_view,
    )
}

pub fn planner_with_geocoder(
    geocoder: MockGeocoder,
    route: Option<Route>,
    vehicles_per_view: usize,
) -> TripPlanner {
    let directory = MockDirectory::with(vec![
        camera_with_views("Hwy 8", 43.46, -80.49, &[("https://cams.invalid/a.jpg", None)]),
        camera_with_views("Hwy 7", 43.47, -80.48, &[("https://cams.invalid/b.jpg", None)]),
    ]);
    let images = MockImages::new()
        .with("https://cams.invalid/a.jpg", 20_000)
        .with("https://cams.invalid/b.jpg", 20_000);
    let scanner = CameraScanner::new(
        Arc::new(directory),
        Arc::new(images),
        Arc::new(MockDetector::by_size(&[(20_000, vehicles_per_view)])),
        10_000,
    );
    TripPlanner::new(
        Arc::new(geocoder),
        Arc::new(MockRouter { route }),
        scanner,
        TrafficWeightPolicy::default(),
        ScanConfig::default(),
    )
}
