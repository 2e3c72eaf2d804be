use crate::{
    camera::Camera,
    geo::{haversine_km, Coordinate},
};
use serde::Deserialize;

/// Rectangular region, bounds inclusive.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub name: String,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Kitchener, Waterloo and Cambridge.
    pub fn kwc() -> Self {
        Self {
            name: "KWC Region".to_string(),
            lat_min: 43.3,
            lat_max: 43.6,
            lon_min: -80.6,
            lon_max: -80.2,
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        (self.lat_min..=self.lat_max).contains(&point.lat)
            && (self.lon_min..=self.lon_max).contains(&point.lon)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::kwc()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearbyCamera {
    pub camera: Camera,
    pub distance_km: f64,
}

/// Cameras inside `bbox`, sorted by location name.
pub fn filter_by_box(cameras: Vec<Camera>, bbox: &BoundingBox) -> Vec<Camera> {
    let mut selected: Vec<Camera> = cameras
        .into_iter()
        .filter(|camera| camera.coordinate().is_some_and(|c| bbox.contains(c)))
        .collect();
    selected.sort_by(|a, b| a.location.cmp(&b.location));
    selected
}

/// Cameras within `radius_km` of `center`, nearest first.
pub fn filter_by_radius(
    cameras: Vec<Camera>,
    center: Coordinate,
    radius_km: f64,
) -> Vec<NearbyCamera> {
    let mut selected: Vec<NearbyCamera> = cameras
        .into_iter()
        .filter_map(|camera| {
            let distance_km = haversine_km(center, camera.coordinate()?);
            (distance_km <= radius_km).then_some(NearbyCamera {
                camera,
                distance_km,
            })
        })
        .collect();
    selected.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    selected
}

#[derive(Debug, Clone)]
pub enum Region {
    Box(BoundingBox),
    Radius { center: Coordinate, radius_km: f64 },
}

impl Region {
    /// Applies the region and its documented ordering.
    pub fn select(&self, cameras: Vec<Camera>) -> Vec<Camera> {
        match self {
            Region::Box(bbox) => filter_by_box(cameras, bbox),
            Region::Radius { center, radius_km } => filter_by_radius(cameras, *center, *radius_km)
                .into_iter()
                .map(|nearby| nearby.camera)
                .collect(),
        }
    }
}
