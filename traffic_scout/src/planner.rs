use crate::{
    config::ScanConfig,
    geocode::Geocoder,
    routing::RouteProvider,
    scanner::{CameraScanner, TrafficSnapshot},
};
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use thiserror::Error;
use tracing::instrument;
use traffic_core::{Coordinate, ErrorKind, TrafficWeightPolicy, UpstreamError};

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Location lookup failed.")]
    LocationNotFound { place: String },
    #[error("No driving route between the two locations.")]
    NoRoute,
    #[error("Upstream service failed: {0}")]
    Upstream(#[from] UpstreamError),
}

impl PlanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::LocationNotFound { .. } | PlanError::NoRoute => ErrorKind::OutOfRange,
            PlanError::Upstream(e) => e.kind(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TripRequest {
    pub origin: String,
    pub destination: String,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripPlan {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub radius_km: f64,
    pub multiplier: f64,
    pub base_duration_secs: f64,
    pub adjusted_duration_secs: f64,
    pub adjusted_eta_minutes: f64,
    pub route: Vec<Coordinate>,
    pub scan_duration_ms: u64,
    pub snapshot: TrafficSnapshot,
}

/// Geocode, scan around the origin, route, and weight the ETA.
pub struct TripPlanner {
    geocoder: Arc<dyn Geocoder>,
    router: Arc<dyn RouteProvider>,
    scanner: CameraScanner,
    policy: TrafficWeightPolicy,
    scan_config: ScanConfig,
}

impl TripPlanner {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        router: Arc<dyn RouteProvider>,
        scanner: CameraScanner,
        policy: TrafficWeightPolicy,
        scan_config: ScanConfig,
    ) -> Self {
        Self {
            geocoder,
            router,
            scanner,
            policy,
            scan_config,
        }
    }

    async fn locate(&self, place: &str) -> Result<Coordinate, PlanError> {
        let place = place.trim();
        if place.is_empty() {
            return Err(PlanError::LocationNotFound {
                place: String::new(),
            });
        }
        match self.geocoder.locate(place).await {
            Ok(Some(coordinate)) => Ok(coordinate),
            Ok(None) => Err(PlanError::LocationNotFound {
                place: place.to_string(),
            }),
            // An unreachable geocoder reads the same as an unknown place.
            Err(e) => {
                tracing::warn!(kind = e.kind().as_str(), "Geocoding {} failed: {}", place, e);
                Err(PlanError::LocationNotFound {
                    place: place.to_string(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn plan(&self, request: &TripRequest) -> Result<TripPlan, PlanError> {
        let origin = self.locate(&request.origin).await?;
        let destination = self.locate(&request.destination).await?;
        let radius_km = self.scan_config.clamp_radius(request.radius_km);

        let started = Instant::now();
        let snapshot = self.scanner.scan(origin, radius_km).await;
        let scan_duration_ms = started.elapsed().as_millis() as u64;
        let multiplier = self.policy.multiplier(snapshot.total_vehicles);

        let route = self
            .router
            .route(origin, destination)
            .await?
            .ok_or(PlanError::NoRoute)?;
        let points = route.points()?;

        let adjusted_duration_secs = self
            .policy
            .adjust_secs(route.duration, snapshot.total_vehicles);
        let adjusted_eta_minutes = (adjusted_duration_secs / 60.0 * 100.0).round() / 100.0;
        tracing::info!(
            vehicles = snapshot.total_vehicles,
            multiplier,
            "Adjusted ETA {} min",
            adjusted_eta_minutes
        );

        Ok(TripPlan {
            origin,
            destination,
            radius_km,
            multiplier,
            base_duration_secs: route.duration,
            adjusted_duration_secs,
            adjusted_eta_minutes,
            route: points,
            scan_duration_ms,
            snapshot,
        })
    }
}
