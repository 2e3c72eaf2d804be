use crate::config::GeocoderConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;
use traffic_core::{Coordinate, UpstreamError};

#[async_trait]
pub trait Geocoder: Send + Sync + 'static {
    /// Best match for a free-text place name, `None` when nothing matches.
    async fn locate(&self, place: &str) -> Result<Option<Coordinate>, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl Place {
    fn coordinate(&self) -> Result<Coordinate, UpstreamError> {
        let lat = self
            .lat
            .trim()
            .parse::<f64>()
            .map_err(|e| UpstreamError::Malformed(format!("lat {:?}: {}", self.lat, e)))?;
        let lon = self
            .lon
            .trim()
            .parse::<f64>()
            .map_err(|e| UpstreamError::Malformed(format!("lon {:?}: {}", self.lon, e)))?;
        Ok(Coordinate::new(lat, lon))
    }
}

fn first_match(places: &[Place]) -> Result<Option<Coordinate>, UpstreamError> {
    places.first().map(Place::coordinate).transpose()
}

/// OpenStreetMap Nominatim search.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn locate(&self, place: &str) -> Result<Option<Coordinate>, UpstreamError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let places: Vec<Place> = response.json().await?;
        first_match(&places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_parses_string_coordinates() {
        let places: Vec<Place> = serde_json::from_str(
            r#"[{"place_id": 1, "lat": "43.4516395", "lon": "-80.4925337", "display_name": "Kitchener City Hall"}]"#,
        )
        .unwrap();
        let coordinate = first_match(&places).unwrap().unwrap();
        assert!((coordinate.lat - 43.4516395).abs() < 1e-9);
        assert!((coordinate.lon + 80.4925337).abs() < 1e-9);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(first_match(&[]).unwrap(), None);
    }

    #[test]
    fn test_unparseable_coordinate() {
        let places = vec![Place {
            lat: "north".into(),
            lon: "-80.5".into(),
        }];
        assert!(matches!(
            first_match(&places),
            Err(UpstreamError::Malformed(_))
        ));
    }
}
