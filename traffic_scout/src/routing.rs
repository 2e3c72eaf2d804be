use crate::config::RouterConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;
use traffic_core::{polyline, Coordinate, UpstreamError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Route {
    /// Free-flow driving time in seconds.
    pub duration: f64,
    /// Encoded polyline of the full route.
    #[serde(default)]
    pub geometry: String,
}

impl Route {
    pub fn points(&self) -> Result<Vec<Coordinate>, UpstreamError> {
        polyline::decode(&self.geometry)
            .map_err(|e| UpstreamError::Malformed(format!("route geometry: {}", e)))
    }
}

#[async_trait]
pub trait RouteProvider: Send + Sync + 'static {
    async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<Option<Route>, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

/// Public OSRM driving profile.
#[derive(Debug, Clone)]
pub struct OsrmRouter {
    client: Client,
    base_url: String,
}

impl OsrmRouter {
    pub fn new(config: &RouterConfig, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    fn route_url(&self, from: Coordinate, to: Coordinate) -> String {
        format!(
            "{}/{};{}?overview=full&geometries=polyline",
            self.base_url.trim_end_matches('/'),
            from.to_lon_lat(),
            to.to_lon_lat()
        )
    }
}

#[async_trait]
impl RouteProvider for OsrmRouter {
    #[instrument(skip(self))]
    async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<Option<Route>, UpstreamError> {
        let url = self.route_url(from, to);
        let response = self.client.get(&url).send().await?;

        // OSRM answers "no route" with a 400 and a JSON body.
        let status = response.status();
        if !status.is_success() && !status.is_client_error() {
            return Err(UpstreamError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body: RouteResponse = response.json().await?;
        Ok(body.routes.into_iter().next())
    }
}
