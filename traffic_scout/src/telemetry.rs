use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;
use std::collections::HashSet;

pub struct Metrics {
    plan_requests: Counter<u64>,
    scan_duration: Histogram<u64>,
    vehicles_detected: Gauge<u64>,
    camera_views: Gauge<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("traffic_scout");
        global::set_meter_provider(provider);

        let plan_requests = meter
            .u64_counter("plan_requests_total")
            .with_description("Trip plans requested, by outcome")
            .build();

        // Serial scans over a few dozen views take seconds.
        let boundaries = generate_boundaries((100, 500, 2_000, 10_000, 60_000));

        let scan_duration = meter
            .u64_histogram("scan_duration_ms")
            .with_boundaries(boundaries)
            .with_description("Duration of camera scans in milliseconds")
            .build();

        let vehicles_detected = meter
            .u64_gauge("vehicles_detected")
            .with_description("Vehicles counted by the latest scan")
            .build();

        let camera_views = meter
            .u64_gauge("camera_views_analysed")
            .with_description("Camera views analysed by the latest scan")
            .build();

        Ok(Metrics {
            plan_requests,
            scan_duration,
            vehicles_detected,
            camera_views,
            registry,
        })
    }

    pub fn record_plan_request(&self, route: &str, outcome: &str) {
        let attributes = [
            KeyValue::new("route", route.to_string()),
            KeyValue::new("outcome", outcome.to_string()),
        ];
        self.plan_requests.add(1, &attributes);
    }

    pub fn record_scan(&self, duration_ms: u64, vehicles: u32, views: usize) {
        self.scan_duration.record(duration_ms, &[]);
        self.vehicles_detected.record(u64::from(vehicles), &[]);
        self.camera_views.record(views as u64, &[]);
    }
}

/// Histogram buckets: fine steps up to `parts.1`, then progressively
/// coarser ones up to `parts.4`.
fn generate_boundaries(parts: (u64, u64, u64, u64, u64)) -> Vec<f64> {
    let first_step = (parts.1 - parts.0).div_ceil(4).max(1) as usize;
    let middle_step = (parts.2 - parts.1).div_ceil(3).max(1) as usize;
    let end_step = (parts.3 - parts.2).div_ceil(4).max(1) as usize;
    let tail_step = (parts.4 - parts.3).div_ceil(5).max(1) as usize;

    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
