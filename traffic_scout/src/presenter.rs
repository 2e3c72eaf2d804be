use crate::{
    map::{MapRenderer, Waypoint},
    planner::TripPlan,
    scanner::TrafficSnapshot,
};
use base64::Engine as _;
use html_escape::{encode_double_quoted_attribute, encode_text};

const TITLE: &str = "Ontario Traffic Scout";

/// One line of the camera list. The still is inlined so a rendered page
/// never depends on server-side state.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRow {
    pub title: String,
    pub vehicle_count: u32,
    pub image_src: String,
}

/// Lists the cameras of a snapshot nearest first.
pub struct FeedPresenter;

fn data_uri(image: &[u8]) -> String {
    format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(image)
    )
}

impl FeedPresenter {
    pub fn rows(snapshot: &TrafficSnapshot) -> Vec<FeedRow> {
        snapshot
            .feeds
            .iter()
            .map(|feed| FeedRow {
                title: format!("📍 {} | {:.1} km", feed.label, feed.distance_km),
                vehicle_count: feed.vehicle_count,
                image_src: data_uri(&feed.image),
            })
            .collect()
    }

    pub fn render(snapshot: &TrafficSnapshot) -> String {
        if snapshot.feeds.is_empty() {
            return "<p>No camera views could be analysed around the origin.</p>".to_string();
        }

        Self::rows(snapshot)
            .iter()
            .map(|row| {
                format!(
                    r#"<details><summary>{}</summary><p>Directional count: {} vehicles</p><img src="{}" alt="camera view" width="480"/></details>"#,
                    encode_text(&row.title),
                    row.vehicle_count,
                    row.image_src
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn page(head: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8"/>
<title>{title}</title>
{head}
</head>
<body>
<h1>🚗 {title}</h1>
{body}
</body>
</html>"#,
        title = TITLE,
        head = head,
        body = body
    )
}

/// Values echoed back into the form.
#[derive(Debug, Clone)]
pub struct FormValues<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub radius_km: f64,
}

fn form(values: &FormValues, min_radius_km: f64, max_radius_km: f64) -> String {
    format!(
        r#"<form action="/plan" method="get">
<label>Start <input name="origin" value="{origin}" required/></label>
<label>Destination <input name="destination" value="{destination}" required/></label>
<label>Scan radius (km) <input name="radius_km" type="number" min="{min}" max="{max}" step="1" value="{radius}"/></label>
<button type="submit">Analyze Route</button>
</form>"#,
        origin = encode_double_quoted_attribute(values.origin),
        destination = encode_double_quoted_attribute(values.destination),
        min = min_radius_km,
        max = max_radius_km,
        radius = values.radius_km,
    )
}

pub fn render_form_page(values: &FormValues, min_radius_km: f64, max_radius_km: f64) -> String {
    page("", &form(values, min_radius_km, max_radius_km))
}

pub fn render_error_page(
    values: &FormValues,
    message: &str,
    min_radius_km: f64,
    max_radius_km: f64,
) -> String {
    let body = format!(
        r#"{}
<p class="error">{}</p>"#,
        form(values, min_radius_km, max_radius_km),
        encode_text(message)
    );
    page("", &body)
}

pub fn render_plan_page(
    values: &FormValues,
    plan: &TripPlan,
    map: &MapRenderer,
    min_radius_km: f64,
    max_radius_km: f64,
) -> String {
    let map_html = map.render(
        &Waypoint {
            label: values.origin,
            position: plan.origin,
        },
        &Waypoint {
            label: values.destination,
            position: plan.destination,
        },
        &plan.route,
    );

    let body = format!(
        r#"{form}
<section class="metrics">
<div><h3>Adjusted ETA</h3><p>{eta:.2} min</p></div>
<div><h3>Total Regional Detections</h3><p>{vehicles}</p></div>
<div><h3>Traffic Multiplier</h3><p>×{multiplier}</p></div>
</section>
{map}
<h2>Camera Feeds within {radius} km</h2>
{feeds}"#,
        form = form(values, min_radius_km, max_radius_km),
        eta = plan.adjusted_eta_minutes,
        vehicles = plan.snapshot.total_vehicles,
        multiplier = plan.multiplier,
        map = map_html,
        radius = plan.radius_km,
        feeds = FeedPresenter::render(&plan.snapshot),
    );
    page(&map.head(), &body)
}
