use traffic_core::Coordinate;

pub const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
pub const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// A labelled end of the trip.
#[derive(Debug, Clone)]
pub struct Waypoint<'a> {
    pub label: &'a str,
    pub position: Coordinate,
}

/// Renders a route as a Leaflet map fragment centred on the start.
#[derive(Debug, Clone)]
pub struct MapRenderer {
    zoom: u8,
    height_px: u32,
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self {
            zoom: 12,
            height_px: 480,
        }
    }
}

impl MapRenderer {
    pub fn head(&self) -> String {
        format!(
            r#"<link rel="stylesheet" href="{}"/><script src="{}"></script>"#,
            LEAFLET_CSS, LEAFLET_JS
        )
    }

    pub fn render(&self, start: &Waypoint, end: &Waypoint, route: &[Coordinate]) -> String {
        let points: Vec<[f64; 2]> = route.iter().map(|p| [p.lat, p.lon]).collect();

        format!(
            r#"<div id="map" style="height: {height}px;"></div>
<script>
const map = L.map('map').setView({start}, {zoom});
L.tileLayer('{tiles}', {{ attribution: '&copy; OpenStreetMap contributors' }}).addTo(map);
L.circleMarker({start}, {{ color: 'green', fillColor: 'green', fillOpacity: 0.9, radius: 9 }}).bindPopup({start_label}).addTo(map);
L.circleMarker({end}, {{ color: 'red', fillColor: 'red', fillOpacity: 0.9, radius: 9 }}).bindPopup({end_label}).addTo(map);
L.polyline({points}, {{ color: 'blue', weight: 5, opacity: 0.7 }}).addTo(map);
</script>"#,
            height = self.height_px,
            start = lat_lon(start.position),
            end = lat_lon(end.position),
            zoom = self.zoom,
            tiles = TILE_URL,
            start_label = js_string(start.label),
            end_label = js_string(end.label),
            points = serde_json::json!(points),
        )
    }
}

fn lat_lon(position: Coordinate) -> serde_json::Value {
    serde_json::json!([position.lat, position.lon])
}

/// Popup text as a JS string literal. HTML-escaping first keeps a label from
/// closing the surrounding script element.
fn js_string(label: &str) -> serde_json::Value {
    serde_json::Value::String(html_escape::encode_text(label).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(start_label: &str) -> String {
        MapRenderer::default().render(
            &Waypoint {
                label: start_label,
                position: Coordinate::new(43.45, -80.49),
            },
            &Waypoint {
                label: "Guelph",
                position: Coordinate::new(43.54, -80.25),
            },
            &[
                Coordinate::new(43.45, -80.49),
                Coordinate::new(43.5, -80.3),
                Coordinate::new(43.54, -80.25),
            ],
        )
    }

    #[test]
    fn test_render_map() {
        let html = render("Kitchener");

        assert!(html.contains("setView([43.45,-80.49], 12)"));
        assert!(html.contains("color: 'green'"));
        assert!(html.contains("color: 'red'"));
        assert!(html.contains("[[43.45,-80.49],[43.5,-80.3],[43.54,-80.25]]"));
        assert!(html.contains("color: 'blue', weight: 5, opacity: 0.7"));
        assert!(html.contains(r#"bindPopup("Kitchener")"#));
    }

    #[test]
    fn test_labels_cannot_break_out_of_script() {
        let html = render("</script><script>alert(1)</script>");
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains("&lt;/script&gt;"));
    }
}
