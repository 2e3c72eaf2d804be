use crate::{
    presenter::{render_form_page, FormValues},
    server::SharedState,
};
use axum::{extract::State, response::Html};

pub async fn index(State(state): State<SharedState>) -> Html<String> {
    let scan = &state.scan_config;
    Html(render_form_page(
        &FormValues {
            origin: "Kitchener City Hall",
            destination: "Guelph Central Station",
            radius_km: scan.default_radius_km,
        },
        scan.min_radius_km,
        scan.max_radius_km,
    ))
}
