mod detector;
mod geocode;
mod map;
mod ort_detector;
mod planner;
mod presenter;
mod routes;
mod routing;
mod scanner;
mod server;
mod telemetry;

#[cfg(test)]
mod test_support;

pub mod app;
pub mod config;

pub use app::start_app;
