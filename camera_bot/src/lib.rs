mod dispatcher;
mod poller;
mod relay;
mod session;
mod telegram;
#[cfg(test)]
mod test_support;

pub mod app;
pub mod config;
pub mod error;

pub use app::start_app;
