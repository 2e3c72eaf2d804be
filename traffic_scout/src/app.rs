use crate::{
    config::Config,
    geocode::NominatimGeocoder,
    ort_detector::OrtVehicleDetector,
    planner::TripPlanner,
    routing::OsrmRouter,
    scanner::CameraScanner,
    server::HttpServer,
};
use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};
use traffic_core::{HttpCameraDirectory, HttpImageSource};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let detector = match OrtVehicleDetector::new(&config.model) {
        Ok(detector) => Arc::new(detector),
        Err(e) => {
            tracing::error!("Failed to load the detection model: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let directory_timeout = config.directory.get_timeout();
    let directory = Arc::new(HttpCameraDirectory::new(
        &config.directory.url,
        directory_timeout,
    )?);
    let images = Arc::new(HttpImageSource::new(config.scan.get_image_timeout())?);
    let geocoder = Arc::new(NominatimGeocoder::new(&config.geocoder, directory_timeout)?);
    let router = Arc::new(OsrmRouter::new(&config.router, directory_timeout)?);

    let scanner = CameraScanner::new(directory, images, detector, config.scan.min_image_bytes);
    let planner = Arc::new(TripPlanner::new(
        geocoder,
        router,
        scanner,
        config.weight.clone(),
        config.scan.clone(),
    ));

    let server = HttpServer::new(planner, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    match server_handle.await {
        Ok(Err(e)) => tracing::error!("Dashboard server stopped with an error: {}", e),
        Err(e) => tracing::error!("Dashboard server task failed: {}", e),
        Ok(Ok(())) => {}
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
