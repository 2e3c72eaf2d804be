use crate::{
    config::Config,
    dispatcher::Dispatcher,
    error::BotError,
    poller::ChatPoller,
    session::{PollState, SessionStore},
    telegram::{ChatTransport, TelegramClient},
};
use std::{error::Error, sync::Arc, time::Duration};
use tokio::{signal, sync::broadcast, time::sleep};
use traffic_core::{CameraDirectory, HttpCameraDirectory, HttpImageSource, ImageSource};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let transport = match TelegramClient::new(&config.telegram) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Failed to initialize messaging client: {:?}", e);
            return Err(Box::new(e));
        }
    };
    let directory = Arc::new(HttpCameraDirectory::new(
        &config.directory.url,
        config.directory.get_timeout(),
    )?);
    let images = Arc::new(HttpImageSource::new(config.directory.get_image_timeout())?);

    let dispatcher = Dispatcher::new(
        directory,
        transport.clone(),
        images,
        SessionStore::new(config.listing.get_ttl()),
        config.region.clone(),
        config.listing.max_entries,
    );
    let poller = ChatPoller::new(transport, dispatcher, config.telegram.poll_timeout_secs);

    let (shutdown_tx, _) = broadcast::channel(1);
    let loop_shutdown_rx = shutdown_tx.subscribe();

    let retry_loop = RetryLoop::new(
        poller,
        config.polling.get_idle_delay(),
        config.polling.get_retry_delay(),
    );
    let loop_handle = tokio::spawn(retry_loop.run(loop_shutdown_rx));

    tracing::info!(
        "Camera bot is live for {}, waiting for the 'map' command",
        config.region.name
    );

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping the bot. Drive safe!");

    let _ = shutdown_tx.send(());
    let _ = loop_handle.await;

    Ok(())
}

/// Runs poll cycles forever. Any failed cycle is logged and followed by a
/// fixed delay before the next one; the delay never grows.
pub struct RetryLoop<D: CameraDirectory, T: ChatTransport, I: ImageSource> {
    poller: ChatPoller<D, T, I>,
    state: PollState,
    idle_delay: Duration,
    retry_delay: Duration,
}

impl<D: CameraDirectory, T: ChatTransport, I: ImageSource> RetryLoop<D, T, I> {
    pub fn new(poller: ChatPoller<D, T, I>, idle_delay: Duration, retry_delay: Duration) -> Self {
        Self {
            poller,
            state: PollState::default(),
            idle_delay,
            retry_delay,
        }
    }

    /// Returns the poll state when stopped, so a caller can persist it.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> PollState {
        loop {
            let result = tokio::select! {
                result = self.poller.poll_once(&mut self.state) => result,
                _ = shutdown_rx.recv() => break,
            };

            let delay = match result {
                Ok(_) => self.idle_delay,
                Err(ref err) => {
                    log_cycle_failure(err, self.retry_delay);
                    self.retry_delay
                }
            };

            tokio::select! {
                _ = sleep(delay) => {},
                _ = shutdown_rx.recv() => break,
            }
        }
        tracing::info!(offset = self.state.offset, "Poll loop stopped");
        self.state
    }
}

fn log_cycle_failure(err: &BotError, retry_delay: Duration) {
    let kind = err.kind();
    if kind.is_transient() {
        tracing::warn!(
            kind = kind.as_str(),
            "Connection blip: {}. Retrying in {} seconds",
            err,
            retry_delay.as_secs()
        );
    } else {
        tracing::error!(
            kind = kind.as_str(),
            "Poll cycle failed: {}. Retrying in {} seconds",
            err,
            retry_delay.as_secs()
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
