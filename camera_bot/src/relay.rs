use crate::{
    error::BotError,
    telegram::{ChatId, ChatTransport, Photo},
};
use std::sync::Arc;
use tracing::instrument;
use traffic_core::{Camera, ImageSource};

const PHOTO_FILE_NAME: &str = "traffic.jpg";

#[derive(Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    Sent,
    NoImage,
}

/// Downloads a camera still and re-uploads it to a chat.
pub struct ImageRelay<T: ChatTransport, I: ImageSource> {
    transport: Arc<T>,
    images: Arc<I>,
}

impl<T: ChatTransport, I: ImageSource> ImageRelay<T, I> {
    pub fn new(transport: Arc<T>, images: Arc<I>) -> Self {
        Self { transport, images }
    }

    #[instrument(skip(self, camera), fields(location = %camera.location))]
    pub async fn relay(&self, chat_id: ChatId, camera: &Camera) -> Result<RelayOutcome, BotError> {
        let Some(url) = camera.primary_image_url() else {
            tracing::info!("Camera has no image view");
            self.transport
                .send_message(
                    chat_id,
                    &format!("No live image is published for {}.", camera.location),
                    None,
                )
                .await?;
            return Ok(RelayOutcome::NoImage);
        };

        tracing::info!("Sending the live image for {}", camera.location);
        let data = self.images.fetch(url).await?;
        self.transport
            .send_photo(
                chat_id,
                Photo {
                    file_name: PHOTO_FILE_NAME.to_string(),
                    caption: format!("✅ {}", camera.location),
                    data,
                },
            )
            .await?;

        Ok(RelayOutcome::Sent)
    }
}
