use crate::telegram::{ChatId, ChatTransport, ParseMode, Photo, TelegramError, Update};
use async_trait::async_trait;
use bytes::Bytes;
use std::{collections::VecDeque, sync::Mutex};
use traffic_core::{Camera, CameraDirectory, CameraView, ImageSource, UpstreamError};

pub fn camera(location: &str, lat: f64, lon: f64, url: Option<&str>) -> Camera {
    Camera {
        location: location.to_string(),
        latitude: Some(lat),
        longitude: Some(lon),
        views: url
            .map(|url| {
                vec![CameraView {
                    url: Some(url.to_string()),
                    description: None,
                }]
            })
            .unwrap_or_default(),
    }
}

pub struct MockDirectory {
    cameras: Option<Vec<Camera>>,
}

impl MockDirectory {
    pub fn with(cameras: Vec<Camera>) -> Self {
        Self {
            cameras: Some(cameras),
        }
    }
}

#[async_trait]
impl CameraDirectory for MockDirectory {
    async fn fetch_all(&self) -> Result<Vec<Camera>, UpstreamError> {
        self.cameras
            .clone()
            .ok_or_else(|| UpstreamError::Malformed("directory down".into()))
    }
}

pub struct MockImages {
    data: Option<Vec<u8>>,
}

impl MockImages {
    pub fn ok(data: Vec<u8>) -> Self {
        Self { data: Some(data) }
    }

    pub fn down() -> Self {
        Self { data: None }
    }
}

#[async_trait]
impl ImageSource for MockImages {
    async fn fetch(&self, url: &str) -> Result<Bytes, UpstreamError> {
        self.data
            .clone()
            .map(Bytes::from)
            .ok_or_else(|| UpstreamError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[derive(Debug, Clone)]
pub enum Sent {
    Message {
        chat_id: ChatId,
        text: String,
        parse_mode: Option<ParseMode>,
    },
    Photo {
        chat_id: ChatId,
        photo: Photo,
    },
}

/// Records every send and replays queued `getUpdates` results. An empty
/// queue answers with an API error.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<Sent>>,
    batches: Mutex<VecDeque<Vec<Update>>>,
    offsets: Mutex<Vec<i64>>,
}

impl MockTransport {
    pub fn with_batches(batches: Vec<Vec<Update>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn requested_offsets(&self) -> Vec<i64> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn get_updates(
        &self,
        offset: i64,
        _timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.offsets.lock().unwrap().push(offset);
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TelegramError::Api {
                method: "getUpdates".into(),
                description: "Bad Gateway".into(),
            })
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TelegramError> {
        self.sent.lock().unwrap().push(Sent::Message {
            chat_id,
            text: text.to_string(),
            parse_mode,
        });
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, photo: Photo) -> Result<(), TelegramError> {
        self.sent.lock().unwrap().push(Sent::Photo { chat_id, photo });
        Ok(())
    }
}
