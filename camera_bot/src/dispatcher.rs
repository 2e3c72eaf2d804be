use crate::{
    error::BotError,
    relay::{ImageRelay, RelayOutcome},
    session::{Listing, Selection, SessionStore},
    telegram::{ChatId, ChatTransport, Message, ParseMode},
};
use std::{sync::Arc, time::Instant};
use tracing::instrument;
use traffic_core::{cameras_in_box, BoundingBox, CameraDirectory, ImageSource};

pub const LISTING_EXPIRED_TEXT: &str =
    "That camera list has expired. Send `map` for a fresh one.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Map,
    Select(usize),
    Unknown,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("map") {
            return Command::Map;
        }
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            // Too many digits for usize cannot index any listing.
            return Command::Select(text.parse().unwrap_or(usize::MAX));
        }
        Command::Unknown
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    ListingSent { entries: usize },
    NoCameras,
    Relayed(RelayOutcome),
    OutOfRange,
    ListingExpired,
    Ignored,
}

/// Chat command handling: `map` shows a numbered camera menu, a number picks
/// from the menu the chat was last shown.
pub struct Dispatcher<D: CameraDirectory, T: ChatTransport, I: ImageSource> {
    directory: Arc<D>,
    transport: Arc<T>,
    relay: ImageRelay<T, I>,
    sessions: SessionStore,
    region: BoundingBox,
    max_entries: usize,
}

impl<D: CameraDirectory, T: ChatTransport, I: ImageSource> Dispatcher<D, T, I> {
    pub fn new(
        directory: Arc<D>,
        transport: Arc<T>,
        images: Arc<I>,
        sessions: SessionStore,
        region: BoundingBox,
        max_entries: usize,
    ) -> Self {
        Self {
            directory,
            relay: ImageRelay::new(transport.clone(), images),
            transport,
            sessions,
            region,
            max_entries,
        }
    }

    #[instrument(skip(self, message), fields(chat_id = message.chat.id))]
    pub async fn handle(&mut self, message: &Message) -> Result<Outcome, BotError> {
        let chat_id = message.chat.id;
        let Some(text) = message.text.as_deref() else {
            return Ok(Outcome::Ignored);
        };

        let now = Instant::now();
        self.sessions.prune(now);

        match Command::parse(text) {
            Command::Map => self.send_listing(chat_id, now).await,
            Command::Select(index) => self.select(chat_id, index, now).await,
            Command::Unknown => Ok(Outcome::Ignored),
        }
    }

    async fn send_listing(&mut self, chat_id: ChatId, now: Instant) -> Result<Outcome, BotError> {
        let mut cameras = cameras_in_box(self.directory.as_ref(), &self.region).await;
        if cameras.is_empty() {
            self.transport
                .send_message(
                    chat_id,
                    &format!("No cameras found in {} right now.", self.region.name),
                    None,
                )
                .await?;
            return Ok(Outcome::NoCameras);
        }

        cameras.truncate(self.max_entries);
        let listing = Listing::new(cameras, now);
        let text = render_listing(&self.region.name, &listing);
        self.transport
            .send_message(chat_id, &text, Some(ParseMode::Markdown))
            .await?;

        let entries = listing.len();
        self.sessions.store(chat_id, listing);
        tracing::debug!("Chat is awaiting a selection among {} cameras", entries);
        Ok(Outcome::ListingSent { entries })
    }

    async fn select(
        &mut self,
        chat_id: ChatId,
        index: usize,
        now: Instant,
    ) -> Result<Outcome, BotError> {
        match self.sessions.select(chat_id, index, now) {
            Selection::Camera(camera) => {
                let outcome = self.relay.relay(chat_id, &camera).await?;
                self.sessions.complete(chat_id);
                Ok(Outcome::Relayed(outcome))
            }
            Selection::OutOfRange { index, len } => {
                tracing::debug!("Ignoring selection {} outside listing of {}", index, len);
                Ok(Outcome::OutOfRange)
            }
            Selection::NoListing => {
                self.transport
                    .send_message(chat_id, LISTING_EXPIRED_TEXT, Some(ParseMode::Markdown))
                    .await?;
                Ok(Outcome::ListingExpired)
            }
        }
    }
}

pub fn render_listing(region_name: &str, listing: &Listing) -> String {
    let header = format!(
        "📍 *{} Road Watch*\nI found these cameras. Pick a number:",
        escape_markdown(region_name)
    );
    let menu: Vec<String> = listing
        .cameras
        .iter()
        .enumerate()
        .map(|(i, camera)| format!("{} | {}", i, escape_markdown(&camera.location)))
        .collect();
    format!("{}\n{}", header, menu.join("\n"))
}

/// Escapes the characters legacy Markdown treats as entity delimiters.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        session::SessionStore,
        telegram::{Chat, Message},
        test_support::{camera, MockDirectory, MockImages, MockTransport, Sent},
    };
    use std::time::Duration;

    type TestDispatcher = Dispatcher<MockDirectory, MockTransport, MockImages>;

    fn dispatcher(
        cameras: Vec<traffic_core::Camera>,
        ttl: Duration,
    ) -> (TestDispatcher, Arc<MockTransport>) {
        dispatcher_with_images(cameras, ttl, MockImages::ok(vec![0xff; 2048]))
    }

    fn dispatcher_with_images(
        cameras: Vec<traffic_core::Camera>,
        ttl: Duration,
        images: MockImages,
    ) -> (TestDispatcher, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::default());
        let dispatcher = Dispatcher::new(
            Arc::new(MockDirectory::with(cameras)),
            transport.clone(),
            Arc::new(images),
            SessionStore::new(ttl),
            BoundingBox::kwc(),
            25,
        );
        (dispatcher, transport)
    }

    fn message(text: &str) -> Message {
        Message {
            chat: Chat { id: 42 },
            text: Some(text.to_string()),
        }
    }

    fn two_local_cameras() -> Vec<traffic_core::Camera> {
        vec![
            camera("Weber St", 43.47, -80.52, Some("https://cams.invalid/weber.jpg")),
            camera("Toronto", 43.65, -79.38, Some("https://cams.invalid/to.jpg")),
            camera("King St", 43.45, -80.49, Some("https://cams.invalid/king.jpg")),
        ]
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("map"), Command::Map);
        assert_eq!(Command::parse(" MAP "), Command::Map);
        assert_eq!(Command::parse("0"), Command::Select(0));
        assert_eq!(Command::parse("12"), Command::Select(12));
        assert_eq!(
            Command::parse("99999999999999999999999"),
            Command::Select(usize::MAX)
        );
        assert_eq!(Command::parse("-1"), Command::Unknown);
        assert_eq!(Command::parse("1.5"), Command::Unknown);
        assert_eq!(Command::parse(""), Command::Unknown);
        assert_eq!(Command::parse("maps"), Command::Unknown);
    }

    #[test]
    fn test_render_listing_escapes_markdown() {
        let listing = Listing::new(
            vec![
                camera("Hwy_8 *ramp*", 43.4, -80.4, None),
                camera("King St", 43.45, -80.49, None),
            ],
            Instant::now(),
        );
        let text = render_listing("KWC Region", &listing);
        assert_eq!(
            text,
            "📍 *KWC Region Road Watch*\nI found these cameras. Pick a number:\n0 | Hwy\\_8 \\*ramp\\*\n1 | King St"
        );
    }

    #[tokio::test]
    async fn test_map_then_select_sends_photo() {
        let (mut dispatcher, transport) = dispatcher(two_local_cameras(), Duration::from_secs(60));

        let outcome = dispatcher.handle(&message("map")).await.unwrap();
        assert_eq!(outcome, Outcome::ListingSent { entries: 2 });

        let outcome = dispatcher.handle(&message("1")).await.unwrap();
        assert_eq!(outcome, Outcome::Relayed(RelayOutcome::Sent));

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        match &sent[0] {
            Sent::Message {
                chat_id,
                text,
                parse_mode,
            } => {
                assert_eq!(*chat_id, 42);
                assert_eq!(*parse_mode, Some(ParseMode::Markdown));
                assert!(text.contains("0 | King St\n1 | Weber St"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &sent[1] {
            Sent::Photo { chat_id, photo } => {
                assert_eq!(*chat_id, 42);
                assert_eq!(photo.caption, "✅ Weber St");
                assert_eq!(photo.file_name, "traffic.jpg");
                assert_eq!(photo.data.len(), 2048);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_selection_sends_nothing() {
        let (mut dispatcher, transport) = dispatcher(two_local_cameras(), Duration::from_secs(60));
        dispatcher.handle(&message("map")).await.unwrap();

        let outcome = dispatcher.handle(&message("3")).await.unwrap();
        assert_eq!(outcome, Outcome::OutOfRange);
        assert_eq!(transport.sent().len(), 1);

        // The listing survives a bad pick.
        let outcome = dispatcher.handle(&message("0")).await.unwrap();
        assert_eq!(outcome, Outcome::Relayed(RelayOutcome::Sent));
    }

    #[tokio::test]
    async fn test_selection_without_listing_reports_expiry() {
        let (mut dispatcher, transport) = dispatcher(two_local_cameras(), Duration::from_secs(60));

        let outcome = dispatcher.handle(&message("0")).await.unwrap();
        assert_eq!(outcome, Outcome::ListingExpired);
        assert!(matches!(
            &transport.sent()[0],
            Sent::Message { text, .. } if text == LISTING_EXPIRED_TEXT
        ));
    }

    #[tokio::test]
    async fn test_expired_listing_is_not_used() {
        let (mut dispatcher, transport) = dispatcher(two_local_cameras(), Duration::ZERO);
        dispatcher.handle(&message("map")).await.unwrap();

        let outcome = dispatcher.handle(&message("0")).await.unwrap();
        assert_eq!(outcome, Outcome::ListingExpired);
        assert!(transport
            .sent()
            .iter()
            .all(|sent| matches!(sent, Sent::Message { .. })));
    }

    #[tokio::test]
    async fn test_selection_consumes_listing() {
        let (mut dispatcher, _transport) = dispatcher(two_local_cameras(), Duration::from_secs(60));
        dispatcher.handle(&message("map")).await.unwrap();
        dispatcher.handle(&message("0")).await.unwrap();

        let outcome = dispatcher.handle(&message("1")).await.unwrap();
        assert_eq!(outcome, Outcome::ListingExpired);
    }

    #[tokio::test]
    async fn test_failed_download_keeps_listing() {
        let (mut dispatcher, transport) = dispatcher_with_images(
            two_local_cameras(),
            Duration::from_secs(60),
            MockImages::down(),
        );
        dispatcher.handle(&message("map")).await.unwrap();

        for _ in 0..2 {
            let err = dispatcher.handle(&message("0")).await.unwrap_err();
            assert!(matches!(err, BotError::Upstream(_)));
        }
        assert!(transport
            .sent()
            .iter()
            .all(|sent| !matches!(sent, Sent::Message { text, .. } if text == LISTING_EXPIRED_TEXT)));
    }

    #[tokio::test]
    async fn test_other_text_is_ignored() {
        let (mut dispatcher, transport) = dispatcher(two_local_cameras(), Duration::from_secs(60));
        assert_eq!(
            dispatcher.handle(&message("hello")).await.unwrap(),
            Outcome::Ignored
        );
        let no_text = Message {
            chat: Chat { id: 42 },
            text: None,
        };
        assert_eq!(dispatcher.handle(&no_text).await.unwrap(), Outcome::Ignored);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_region_sends_notice() {
        let (mut dispatcher, transport) = dispatcher(
            vec![camera("Toronto", 43.65, -79.38, None)],
            Duration::from_secs(60),
        );
        assert_eq!(
            dispatcher.handle(&message("map")).await.unwrap(),
            Outcome::NoCameras
        );
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(
            dispatcher.handle(&message("0")).await.unwrap(),
            Outcome::ListingExpired
        );
    }

    #[tokio::test]
    async fn test_listing_is_capped() {
        let cameras: Vec<_> = (0..40)
            .map(|i| camera(&format!("Cam {:02}", i), 43.45, -80.5, None))
            .collect();
        let (mut dispatcher, _transport) = dispatcher(cameras, Duration::from_secs(60));
        assert_eq!(
            dispatcher.handle(&message("map")).await.unwrap(),
            Outcome::ListingSent { entries: 25 }
        );
        assert_eq!(
            dispatcher.handle(&message("30")).await.unwrap(),
            Outcome::OutOfRange
        );
    }

    #[tokio::test]
    async fn test_camera_without_image_is_reported() {
        let (mut dispatcher, transport) = dispatcher(
            vec![camera("King St", 43.45, -80.49, None)],
            Duration::from_secs(60),
        );
        dispatcher.handle(&message("map")).await.unwrap();
        assert_eq!(
            dispatcher.handle(&message("0")).await.unwrap(),
            Outcome::Relayed(RelayOutcome::NoImage)
        );
        assert!(matches!(
            &transport.sent()[1],
            Sent::Message { text, .. } if text.contains("King St")
        ));
    }
}
