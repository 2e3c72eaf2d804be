use crate::{
    dispatcher::{Dispatcher, Outcome},
    error::BotError,
    session::PollState,
    telegram::ChatTransport,
};
use std::sync::Arc;
use tracing::instrument;
use traffic_core::{CameraDirectory, ImageSource};

/// Drains the update stream one long-poll at a time.
pub struct ChatPoller<D: CameraDirectory, T: ChatTransport, I: ImageSource> {
    transport: Arc<T>,
    dispatcher: Dispatcher<D, T, I>,
    poll_timeout_secs: u64,
}

impl<D: CameraDirectory, T: ChatTransport, I: ImageSource> ChatPoller<D, T, I> {
    pub fn new(transport: Arc<T>, dispatcher: Dispatcher<D, T, I>, poll_timeout_secs: u64) -> Self {
        Self {
            transport,
            dispatcher,
            poll_timeout_secs,
        }
    }

    /// One cycle: fetch pending updates after `state.offset` and handle them
    /// in order. Each update is acknowledged before it is handled, so a
    /// failing update is not delivered again while the ones after it are.
    #[instrument(skip(self, state), fields(offset = state.offset))]
    pub async fn poll_once(&mut self, state: &mut PollState) -> Result<Vec<Outcome>, BotError> {
        let updates = self
            .transport
            .get_updates(state.offset, self.poll_timeout_secs)
            .await?;
        if !updates.is_empty() {
            tracing::debug!("Received {} updates", updates.len());
        }

        let mut outcomes = Vec::with_capacity(updates.len());
        for update in updates {
            state.acknowledge(update.update_id);
            let Some(message) = update.message else {
                continue;
            };
            outcomes.push(self.dispatcher.handle(&message).await?);
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        session::SessionStore,
        telegram::{Chat, Message, Update},
        test_support::{camera, MockDirectory, MockImages, MockTransport, Sent},
    };
    use std::time::Duration;
    use traffic_core::BoundingBox;

    fn update(update_id: i64, text: Option<&str>) -> Update {
        Update {
            update_id,
            message: text.map(|text| Message {
                chat: Chat { id: 7 },
                text: Some(text.to_string()),
            }),
        }
    }

    fn poller(
        batches: Vec<Vec<Update>>,
    ) -> (
        ChatPoller<MockDirectory, MockTransport, MockImages>,
        Arc<MockTransport>,
    ) {
        let transport = Arc::new(MockTransport::with_batches(batches));
        let dispatcher = Dispatcher::new(
            Arc::new(MockDirectory::with(vec![camera(
                "King St",
                43.45,
                -80.49,
                Some("https://cams.invalid/king.jpg"),
            )])),
            transport.clone(),
            Arc::new(MockImages::ok(vec![1, 2, 3])),
            SessionStore::new(Duration::from_secs(60)),
            BoundingBox::kwc(),
            25,
        );
        (ChatPoller::new(transport.clone(), dispatcher, 30), transport)
    }

    #[tokio::test]
    async fn test_offset_advances_past_every_update() {
        let (mut poller, transport) = poller(vec![
            vec![update(100, Some("map")), update(101, None)],
            vec![update(102, Some("0"))],
            vec![],
        ]);
        let mut state = PollState::default();

        let outcomes = poller.poll_once(&mut state).await.unwrap();
        assert_eq!(outcomes, vec![Outcome::ListingSent { entries: 1 }]);
        assert_eq!(state.offset, 102);

        poller.poll_once(&mut state).await.unwrap();
        assert_eq!(state.offset, 103);

        let outcomes = poller.poll_once(&mut state).await.unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(state.offset, 103);

        assert_eq!(transport.requested_offsets(), vec![0, 102, 103]);
        assert!(matches!(transport.sent()[1], Sent::Photo { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_offset() {
        let (mut poller, _transport) = poller(vec![]);
        let mut state = PollState { offset: 55 };

        let err = poller.poll_once(&mut state).await.unwrap_err();
        assert!(err.kind().is_transient());
        assert_eq!(state.offset, 55);
    }
}
