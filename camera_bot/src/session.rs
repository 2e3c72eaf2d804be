use crate::telegram::ChatId;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use traffic_core::Camera;

/// Position in the update stream. Owned by the poll loop and handed to every
/// cycle; it lives only as long as the process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    pub offset: i64,
}

impl PollState {
    /// Acknowledges `update_id` so the next long-poll starts after it.
    pub fn acknowledge(&mut self, update_id: i64) {
        self.offset = self.offset.max(update_id + 1);
    }
}

/// The numbered camera menu last shown in a chat.
#[derive(Debug, Clone)]
pub struct Listing {
    pub cameras: Vec<Camera>,
    pub created_at: Instant,
}

impl Listing {
    pub fn new(cameras: Vec<Camera>, created_at: Instant) -> Self {
        Self {
            cameras,
            created_at,
        }
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }
}

#[derive(Debug)]
pub enum Selection {
    Camera(Camera),
    OutOfRange { index: usize, len: usize },
    NoListing,
}

/// Per-chat listing snapshots. A chat with a live listing is awaiting a
/// selection; any other chat is idle.
#[derive(Debug)]
pub struct SessionStore {
    listings: HashMap<ChatId, Listing>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            listings: HashMap::new(),
            ttl,
        }
    }

    pub fn store(&mut self, chat_id: ChatId, listing: Listing) {
        self.listings.insert(chat_id, listing);
    }

    /// Resolves `index` against the chat's listing. The listing stays in
    /// place until the pick is delivered and `complete` is called.
    pub fn select(&mut self, chat_id: ChatId, index: usize, now: Instant) -> Selection {
        let Some(listing) = self.listings.get(&chat_id) else {
            return Selection::NoListing;
        };
        if listing.is_expired(now, self.ttl) {
            self.listings.remove(&chat_id);
            return Selection::NoListing;
        }
        match listing.cameras.get(index) {
            Some(camera) => Selection::Camera(camera.clone()),
            None => Selection::OutOfRange {
                index,
                len: listing.len(),
            },
        }
    }

    /// Ends the chat's listing once a pick has been delivered.
    pub fn complete(&mut self, chat_id: ChatId) {
        self.listings.remove(&chat_id);
    }

    /// Drops expired listings.
    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.listings
            .retain(|_, listing| !listing.is_expired(now, ttl));
    }
}

#[cfg(test)]
impl SessionStore {
    pub fn is_awaiting_selection(&self, chat_id: ChatId, now: Instant) -> bool {
        self.listings
            .get(&chat_id)
            .is_some_and(|listing| !listing.is_expired(now, self.ttl))
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }
}
