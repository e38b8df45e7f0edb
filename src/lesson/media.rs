//! Process-local store for downloaded video artifacts.
//!
//! A finished video is fetched once from the service and kept here, so the
//! browser can load it from this server (`/api/v1/media/{id}`) without ever
//! seeing the service credential. Only the most recent videos are kept; see
//! [`BoundedStore`].

use crate::genai::types::DownloadedMedia;
use crate::lesson::store::BoundedStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Path prefix under which stored media is served.
pub const MEDIA_ROUTE_PREFIX: &str = "/api/v1/media";

#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub content_type: String,
    pub bytes: Arc<Vec<u8>>,
}

#[derive(Debug)]
pub struct MediaStore {
    entries: RwLock<BoundedStore<StoredMedia>>,
}

impl MediaStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(BoundedStore::new(capacity)),
        }
    }

    /// Keep the artifact and return the local URL it is served from.
    pub async fn insert(&self, media: DownloadedMedia) -> String {
        let id = Uuid::new_v4();
        let stored = StoredMedia {
            content_type: media.content_type,
            bytes: Arc::new(media.bytes),
        };
        if let Some(evicted) = self.entries.write().await.insert(id, stored) {
            debug!(media_id = %evicted, "Dropped oldest stored video");
        }
        locator_for(id)
    }

    pub async fn get(&self, id: &Uuid) -> Option<StoredMedia> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

pub fn locator_for(id: Uuid) -> String {
    format!("{}/{}", MEDIA_ROUTE_PREFIX, id)
}
