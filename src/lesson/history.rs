//! In-memory lesson history, most recent first.
//!
//! Items are only ever prepended; nothing is edited or removed while the
//! process runs, and nothing survives a restart.

use crate::lesson::model::HistoryItem;
use std::collections::VecDeque;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct HistoryLog {
    items: RwLock<VecDeque<HistoryItem>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, item: HistoryItem) {
        self.items.write().await.push_front(item);
    }

    /// Up to `limit` items, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<HistoryItem> {
        self.items.read().await.iter().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }
}
