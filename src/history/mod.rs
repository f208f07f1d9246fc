//! Paginated backward-scrolling read over persisted messages, with
//! deduplication against messages that already arrived live through the
//! conversation's channel during the same session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::chat::ChatMessage;
use crate::shared::error::SupportError;
use crate::store::MessageStore;

#[derive(Debug, Serialize)]
pub struct HistoryPage {
    pub messages: Vec<ChatMessage>,
    pub has_more: bool,
}

/// Page-numbered fetch for the REST surface. Newest first; a page is
/// only shorter than `limit` when the true remainder is shorter.
pub async fn fetch_page(
    store: &dyn MessageStore,
    delivery_id: Uuid,
    page: usize,
    limit: usize,
) -> Result<HistoryPage, SupportError> {
    if limit == 0 {
        return Err(SupportError::Validation("limit must be positive".into()));
    }
    let page = page.max(1);
    let offset = (page - 1) * limit;
    let (messages, has_more) = store.history(delivery_id, limit, offset).await;
    Ok(HistoryPage { messages, has_more })
}

/// Session-scoped scroll-back reader. Messages received live while the
/// conversation is open are recorded here so a later page fetch never
/// shows a stale duplicate.
pub struct MessageHistory {
    store: Arc<dyn MessageStore>,
    delivery_id: Uuid,
    live: Vec<ChatMessage>,
}

impl MessageHistory {
    pub fn new(store: Arc<dyn MessageStore>, delivery_id: Uuid) -> Self {
        Self {
            store,
            delivery_id,
            live: Vec::new(),
        }
    }

    /// Records a message (or status update) observed on the live channel.
    pub fn record_live(&mut self, message: ChatMessage) {
        if let Some(existing) = self.live.iter_mut().find(|m| m.id == message.id) {
            if message.status > existing.status {
                *existing = message;
            }
        } else {
            self.live.push(message);
        }
    }

    /// One backward page of messages created before `before` (all when
    /// `None`), deduplicated against the live set by id, keeping the
    /// more-advanced delivery status.
    pub async fn page(
        &self,
        size: usize,
        before: Option<DateTime<Utc>>,
    ) -> Result<HistoryPage, SupportError> {
        if size == 0 {
            return Err(SupportError::Validation("page size must be positive".into()));
        }
        let (mut messages, has_more) = self
            .store
            .history_before(self.delivery_id, size, before)
            .await;
        for message in &mut messages {
            if let Some(live) = self.live.iter().find(|m| m.id == message.id) {
                if live.status > message.status {
                    message.status = live.status;
                }
            }
        }
        Ok(HistoryPage { messages, has_more })
    }
}
