//! Out-of-scope collaborators behind trait seams: delivery records,
//! persisted messages, tickets, and push notifications. The in-memory
//! implementations back the dev server and the test suite.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::chat::{ChatMessage, MessageDeliveryStatus};
use crate::shared::error::SupportError;
use crate::shared::models::DeliveryRecord;
use crate::tickets::{Ticket, TicketStatus};

/// Read-only lookup of delivery context (status, tracking, ETA, customer).
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn delivery(&self, id: Uuid) -> Option<DeliveryRecord>;
}

/// Persistent message store. Messages are kept in creation order.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, message: ChatMessage) -> Result<(), SupportError>;

    async fn get(&self, id: Uuid) -> Option<ChatMessage>;

    /// Applies a monotonic status transition and returns the effective
    /// status. Regressions and duplicates are no-ops, not errors.
    async fn advance_status(
        &self,
        id: Uuid,
        status: MessageDeliveryStatus,
    ) -> Result<MessageDeliveryStatus, SupportError>;

    /// Newest-first window over one conversation plus whether older
    /// messages remain beyond it.
    async fn history(
        &self,
        delivery_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> (Vec<ChatMessage>, bool);

    /// Newest-first window over messages created strictly before the
    /// cursor (all messages when `None`), for backward scrolling.
    async fn history_before(
        &self,
        delivery_id: Uuid,
        limit: usize,
        before: Option<chrono::DateTime<chrono::Utc>>,
    ) -> (Vec<ChatMessage>, bool);

    async fn mark_feedback(&self, id: Uuid) -> Result<(), SupportError>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert(&self, ticket: Ticket);
    async fn get(&self, id: Uuid) -> Option<Ticket>;
    async fn update(&self, ticket: Ticket) -> Result<(), SupportError>;
    async fn for_user(&self, user_id: Uuid) -> Vec<Ticket>;
    async fn for_delivery(&self, delivery_id: Uuid) -> Option<Ticket>;

    /// Still-open tickets whose response deadline has passed.
    async fn due_for_escalation(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<Ticket>;

    /// Open or in-progress tickets currently assigned to the agent.
    async fn open_count_for_assignee(&self, agent_id: Uuid) -> usize;
}

/// Fire-and-forget push notifications. Failures are logged, never
/// surfaced to the triage path.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn notify(&self, user_id: Uuid, title: &str, body: &str);
}

#[derive(Default)]
pub struct InMemoryDeliveryStore {
    records: RwLock<HashMap<Uuid, DeliveryRecord>>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, record: DeliveryRecord) {
        self.records.write().await.insert(record.id, record);
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn delivery(&self, id: Uuid) -> Option<DeliveryRecord> {
        self.records.read().await.get(&id).cloned()
    }
}

#[derive(Default)]
pub struct InMemoryMessageStore {
    // Creation order; history windows are cut from the tail.
    messages: RwLock<Vec<ChatMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, message: ChatMessage) -> Result<(), SupportError> {
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Option<ChatMessage> {
        self.messages
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    async fn advance_status(
        &self,
        id: Uuid,
        status: MessageDeliveryStatus,
    ) -> Result<MessageDeliveryStatus, SupportError> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| SupportError::NotFound(format!("message {id}")))?;
        message.status.advance(status);
        Ok(message.status)
    }

    async fn history(
        &self,
        delivery_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> (Vec<ChatMessage>, bool) {
        let messages = self.messages.read().await;
        let mut conversation: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.delivery_id == delivery_id)
            .cloned()
            .collect();
        conversation.reverse();
        let has_more = conversation.len() > offset + limit;
        let page = conversation.into_iter().skip(offset).take(limit).collect();
        (page, has_more)
    }

    async fn history_before(
        &self,
        delivery_id: Uuid,
        limit: usize,
        before: Option<chrono::DateTime<chrono::Utc>>,
    ) -> (Vec<ChatMessage>, bool) {
        let messages = self.messages.read().await;
        let mut conversation: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.delivery_id == delivery_id)
            .filter(|m| before.map(|cutoff| m.timestamp < cutoff).unwrap_or(true))
            .cloned()
            .collect();
        conversation.reverse();
        let has_more = conversation.len() > limit;
        let page = conversation.into_iter().take(limit).collect();
        (page, has_more)
    }

    async fn mark_feedback(&self, id: Uuid) -> Result<(), SupportError> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| SupportError::NotFound(format!("message {id}")))?;
        message.feedback_submitted = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTicketStore {
    tickets: RwLock<HashMap<Uuid, Ticket>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn insert(&self, ticket: Ticket) {
        self.tickets.write().await.insert(ticket.id, ticket);
    }

    async fn get(&self, id: Uuid) -> Option<Ticket> {
        self.tickets.read().await.get(&id).cloned()
    }

    async fn update(&self, ticket: Ticket) -> Result<(), SupportError> {
        let mut tickets = self.tickets.write().await;
        if !tickets.contains_key(&ticket.id) {
            return Err(SupportError::NotFound(format!("ticket {}", ticket.id)));
        }
        tickets.insert(ticket.id, ticket);
        Ok(())
    }

    async fn for_user(&self, user_id: Uuid) -> Vec<Ticket> {
        let tickets = self.tickets.read().await;
        let mut result: Vec<Ticket> = tickets
            .values()
            .filter(|t| t.customer_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result
    }

    async fn for_delivery(&self, delivery_id: Uuid) -> Option<Ticket> {
        let tickets = self.tickets.read().await;
        let mut candidates: Vec<&Ticket> = tickets
            .values()
            .filter(|t| t.delivery_id == delivery_id)
            .collect();
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        candidates.first().map(|t| (*t).clone())
    }

    async fn due_for_escalation(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<Ticket> {
        self.tickets
            .read()
            .await
            .values()
            .filter(|t| t.status == TicketStatus::Open)
            .filter(|t| t.escalate_at.is_some_and(|at| at <= now))
            .cloned()
            .collect()
    }

    async fn open_count_for_assignee(&self, agent_id: Uuid) -> usize {
        self.tickets
            .read()
            .await
            .values()
            .filter(|t| t.assignee_id == Some(agent_id))
            .filter(|t| matches!(t.status, TicketStatus::Open | TicketStatus::InProgress))
            .count()
    }
}

/// Dev notifier: logs instead of pushing.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn notify(&self, user_id: Uuid, title: &str, body: &str) {
        info!(%user_id, title, body, "push notification");
    }
}
