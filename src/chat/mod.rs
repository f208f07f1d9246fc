//! Live conversation channel: ordered status-tracked message delivery,
//! typed inbound event stream, participant presence and typing signals,
//! multiplexed over one WebSocket per conversation.

pub mod reconnect;
pub mod typing;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::history;
use crate::shared::error::SupportError;
use crate::shared::state::AppState;
use crate::store::MessageStore;
use crate::tickets;
use reconnect::ReconnectPolicy;
use typing::TypingTracker;

/// Delivery state of a single chat message. Strictly ordered; transitions
/// only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDeliveryStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageDeliveryStatus {
    /// Monotonic transition. Regressions and duplicate acknowledgments
    /// are no-ops; returns whether the status changed.
    pub fn advance(&mut self, next: MessageDeliveryStatus) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderKind {
    Customer,
    Support,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Online,
    Away,
    Offline,
}

/// A human party to a conversation. Presence is announced by the client
/// over the live channel; `last_seen` refreshes on every message or
/// keystroke. The ephemeral is-typing signal lives in [`TypingTracker`]
/// and is never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatParticipant {
    pub id: Uuid,
    pub kind: SenderKind,
    pub presence: Presence,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Document,
    Audio,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: MediaKind,
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub sender_id: Uuid,
    pub sender_kind: SenderKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub status: MessageDeliveryStatus,
    pub automated: bool,
    pub attachments: Vec<Attachment>,
    pub feedback_submitted: bool,
}

/// Events multiplexed over a conversation's live channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChannelEvent {
    Message {
        message: ChatMessage,
    },
    MessageStatus {
        message_id: Uuid,
        status: MessageDeliveryStatus,
    },
    Typing {
        participant_id: Uuid,
    },
    StopTyping {
        participant_id: Uuid,
    },
    Presence {
        participant: ChatParticipant,
    },
    /// Terminal state once the reconnect budget is exhausted.
    Disconnected,
}

/// One duplex channel per conversation. Owns the conversation's event
/// fan-out, participant roster and typing timer; all mutation goes
/// through its methods.
pub struct ChatChannel {
    pub delivery_id: Uuid,
    store: Arc<dyn MessageStore>,
    events: broadcast::Sender<ChannelEvent>,
    typing: TypingTracker,
    reconnect: ReconnectPolicy,
    viewers: AtomicUsize,
    participants: RwLock<HashMap<Uuid, ChatParticipant>>,
}

impl ChatChannel {
    pub fn new(
        delivery_id: Uuid,
        store: Arc<dyn MessageStore>,
        quiet: Duration,
        reconnect: ReconnectPolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let typing = TypingTracker::new(quiet, events.clone());
        Self {
            delivery_id,
            store,
            events,
            typing,
            reconnect,
            viewers: AtomicUsize::new(0),
            participants: RwLock::new(HashMap::new()),
        }
    }

    /// Persists the message and returns the stored record (server id and
    /// timestamp) to the caller before fanning it out to subscribers.
    /// Store writes retry under the channel's reconnect policy; once the
    /// budget is exhausted a terminal `disconnected` event is broadcast
    /// and the transport error is returned.
    ///
    /// Concurrent sends on the same conversation are ordered only by the
    /// server-assigned timestamps, not by client submission order.
    pub async fn send(
        &self,
        sender_id: Uuid,
        sender_kind: SenderKind,
        content: String,
        attachments: Vec<Attachment>,
        automated: bool,
    ) -> Result<ChatMessage, SupportError> {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            delivery_id: self.delivery_id,
            sender_id,
            sender_kind,
            content,
            timestamp: Utc::now(),
            status: MessageDeliveryStatus::Sent,
            automated,
            attachments,
            feedback_submitted: false,
        };
        let append = |_| {
            let store = Arc::clone(&self.store);
            let message = message.clone();
            async move { store.append(message).await }
        };
        if let Err(e) = reconnect::with_reconnect(&self.reconnect, append).await {
            let _ = self.events.send(ChannelEvent::Disconnected);
            return Err(e);
        }
        if sender_kind != SenderKind::System {
            self.set_presence(sender_id, sender_kind, Presence::Online)
                .await;
        }
        let _ = self.events.send(ChannelEvent::Message {
            message: message.clone(),
        });
        Ok(message)
    }

    /// Applies a status acknowledgment and echoes the effective status
    /// back over the channel. Duplicate or regressive acks are tolerated.
    pub async fn acknowledge(
        &self,
        message_id: Uuid,
        status: MessageDeliveryStatus,
    ) -> Result<MessageDeliveryStatus, SupportError> {
        let effective = self.store.advance_status(message_id, status).await?;
        let _ = self.events.send(ChannelEvent::MessageStatus {
            message_id,
            status: effective,
        });
        Ok(effective)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    pub async fn keystroke(&self, participant_id: Uuid) {
        self.seen(participant_id).await;
        self.typing.keystroke(participant_id).await;
    }

    /// Upserts a participant and broadcasts a `presence` event when the
    /// presence actually changed. `last_seen` refreshes on every call.
    pub async fn set_presence(&self, id: Uuid, kind: SenderKind, presence: Presence) {
        let now = Utc::now();
        let mut participants = self.participants.write().await;
        let changed = match participants.get_mut(&id) {
            Some(participant) => {
                let changed = participant.presence != presence;
                participant.presence = presence;
                participant.last_seen = now;
                changed
            }
            None => {
                participants.insert(
                    id,
                    ChatParticipant {
                        id,
                        kind,
                        presence,
                        last_seen: now,
                    },
                );
                true
            }
        };
        if changed {
            if let Some(participant) = participants.get(&id) {
                let _ = self.events.send(ChannelEvent::Presence {
                    participant: participant.clone(),
                });
            }
        }
    }

    async fn seen(&self, id: Uuid) {
        if let Some(participant) = self.participants.write().await.get_mut(&id) {
            participant.last_seen = Utc::now();
        }
    }

    pub async fn participants(&self) -> Vec<ChatParticipant> {
        let participants = self.participants.read().await;
        let mut roster: Vec<ChatParticipant> = participants.values().cloned().collect();
        roster.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        roster
    }

    /// Deterministic teardown: cancels pending typing timers. Subscribers
    /// observe the stream end when the registry drops the channel.
    pub async fn close(&self) {
        self.typing.shutdown().await;
    }
}

/// Conversation-scoped channel ownership. A channel stays registered
/// while it has at least one live viewer; the last viewer leaving tears
/// it down, so the registry never grows past the set of conversations
/// someone is actually watching.
pub struct ChannelRegistry {
    store: Arc<dyn MessageStore>,
    quiet: Duration,
    reconnect: ReconnectPolicy,
    channels: RwLock<HashMap<Uuid, Arc<ChatChannel>>>,
}

impl ChannelRegistry {
    pub fn new(store: Arc<dyn MessageStore>, quiet: Duration, reconnect: ReconnectPolicy) -> Self {
        Self {
            store,
            quiet,
            reconnect,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a viewer on the conversation's channel, creating it on
    /// first join.
    pub async fn join(&self, delivery_id: Uuid) -> Arc<ChatChannel> {
        let mut channels = self.channels.write().await;
        let channel = Arc::clone(channels.entry(delivery_id).or_insert_with(|| {
            Arc::new(ChatChannel::new(
                delivery_id,
                Arc::clone(&self.store),
                self.quiet,
                self.reconnect.clone(),
            ))
        }));
        channel.viewers.fetch_add(1, Ordering::SeqCst);
        channel
    }

    /// Drops one viewer; the last one out closes the channel (cancelling
    /// its typing timers) and removes it from the registry.
    pub async fn leave(&self, delivery_id: Uuid) {
        let mut channels = self.channels.write().await;
        let idle = channels
            .get(&delivery_id)
            .map(|channel| channel.viewers.fetch_sub(1, Ordering::SeqCst) == 1)
            .unwrap_or(false);
        if idle {
            if let Some(channel) = channels.remove(&delivery_id) {
                channel.close().await;
            }
        }
    }

    /// Channel to send through: the registered one when the conversation
    /// has live viewers, otherwise an unregistered stand-in that persists
    /// the message and fans out to nobody.
    pub async fn for_send(&self, delivery_id: Uuid) -> Arc<ChatChannel> {
        if let Some(channel) = self.channels.read().await.get(&delivery_id) {
            return Arc::clone(channel);
        }
        Arc::new(ChatChannel::new(
            delivery_id,
            Arc::clone(&self.store),
            self.quiet,
            self.reconnect.clone(),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub delivery_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub delivery_id: Uuid,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantsQuery {
    pub delivery_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub message_id: Uuid,
    pub helpful: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub escalated: bool,
    pub ticket: Option<tickets::Ticket>,
}

/// Accepts a customer message, then tries the auto-response catalogue;
/// a matched canned reply flows through the same channel flagged as
/// automated. Returns the persisted customer message (status `sent`).
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ChatMessage>, SupportError> {
    let delivery = state
        .deliveries
        .delivery(req.delivery_id)
        .await
        .ok_or_else(|| SupportError::NotFound(format!("delivery {}", req.delivery_id)))?;

    let channel = state.channels.for_send(req.delivery_id).await;
    let message = channel
        .send(
            req.sender_id,
            SenderKind::Customer,
            req.content.clone(),
            req.attachments,
            false,
        )
        .await?;

    if let Some(reply) = state.responder.match_message(&req.content, &delivery) {
        channel
            .send(Uuid::nil(), SenderKind::Support, reply, Vec::new(), true)
            .await?;
    } else {
        debug!(delivery_id = %req.delivery_id, "no auto-response match, awaiting agent");
    }

    Ok(Json(message))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<history::HistoryPage>, SupportError> {
    let page = history::fetch_page(
        state.messages.as_ref(),
        query.delivery_id,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(20),
    )
    .await?;
    Ok(Json(page))
}

pub async fn get_participants(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ParticipantsQuery>,
) -> Result<Json<Vec<ChatParticipant>>, SupportError> {
    let channel = state.channels.for_send(query.delivery_id).await;
    Ok(Json(channel.participants().await))
}

/// `helpful=false` on an automated reply triggers the escalation path.
pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, SupportError> {
    if req.helpful {
        state.messages.mark_feedback(req.message_id).await?;
        return Ok(Json(FeedbackResponse {
            escalated: false,
            ticket: None,
        }));
    }
    let reason = req.reason.as_deref().unwrap_or("unhelpful");
    let ticket = tickets::escalate_for_feedback(&state, req.message_id, reason).await?;
    Ok(Json(FeedbackResponse {
        escalated: true,
        ticket: Some(ticket),
    }))
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(delivery_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_chat_socket(socket, state, delivery_id))
}

async fn handle_chat_socket(
    socket: axum::extract::ws::WebSocket,
    state: Arc<AppState>,
    delivery_id: Uuid,
) {
    let channel = state.channels.join(delivery_id).await;
    let (mut sender, mut receiver) = socket.split();
    let mut rx = channel.subscribe();

    // Forward channel events to this client.
    let send_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                if sender
                    .send(axum::extract::ws::Message::Text(json))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!(%delivery_id, "websocket receive error: {e}");
                break;
            }
        };
        match msg {
            axum::extract::ws::Message::Text(text) => {
                match serde_json::from_str::<ChannelEvent>(&text) {
                    Ok(ChannelEvent::MessageStatus { message_id, status }) => {
                        if let Err(e) = channel.acknowledge(message_id, status).await {
                            warn!(%delivery_id, "status ack rejected: {e}");
                        }
                    }
                    Ok(ChannelEvent::Typing { participant_id }) => {
                        channel.keystroke(participant_id).await;
                    }
                    Ok(ChannelEvent::Presence { participant }) => {
                        channel
                            .set_presence(participant.id, participant.kind, participant.presence)
                            .await;
                    }
                    Ok(_) => {}
                    Err(e) => debug!(%delivery_id, "ignoring malformed channel event: {e}"),
                }
            }
            axum::extract::ws::Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    state.channels.leave(delivery_id).await;
}

pub fn configure_chat_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/chat/messages", get(get_history).post(send_message))
        .route("/api/chat/participants", get(get_participants))
        .route("/api/chat/feedback", post(submit_feedback))
        .route("/api/chat/ws/:delivery_id", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    use crate::store::InMemoryMessageStore;

    fn channel() -> ChatChannel {
        ChatChannel::new(
            Uuid::new_v4(),
            Arc::new(InMemoryMessageStore::new()),
            Duration::from_millis(1500),
            ReconnectPolicy::default(),
        )
    }

    fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy {
            base: Duration::from_millis(10),
            cap: Duration::from_millis(50),
            max_attempts: 2,
        }
    }

    /// Store whose first `failures` appends are rejected with a transport
    /// error, then delegates to an in-memory store.
    struct FlakyStore {
        inner: InMemoryMessageStore,
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: InMemoryMessageStore::new(),
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl MessageStore for FlakyStore {
        async fn append(&self, message: ChatMessage) -> Result<(), SupportError> {
            let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n < self.failures {
                return Err(SupportError::Transport("store unreachable".into()));
            }
            self.inner.append(message).await
        }

        async fn get(&self, id: Uuid) -> Option<ChatMessage> {
            self.inner.get(id).await
        }

        async fn advance_status(
            &self,
            id: Uuid,
            status: MessageDeliveryStatus,
        ) -> Result<MessageDeliveryStatus, SupportError> {
            self.inner.advance_status(id, status).await
        }

        async fn history(
            &self,
            delivery_id: Uuid,
            limit: usize,
            offset: usize,
        ) -> (Vec<ChatMessage>, bool) {
            self.inner.history(delivery_id, limit, offset).await
        }

        async fn history_before(
            &self,
            delivery_id: Uuid,
            limit: usize,
            before: Option<chrono::DateTime<chrono::Utc>>,
        ) -> (Vec<ChatMessage>, bool) {
            self.inner.history_before(delivery_id, limit, before).await
        }

        async fn mark_feedback(&self, id: Uuid) -> Result<(), SupportError> {
            self.inner.mark_feedback(id).await
        }
    }

    #[test]
    fn status_never_regresses() {
        let mut status = MessageDeliveryStatus::Sent;
        assert!(status.advance(MessageDeliveryStatus::Read));
        assert!(!status.advance(MessageDeliveryStatus::Delivered));
        assert_eq!(status, MessageDeliveryStatus::Read);
        assert!(!status.advance(MessageDeliveryStatus::Read));
    }

    #[tokio::test]
    async fn send_returns_persisted_record_and_broadcasts() {
        let ch = channel();
        let mut rx = ch.subscribe();
        let sender = Uuid::new_v4();
        let message = ch
            .send(sender, SenderKind::Customer, "hello".into(), vec![], false)
            .await
            .unwrap();
        assert_eq!(message.status, MessageDeliveryStatus::Sent);
        assert_eq!(message.sender_id, sender);

        // First the sender's presence, then the message itself.
        match rx.recv().await.unwrap() {
            ChannelEvent::Presence { participant } => {
                assert_eq!(participant.id, sender);
                assert_eq!(participant.presence, Presence::Online);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            ChannelEvent::Message { message: m } => assert_eq!(m.id, message.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_store_failures_are_retried() {
        let store = Arc::new(FlakyStore::new(2));
        let ch = ChatChannel::new(
            Uuid::new_v4(),
            Arc::clone(&store) as Arc<dyn MessageStore>,
            Duration::from_millis(1500),
            fast_policy(),
        );
        let message = ch
            .send(Uuid::new_v4(), SenderKind::Customer, "hi".into(), vec![], false)
            .await
            .unwrap();
        assert!(store.get(message.id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_store_retries_surface_disconnected() {
        let ch = ChatChannel::new(
            Uuid::new_v4(),
            Arc::new(FlakyStore::new(u32::MAX)),
            Duration::from_millis(1500),
            fast_policy(),
        );
        let mut rx = ch.subscribe();
        let err = ch
            .send(Uuid::new_v4(), SenderKind::Customer, "hi".into(), vec![], false)
            .await
            .unwrap_err();
        assert!(matches!(err, SupportError::Transport(_)));
        match rx.recv().await.unwrap() {
            ChannelEvent::Disconnected => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_acks_are_echoed_at_the_effective_status() {
        let ch = channel();
        let message = ch
            .send(Uuid::new_v4(), SenderKind::Customer, "hi".into(), vec![], false)
            .await
            .unwrap();

        let s = ch
            .acknowledge(message.id, MessageDeliveryStatus::Read)
            .await
            .unwrap();
        assert_eq!(s, MessageDeliveryStatus::Read);

        // Late "delivered" after "read" must not regress.
        let s = ch
            .acknowledge(message.id, MessageDeliveryStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(s, MessageDeliveryStatus::Read);
    }

    #[tokio::test]
    async fn ack_for_unknown_message_is_not_found() {
        let ch = channel();
        let err = ch
            .acknowledge(Uuid::new_v4(), MessageDeliveryStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, SupportError::NotFound(_)));
    }

    #[tokio::test]
    async fn presence_changes_broadcast_once() {
        let ch = channel();
        let mut rx = ch.subscribe();
        let id = Uuid::new_v4();

        ch.set_presence(id, SenderKind::Customer, Presence::Online).await;
        match rx.recv().await.unwrap() {
            ChannelEvent::Presence { participant } => {
                assert_eq!(participant.presence, Presence::Online);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // Same presence again: last_seen refreshes, no event.
        ch.set_presence(id, SenderKind::Customer, Presence::Online).await;
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        ch.set_presence(id, SenderKind::Customer, Presence::Away).await;
        match rx.recv().await.unwrap() {
            ChannelEvent::Presence { participant } => {
                assert_eq!(participant.presence, Presence::Away);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(ch.participants().await.len(), 1);
    }

    #[tokio::test]
    async fn registry_keeps_a_channel_while_viewers_remain() {
        let registry = ChannelRegistry::new(
            Arc::new(InMemoryMessageStore::new()),
            Duration::from_millis(1500),
            ReconnectPolicy::default(),
        );
        let id = Uuid::new_v4();

        let first = registry.join(id).await;
        let second = registry.join(id).await;
        assert!(Arc::ptr_eq(&first, &second));

        registry.leave(id).await;
        let still = registry.for_send(id).await;
        assert!(Arc::ptr_eq(&first, &still));

        registry.leave(id).await;
        let fresh = registry.join(id).await;
        assert!(!Arc::ptr_eq(&first, &fresh));
    }

    #[tokio::test]
    async fn sends_without_viewers_use_an_unregistered_channel() {
        let registry = ChannelRegistry::new(
            Arc::new(InMemoryMessageStore::new()),
            Duration::from_millis(1500),
            ReconnectPolicy::default(),
        );
        let id = Uuid::new_v4();
        let a = registry.for_send(id).await;
        let b = registry.for_send(id).await;
        assert!(!Arc::ptr_eq(&a, &b));

        let joined = registry.join(id).await;
        let routed = registry.for_send(id).await;
        assert!(Arc::ptr_eq(&joined, &routed));
    }

    #[test]
    fn channel_events_use_the_wire_naming() {
        let event = ChannelEvent::MessageStatus {
            message_id: Uuid::nil(),
            status: MessageDeliveryStatus::Delivered,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "messageStatus");
        assert_eq!(json["status"], "delivered");
        assert!(json.get("messageId").is_some());

        let event = ChannelEvent::Presence {
            participant: ChatParticipant {
                id: Uuid::nil(),
                kind: SenderKind::Customer,
                presence: Presence::Away,
                last_seen: Utc::now(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "presence");
        assert!(json["participant"].get("lastSeen").is_some());
    }
}
