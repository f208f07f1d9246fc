use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::autoresponse::{AutoResponseMatcher, QuickResponse};
use crate::chat::ChannelRegistry;
use crate::config::AppConfig;
use crate::rules::PriorityClassifier;
use crate::store::{
    DeliveryStore, InMemoryDeliveryStore, InMemoryMessageStore, InMemoryTicketStore, LogNotifier,
    MessageStore, NotificationSender, TicketStore,
};

/// Explicitly constructed application state: stores and collaborators are
/// injected, rule catalogues are immutable after construction, and every
/// live channel is owned by its conversation through the registry.
pub struct AppState {
    pub config: AppConfig,
    pub deliveries: Arc<dyn DeliveryStore>,
    pub messages: Arc<dyn MessageStore>,
    pub tickets: Arc<dyn TicketStore>,
    pub notifier: Arc<dyn NotificationSender>,
    pub classifier: PriorityClassifier,
    pub responder: AutoResponseMatcher,
    pub quick_responses: RwLock<Vec<QuickResponse>>,
    pub channels: ChannelRegistry,
}

impl AppState {
    /// Dev wiring: in-memory stores and a logging notifier.
    pub fn new(config: AppConfig) -> Self {
        Self::with_stores(
            config,
            Arc::new(InMemoryDeliveryStore::new()),
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(InMemoryTicketStore::new()),
            Arc::new(LogNotifier),
        )
    }

    pub fn with_stores(
        config: AppConfig,
        deliveries: Arc<dyn DeliveryStore>,
        messages: Arc<dyn MessageStore>,
        tickets: Arc<dyn TicketStore>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        let classifier = match &config.support.priority_rules {
            Some(raw) => PriorityClassifier::from_catalogue(raw),
            None => PriorityClassifier::default(),
        };
        let channels = ChannelRegistry::new(
            Arc::clone(&messages),
            Duration::from_millis(config.support.typing_quiet_ms),
            config.support.reconnect.policy(),
        );
        Self {
            config,
            deliveries,
            messages,
            tickets,
            notifier,
            classifier,
            responder: AutoResponseMatcher::default(),
            quick_responses: RwLock::new(default_quick_responses()),
            channels,
        }
    }
}

fn default_quick_responses() -> Vec<QuickResponse> {
    let now = Utc::now();
    vec![
        QuickResponse {
            id: Uuid::new_v4(),
            category: "shipping".into(),
            title: "Tracking and ETA".into(),
            body: "Livraison {trackingNumber} - ETA {eta}".into(),
            tags: vec!["eta".into(), "tracking".into()],
            usage_count: 0,
            is_public: true,
            created_by: None,
            created_at: now,
        },
        QuickResponse {
            id: Uuid::new_v4(),
            category: "shipping".into(),
            title: "Delayed delivery apology".into(),
            body: "We are sorry for the delay on {trackingNumber}. The new \
                   estimated arrival is {eta}. Thank you for your patience."
                .into(),
            tags: vec!["delay".into()],
            usage_count: 0,
            is_public: true,
            created_by: None,
            created_at: now,
        },
        QuickResponse {
            id: Uuid::new_v4(),
            category: "claims".into(),
            title: "Damaged parcel claim".into(),
            body: "We have opened claim {claimId} for your parcel \
                   {trackingNumber}. Please attach photos of the damage so \
                   we can process it quickly."
                .into(),
            tags: vec!["damage".into(), "claim".into()],
            usage_count: 0,
            is_public: true,
            created_by: None,
            created_at: now,
        },
    ]
}
