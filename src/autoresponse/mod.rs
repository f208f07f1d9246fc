//! Keyword-matched canned replies and agent quick-response templates.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::models::{DeliveryRecord, DeliveryStatus};

/// A canned reply body: either a fixed string or a function of the
/// delivery context (e.g. a different answer per delivery status).
#[derive(Debug, Clone, Copy)]
pub enum ResponseTemplate {
    Literal(&'static str),
    FromDelivery(fn(&DeliveryRecord) -> String),
}

impl ResponseTemplate {
    pub fn render(&self, delivery: &DeliveryRecord) -> String {
        match self {
            Self::Literal(text) => (*text).to_string(),
            Self::FromDelivery(f) => f(delivery),
        }
    }
}

/// `priority` orders matching attempts only (lower = tried first); it is
/// unrelated to ticket priority tiers.
#[derive(Debug, Clone)]
pub struct AutoResponseRule {
    pub keywords: Vec<&'static str>,
    pub response: ResponseTemplate,
    pub priority: u32,
}

/// Matches free-text customer messages against the rule catalogue.
/// The catalogue is sorted once at construction (stable, ascending by
/// priority number) and treated as read-only afterwards.
#[derive(Debug, Clone)]
pub struct AutoResponseMatcher {
    rules: Vec<AutoResponseRule>,
}

impl AutoResponseMatcher {
    pub fn new(mut rules: Vec<AutoResponseRule>) -> Self {
        rules.sort_by_key(|rule| rule.priority);
        Self { rules }
    }

    /// First rule (lowest priority number) with a case-insensitive
    /// substring keyword hit, rendered against the delivery context.
    /// `None` means no canned reply; callers must not fabricate one.
    pub fn match_message(&self, message: &str, delivery: &DeliveryRecord) -> Option<String> {
        let normalized = message.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|k| normalized.contains(&k.to_lowercase()))
            })
            .map(|rule| rule.response.render(delivery))
    }

    pub fn default_catalogue() -> Vec<AutoResponseRule> {
        vec![
            AutoResponseRule {
                keywords: vec!["where", "track", "status", "suivi"],
                response: ResponseTemplate::FromDelivery(tracking_reply),
                priority: 10,
            },
            AutoResponseRule {
                keywords: vec!["late", "delay", "retard"],
                response: ResponseTemplate::FromDelivery(delay_reply),
                priority: 20,
            },
            AutoResponseRule {
                keywords: vec!["cancel", "annul"],
                response: ResponseTemplate::Literal(
                    "A delivery can be cancelled free of charge until the courier \
                     picks it up. Reply CANCEL to confirm and we will take care of it.",
                ),
                priority: 30,
            },
            AutoResponseRule {
                keywords: vec!["refund", "rembours"],
                response: ResponseTemplate::Literal(
                    "Refunds are issued to the original payment method within 5 \
                     business days once the claim is approved. An agent will review \
                     your request shortly.",
                ),
                priority: 40,
            },
        ]
    }
}

impl Default for AutoResponseMatcher {
    fn default() -> Self {
        Self::new(Self::default_catalogue())
    }
}

fn tracking_reply(delivery: &DeliveryRecord) -> String {
    let eta = delivery
        .eta
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "being confirmed".to_string());
    format!(
        "{} Tracking number {}, estimated arrival: {}.",
        status_display(delivery.status),
        delivery.tracking_number,
        eta
    )
}

fn delay_reply(delivery: &DeliveryRecord) -> String {
    match delivery.status {
        DeliveryStatus::PickedUp | DeliveryStatus::InTransit => format!(
            "Your delivery {} is moving through our network and may arrive \
             slightly later than planned. We will notify you of any change.",
            delivery.tracking_number
        ),
        DeliveryStatus::OutForDelivery => format!(
            "Good news: delivery {} is out with the courier and should arrive today.",
            delivery.tracking_number
        ),
        _ => format!(
            "{} We are sorry for the wait on {}.",
            status_display(delivery.status),
            delivery.tracking_number
        ),
    }
}

/// Fixed human-readable message per delivery status, independent of the
/// rule catalogue.
pub fn status_display(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Pending => "Your delivery is being prepared.",
        DeliveryStatus::PickedUp => "The courier has picked up your package.",
        DeliveryStatus::InTransit => "Your package is in transit.",
        DeliveryStatus::OutForDelivery => "Your package is out for delivery.",
        DeliveryStatus::Delivered => "Your package has been delivered.",
        DeliveryStatus::Failed => "The delivery attempt failed.",
    }
}

/// Agent-selectable canned template with `{placeholder}` substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickResponse {
    pub id: Uuid,
    pub category: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub usage_count: u32,
    pub is_public: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl QuickResponse {
    pub fn render(&self, vars: &HashMap<String, String>) -> String {
        render_template(&self.body, vars)
    }

    pub fn record_use(&mut self) {
        self.usage_count += 1;
    }
}

/// Replaces every `{key}` token with its value from `vars`. Tokens
/// without a supplied value are left literal, never an error.
pub fn render_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in vars {
        rendered = rendered.replace(&format!("{{{key}}}"), value);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::CustomerRecord;

    fn delivery(status: DeliveryStatus) -> DeliveryRecord {
        DeliveryRecord {
            id: Uuid::new_v4(),
            tracking_number: "TW123".into(),
            status,
            eta: None,
            declared_value: None,
            customer: CustomerRecord {
                id: Uuid::new_v4(),
                name: "Ada".into(),
                vip: false,
                last_interaction: None,
            },
        }
    }

    #[test]
    fn lower_priority_number_wins_regardless_of_insertion_order() {
        let rules = vec![
            AutoResponseRule {
                keywords: vec!["package"],
                response: ResponseTemplate::Literal("second"),
                priority: 20,
            },
            AutoResponseRule {
                keywords: vec!["package"],
                response: ResponseTemplate::Literal("first"),
                priority: 10,
            },
        ];
        let matcher = AutoResponseMatcher::new(rules);
        let reply = matcher
            .match_message("Where is my PACKAGE?", &delivery(DeliveryStatus::InTransit))
            .unwrap();
        assert_eq!(reply, "first");
    }

    #[test]
    fn ties_preserve_original_order() {
        let rules = vec![
            AutoResponseRule {
                keywords: vec!["package"],
                response: ResponseTemplate::Literal("a"),
                priority: 10,
            },
            AutoResponseRule {
                keywords: vec!["package"],
                response: ResponseTemplate::Literal("b"),
                priority: 10,
            },
        ];
        let matcher = AutoResponseMatcher::new(rules);
        let reply = matcher
            .match_message("package", &delivery(DeliveryStatus::Pending))
            .unwrap();
        assert_eq!(reply, "a");
    }

    #[test]
    fn no_keyword_hit_yields_no_response() {
        let matcher = AutoResponseMatcher::default();
        assert!(matcher
            .match_message("I want to speak to a human", &delivery(DeliveryStatus::Pending))
            .is_none());
        assert!(matcher
            .match_message("   ", &delivery(DeliveryStatus::Pending))
            .is_none());
    }

    #[test]
    fn template_function_varies_with_delivery_status() {
        let matcher = AutoResponseMatcher::default();
        let in_transit = matcher
            .match_message("my order is late", &delivery(DeliveryStatus::InTransit))
            .unwrap();
        let out = matcher
            .match_message("my order is late", &delivery(DeliveryStatus::OutForDelivery))
            .unwrap();
        assert_ne!(in_transit, out);
        assert!(out.contains("out with the courier"));
    }

    #[test]
    fn unresolved_tokens_are_left_literal() {
        let mut vars = HashMap::new();
        vars.insert("trackingNumber".to_string(), "TW123".to_string());
        let rendered = render_template("Livraison {trackingNumber} - ETA {eta}", &vars);
        assert_eq!(rendered, "Livraison TW123 - ETA {eta}");
    }

    #[test]
    fn quick_response_usage_counter_increments() {
        let mut qr = QuickResponse {
            id: Uuid::new_v4(),
            category: "shipping".into(),
            title: "ETA".into(),
            body: "ETA for {trackingNumber}: {eta}".into(),
            tags: vec!["eta".into()],
            usage_count: 0,
            is_public: true,
            created_by: None,
            created_at: Utc::now(),
        };
        qr.record_use();
        qr.record_use();
        assert_eq!(qr.usage_count, 2);
    }

    #[test]
    fn every_delivery_status_has_a_display_message() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::PickedUp,
            DeliveryStatus::InTransit,
            DeliveryStatus::OutForDelivery,
            DeliveryStatus::Delivered,
            DeliveryStatus::Failed,
        ] {
            assert!(!status_display(status).is_empty());
        }
    }
}
