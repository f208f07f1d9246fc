//! Ordered rule evaluation and ticket priority classification.
//!
//! Both priority classification and auto-response matching share the same
//! contract: rules are read-only at evaluation time, evaluated in declared
//! order, and the first matching rule wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::shared::models::{DeliveryRecord, DeliveryStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    /// The next tier up. `Urgent` saturates.
    pub fn bumped(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Urgent,
            Self::Urgent => Self::Urgent,
        }
    }
}

/// Closed set of rule conditions. Each variant carries its own typed
/// payload and is evaluated through exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    Keywords { keywords: Vec<String> },
    DeliveryStatus { status: DeliveryStatus },
    ValueAbove { threshold: f64 },
    VipCustomer,
    HoursSinceContactAbove { hours: f64 },
}

impl RuleCondition {
    fn matches(&self, ctx: &RuleContext) -> bool {
        match self {
            Self::Keywords { keywords } => {
                let subject = ctx.subject.to_lowercase();
                keywords
                    .iter()
                    .any(|k| !k.is_empty() && subject.contains(&k.to_lowercase()))
            }
            Self::DeliveryStatus { status } => ctx.delivery_status == Some(*status),
            Self::ValueAbove { threshold } => {
                ctx.declared_value.is_some_and(|v| v > *threshold)
            }
            Self::VipCustomer => ctx.vip,
            Self::HoursSinceContactAbove { hours } => {
                ctx.hours_since_contact.is_some_and(|h| h > *hours)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityRule {
    pub condition: RuleCondition,
    pub priority: TicketPriority,
    #[serde(default)]
    pub auto_assign: bool,
    #[serde(default)]
    pub escalate_after_minutes: Option<u32>,
}

/// Context snapshot a rule list is evaluated against. Built once per
/// classification; never mutated during evaluation.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub subject: String,
    pub delivery_status: Option<DeliveryStatus>,
    pub declared_value: Option<f64>,
    pub vip: bool,
    pub hours_since_contact: Option<f64>,
}

impl RuleContext {
    pub fn from_delivery(subject: &str, delivery: &DeliveryRecord, now: DateTime<Utc>) -> Self {
        let hours_since_contact = delivery
            .customer
            .last_interaction
            .map(|t| (now - t).num_seconds() as f64 / 3600.0);
        Self {
            subject: subject.to_string(),
            delivery_status: Some(delivery.status),
            declared_value: delivery.declared_value,
            vip: delivery.customer.vip,
            hours_since_contact,
        }
    }
}

/// Returns the first rule whose condition holds, in declared order.
/// Deterministic: identical inputs always produce the identical result.
pub fn evaluate<'a>(rules: &'a [PriorityRule], ctx: &RuleContext) -> Option<&'a PriorityRule> {
    rules.iter().find(|rule| rule.condition.matches(ctx))
}

/// Classifies tickets into one of the four priority tiers against an
/// immutable rule catalogue. Safe to share across concurrent callers.
#[derive(Debug, Clone)]
pub struct PriorityClassifier {
    rules: Vec<PriorityRule>,
}

impl PriorityClassifier {
    pub fn new(rules: Vec<PriorityRule>) -> Self {
        Self { rules }
    }

    /// Parses a rule catalogue from configuration. Entries that fail to
    /// deserialize (unrecognized condition kind, malformed payload) are
    /// skipped with a warning so one bad rule never blocks classification.
    pub fn from_catalogue(raw: &serde_json::Value) -> Self {
        let entries = raw.as_array().cloned().unwrap_or_default();
        let rules = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<PriorityRule>(entry) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!("skipping malformed priority rule: {e}");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    pub fn matched_rule(&self, ctx: &RuleContext) -> Option<&PriorityRule> {
        evaluate(&self.rules, ctx)
    }

    /// First matching tier, or `Medium` when no rule matches.
    pub fn classify(&self, ctx: &RuleContext) -> TicketPriority {
        self.matched_rule(ctx)
            .map(|rule| rule.priority)
            .unwrap_or(TicketPriority::Medium)
    }

    pub fn default_rules() -> Vec<PriorityRule> {
        vec![
            PriorityRule {
                condition: RuleCondition::Keywords {
                    keywords: vec![
                        "urgent".into(),
                        "lost".into(),
                        "stolen".into(),
                        "perdu".into(),
                    ],
                },
                priority: TicketPriority::Urgent,
                auto_assign: true,
                escalate_after_minutes: Some(30),
            },
            PriorityRule {
                condition: RuleCondition::DeliveryStatus {
                    status: DeliveryStatus::Failed,
                },
                priority: TicketPriority::High,
                auto_assign: true,
                escalate_after_minutes: Some(60),
            },
            PriorityRule {
                condition: RuleCondition::Keywords {
                    keywords: vec!["damaged".into(), "broken".into(), "endommag".into()],
                },
                priority: TicketPriority::High,
                auto_assign: false,
                escalate_after_minutes: None,
            },
            PriorityRule {
                condition: RuleCondition::ValueAbove { threshold: 500.0 },
                priority: TicketPriority::High,
                auto_assign: false,
                escalate_after_minutes: None,
            },
            PriorityRule {
                condition: RuleCondition::VipCustomer,
                priority: TicketPriority::High,
                auto_assign: true,
                escalate_after_minutes: None,
            },
            PriorityRule {
                condition: RuleCondition::HoursSinceContactAbove { hours: 24.0 },
                priority: TicketPriority::High,
                auto_assign: false,
                escalate_after_minutes: None,
            },
            PriorityRule {
                condition: RuleCondition::Keywords {
                    keywords: vec!["where".into(), "late".into(), "retard".into()],
                },
                priority: TicketPriority::Low,
                auto_assign: false,
                escalate_after_minutes: None,
            },
        ]
    }
}

impl Default for PriorityClassifier {
    fn default() -> Self {
        Self::new(Self::default_rules())
    }
}
