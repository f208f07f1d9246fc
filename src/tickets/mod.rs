//! Support tickets: model, lifecycle state machine, escalation path and
//! REST handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::autoresponse::QuickResponse;
use crate::chat::SenderKind;
use crate::rules::{RuleContext, TicketPriority};
use crate::shared::error::SupportError;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub solved_by: Uuid,
    pub solved_at: DateTime<Utc>,
    pub solution: String,
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub customer_id: Uuid,
    pub category: String,
    pub subject: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub assignee_id: Option<Uuid>,
    /// Weak back-reference when this ticket continues an escalated one.
    pub escalated_from: Option<Uuid>,
    pub escalation_reason: Option<String>,
    /// Response deadline set by the matching priority rule; the periodic
    /// sweep escalates tickets still open past it.
    pub escalate_at: Option<DateTime<Utc>>,
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        delivery_id: Uuid,
        customer_id: Uuid,
        category: String,
        subject: String,
        priority: TicketPriority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            delivery_id,
            customer_id,
            category,
            subject,
            priority,
            status: TicketStatus::Open,
            assignee_id: None,
            escalated_from: None,
            escalation_reason: None,
            escalate_at: None,
            resolution: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn invalid(&self, action: &str) -> SupportError {
        SupportError::Transition(format!(
            "cannot {action} a ticket in state {:?}",
            self.status
        ))
    }

    /// `open -> in_progress`: an agent claims the ticket.
    pub fn claim(&mut self, agent_id: Uuid) -> Result<(), SupportError> {
        if self.status != TicketStatus::Open {
            return Err(self.invalid("claim"));
        }
        self.status = TicketStatus::InProgress;
        self.assignee_id = Some(agent_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `in_progress -> resolved`: records the resolution.
    pub fn resolve(&mut self, solved_by: Uuid, solution: String) -> Result<(), SupportError> {
        if self.status != TicketStatus::InProgress {
            return Err(self.invalid("resolve"));
        }
        self.resolution = Some(Resolution {
            solved_by,
            solved_at: Utc::now(),
            solution,
            feedback: None,
        });
        self.status = TicketStatus::Resolved;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `resolved -> closed`. Feedback can only be attached when a
    /// resolution record exists.
    pub fn close(&mut self, feedback: Option<Feedback>) -> Result<(), SupportError> {
        if self.status != TicketStatus::Resolved {
            return Err(self.invalid("close"));
        }
        if let Some(fb) = feedback {
            match self.resolution.as_mut() {
                Some(resolution) => resolution.feedback = Some(fb),
                None => {
                    return Err(SupportError::Transition(
                        "cannot attach feedback without a resolution record".to_string(),
                    ))
                }
            }
        }
        self.status = TicketStatus::Closed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Raises urgency from any non-closed state and records the reason.
    /// The new tier is the requested one when it is strictly higher than
    /// a one-step bump, otherwise the bump. Saturates at `urgent`.
    pub fn escalate(
        &mut self,
        reason: &str,
        requested: Option<TicketPriority>,
    ) -> Result<TicketPriority, SupportError> {
        if self.status == TicketStatus::Closed {
            return Err(self.invalid("escalate"));
        }
        let mut target = self.priority.bumped();
        if let Some(req) = requested {
            if req > target {
                target = req;
            }
        }
        self.priority = target;
        self.escalation_reason = Some(reason.to_string());
        self.updated_at = Utc::now();
        Ok(target)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub delivery_id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub subject: String,
}

#[derive(Debug, Deserialize)]
pub struct EscalateRequest {
    pub reason: String,
    pub priority: Option<TicketPriority>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub agent_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub solved_by: Uuid,
    pub solution: String,
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<Uuid>,
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<Json<Ticket>, SupportError> {
    let delivery = state
        .deliveries
        .delivery(req.delivery_id)
        .await
        .ok_or_else(|| SupportError::NotFound(format!("delivery {}", req.delivery_id)))?;

    let ctx = RuleContext::from_delivery(&req.subject, &delivery, Utc::now());
    let priority = state.classifier.classify(&ctx);
    let mut ticket =
        Ticket::new(req.delivery_id, req.user_id, req.category, req.subject, priority);
    if let Some(rule) = state.classifier.matched_rule(&ctx) {
        if let Some(minutes) = rule.escalate_after_minutes {
            ticket.escalate_at =
                Some(ticket.created_at + chrono::Duration::minutes(i64::from(minutes)));
        }
        if rule.auto_assign {
            if let Some(agent_id) = least_loaded_agent(&state).await {
                ticket.claim(agent_id)?;
                info!(ticket_id = %ticket.id, %agent_id, "ticket auto-assigned");
            }
        }
    }

    state.tickets.insert(ticket.clone()).await;
    info!(ticket_id = %ticket.id, ?priority, "ticket created");
    Ok(Json(ticket))
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Ticket>>, SupportError> {
    let user_id = query
        .user_id
        .ok_or_else(|| SupportError::Validation("user_id is required".to_string()))?;
    Ok(Json(state.tickets.for_user(user_id).await))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ticket>, SupportError> {
    let ticket = state
        .tickets
        .get(id)
        .await
        .ok_or_else(|| SupportError::NotFound(format!("ticket {id}")))?;
    Ok(Json(ticket))
}

pub async fn escalate_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<EscalateRequest>,
) -> Result<Json<Ticket>, SupportError> {
    let ticket = state
        .tickets
        .get(id)
        .await
        .ok_or_else(|| SupportError::NotFound(format!("ticket {id}")))?;
    let ticket = apply_escalation(&state, ticket, &req.reason, req.priority).await?;
    Ok(Json(ticket))
}

/// Shared escalation path for the explicit endpoint and the negative
/// feedback trigger: raise priority, re-classify against a fresh context,
/// persist, announce via a system chat message, and notify the customer.
pub async fn apply_escalation(
    state: &AppState,
    mut ticket: Ticket,
    reason: &str,
    floor: Option<TicketPriority>,
) -> Result<Ticket, SupportError> {
    ticket.escalate(reason, floor)?;

    // Re-classification may out-rank the bump (e.g. elapsed time has
    // crossed a rule threshold since creation).
    if let Some(delivery) = state.deliveries.delivery(ticket.delivery_id).await {
        let ctx = RuleContext::from_delivery(&ticket.subject, &delivery, Utc::now());
        let classified = state.classifier.classify(&ctx);
        if classified > ticket.priority {
            ticket.priority = classified;
        }
    }

    state.tickets.update(ticket.clone()).await?;

    let channel = state.channels.for_send(ticket.delivery_id).await;
    channel
        .send(
            Uuid::nil(),
            SenderKind::System,
            format!(
                "This conversation has been escalated ({reason}). \
                 A support agent will follow up with you shortly."
            ),
            Vec::new(),
            true,
        )
        .await?;

    state
        .notifier
        .notify(
            ticket.customer_id,
            "Your support request was escalated",
            "A support agent will follow up with you shortly.",
        )
        .await;

    info!(ticket_id = %ticket.id, priority = ?ticket.priority, reason, "ticket escalated");
    Ok(ticket)
}

/// Agent on the roster with the fewest tickets currently on their plate.
/// `None` when no roster is configured.
async fn least_loaded_agent(state: &AppState) -> Option<Uuid> {
    let mut best: Option<(Uuid, usize)> = None;
    for &agent_id in &state.config.support.agents {
        let load = state.tickets.open_count_for_assignee(agent_id).await;
        if best.map(|(_, lowest)| load < lowest).unwrap_or(true) {
            best = Some((agent_id, load));
        }
    }
    best.map(|(agent_id, _)| agent_id)
}

/// Escalates tickets still open past their response deadline. Driven by
/// the periodic sweep in the server binary; returns how many were raised.
pub async fn escalate_overdue(state: &AppState) -> Result<usize, SupportError> {
    let due = state.tickets.due_for_escalation(Utc::now()).await;
    let mut escalated = 0;
    for mut ticket in due {
        ticket.escalate_at = None;
        apply_escalation(state, ticket, "response deadline passed", None).await?;
        escalated += 1;
    }
    Ok(escalated)
}

/// Negative feedback on an automated reply: mark the message, escalate the
/// conversation's ticket to at least `high`.
pub async fn escalate_for_feedback(
    state: &AppState,
    message_id: Uuid,
    reason: &str,
) -> Result<Ticket, SupportError> {
    let message = state
        .messages
        .get(message_id)
        .await
        .ok_or_else(|| SupportError::NotFound(format!("message {message_id}")))?;
    state.messages.mark_feedback(message_id).await?;

    let ticket = state
        .tickets
        .for_delivery(message.delivery_id)
        .await
        .ok_or_else(|| {
            SupportError::NotFound(format!("ticket for delivery {}", message.delivery_id))
        })?;
    apply_escalation(state, ticket, reason, Some(TicketPriority::High)).await
}

pub async fn claim_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<Ticket>, SupportError> {
    let mut ticket = state
        .tickets
        .get(id)
        .await
        .ok_or_else(|| SupportError::NotFound(format!("ticket {id}")))?;
    ticket.claim(req.agent_id)?;
    state.tickets.update(ticket.clone()).await?;
    Ok(Json(ticket))
}

pub async fn resolve_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<Ticket>, SupportError> {
    let mut ticket = state
        .tickets
        .get(id)
        .await
        .ok_or_else(|| SupportError::NotFound(format!("ticket {id}")))?;
    ticket.resolve(req.solved_by, req.solution)?;
    state.tickets.update(ticket.clone()).await?;
    Ok(Json(ticket))
}

pub async fn close_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CloseRequest>,
) -> Result<Json<Ticket>, SupportError> {
    let mut ticket = state
        .tickets
        .get(id)
        .await
        .ok_or_else(|| SupportError::NotFound(format!("ticket {id}")))?;
    ticket.close(req.feedback)?;
    state.tickets.update(ticket.clone()).await?;
    Ok(Json(ticket))
}

/// `?category=…&tags[]=a&tags[]=b`; repeated `tags[]` parameters match
/// any. Collected as raw pairs because the multi-value key falls outside
/// what a derived query struct can express.
pub async fn list_quick_responses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<QuickResponse>>, SupportError> {
    let mut category = None;
    let mut tags = Vec::new();
    for (key, value) in params {
        match key.as_str() {
            "category" => category = Some(value),
            "tags[]" => tags.push(value),
            _ => {}
        }
    }

    let responses = state.quick_responses.read().await;
    let filtered = responses
        .iter()
        .filter(|qr| qr.is_public)
        .filter(|qr| category.as_ref().map(|c| &qr.category == c).unwrap_or(true))
        .filter(|qr| tags.is_empty() || tags.iter().any(|t| qr.tags.contains(t)))
        .cloned()
        .collect();
    Ok(Json(filtered))
}

pub async fn get_quick_response(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuickResponse>, SupportError> {
    let responses = state.quick_responses.read().await;
    responses
        .iter()
        .find(|qr| qr.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| SupportError::NotFound(format!("quick response {id}")))
}

pub async fn use_quick_response(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuickResponse>, SupportError> {
    let mut responses = state.quick_responses.write().await;
    let qr = responses
        .iter_mut()
        .find(|qr| qr.id == id)
        .ok_or_else(|| SupportError::NotFound(format!("quick response {id}")))?;
    qr.record_use();
    Ok(Json(qr.clone()))
}

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/support/tickets", get(list_tickets).post(create_ticket))
        .route("/api/support/tickets/:id", get(get_ticket))
        .route("/api/support/tickets/:id/escalate", post(escalate_ticket))
        .route("/api/support/tickets/:id/claim", put(claim_ticket))
        .route("/api/support/tickets/:id/resolve", put(resolve_ticket))
        .route("/api/support/tickets/:id/close", put(close_ticket))
        .route("/api/support/quick-responses", get(list_quick_responses))
        .route("/api/support/quick-responses/:id", get(get_quick_response))
        .route("/api/support/quick-responses/:id/use", post(use_quick_response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> Ticket {
        Ticket::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "delivery".into(),
            "package not moving".into(),
            TicketPriority::Medium,
        )
    }

    #[test]
    fn closed_is_only_reachable_via_resolved() {
        let mut t = ticket();
        let err = t.close(None).unwrap_err();
        assert!(matches!(err, SupportError::Transition(_)));
        assert_eq!(t.status, TicketStatus::Open);

        t.claim(Uuid::new_v4()).unwrap();
        assert!(t.close(None).is_err());
        t.resolve(Uuid::new_v4(), "rerouted the parcel".into()).unwrap();
        t.close(None).unwrap();
        assert_eq!(t.status, TicketStatus::Closed);
    }

    #[test]
    fn claim_requires_open() {
        let mut t = ticket();
        t.claim(Uuid::new_v4()).unwrap();
        assert!(t.claim(Uuid::new_v4()).is_err());
        assert_eq!(t.status, TicketStatus::InProgress);
    }

    #[test]
    fn resolve_requires_in_progress() {
        let mut t = ticket();
        assert!(t.resolve(Uuid::new_v4(), "fix".into()).is_err());
    }

    #[test]
    fn close_with_feedback_keeps_resolution_record() {
        let mut t = ticket();
        t.claim(Uuid::new_v4()).unwrap();
        t.resolve(Uuid::new_v4(), "refund issued".into()).unwrap();
        t.close(Some(Feedback {
            rating: 5,
            comment: Some("merci".into()),
        }))
        .unwrap();
        let resolution = t.resolution.unwrap();
        assert_eq!(resolution.feedback.unwrap().rating, 5);
    }

    #[test]
    fn escalation_raises_priority_and_records_reason() {
        let mut t = ticket();
        t.claim(Uuid::new_v4()).unwrap();
        let new = t.escalate("notClear", Some(TicketPriority::High)).unwrap();
        assert_eq!(new, TicketPriority::High);
        assert_eq!(t.priority, TicketPriority::High);
        assert_eq!(t.escalation_reason.as_deref(), Some("notClear"));
    }

    #[test]
    fn escalation_rejected_on_closed_ticket() {
        let mut t = ticket();
        t.claim(Uuid::new_v4()).unwrap();
        t.resolve(Uuid::new_v4(), "done".into()).unwrap();
        t.close(None).unwrap();
        assert!(t.escalate("too late", None).is_err());
    }

    #[test]
    fn escalation_saturates_at_urgent() {
        let mut t = ticket();
        t.priority = TicketPriority::Urgent;
        let new = t.escalate("still urgent", None).unwrap();
        assert_eq!(new, TicketPriority::Urgent);
    }
}
