//! Combines the REST/WS routes of all modules into a unified router.

use std::sync::Arc;

use axum::Router;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::tickets::configure_tickets_routes())
        .merge(crate::chat::configure_chat_routes())
}
