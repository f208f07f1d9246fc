pub mod api_router;
pub mod autoresponse;
pub mod chat;
pub mod config;
pub mod history;
pub mod rules;
pub mod shared;
pub mod store;
pub mod tickets;
