//! Oratio: routes understood user intents to ability microservices.

pub mod ability;
pub mod api;
pub mod app;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod nlg;
pub mod nlu;
pub mod registry;
pub mod store;
