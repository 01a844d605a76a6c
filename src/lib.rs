//! Backend for a WhatsApp bot that recommends job openings.
//!
//! This crate provides the skeleton the bot grows on:
//! - single-instance lifecycle management for the database pool, the
//!   redis client and the LLM client ([`resource`], [`services::app_state`])
//! - thin facades for parameterized queries, TTL-bounded session/cache
//!   storage and LLM request shaping ([`services`])
//! - the HTTP surface: info, health check and stub webhook endpoints
//!   ([`routes`], [`server`])
//!
//! The webhook handlers acknowledge and discard payloads today; message
//! parsing, retrieval and the dialogue state machine are not built yet.

pub mod config;
pub mod error;
pub mod resource;
pub mod routes;
pub mod server;
pub mod services;

pub use config::AppConfig;
pub use error::{Result, ServerError};
pub use server::Server;
