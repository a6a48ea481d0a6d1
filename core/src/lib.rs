//! Core library for the Atelier AI assistant.
//!
//! - [`prompt`] converts the stored system prompt to and from named sections.
//! - [`settings`] folds site settings rows into a per-request snapshot.
//! - [`agents`] holds the conversation model and the provider adapters.
//! - [`gateway`] runs the ordered provider fallback and prompt enhancement.
//! - [`api`] exposes the HTTP routes the website calls.
//! - [`db`] opens the SQLite pool and applies migrations.
//! - [`errors`] is the catalogue of caller-facing failures.
//! - [`logging`] writes structured diagnostics to the event log table.
//! - [`chat_log`] keeps a record of finished exchanges.

pub mod agents;
pub mod api;
pub mod chat_log;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod logging;
pub mod prompt;
pub mod settings;

pub use errors::GatewayError;
pub use gateway::{AiGateway, EnhancedPrompt, NormalizedReply, ProviderLineup};
