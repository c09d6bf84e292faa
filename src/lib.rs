//! Pokerlog Gateway - `WhatsApp` bot for logging poker sessions
//!
//! Inbound `WhatsApp` messages (text, voice notes, images) are resolved to a
//! registered player, turned into text, classified and answered with exactly
//! one reply: a logged session with its profit, a tournament listing, a
//! practice scenario or its feedback, an image analysis, or a general answer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          Webhook  (POST /api/webhooks/whatsapp)       │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ InboundEvent
//! ┌──────────────────────────▼───────────────────────────┐
//! │                 Conversation Router                   │
//! │  Identity │ Media │ Transcription │ Vision │ Intent   │
//! │  Session Extractor │ Training Engine │ Advisor        │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ one reply
//! ┌──────────────────────────▼───────────────────────────┐
//! │        Reply Dispatcher  →  WhatsApp gateway          │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod advisor;
pub mod api;
pub mod channels;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod intent;
pub mod llm;
pub mod media;
pub mod replies;
pub mod router;
pub mod training;
pub mod transcription;
pub mod vision;

pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
pub use router::{ConversationRouter, Outcome, Services};
