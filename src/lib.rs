//! Tidings - authenticated real-time update hub
//!
//! A publish/subscribe hub that accepts authenticated publications and fans
//! updates out to long-lived subscriber connections, with topic-based
//! authorization, resume-from-id support, and token verification.

pub mod auth;
pub mod config;
pub mod error;
pub mod hub;
pub mod server;
pub mod topic;
pub mod web;

pub use auth::{AuthGateway, Claims, TokenCodec};
pub use error::{Error, Result};
pub use hub::{Hub, HubConfig, HubRegistry, InstrumentedHub, Publisher, RetentionPolicy, Subscriber, Update, UpdateId};
pub use topic::TopicSelector;
