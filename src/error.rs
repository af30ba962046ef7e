//! Error types for the tracker
//!
//! Every failure in the app degrades to "the operation did not happen".
//! Nothing here is fatal; the UI turns these into non-blocking notices.

use std::sync::Arc;
use thiserror::Error;

/// Anonymous identity bootstrap failed, so no persistence can proceed
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Identity store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Stored user identifier is malformed: {0}")]
    MalformedIdentity(String),

    #[error("Sign-in timed out after {0}s")]
    Timeout(u64),

    #[error("Sign-in task failed: {0}")]
    Task(String),
}

/// A create/update/delete/subscribe call against the project collection failed
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Remote call timed out after {0}s")]
    Timeout(u64),

    #[error("Subscription closed")]
    SubscriptionClosed,

    #[error("Gateway task failed: {0}")]
    Task(String),
}

/// A single image could not be turned into an embeddable payload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageDecodeError {
    #[error("{0}: file is empty")]
    Empty(String),

    #[error("{name}: could not decode image: {reason}")]
    Decode { name: String, reason: String },

    #[error("{name}: could not encode JPEG: {reason}")]
    Encode { name: String, reason: String },

    #[error("{0}: ingestion task failed")]
    Task(String),
}

/// Rejected form/modal transitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("A save or image upload is already in progress")]
    Busy,

    #[error("No project is open for editing")]
    NotOpen,

    #[error("Only saved projects can be deleted")]
    NotPersisted,

    #[error("Project name is required")]
    NameRequired,

    #[error("Delete was not confirmed")]
    NotConfirmed,

    #[error("Image is not part of this project")]
    UnknownImage,
}

/// Config file could not be read or parsed
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Umbrella error surfaced to the user as a notice
///
/// Remote errors arrive wrapped in `Arc` because they travel through
/// cloneable UI messages.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Sign-in failed: {0}")]
    Auth(#[from] Arc<AuthError>),

    #[error("Sync failed: {0}")]
    Persistence(#[from] Arc<PersistenceError>),

    #[error("Image skipped: {0}")]
    Image(#[from] ImageDecodeError),

    #[error("{0}")]
    Form(#[from] FormError),
}
