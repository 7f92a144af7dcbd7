//! Error types for storebot.

use uuid::Uuid;

use crate::campaigns::model::CampaignStatus;

/// Top-level error type for the worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Campaign error: {0}")]
    Campaign(#[from] CampaignError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence errors. Surfaced to the caller of the failing operation;
/// never retried inside the storage layer itself.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {collection} with id {id}")]
    NotFound { collection: String, id: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Messaging-channel errors. Every send failure is treated as transient:
/// the dispatcher retries the contact on a later cycle, never within one.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel failed to start: {reason}")]
    StartupFailed { reason: String },

    #[error("Failed to send to {recipient}: {reason}")]
    SendFailed { recipient: String, reason: String },

    #[error("Channel session lost: {reason}")]
    SessionLost { reason: String },
}

/// Campaign lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("Campaign {id} not found")]
    NotFound { id: Uuid },

    #[error("Invalid campaign spec: {reason}")]
    InvalidSpec { reason: String },

    #[error("Campaign {id} cannot transition from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    },
}

/// Result type alias for the worker.
pub type Result<T> = std::result::Result<T, Error>;
