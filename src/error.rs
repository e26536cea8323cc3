//! Error types shared by the watch engine and its collaborators.
//!
//! None of these are fatal: fetch and delivery errors are logged by the poll
//! cycle and the loop carries on.

use std::time::Duration;

/// Why a source fetch produced no usable item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Page was retrieved but the expected structure was not there.
    #[error("parse error: {0}")]
    Parse(String),

    /// Page parsed fine but carries no listing item.
    #[error("no listing item on page")]
    NoItem,

    /// Fetch did not finish within the allowed time.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Why a notification could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("API error: {0}")]
    Api(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("unknown source '{0}'")]
    UnknownSource(String),
}
