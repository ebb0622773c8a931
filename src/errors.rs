//! Typed error taxonomy (spec categories: transient I/O, business
//! constraint, invariant breach, ambiguous fill, configuration/pricing
//! unavailable). Internal helpers return `LadderError` so callers can match
//! on kind; `anyhow::Result` is used at the iteration boundary.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LadderError>;

#[derive(Debug, Error)]
pub enum LadderError {
    #[error("transient adapter error: {0}")]
    TransientIo(String),

    #[error("business constraint violated: {0}")]
    BusinessConstraint(String),

    #[error("invariant breach: {0}")]
    InvariantBreach(String),

    #[error("ambiguous fill for order {order_id}")]
    AmbiguousFill { order_id: String },

    #[error("configuration or pricing unavailable: {0}")]
    ConfigUnavailable(String),
}

impl LadderError {
    pub fn transient(msg: impl Into<String>) -> Self {
        LadderError::TransientIo(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        LadderError::InvariantBreach(msg.into())
    }
}
