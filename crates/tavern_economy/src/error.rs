//! # Economy Error Types
//!
//! All errors that can occur in the economy system.

use thiserror::Error;

use crate::currency::Currency;

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Attempted to spend more than the ledger holds.
    #[error("insufficient funds: need {required} {currency:?}, have {available}")]
    InsufficientFunds {
        /// The currency being spent.
        currency: Currency,
        /// The amount required.
        required: u32,
        /// The amount available.
        available: u32,
    },

    /// A table the engine needs was never configured.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The offer cannot be fulfilled by the shop.
    #[error("invalid offer: {0}")]
    InvalidOffer(String),

    /// The persistence collaborator failed.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
