//! Error types for stockpass storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record (account, invite code, plan, order).
        entity: &'static str,
        /// The key that was looked up.
        id: String,
    },

    /// An account with this display name already exists.
    #[error("account name already taken: {name}")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// The invite code was already consumed.
    #[error("invite code already used: {code}")]
    CodeAlreadyUsed {
        /// The code that was replayed.
        code: String,
    },

    /// The order is in a terminal non-payable state.
    #[error("order not payable: {out_trade_no} ({status})")]
    OrderNotPayable {
        /// The order number.
        out_trade_no: String,
        /// The order's current status.
        status: String,
    },

    /// Invalid input (non-positive count/duration/price).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
