//! Error types for the voucher ledger

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Voucher ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Voucher not found
    #[error("Voucher not found: {0}")]
    VoucherNotFound(String),

    /// Voucher code already present at creation time
    #[error("Voucher already exists: {0}")]
    VoucherExists(String),

    /// Voucher exists but has not been activated
    #[error("Voucher is not active (status: {0})")]
    NotActivated(String),

    /// Voucher has no recorded sale date, so the cooling period cannot be checked
    #[error("Voucher has no recorded sale date")]
    SaleDateMissing,

    /// Redemption attempted on or before the sale date
    #[error("Redemption opens the day after the sale date ({0})")]
    TooEarly(NaiveDate),

    /// Balance does not cover the requested amount; carries the current balance
    #[error("Insufficient balance: {balance} available")]
    InsufficientBalance {
        /// Balance at the time the lock was held
        balance: i64,
    },

    /// Redemption amount must be a positive number of currency units
    #[error("Invalid redemption amount: {0}")]
    InvalidAmount(i64),

    /// Seller activation on a voucher no admin has assigned yet
    #[error("Voucher {0} has not been assigned to a seller")]
    SellerNotAssigned(String),

    /// Seller activation with a name that does not match the assignment
    #[error("Voucher is registered to seller {0}")]
    SellerMismatch(String),

    /// Seller activation on a voucher that is already active
    #[error("Voucher {0} is already active")]
    AlreadyActive(String),

    /// Seller not present in the registry
    #[error("Seller not found: {0}")]
    SellerNotFound(String),

    /// Seller name already registered
    #[error("Seller already registered: {0}")]
    SellerExists(String),

    /// Invariant violation (balance reconciliation, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Order line references an item the current branch menu does not carry
    #[error("Item not on the menu: {0}")]
    UnknownMenuItem(String),

    /// Session method called in a state that does not allow it
    #[error("Session step not allowed: {0}")]
    SessionStep(String),

    /// Session id not present in the store
    #[error("Session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}
