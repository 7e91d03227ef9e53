//! Kupon Pawon Sappitoe voucher ledger
//!
//! Voucher issuance, activation, and redemption for a two-branch food
//! business. Vouchers are sold through sellers, activated with the buyer's
//! detail, and redeemed against the menu of either branch.
//!
//! # Architecture
//!
//! - **Single store**: vouchers, transactions, menu, and sellers live in
//!   one RocksDB instance with a column family per record kind
//! - **Row-level locking**: an in-process lock table serializes writers of
//!   the same voucher or menu row; unrelated rows never block each other
//! - **Atomic commits**: every redemption writes its voucher update,
//!   transaction row, and counter increments in one write batch
//!
//! # Invariants
//!
//! - Reconciliation: `initial_value == balance + Σ(used_amount)` per voucher
//! - No double-spend: concurrent redemptions of one code serialize, and the
//!   loser observes the winner's committed balance
//! - All-or-nothing: a failed redemption leaves no partial state

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod order;
pub mod storage;
pub mod repository;
pub mod ledger;
pub mod session;
pub mod report;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::VoucherLedger;
pub use order::{Order, OrderLine};
pub use repository::Repository;
pub use session::{RedeemSession, SessionState, SessionStore};
pub use storage::Storage;
pub use types::{
    Branch, MenuEntry, MenuItem, RedemptionReceipt, Seller, SellerStatus, Transaction, Voucher,
    VoucherFilter, VoucherStatus,
};
