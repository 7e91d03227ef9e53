//! Main ledger orchestration layer
//!
//! This module ties together storage, repository, and metrics into a
//! high-level API for voucher provisioning, activation, and redemption.
//!
//! # Example
//!
//! ```no_run
//! use voucher_ledger::{Config, VoucherLedger};
//!
//! fn main() -> voucher_ledger::Result<()> {
//!     let config = Config::default();
//!     let ledger = VoucherLedger::open(config)?;
//!
//!     // Redeem against a voucher
//!     // let receipt = ledger.redeem("ABC123", 40_000, Branch::Sedati, "Nasi Goreng x2")?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    metrics::Metrics,
    order::{format_item_summary, parse_item_summary, OrderLine},
    repository::Repository,
    storage::StorageStats,
    types::{normalize_code, Branch, RedemptionReceipt, Transaction, Voucher, VoucherStatus},
    Config, Error, Result, Storage,
};
use chrono::{NaiveDate, Utc};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Characters used for generated voucher codes. Ambiguous glyphs
/// (0/O, 1/I/L) are excluded because codes are copied by hand.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Attempts per voucher before provisioning gives up on a unique code
const MAX_CODE_ATTEMPTS: usize = 100;

/// Main voucher ledger interface
pub struct VoucherLedger {
    /// Shared storage
    storage: Arc<Storage>,

    /// Read and registry operations
    repository: Repository,

    /// Prometheus collectors
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl VoucherLedger {
    /// Open the ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let repository = Repository::new(storage.clone());
        let metrics = Metrics::new()?;

        Ok(Self {
            storage,
            repository,
            metrics,
            config,
        })
    }

    /// Query and registry operations
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Metrics collectors
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration the ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Approximate storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    // Redemption protocol

    /// Check whether a voucher may enter the order-building phase.
    ///
    /// Read-only. `today` is passed in so callers control the clock. The
    /// checks run in order: existence, active status, recorded sale date,
    /// and the cooling period (redemption opens strictly after the day of
    /// sale). Returns the voucher on success so callers can show the
    /// balance without a second read.
    pub fn check_eligibility(&self, code: &str, today: NaiveDate) -> Result<Voucher> {
        let code = normalize_code(code);

        let voucher = self
            .storage
            .get_voucher(&code)?
            .ok_or_else(|| Error::VoucherNotFound(code.clone()))?;

        if voucher.status != VoucherStatus::Active {
            return Err(Error::NotActivated(voucher.status.code().to_string()));
        }

        let sale_date = voucher.tanggal_penjualan.ok_or(Error::SaleDateMissing)?;
        if today <= sale_date {
            return Err(Error::TooEarly(sale_date));
        }

        Ok(voucher)
    }

    /// Atomically redeem `amount` from a voucher.
    ///
    /// The caller's earlier balance check is advisory only; the
    /// authoritative check happens here under the voucher's lock. On
    /// success the voucher balance is reduced, the status becomes `used`,
    /// one transaction row is appended, and the branch sold-counter of
    /// every recognized item in `item_summary` is incremented, all in one
    /// atomic write. A failure leaves no partial state.
    pub fn redeem(
        &self,
        code: &str,
        amount: i64,
        branch: Branch,
        item_summary: &str,
    ) -> Result<RedemptionReceipt> {
        let started = Instant::now();
        let result = self.redeem_locked(code, amount, branch, item_summary);

        match &result {
            Ok(receipt) => {
                self.metrics
                    .record_redemption(amount, started.elapsed().as_secs_f64());
                tracing::info!(
                    code = %normalize_code(code),
                    amount,
                    branch = %branch,
                    new_balance = receipt.new_balance,
                    "Redemption committed"
                );
            }
            Err(e) => {
                self.metrics.record_redemption_failure();
                tracing::warn!(code = %normalize_code(code), amount, error = %e, "Redemption rejected");
            }
        }

        result
    }

    /// Redeem from a structured order instead of a serialized summary.
    ///
    /// The lines are serialized to the canonical item-summary format, so
    /// both entry points commit identical state.
    pub fn redeem_order(
        &self,
        code: &str,
        amount: i64,
        branch: Branch,
        lines: &[OrderLine],
    ) -> Result<RedemptionReceipt> {
        let summary = format_item_summary(lines);
        self.redeem(code, amount, branch, &summary)
    }

    fn redeem_locked(
        &self,
        code: &str,
        amount: i64,
        branch: Branch,
        item_summary: &str,
    ) -> Result<RedemptionReceipt> {
        if amount <= 0 {
            return Err(Error::InvalidAmount(amount));
        }

        let code = normalize_code(code);

        // 1. Serialize all writers of this voucher
        let voucher_lock = self.storage.voucher_lock(&code);
        let _voucher_guard = voucher_lock.lock();

        // 2. Existence under the lock
        let mut voucher = self
            .storage
            .get_voucher(&code)?
            .ok_or_else(|| Error::VoucherNotFound(code.clone()))?;

        // 3. Authoritative balance check; the pre-lock balance may be stale
        if voucher.balance < amount {
            return Err(Error::InsufficientBalance {
                balance: voucher.balance,
            });
        }

        // 4. New balance, status forced to used regardless of remainder
        voucher.balance -= amount;
        voucher.status = VoucherStatus::Used;

        // 5. Transaction row, timestamped at commit time
        let transaction = Transaction {
            id: self.storage.allocate_transaction_id(),
            code: code.clone(),
            used_amount: amount,
            tanggal_transaksi: Utc::now(),
            branch,
            items: item_summary.trim().to_string(),
        };

        // 6. Aggregate quantities per item name; malformed tokens were
        //    already dropped by the parser. Names are locked in sorted
        //    order, after the voucher lock, so writers cannot deadlock.
        let mut wanted: BTreeMap<String, u32> = BTreeMap::new();
        for line in parse_item_summary(item_summary) {
            if line.quantity > 0 {
                *wanted.entry(line.name).or_insert(0) += line.quantity;
            }
        }

        let menu_locks: Vec<_> = wanted
            .keys()
            .map(|name| self.storage.menu_lock(name))
            .collect();
        let _menu_guards: Vec<_> = menu_locks.iter().map(|lock| lock.lock()).collect();

        let mut touched_items = Vec::new();
        for (name, quantity) in &wanted {
            // Unknown names are skipped, not an error
            if let Some(mut item) = self.storage.get_menu_item(name)? {
                item.add_sold(branch, *quantity as i64);
                touched_items.push(item);
            }
        }

        // 7. All-or-nothing commit
        self.storage
            .commit_redemption(&voucher, &transaction, &touched_items)?;

        // 8. Receipt with the committed balance
        Ok(RedemptionReceipt {
            transaction_id: transaction.id,
            new_balance: voucher.balance,
        })
    }

    // Activation

    /// Seller-side activation of an assigned voucher.
    ///
    /// The seller must exist in the registry and must match the voucher's
    /// assignment (compared trimmed, case-insensitive). Only an inactive
    /// voucher can be activated; buyer detail, active status, and the sale
    /// date are written together under the voucher's lock.
    pub fn activate_by_seller(
        &self,
        code: &str,
        seller: &str,
        buyer_name: &str,
        buyer_phone: &str,
        sale_date: NaiveDate,
    ) -> Result<Voucher> {
        let code = normalize_code(code);
        let seller = seller.trim();

        if self.storage.get_seller(seller)?.is_none() {
            return Err(Error::SellerNotFound(seller.to_string()));
        }

        let lock = self.storage.voucher_lock(&code);
        let _guard = lock.lock();

        let mut voucher = self
            .storage
            .get_voucher(&code)?
            .ok_or_else(|| Error::VoucherNotFound(code.clone()))?;

        match voucher.seller.as_deref() {
            None => return Err(Error::SellerNotAssigned(code.clone())),
            Some(assigned) if !assigned.trim().eq_ignore_ascii_case(seller) => {
                return Err(Error::SellerMismatch(assigned.trim().to_string()));
            }
            Some(_) => {}
        }

        // A used voucher was necessarily active once; both are rejected
        if voucher.status != VoucherStatus::Inactive {
            return Err(Error::AlreadyActive(code.clone()));
        }

        voucher.nama = non_empty(buyer_name);
        voucher.no_hp = non_empty(buyer_phone);
        voucher.status = VoucherStatus::Active;
        voucher.tanggal_penjualan = Some(sale_date);

        self.storage.put_voucher(&voucher)?;
        self.metrics.record_activation();

        tracing::info!(code = %code, seller = %seller, %sale_date, "Voucher activated");
        Ok(voucher)
    }

    // Provisioning

    /// Create a single voucher with an explicit code.
    ///
    /// For preprinted voucher books where codes already exist on paper.
    /// The code is normalized before storage; a duplicate is rejected.
    pub fn create_voucher(&self, code: &str, initial_value: i64) -> Result<Voucher> {
        if initial_value <= 0 {
            return Err(Error::InvalidAmount(initial_value));
        }

        let code = normalize_code(code);
        if code.is_empty() {
            return Err(Error::InvariantViolation(
                "Voucher code must not be empty".to_string(),
            ));
        }

        let lock = self.storage.voucher_lock(&code);
        let _guard = lock.lock();

        if self.storage.get_voucher(&code)?.is_some() {
            return Err(Error::VoucherExists(code));
        }

        let voucher = Voucher {
            code,
            initial_value,
            balance: initial_value,
            created_at: Utc::now(),
            nama: None,
            no_hp: None,
            status: VoucherStatus::Inactive,
            seller: None,
            tanggal_penjualan: None,
        };
        self.storage.insert_voucher(&voucher)?;

        tracing::debug!(code = %voucher.code, initial_value, "Voucher created");
        Ok(voucher)
    }

    /// Create a batch of fresh vouchers with random codes.
    ///
    /// Codes are `prefix` plus `provisioning.code_length` characters from
    /// an unambiguous alphabet; collisions with existing codes are retried.
    pub fn provision_vouchers(
        &self,
        count: usize,
        initial_value: i64,
        prefix: &str,
    ) -> Result<Vec<Voucher>> {
        if initial_value <= 0 {
            return Err(Error::InvalidAmount(initial_value));
        }

        let prefix = normalize_code(prefix);
        let mut created = Vec::with_capacity(count);

        for _ in 0..count {
            let voucher = self.provision_one(initial_value, &prefix)?;
            created.push(voucher);
        }

        self.metrics.record_provisioned(created.len() as u64);
        tracing::info!(
            count = created.len(),
            initial_value,
            prefix = %prefix,
            "Vouchers provisioned"
        );

        Ok(created)
    }

    fn provision_one(&self, initial_value: i64, prefix: &str) -> Result<Voucher> {
        let mut rng = rand::thread_rng();

        for _ in 0..MAX_CODE_ATTEMPTS {
            let mut code = String::from(prefix);
            for _ in 0..self.config.provisioning.code_length {
                let idx = rng.gen_range(0..CODE_ALPHABET.len());
                code.push(CODE_ALPHABET[idx] as char);
            }

            match self.create_voucher(&code, initial_value) {
                Ok(voucher) => return Ok(voucher),
                Err(Error::VoucherExists(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(Error::InvariantViolation(format!(
            "No unique code found after {} attempts (prefix {})",
            MAX_CODE_ATTEMPTS, prefix
        )))
    }

    // Invariants

    /// Check the reconciliation invariant for one voucher:
    /// `initial_value == balance + sum(used_amount)` over its transactions.
    pub fn check_reconciliation(&self, code: &str) -> Result<bool> {
        let code = normalize_code(code);
        let voucher = self
            .storage
            .get_voucher(&code)?
            .ok_or_else(|| Error::VoucherNotFound(code.clone()))?;

        let spent: i64 = self
            .repository
            .transactions_for_voucher(&code)?
            .iter()
            .map(|t| t.used_amount)
            .sum();

        Ok(voucher.initial_value == voucher.balance + spent)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
