//! Core types for the voucher ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Closed enums where the legacy store held free text
//! - Integer rupiah amounts (no fractional units)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalize a user-entered voucher code: trimmed, uppercase ASCII.
pub fn normalize_code(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Voucher lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherStatus {
    /// Provisioned but not yet activated
    Inactive,
    /// Activated and eligible for redemption
    Active,
    /// Has been redeemed at least once
    Used,
}

impl VoucherStatus {
    /// Canonical status code
    pub fn code(&self) -> &'static str {
        match self {
            VoucherStatus::Inactive => "inactive",
            VoucherStatus::Active => "active",
            VoucherStatus::Used => "used",
        }
    }

    /// Parse legacy free-text status. Case-insensitive; anything
    /// unrecognized (including empty text) maps to `Inactive`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "active" => VoucherStatus::Active,
            "used" | "habis" => VoucherStatus::Used,
            _ => VoucherStatus::Inactive,
        }
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Physical sale branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    /// Sedati branch
    Sedati,
    /// Tawangsari branch
    Tawangsari,
}

impl Branch {
    /// Both branches, in display order
    pub const ALL: [Branch; 2] = [Branch::Sedati, Branch::Tawangsari];

    /// Branch name as stored in transaction rows
    pub fn code(&self) -> &'static str {
        match self {
            Branch::Sedati => "Sedati",
            Branch::Tawangsari => "Tawangsari",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sedati" => Some(Branch::Sedati),
            "tawangsari" => Some(Branch::Tawangsari),
            _ => None,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Listing filter over vouchers. Replaces the legacy free-text
/// `filter_status` tag with a closed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoucherFilter {
    /// No status predicate
    Any,
    /// Only vouchers whose status is `active`
    ActiveOnly,
    /// Only vouchers with zero remaining balance
    ZeroBalanceOnly,
}

impl VoucherFilter {
    /// Whether a voucher passes this filter
    pub fn matches(&self, voucher: &Voucher) -> bool {
        match self {
            VoucherFilter::Any => true,
            VoucherFilter::ActiveOnly => voucher.status == VoucherStatus::Active,
            VoucherFilter::ZeroBalanceOnly => voucher.balance == 0,
        }
    }
}

impl Default for VoucherFilter {
    fn default() -> Self {
        VoucherFilter::Any
    }
}

/// Seller registration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SellerStatus {
    /// Registered, awaiting admin acceptance
    Pending,
    /// Accepted by an admin; may be assigned vouchers
    Accepted,
}

impl SellerStatus {
    /// Canonical status code
    pub fn code(&self) -> &'static str {
        match self {
            SellerStatus::Pending => "pending",
            SellerStatus::Accepted => "accepted",
        }
    }

    /// Parse legacy free-text status ("not accepted" / "Accepted")
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "accepted" => SellerStatus::Accepted,
            _ => SellerStatus::Pending,
        }
    }
}

impl fmt::Display for SellerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A prepaid voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    /// Unique code, normalized uppercase
    pub code: String,

    /// Face value in rupiah, immutable once set
    pub initial_value: i64,

    /// Remaining balance, `0 <= balance <= initial_value`
    pub balance: i64,

    /// Provisioning timestamp
    pub created_at: DateTime<Utc>,

    /// Buyer name (set at activation)
    pub nama: Option<String>,

    /// Buyer phone number (set at activation)
    pub no_hp: Option<String>,

    /// Lifecycle status
    pub status: VoucherStatus,

    /// Seller the voucher is assigned to
    pub seller: Option<String>,

    /// Sale date; gates redemption via the cooling period
    pub tanggal_penjualan: Option<NaiveDate>,
}

impl Voucher {
    /// Value consumed so far (`initial_value - balance`)
    pub fn used_value(&self) -> i64 {
        self.initial_value - self.balance
    }

    /// Whether a non-empty seller is assigned
    pub fn has_seller(&self) -> bool {
        self.seller
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }
}

/// An append-only redemption record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Monotonic surrogate key
    pub id: u64,

    /// Voucher code (not enforced as a foreign key)
    pub code: String,

    /// Amount deducted, always positive
    pub used_amount: i64,

    /// Commit timestamp
    pub tanggal_transaksi: DateTime<Utc>,

    /// Branch where the redemption happened
    pub branch: Branch,

    /// Serialized order detail, `"name xQty, name xQty"`
    pub items: String,
}

/// A menu row with per-branch prices and sold counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Category label
    pub kategori: String,

    /// Unique item name; the join key from transaction items to counters
    pub nama_item: String,

    /// Free-text description
    pub keterangan: Option<String>,

    /// Price at Sedati; `None` means not offered there
    pub harga_sedati: Option<i64>,

    /// Price at Tawangsari; `None` means not offered there
    pub harga_twsari: Option<i64>,

    /// Running sold counter for Sedati
    pub terjual_sedati: i64,

    /// Running sold counter for Tawangsari
    pub terjual_twsari: i64,
}

impl MenuItem {
    /// Price for a branch, if offered there
    pub fn price_for(&self, branch: Branch) -> Option<i64> {
        match branch {
            Branch::Sedati => self.harga_sedati,
            Branch::Tawangsari => self.harga_twsari,
        }
    }

    /// Sold counter for a branch
    pub fn sold_for(&self, branch: Branch) -> i64 {
        match branch {
            Branch::Sedati => self.terjual_sedati,
            Branch::Tawangsari => self.terjual_twsari,
        }
    }

    /// Increment the sold counter for a branch
    pub fn add_sold(&mut self, branch: Branch, quantity: i64) {
        match branch {
            Branch::Sedati => self.terjual_sedati += quantity,
            Branch::Tawangsari => self.terjual_twsari += quantity,
        }
    }

    /// Combined sold counter across both branches
    pub fn total_sold(&self) -> i64 {
        self.terjual_sedati + self.terjual_twsari
    }
}

/// A menu row projected for one branch (`get_menu` result)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// Item name
    pub name: String,

    /// Price at the requested branch
    pub price: i64,

    /// Category label
    pub category: String,
}

/// A registered voucher seller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seller {
    /// Unique seller name (trimmed)
    pub nama_seller: String,

    /// Contact phone number
    pub no_hp: String,

    /// Registration status
    pub status: SellerStatus,
}

/// Outcome of a successful redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    /// Id of the appended transaction row
    pub transaction_id: u64,

    /// Voucher balance after the deduction
    pub new_balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  abc123 "), "ABC123");
        assert_eq!(normalize_code("KPN-01"), "KPN-01");
    }

    #[test]
    fn test_status_parse_is_case_insensitive_and_total() {
        assert_eq!(VoucherStatus::parse("Active"), VoucherStatus::Active);
        assert_eq!(VoucherStatus::parse("ACTIVE"), VoucherStatus::Active);
        assert_eq!(VoucherStatus::parse("used"), VoucherStatus::Used);
        assert_eq!(VoucherStatus::parse(""), VoucherStatus::Inactive);
        assert_eq!(VoucherStatus::parse("sold out"), VoucherStatus::Inactive);
    }

    #[test]
    fn test_branch_parse_and_code() {
        assert_eq!(Branch::parse("tawangsari"), Some(Branch::Tawangsari));
        assert_eq!(Branch::parse("Sedati"), Some(Branch::Sedati));
        assert_eq!(Branch::parse("surabaya"), None);
        assert_eq!(Branch::Tawangsari.code(), "Tawangsari");
    }

    #[test]
    fn test_menu_item_branch_selection() {
        let mut item = MenuItem {
            kategori: "Makanan".to_string(),
            nama_item: "Nasi Goreng".to_string(),
            keterangan: None,
            harga_sedati: Some(15000),
            harga_twsari: None,
            terjual_sedati: 0,
            terjual_twsari: 0,
        };

        assert_eq!(item.price_for(Branch::Sedati), Some(15000));
        assert_eq!(item.price_for(Branch::Tawangsari), None);

        item.add_sold(Branch::Sedati, 2);
        assert_eq!(item.sold_for(Branch::Sedati), 2);
        assert_eq!(item.sold_for(Branch::Tawangsari), 0);
        assert_eq!(item.total_sold(), 2);
    }

    #[test]
    fn test_voucher_filter_predicates() {
        let voucher = Voucher {
            code: "ABC123".to_string(),
            initial_value: 100_000,
            balance: 0,
            created_at: Utc::now(),
            nama: None,
            no_hp: None,
            status: VoucherStatus::Used,
            seller: Some("Budi".to_string()),
            tanggal_penjualan: None,
        };

        assert!(VoucherFilter::Any.matches(&voucher));
        assert!(!VoucherFilter::ActiveOnly.matches(&voucher));
        assert!(VoucherFilter::ZeroBalanceOnly.matches(&voucher));
        assert_eq!(voucher.used_value(), 100_000);
        assert!(voucher.has_seller());
    }
}
