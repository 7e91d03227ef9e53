//! Report generation over the voucher store
//!
//! Summaries aggregate what the repository reads; CSV exports are plain
//! projections of the same queries. Nothing in this module writes to the
//! store.

use crate::{
    repository::Repository,
    types::{Branch, SellerStatus, VoucherStatus},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Report generation errors
#[derive(Debug, Error)]
pub enum ReportError {
    /// Underlying store query failed
    #[error("Query error: {0}")]
    Query(#[from] crate::Error),

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Produced bytes were not valid UTF-8
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Voucher population summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherSummary {
    /// All vouchers in the store
    pub total_vouchers: usize,
    /// Vouchers currently active
    pub active: usize,
    /// Vouchers redeemed at least once
    pub used: usize,
    /// Vouchers never activated
    pub inactive: usize,
    /// Vouchers with nothing left on them
    pub zero_balance: usize,
    /// Vouchers assigned to a seller
    pub assigned_to_seller: usize,
    /// Sum of initial values
    pub total_initial_value: i64,
    /// Sum of remaining balances
    pub total_balance: i64,
    /// Sum of redeemed value
    pub total_used_value: i64,
}

/// Redemption volume for one branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchBreakdown {
    /// Branch name
    pub branch: String,
    /// Transactions committed at this branch
    pub transactions: usize,
    /// Total amount redeemed at this branch
    pub redeemed: i64,
}

/// Transaction volume summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// All transactions
    pub total_transactions: usize,
    /// Total amount redeemed
    pub total_redeemed: i64,
    /// Mean amount per transaction, zero when there are none
    pub mean_redeemed: f64,
    /// Volume per branch
    pub per_branch: Vec<BranchBreakdown>,
}

/// Sold counters of one menu item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopMenuItem {
    /// Item name
    pub nama_item: String,
    /// Item category
    pub kategori: String,
    /// Portions sold at Sedati
    pub sold_sedati: i64,
    /// Portions sold at Tawangsari
    pub sold_twsari: i64,
    /// Portions sold across both branches
    pub total_sold: i64,
}

/// Per-seller voucher performance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerPerformance {
    /// Seller name
    pub nama_seller: String,
    /// Contact number
    pub no_hp: String,
    /// Registry status
    pub status: SellerStatus,
    /// Vouchers assigned to this seller
    pub vouchers_assigned: usize,
    /// Assigned vouchers that were activated
    pub vouchers_activated: usize,
    /// Redeemed value across assigned vouchers
    pub total_sold_value: i64,
}

/// Summarize the voucher population
pub fn voucher_summary(repo: &Repository) -> Result<VoucherSummary> {
    let vouchers = repo.list_vouchers(Default::default(), None, usize::MAX, 0)?;

    let mut summary = VoucherSummary {
        total_vouchers: vouchers.len(),
        active: 0,
        used: 0,
        inactive: 0,
        zero_balance: 0,
        assigned_to_seller: 0,
        total_initial_value: 0,
        total_balance: 0,
        total_used_value: 0,
    };

    for voucher in &vouchers {
        match voucher.status {
            VoucherStatus::Active => summary.active += 1,
            VoucherStatus::Used => summary.used += 1,
            VoucherStatus::Inactive => summary.inactive += 1,
        }
        if voucher.balance == 0 {
            summary.zero_balance += 1;
        }
        if voucher.has_seller() {
            summary.assigned_to_seller += 1;
        }
        summary.total_initial_value += voucher.initial_value;
        summary.total_balance += voucher.balance;
        summary.total_used_value += voucher.used_value();
    }

    Ok(summary)
}

/// Summarize redemption volume with a per-branch breakdown
pub fn transaction_summary(repo: &Repository) -> Result<TransactionSummary> {
    let transactions = repo.list_transactions(usize::MAX)?;

    let mut per_branch: Vec<BranchBreakdown> = Branch::ALL
        .iter()
        .map(|b| BranchBreakdown {
            branch: b.code().to_string(),
            transactions: 0,
            redeemed: 0,
        })
        .collect();

    let mut total_redeemed = 0i64;
    for transaction in &transactions {
        total_redeemed += transaction.used_amount;
        let slot = Branch::ALL
            .iter()
            .position(|b| *b == transaction.branch)
            .unwrap_or(0);
        per_branch[slot].transactions += 1;
        per_branch[slot].redeemed += transaction.used_amount;
    }

    let mean_redeemed = if transactions.is_empty() {
        0.0
    } else {
        total_redeemed as f64 / transactions.len() as f64
    };

    Ok(TransactionSummary {
        total_transactions: transactions.len(),
        total_redeemed,
        mean_redeemed,
        per_branch,
    })
}

/// Best-selling menu items, highest first. Ranked by the given branch's
/// counter, or by the combined total when no branch is given; items with
/// no sales under that ranking are omitted.
pub fn top_menu_items(
    repo: &Repository,
    branch: Option<Branch>,
    limit: usize,
) -> Result<Vec<TopMenuItem>> {
    let sold_key = |item: &TopMenuItem| match branch {
        Some(Branch::Sedati) => item.sold_sedati,
        Some(Branch::Tawangsari) => item.sold_twsari,
        None => item.total_sold,
    };

    let mut items: Vec<TopMenuItem> = repo
        .menu_items()?
        .into_iter()
        .map(|item| TopMenuItem {
            sold_sedati: item.terjual_sedati,
            sold_twsari: item.terjual_twsari,
            total_sold: item.total_sold(),
            nama_item: item.nama_item,
            kategori: item.kategori,
        })
        .filter(|item| sold_key(item) > 0)
        .collect();

    items.sort_by(|a, b| {
        sold_key(b)
            .cmp(&sold_key(a))
            .then_with(|| a.nama_item.cmp(&b.nama_item))
    });
    items.truncate(limit);

    Ok(items)
}

/// Per-seller assignment and redemption performance, heaviest carriers
/// first, ties broken by name
pub fn seller_summary(repo: &Repository) -> Result<Vec<SellerPerformance>> {
    let mut out = Vec::new();

    for seller in repo.list_sellers(None)? {
        let assigned = repo.vouchers_by_seller(&seller.nama_seller)?;
        let activated = assigned
            .iter()
            .filter(|v| v.status != VoucherStatus::Inactive)
            .count();
        let total_sold_value = assigned.iter().map(|v| v.used_value()).sum();

        out.push(SellerPerformance {
            nama_seller: seller.nama_seller,
            no_hp: seller.no_hp,
            status: seller.status,
            vouchers_assigned: assigned.len(),
            vouchers_activated: activated,
            total_sold_value,
        });
    }

    out.sort_by(|a, b| {
        b.vouchers_assigned
            .cmp(&a.vouchers_assigned)
            .then_with(|| a.nama_seller.cmp(&b.nama_seller))
    });

    Ok(out)
}

/// Export all vouchers as CSV, newest first
pub fn vouchers_csv(repo: &Repository) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "code",
        "initial_value",
        "balance",
        "created_at",
        "nama",
        "no_hp",
        "status",
        "seller",
        "tanggal_penjualan",
    ])?;

    for voucher in repo.list_vouchers(Default::default(), None, usize::MAX, 0)? {
        let row = [
            voucher.code.clone(),
            voucher.initial_value.to_string(),
            voucher.balance.to_string(),
            voucher.created_at.to_rfc3339(),
            voucher.nama.clone().unwrap_or_default(),
            voucher.no_hp.clone().unwrap_or_default(),
            voucher.status.code().to_string(),
            voucher.seller.clone().unwrap_or_default(),
            voucher
                .tanggal_penjualan
                .map(|d| d.to_string())
                .unwrap_or_default(),
        ];
        writer.write_record(&row)?;
    }

    finish(writer)
}

/// Export all transactions as CSV, newest first
pub fn transactions_csv(repo: &Repository) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "code",
        "used_amount",
        "tanggal_transaksi",
        "branch",
        "items",
    ])?;

    for transaction in repo.list_transactions(usize::MAX)? {
        let row = [
            transaction.id.to_string(),
            transaction.code.clone(),
            transaction.used_amount.to_string(),
            transaction.tanggal_transaksi.to_rfc3339(),
            transaction.branch.code().to_string(),
            transaction.items.clone(),
        ];
        writer.write_record(&row)?;
    }

    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Encoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReportError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, VoucherLedger};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn create_test_ledger() -> (VoucherLedger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (VoucherLedger::open(config).unwrap(), temp_dir)
    }

    fn seed(ledger: &VoucherLedger) {
        let yesterday = Utc::now().date_naive() - Duration::days(1);

        ledger.repository().register_seller("Budi", "0812").unwrap();
        ledger.repository().accept_seller("Budi").unwrap();

        for code in ["PAW001", "PAW002", "PAW003"] {
            ledger.create_voucher(code, 100_000).unwrap();
        }
        assert!(ledger.repository().assign_seller("PAW001", "Budi", yesterday));
        assert!(ledger.repository().assign_seller("PAW002", "Budi", yesterday));
        assert!(ledger
            .repository()
            .update_voucher_detail("PAW001", "Siti", "0813", VoucherStatus::Active));
        assert!(ledger
            .repository()
            .update_voucher_detail("PAW002", "", "", VoucherStatus::Active));

        ledger
            .repository()
            .upsert_menu_item("Makanan", "Nasi Goreng", None, Some(15_000), Some(16_000))
            .unwrap();
        ledger
            .repository()
            .upsert_menu_item("Minuman", "Es Teh", None, Some(5_000), Some(5_000))
            .unwrap();

        ledger
            .redeem("PAW001", 40_000, Branch::Sedati, "Nasi Goreng x2, Es Teh x2")
            .unwrap();
        ledger
            .redeem("PAW002", 100_000, Branch::Tawangsari, "Es Teh x1")
            .unwrap();
    }

    #[test]
    fn test_voucher_summary() {
        let (ledger, _temp) = create_test_ledger();
        seed(&ledger);

        let summary = voucher_summary(ledger.repository()).unwrap();
        assert_eq!(summary.total_vouchers, 3);
        assert_eq!(summary.used, 2);
        assert_eq!(summary.inactive, 1);
        assert_eq!(summary.zero_balance, 1);
        assert_eq!(summary.assigned_to_seller, 2);
        assert_eq!(summary.total_initial_value, 300_000);
        assert_eq!(summary.total_balance, 160_000);
        assert_eq!(summary.total_used_value, 140_000);
    }

    #[test]
    fn test_transaction_summary_per_branch() {
        let (ledger, _temp) = create_test_ledger();
        seed(&ledger);

        let summary = transaction_summary(ledger.repository()).unwrap();
        assert_eq!(summary.total_transactions, 2);
        assert_eq!(summary.total_redeemed, 140_000);
        assert_eq!(summary.mean_redeemed, 70_000.0);

        let sedati = summary
            .per_branch
            .iter()
            .find(|b| b.branch == "Sedati")
            .unwrap();
        assert_eq!(sedati.transactions, 1);
        assert_eq!(sedati.redeemed, 40_000);

        let twsari = summary
            .per_branch
            .iter()
            .find(|b| b.branch == "Tawangsari")
            .unwrap();
        assert_eq!(twsari.redeemed, 100_000);
    }

    #[test]
    fn test_top_menu_items() {
        let (ledger, _temp) = create_test_ledger();
        seed(&ledger);
        ledger
            .repository()
            .upsert_menu_item("Makanan", "Sate", None, Some(20_000), None)
            .unwrap();

        let top = top_menu_items(ledger.repository(), None, 10).unwrap();
        // Es Teh sold 3 across branches, Nasi Goreng 2, Sate never
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].nama_item, "Es Teh");
        assert_eq!(top[0].total_sold, 3);
        assert_eq!(top[0].sold_twsari, 1);
        assert_eq!(top[1].nama_item, "Nasi Goreng");

        // Only Es Teh ever sold at Tawangsari
        let twsari = top_menu_items(ledger.repository(), Some(Branch::Tawangsari), 10).unwrap();
        assert_eq!(twsari.len(), 1);
        assert_eq!(twsari[0].nama_item, "Es Teh");
        assert_eq!(twsari[0].sold_twsari, 1);

        assert_eq!(top_menu_items(ledger.repository(), None, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_seller_summary() {
        let (ledger, _temp) = create_test_ledger();
        seed(&ledger);
        ledger.repository().register_seller("Agus", "0814").unwrap();

        let sellers = seller_summary(ledger.repository()).unwrap();
        assert_eq!(sellers.len(), 2);

        assert_eq!(sellers[0].nama_seller, "Budi");
        assert_eq!(sellers[0].vouchers_assigned, 2);
        assert_eq!(sellers[0].vouchers_activated, 2);
        assert_eq!(sellers[0].total_sold_value, 140_000);

        assert_eq!(sellers[1].nama_seller, "Agus");
        assert_eq!(sellers[1].vouchers_assigned, 0);
    }

    #[test]
    fn test_csv_exports() {
        let (ledger, _temp) = create_test_ledger();
        seed(&ledger);
        ledger
            .repository()
            .upsert_menu_item("Makanan", "Ayam Bakar, Pedas", None, Some(25_000), None)
            .unwrap();
        ledger
            .redeem("PAW001", 25_000, Branch::Sedati, "Ayam Bakar, Pedas x1")
            .unwrap();

        let vouchers = vouchers_csv(ledger.repository()).unwrap();
        let mut lines = vouchers.lines();
        assert_eq!(
            lines.next().unwrap(),
            "code,initial_value,balance,created_at,nama,no_hp,status,seller,tanggal_penjualan"
        );
        assert_eq!(vouchers.lines().count(), 4);
        assert!(vouchers.contains("PAW001"));
        assert!(vouchers.contains("Siti"));

        // A comma inside the items field stays quoted
        let transactions = transactions_csv(ledger.repository()).unwrap();
        assert_eq!(transactions.lines().count(), 4);
        assert!(transactions.contains("\"Ayam Bakar, Pedas x1\""));
    }
}
