//! Read and administrative operations over the voucher store
//!
//! Listing, search, and count share one predicate so a page and its total
//! always agree. Administrative writes that the presentation layer treats
//! as best-effort (`update_voucher_detail`, `assign_seller`) report plain
//! booleans and log the failure detail; `false` always means "no state
//! changed". Everything else surfaces typed errors.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{
        Branch, MenuEntry, MenuItem, Seller, SellerStatus, Transaction, Voucher, VoucherFilter,
        VoucherStatus,
    },
};
use chrono::NaiveDate;
use std::sync::Arc;

/// Query and registry operations backed by shared storage
pub struct Repository {
    storage: Arc<Storage>,
}

impl Repository {
    /// Create a repository over shared storage
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    // Voucher queries

    /// Exact-match lookup on a stored (normalized) code
    pub fn find_voucher(&self, code: &str) -> Result<Voucher> {
        self.storage
            .get_voucher(code)?
            .ok_or_else(|| Error::VoucherNotFound(code.to_string()))
    }

    /// List vouchers newest-first with filter, code search, and pagination
    pub fn list_vouchers(
        &self,
        filter: VoucherFilter,
        search: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Voucher>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let needle = normalized_needle(search);
        let mut page = Vec::new();
        let mut skipped = 0usize;

        for voucher in self.storage.iter_vouchers_newest_first()? {
            let voucher = voucher?;
            if !matches(&voucher, filter, needle.as_deref()) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            page.push(voucher);
            if page.len() == limit {
                break;
            }
        }

        Ok(page)
    }

    /// Count vouchers matching the same predicate as [`Repository::list_vouchers`]
    pub fn count_vouchers(&self, filter: VoucherFilter, search: Option<&str>) -> Result<usize> {
        let needle = normalized_needle(search);
        let mut count = 0usize;

        for voucher in self.storage.iter_vouchers_newest_first()? {
            if matches(&voucher?, filter, needle.as_deref()) {
                count += 1;
            }
        }

        Ok(count)
    }

    /// Vouchers assigned to a seller, newest first
    pub fn vouchers_by_seller(&self, seller: &str) -> Result<Vec<Voucher>> {
        let needle = seller.trim();
        let mut out = Vec::new();

        for voucher in self.storage.iter_vouchers_newest_first()? {
            let voucher = voucher?;
            let assigned = voucher
                .seller
                .as_deref()
                .is_some_and(|s| s.trim().eq_ignore_ascii_case(needle));
            if assigned {
                out.push(voucher);
            }
        }

        Ok(out)
    }

    /// Vouchers with no seller yet, oldest first, capped at `limit`
    pub fn unassigned_vouchers(&self, limit: usize) -> Result<Vec<Voucher>> {
        let mut out = Vec::new();

        for voucher in self.storage.iter_vouchers_newest_first()? {
            let voucher = voucher?;
            if !voucher.has_seller() {
                out.push(voucher);
            }
        }

        out.reverse();
        out.truncate(limit);
        Ok(out)
    }

    // Transaction queries

    /// Most recent transactions, newest first
    pub fn list_transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        let mut out = Vec::new();

        for transaction in self.storage.iter_transactions_newest_first()?.take(limit) {
            out.push(transaction?);
        }

        Ok(out)
    }

    /// Full redemption history of one voucher, newest first
    pub fn transactions_for_voucher(&self, code: &str) -> Result<Vec<Transaction>> {
        let mut out = Vec::new();

        for transaction in self.storage.iter_transactions_newest_first()? {
            let transaction = transaction?;
            if transaction.code == code {
                out.push(transaction);
            }
        }

        Ok(out)
    }

    // Menu queries

    /// Menu for one branch: items priced at that branch, name-ascending
    pub fn get_menu(&self, branch: Branch) -> Result<Vec<MenuEntry>> {
        let entries = self
            .storage
            .list_menu_items()?
            .into_iter()
            .filter_map(|item| {
                item.price_for(branch).map(|price| MenuEntry {
                    name: item.nama_item.clone(),
                    price,
                    category: item.kategori.clone(),
                })
            })
            .collect();

        Ok(entries)
    }

    /// Full menu rows including both prices and sold counters
    pub fn menu_items(&self) -> Result<Vec<MenuItem>> {
        self.storage.list_menu_items()
    }

    /// Create or update a menu item. Sold counters of an existing row are
    /// preserved across the update.
    pub fn upsert_menu_item(
        &self,
        kategori: &str,
        nama_item: &str,
        keterangan: Option<&str>,
        harga_sedati: Option<i64>,
        harga_twsari: Option<i64>,
    ) -> Result<()> {
        let nama_item = nama_item.trim();
        let lock = self.storage.menu_lock(nama_item);
        let _guard = lock.lock();

        let (terjual_sedati, terjual_twsari) = match self.storage.get_menu_item(nama_item)? {
            Some(existing) => (existing.terjual_sedati, existing.terjual_twsari),
            None => (0, 0),
        };

        self.storage.put_menu_item(&MenuItem {
            kategori: kategori.trim().to_string(),
            nama_item: nama_item.to_string(),
            keterangan: keterangan
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            harga_sedati,
            harga_twsari,
            terjual_sedati,
            terjual_twsari,
        })
    }

    // Administrative voucher writes

    /// Administrative activation: overwrite buyer detail and status.
    ///
    /// Returns `false` (and logs the reason) on an unknown code or a store
    /// failure; in both cases no state has changed.
    pub fn update_voucher_detail(
        &self,
        code: &str,
        nama: &str,
        no_hp: &str,
        status: VoucherStatus,
    ) -> bool {
        let lock = self.storage.voucher_lock(code);
        let _guard = lock.lock();

        let mut voucher = match self.storage.get_voucher(code) {
            Ok(Some(voucher)) => voucher,
            Ok(None) => {
                tracing::warn!(code = %code, "Detail update targeted an unknown voucher");
                return false;
            }
            Err(e) => {
                tracing::error!(code = %code, error = %e, "Detail update failed to read voucher");
                return false;
            }
        };

        voucher.nama = non_empty(nama);
        voucher.no_hp = non_empty(no_hp);
        voucher.status = status;

        match self.storage.put_voucher(&voucher) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(code = %code, error = %e, "Detail update failed to write voucher");
                false
            }
        }
    }

    /// Provisioning step: set `seller` and `tanggal_penjualan` unconditionally.
    ///
    /// Calling it twice overwrites. Returns `false` (and logs the reason) on
    /// an unknown code or a store failure.
    pub fn assign_seller(&self, code: &str, seller: &str, sale_date: NaiveDate) -> bool {
        let lock = self.storage.voucher_lock(code);
        let _guard = lock.lock();

        let mut voucher = match self.storage.get_voucher(code) {
            Ok(Some(voucher)) => voucher,
            Ok(None) => {
                tracing::warn!(code = %code, "Seller assignment targeted an unknown voucher");
                return false;
            }
            Err(e) => {
                tracing::error!(code = %code, error = %e, "Seller assignment failed to read voucher");
                return false;
            }
        };

        voucher.seller = Some(seller.trim().to_string());
        voucher.tanggal_penjualan = Some(sale_date);

        match self.storage.put_voucher(&voucher) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(code = %code, error = %e, "Seller assignment failed to write voucher");
                false
            }
        }
    }

    // Seller registry

    /// Register a new seller in pending state
    pub fn register_seller(&self, nama: &str, no_hp: &str) -> Result<Seller> {
        let nama = nama.trim();

        if self.storage.get_seller(nama)?.is_some() {
            return Err(Error::SellerExists(nama.to_string()));
        }

        let seller = Seller {
            nama_seller: nama.to_string(),
            no_hp: no_hp.trim().to_string(),
            status: SellerStatus::Pending,
        };
        self.storage.put_seller(&seller)?;

        tracing::info!(seller = %seller.nama_seller, "Seller registered");
        Ok(seller)
    }

    /// Get one seller by exact name
    pub fn get_seller(&self, nama: &str) -> Result<Option<Seller>> {
        self.storage.get_seller(nama.trim())
    }

    /// Sellers in name-ascending order, optionally restricted to one status
    pub fn list_sellers(&self, status: Option<SellerStatus>) -> Result<Vec<Seller>> {
        let sellers = self
            .storage
            .list_sellers()?
            .into_iter()
            .filter(|s| status.map_or(true, |wanted| s.status == wanted))
            .collect();

        Ok(sellers)
    }

    /// Move a pending seller to accepted
    pub fn accept_seller(&self, nama: &str) -> Result<()> {
        let nama = nama.trim();
        let mut seller = self
            .storage
            .get_seller(nama)?
            .ok_or_else(|| Error::SellerNotFound(nama.to_string()))?;

        seller.status = SellerStatus::Accepted;
        self.storage.put_seller(&seller)?;

        tracing::info!(seller = %nama, "Seller accepted");
        Ok(())
    }

    /// Remove a seller from the registry. Vouchers already assigned to the
    /// seller keep their assignment.
    pub fn remove_seller(&self, nama: &str) -> Result<()> {
        let nama = nama.trim();

        if self.storage.get_seller(nama)?.is_none() {
            return Err(Error::SellerNotFound(nama.to_string()));
        }
        self.storage.delete_seller(nama)?;

        tracing::info!(seller = %nama, "Seller removed");
        Ok(())
    }
}

// Listing predicate shared by list and count

fn matches(voucher: &Voucher, filter: VoucherFilter, needle: Option<&str>) -> bool {
    if !filter.matches(voucher) {
        return false;
    }
    match needle {
        Some(needle) => voucher.code.to_uppercase().contains(needle),
        None => true,
    }
}

fn normalized_needle(search: Option<&str>) -> Option<String> {
    search
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
