//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `vouchers` - Voucher records (key: code)
//! - `voucher_created_idx` - Creation-time listing index
//!   (key: inverted created_at nanos || code, value: code)
//! - `transactions` - Append-only redemption log (key: big-endian id)
//! - `menu_items` - Menu rows with sold counters (key: nama_item)
//! - `sellers` - Seller registry (key: nama_seller)
//!
//! The store emulates row-level pessimistic locking with an in-process
//! per-key lock table; every writer of a voucher or menu row must go
//! through it. Multi-row mutations commit through a single `WriteBatch`,
//! so a failed operation leaves no partial state.

use crate::{
    error::{Error, Result},
    types::{MenuItem, Seller, Transaction, Voucher},
    Config,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, IteratorMode, Options,
    WriteBatch, DB,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Column family names
const CF_VOUCHERS: &str = "vouchers";
const CF_VOUCHER_CREATED_IDX: &str = "voucher_created_idx";
const CF_TRANSACTIONS: &str = "transactions";
const CF_MENU_ITEMS: &str = "menu_items";
const CF_SELLERS: &str = "sellers";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    next_transaction_id: AtomicU64,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Storage {
    /// Open or create the database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_level_zero_file_num_compaction_trigger(
            config.rocksdb.level0_file_num_compaction_trigger,
        );

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_VOUCHERS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_VOUCHER_CREATED_IDX, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_MENU_ITEMS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_SELLERS, Self::cf_options_records()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let storage = Self {
            db: Arc::new(db),
            next_transaction_id: AtomicU64::new(1),
            locks: DashMap::new(),
        };

        // Re-seed the transaction id counter from the highest existing key
        let last_id = storage.last_transaction_id()?;
        storage
            .next_transaction_id
            .store(last_id + 1, Ordering::SeqCst);

        tracing::info!(
            path = %path.display(),
            next_transaction_id = last_id + 1,
            "Opened RocksDB voucher store"
        );

        Ok(storage)
    }

    // Column family options

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Lock table
    //
    // Locks are never evicted; the table is bounded by the voucher and menu
    // cardinality of one store.

    fn lock_entry(&self, key: String) -> Arc<Mutex<()>> {
        self.locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Exclusive per-voucher lock. All writers of a voucher row must hold it.
    pub fn voucher_lock(&self, code: &str) -> Arc<Mutex<()>> {
        self.lock_entry(format!("voucher/{}", code))
    }

    /// Exclusive per-menu-item lock. Counter writers must hold it.
    pub fn menu_lock(&self, nama_item: &str) -> Arc<Mutex<()>> {
        self.lock_entry(format!("menu/{}", nama_item))
    }

    // Voucher operations

    /// Insert a new voucher together with its creation-index entry (atomic)
    pub fn insert_voucher(&self, voucher: &Voucher) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_vouchers = self.cf_handle(CF_VOUCHERS)?;
        batch.put_cf(&cf_vouchers, voucher.code.as_bytes(), bincode::serialize(voucher)?);

        let cf_idx = self.cf_handle(CF_VOUCHER_CREATED_IDX)?;
        let idx_key = Self::index_key_created(voucher);
        batch.put_cf(&cf_idx, &idx_key, voucher.code.as_bytes());

        self.db.write(batch)?;

        tracing::debug!(code = %voucher.code, "Voucher inserted");
        Ok(())
    }

    /// Overwrite an existing voucher record. The creation index is keyed by
    /// the immutable `created_at`, so updates do not touch it.
    pub fn put_voucher(&self, voucher: &Voucher) -> Result<()> {
        let cf = self.cf_handle(CF_VOUCHERS)?;
        self.db
            .put_cf(&cf, voucher.code.as_bytes(), bincode::serialize(voucher)?)?;
        Ok(())
    }

    /// Get a voucher by exact code
    pub fn get_voucher(&self, code: &str) -> Result<Option<Voucher>> {
        let cf = self.cf_handle(CF_VOUCHERS)?;
        match self.db.get_cf(&cf, code.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Iterate vouchers in creation-time-descending order
    pub fn iter_vouchers_newest_first(
        &self,
    ) -> Result<impl Iterator<Item = Result<Voucher>> + '_> {
        let cf_idx = self.cf_handle(CF_VOUCHER_CREATED_IDX)?;
        let iter = self.db.iterator_cf(&cf_idx, IteratorMode::Start);

        Ok(iter.map(move |item| -> Result<Voucher> {
            let (_, value) = item?;
            let code = String::from_utf8_lossy(&value).into_owned();
            self.get_voucher(&code)?
                .ok_or_else(|| Error::Storage(format!("Dangling index entry for {}", code)))
        }))
    }

    // Transaction operations

    /// Allocate the next monotonic transaction id
    pub fn allocate_transaction_id(&self) -> u64 {
        self.next_transaction_id.fetch_add(1, Ordering::SeqCst)
    }

    fn last_transaction_id(&self) -> Result<u64> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let mut iter = self.db.iterator_cf(&cf, IteratorMode::End);

        if let Some(item) = iter.next() {
            let (key, _) = item?;
            let bytes: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Malformed transaction key".to_string()))?;
            return Ok(u64::from_be_bytes(bytes));
        }

        Ok(0)
    }

    /// Get a transaction by id
    pub fn get_transaction(&self, id: u64) -> Result<Option<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        match self.db.get_cf(&cf, id.to_be_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Iterate transactions newest first (descending id order)
    pub fn iter_transactions_newest_first(
        &self,
    ) -> Result<impl Iterator<Item = Result<Transaction>> + '_> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let iter = self.db.iterator_cf(&cf, IteratorMode::End);

        Ok(iter.map(|item| -> Result<Transaction> {
            let (_, value) = item?;
            Ok(bincode::deserialize(&value)?)
        }))
    }

    // Menu operations

    /// Get a menu item by name
    pub fn get_menu_item(&self, nama_item: &str) -> Result<Option<MenuItem>> {
        let cf = self.cf_handle(CF_MENU_ITEMS)?;
        match self.db.get_cf(&cf, nama_item.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Create or replace a menu item
    pub fn put_menu_item(&self, item: &MenuItem) -> Result<()> {
        let cf = self.cf_handle(CF_MENU_ITEMS)?;
        self.db
            .put_cf(&cf, item.nama_item.as_bytes(), bincode::serialize(item)?)?;
        Ok(())
    }

    /// All menu items, name-ascending (key order)
    pub fn list_menu_items(&self) -> Result<Vec<MenuItem>> {
        let cf = self.cf_handle(CF_MENU_ITEMS)?;
        let iter = self.db.iterator_cf(&cf, IteratorMode::Start);

        let mut items = Vec::new();
        for item in iter {
            let (_, value) = item?;
            items.push(bincode::deserialize(&value)?);
        }
        Ok(items)
    }

    // Seller operations

    /// Get a seller by name
    pub fn get_seller(&self, nama_seller: &str) -> Result<Option<Seller>> {
        let cf = self.cf_handle(CF_SELLERS)?;
        match self.db.get_cf(&cf, nama_seller.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Create or replace a seller row
    pub fn put_seller(&self, seller: &Seller) -> Result<()> {
        let cf = self.cf_handle(CF_SELLERS)?;
        self.db
            .put_cf(&cf, seller.nama_seller.as_bytes(), bincode::serialize(seller)?)?;
        Ok(())
    }

    /// Delete a seller row
    pub fn delete_seller(&self, nama_seller: &str) -> Result<()> {
        let cf = self.cf_handle(CF_SELLERS)?;
        self.db.delete_cf(&cf, nama_seller.as_bytes())?;
        Ok(())
    }

    /// All sellers, name-ascending (key order)
    pub fn list_sellers(&self) -> Result<Vec<Seller>> {
        let cf = self.cf_handle(CF_SELLERS)?;
        let iter = self.db.iterator_cf(&cf, IteratorMode::Start);

        let mut sellers = Vec::new();
        for item in iter {
            let (_, value) = item?;
            sellers.push(bincode::deserialize(&value)?);
        }
        Ok(sellers)
    }

    // Batch operations (atomic)

    /// Commit one redemption: voucher update, transaction append, and
    /// counter updates in a single atomic write
    pub fn commit_redemption(
        &self,
        voucher: &Voucher,
        transaction: &Transaction,
        touched_items: &[MenuItem],
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        // 1. Voucher
        let cf_vouchers = self.cf_handle(CF_VOUCHERS)?;
        batch.put_cf(&cf_vouchers, voucher.code.as_bytes(), bincode::serialize(voucher)?);

        // 2. Transaction row
        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;
        batch.put_cf(
            &cf_transactions,
            transaction.id.to_be_bytes(),
            bincode::serialize(transaction)?,
        );

        // 3. Counter updates
        let cf_menu = self.cf_handle(CF_MENU_ITEMS)?;
        for item in touched_items {
            batch.put_cf(&cf_menu, item.nama_item.as_bytes(), bincode::serialize(item)?);
        }

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(
            code = %voucher.code,
            transaction_id = transaction.id,
            items_touched = touched_items.len(),
            "Redemption committed"
        );

        Ok(())
    }

    // Statistics

    /// Get storage statistics (approximate, fast)
    pub fn get_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            total_vouchers: self.approximate_count(CF_VOUCHERS)?,
            total_transactions: self.approximate_count(CF_TRANSACTIONS)?,
            total_menu_items: self.approximate_count(CF_MENU_ITEMS)?,
            total_sellers: self.approximate_count(CF_SELLERS)?,
        })
    }

    fn approximate_count(&self, cf_name: &str) -> Result<u64> {
        let cf = self.cf_handle(cf_name)?;
        let prop = self
            .db
            .property_int_value_cf(&cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);
        Ok(prop)
    }

    // Index key helpers

    /// Creation index key: inverted timestamp so that ascending key order is
    /// creation-time-descending; the code suffix disambiguates ties.
    fn index_key_created(voucher: &Voucher) -> Vec<u8> {
        let nanos = voucher.created_at.timestamp_nanos_opt().unwrap_or(0).max(0) as u64;
        let mut key = (u64::MAX - nanos).to_be_bytes().to_vec();
        key.extend_from_slice(voucher.code.as_bytes());
        key
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate voucher count
    pub total_vouchers: u64,
    /// Approximate transaction count
    pub total_transactions: u64,
    /// Approximate menu item count
    pub total_menu_items: u64,
    /// Approximate seller count
    pub total_sellers: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Branch, SellerStatus, VoucherStatus};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    fn test_voucher(code: &str) -> Voucher {
        Voucher {
            code: code.to_string(),
            initial_value: 100_000,
            balance: 100_000,
            created_at: Utc::now(),
            nama: None,
            no_hp: None,
            status: VoucherStatus::Inactive,
            seller: None,
            tanggal_penjualan: None,
        }
    }

    fn test_menu_item(name: &str) -> MenuItem {
        MenuItem {
            kategori: "Makanan".to_string(),
            nama_item: name.to_string(),
            keterangan: None,
            harga_sedati: Some(15_000),
            harga_twsari: Some(16_000),
            terjual_sedati: 0,
            terjual_twsari: 0,
        }
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        assert!(storage.db.cf_handle(CF_VOUCHERS).is_some());
        assert!(storage.db.cf_handle(CF_TRANSACTIONS).is_some());
        assert!(storage.db.cf_handle(CF_SELLERS).is_some());
    }

    #[test]
    fn test_insert_and_get_voucher() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let voucher = test_voucher("ABC123");
        storage.insert_voucher(&voucher).unwrap();

        let retrieved = storage.get_voucher("ABC123").unwrap().unwrap();
        assert_eq!(retrieved, voucher);
        assert!(storage.get_voucher("MISSING").unwrap().is_none());
    }

    #[test]
    fn test_vouchers_listed_newest_first() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let base = Utc::now();
        for (i, code) in ["OLD111", "MID222", "NEW333"].iter().enumerate() {
            let mut voucher = test_voucher(code);
            voucher.created_at = base + Duration::seconds(i as i64);
            storage.insert_voucher(&voucher).unwrap();
        }

        let codes: Vec<String> = storage
            .iter_vouchers_newest_first()
            .unwrap()
            .map(|v| v.unwrap().code)
            .collect();
        assert_eq!(codes, vec!["NEW333", "MID222", "OLD111"]);
    }

    #[test]
    fn test_commit_redemption_is_atomic_and_visible() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let mut voucher = test_voucher("ABC123");
        storage.insert_voucher(&voucher).unwrap();
        storage.put_menu_item(&test_menu_item("Nasi Goreng")).unwrap();

        voucher.balance = 60_000;
        voucher.status = VoucherStatus::Used;

        let transaction = Transaction {
            id: storage.allocate_transaction_id(),
            code: "ABC123".to_string(),
            used_amount: 40_000,
            tanggal_transaksi: Utc::now(),
            branch: Branch::Sedati,
            items: "Nasi Goreng x2".to_string(),
        };

        let mut item = storage.get_menu_item("Nasi Goreng").unwrap().unwrap();
        item.add_sold(Branch::Sedati, 2);

        storage
            .commit_redemption(&voucher, &transaction, &[item])
            .unwrap();

        assert_eq!(storage.get_voucher("ABC123").unwrap().unwrap().balance, 60_000);
        assert_eq!(
            storage.get_transaction(transaction.id).unwrap().unwrap().used_amount,
            40_000
        );
        assert_eq!(
            storage
                .get_menu_item("Nasi Goreng")
                .unwrap()
                .unwrap()
                .terjual_sedati,
            2
        );
    }

    #[test]
    fn test_transaction_id_reseeds_after_reopen() {
        let (config, _temp) = test_config();

        let first_id = {
            let storage = Storage::open(&config).unwrap();
            let voucher = test_voucher("ABC123");
            storage.insert_voucher(&voucher).unwrap();

            let id = storage.allocate_transaction_id();
            let transaction = Transaction {
                id,
                code: "ABC123".to_string(),
                used_amount: 10_000,
                tanggal_transaksi: Utc::now(),
                branch: Branch::Tawangsari,
                items: String::new(),
            };
            storage
                .commit_redemption(&voucher, &transaction, &[])
                .unwrap();
            id
        };

        let storage = Storage::open(&config).unwrap();
        let next = storage.allocate_transaction_id();
        assert!(next > first_id);
    }

    #[test]
    fn test_transactions_listed_newest_first() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let voucher = test_voucher("ABC123");
        storage.insert_voucher(&voucher).unwrap();

        for amount in [10_000, 20_000, 30_000] {
            let transaction = Transaction {
                id: storage.allocate_transaction_id(),
                code: "ABC123".to_string(),
                used_amount: amount,
                tanggal_transaksi: Utc::now(),
                branch: Branch::Sedati,
                items: String::new(),
            };
            storage
                .commit_redemption(&voucher, &transaction, &[])
                .unwrap();
        }

        let amounts: Vec<i64> = storage
            .iter_transactions_newest_first()
            .unwrap()
            .map(|t| t.unwrap().used_amount)
            .collect();
        assert_eq!(amounts, vec![30_000, 20_000, 10_000]);
    }

    #[test]
    fn test_seller_round_trip_and_ordering() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        for name in ["Citra", "Agus", "Budi"] {
            storage
                .put_seller(&Seller {
                    nama_seller: name.to_string(),
                    no_hp: "0812".to_string(),
                    status: SellerStatus::Pending,
                })
                .unwrap();
        }

        let names: Vec<String> = storage
            .list_sellers()
            .unwrap()
            .into_iter()
            .map(|s| s.nama_seller)
            .collect();
        assert_eq!(names, vec!["Agus", "Budi", "Citra"]);

        storage.delete_seller("Budi").unwrap();
        assert!(storage.get_seller("Budi").unwrap().is_none());
        assert_eq!(storage.list_sellers().unwrap().len(), 2);
    }

    #[test]
    fn test_voucher_lock_is_shared_per_code() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let a = storage.voucher_lock("ABC123");
        let b = storage.voucher_lock("ABC123");
        let other = storage.voucher_lock("XYZ999");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
