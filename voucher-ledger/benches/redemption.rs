//! Redemption path benchmarks.
//!
//! The redeem benchmark measures the full locked read-modify-write cycle
//! including the transaction append and menu counter updates. The read
//! benchmarks measure the eligibility gate and the paged listing as the
//! voucher set grows.

#![allow(missing_docs, clippy::expect_used)]

use std::{hint::black_box, time::Duration};

use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;
use voucher_ledger::{
    order::parse_item_summary, Branch, Config, VoucherFilter, VoucherLedger, VoucherStatus,
};

fn bench_ledger() -> (VoucherLedger, TempDir) {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();

    (VoucherLedger::open(config).expect("open ledger"), temp_dir)
}

/// Seed an active voucher that is past the cooling period.
fn seed_redeemable(ledger: &VoucherLedger, code: &str, initial_value: i64) {
    ledger
        .create_voucher(code, initial_value)
        .expect("create voucher");
    let yesterday = Utc::now()
        .date_naive()
        .pred_opt()
        .expect("previous day exists");
    assert!(ledger.repository().assign_seller(code, "Budi", yesterday));
    assert!(ledger
        .repository()
        .update_voucher_detail(code, "", "", VoucherStatus::Active));
}

fn seed_menu(ledger: &VoucherLedger) {
    let repo = ledger.repository();
    repo.upsert_menu_item("Makanan", "Nasi Goreng", None, Some(15_000), Some(16_000))
        .expect("upsert item");
    repo.upsert_menu_item("Minuman", "Es Teh", None, Some(5_000), Some(5_000))
        .expect("upsert item");
}

/// One committed redemption per iteration, counters included. The seeded
/// balance is large enough that the benchmark never runs the voucher dry.
fn bench_redeem(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger/redeem");
    group.throughput(Throughput::Elements(1));

    let (ledger, _temp) = bench_ledger();
    seed_menu(&ledger);
    seed_redeemable(&ledger, "BENCH001", 1_000_000_000_000);

    group.bench_function("with_counters", |b| {
        b.iter(|| {
            let receipt = ledger
                .redeem("BENCH001", 1_000, Branch::Sedati, "Nasi Goreng x2, Es Teh x1")
                .expect("redeem");
            black_box(receipt)
        });
    });

    group.finish();
}

/// Eligibility gate (point lookup plus status and date checks) as the
/// voucher column family grows.
fn bench_eligibility(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger/eligibility");
    group.throughput(Throughput::Elements(1));

    for voucher_count in [1_000usize, 10_000] {
        let (ledger, _temp) = bench_ledger();
        ledger
            .provision_vouchers(voucher_count, 100_000, "PAW")
            .expect("provision batch");
        seed_redeemable(&ledger, "ELIG0001", 100_000);
        let today = Utc::now().date_naive();

        group.bench_with_input(
            BenchmarkId::from_parameter(voucher_count),
            &voucher_count,
            |b, _| {
                b.iter(|| {
                    let result = ledger.check_eligibility("ELIG0001", today);
                    black_box(result)
                });
            },
        );
    }

    group.finish();
}

/// First page of the newest-first voucher listing over 10k vouchers.
fn bench_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger/list_page");
    group.throughput(Throughput::Elements(50));

    let (ledger, _temp) = bench_ledger();
    ledger
        .provision_vouchers(10_000, 100_000, "PAW")
        .expect("provision batch");

    group.bench_function("10k_vouchers", |b| {
        b.iter(|| {
            let page = ledger
                .repository()
                .list_vouchers(VoucherFilter::Any, None, 50, 0);
            black_box(page)
        });
    });

    group.finish();
}

/// Parsing the stored item summary, the hot string path of every redemption.
fn bench_summary_parsing(c: &mut Criterion) {
    let summary = "Nasi Goreng x2, Es Teh x1, Ayam Bakar x1, Sate x3, Es Jeruk x2";

    c.bench_function("order/parse_summary", |b| {
        b.iter(|| black_box(parse_item_summary(black_box(summary))));
    });
}

criterion_group! {
    name = write_benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(50);
    targets = bench_redeem
}

criterion_group! {
    name = read_benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_eligibility, bench_listing, bench_summary_parsing
}

criterion_main!(write_benches, read_benches);
