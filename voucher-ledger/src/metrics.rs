//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the voucher ledger.
//!
//! # Metrics
//!
//! - `voucher_redemptions_total` - Successful redemptions
//! - `voucher_redemption_failures_total` - Rejected redemption attempts
//! - `voucher_redeemed_amount_total` - Sum of redeemed amounts (rupiah)
//! - `voucher_redemption_duration_seconds` - Histogram of redemption latencies
//! - `vouchers_provisioned_total` - Vouchers created by provisioning
//! - `vouchers_activated_total` - Vouchers activated through a seller
//!
//! Each collector instance carries its own registry, so several ledgers can
//! coexist in one process.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Histogram, IntCounter,
    Registry,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Successful redemptions
    pub redemptions_total: IntCounter,

    /// Rejected redemption attempts
    pub redemption_failures_total: IntCounter,

    /// Sum of redeemed amounts in rupiah
    pub redeemed_amount_total: IntCounter,

    /// Redemption latency histogram
    pub redemption_duration: Histogram,

    /// Vouchers created by provisioning
    pub provisioned_total: IntCounter,

    /// Vouchers activated through a seller
    pub activated_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let redemptions_total = register_int_counter_with_registry!(
            "voucher_redemptions_total",
            "Successful redemptions",
            registry
        )?;

        let redemption_failures_total = register_int_counter_with_registry!(
            "voucher_redemption_failures_total",
            "Rejected redemption attempts",
            registry
        )?;

        let redeemed_amount_total = register_int_counter_with_registry!(
            "voucher_redeemed_amount_total",
            "Sum of redeemed amounts in rupiah",
            registry
        )?;

        let redemption_duration = register_histogram_with_registry!(
            "voucher_redemption_duration_seconds",
            "Histogram of redemption latencies",
            vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250],
            registry
        )?;

        let provisioned_total = register_int_counter_with_registry!(
            "vouchers_provisioned_total",
            "Vouchers created by provisioning",
            registry
        )?;

        let activated_total = register_int_counter_with_registry!(
            "vouchers_activated_total",
            "Vouchers activated through a seller",
            registry
        )?;

        Ok(Self {
            redemptions_total,
            redemption_failures_total,
            redeemed_amount_total,
            redemption_duration,
            provisioned_total,
            activated_total,
            registry,
        })
    }

    /// Record a committed redemption
    pub fn record_redemption(&self, amount: i64, duration_seconds: f64) {
        self.redemptions_total.inc();
        self.redeemed_amount_total.inc_by(amount.max(0) as u64);
        self.redemption_duration.observe(duration_seconds);
    }

    /// Record a rejected redemption attempt
    pub fn record_redemption_failure(&self) {
        self.redemption_failures_total.inc();
    }

    /// Record provisioned vouchers
    pub fn record_provisioned(&self, count: u64) {
        self.provisioned_total.inc_by(count);
    }

    /// Record a seller-side activation
    pub fn record_activation(&self) {
        self.activated_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
