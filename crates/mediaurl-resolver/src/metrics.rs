//! Metrics for signed URL resolution.
//!
//! Counters are emitted through the `metrics` facade. Installing a recorder
//! (Prometheus or otherwise) is left to the embedding process; without one
//! these calls are no-ops.

use mediaurl_storage::ErrorCategory;
use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "signed_url_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "signed_url_cache_misses_total";
    pub const SIGN_TOTAL: &str = "signed_url_sign_total";
    pub const SIGN_ERRORS_TOTAL: &str = "signed_url_sign_errors_total";
    pub const DISTRIBUTED_ERRORS_TOTAL: &str = "signed_url_distributed_errors_total";
    pub const DISTRIBUTED_TIMEOUTS_TOTAL: &str = "signed_url_distributed_timeouts_total";
    pub const BACKGROUND_WRITES_DROPPED_TOTAL: &str = "signed_url_background_writes_dropped_total";
    pub const BACKGROUND_WRITES_FAILED_TOTAL: &str = "signed_url_background_writes_failed_total";
    pub const BATCH_FALLBACKS_TOTAL: &str = "signed_url_batch_fallbacks_total";
}

// =============================================================================
// Cache Metrics
// =============================================================================

/// Record a cache hit in the given tier ("local" or "distributed").
pub fn record_cache_hit(tier: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "tier" => tier).increment(1);
}

/// Record `count` lookups that missed both tiers.
pub fn record_cache_miss(count: u64) {
    counter!(names::CACHE_MISSES_TOTAL).increment(count);
}

// =============================================================================
// Signer Metrics
// =============================================================================

pub fn record_sign(variant: &'static str) {
    counter!(names::SIGN_TOTAL, "variant" => variant).increment(1);
}

pub fn record_sign_error(category: String) {
    counter!(names::SIGN_ERRORS_TOTAL, "category" => category).increment(1);
}

// =============================================================================
// Distributed Tier Metrics
// =============================================================================

pub fn record_distributed_error(operation: &'static str, category: ErrorCategory) {
    counter!(
        names::DISTRIBUTED_ERRORS_TOTAL,
        "operation" => operation,
        "category" => category.to_string()
    )
    .increment(1);
}

pub fn record_distributed_timeout() {
    counter!(names::DISTRIBUTED_TIMEOUTS_TOTAL).increment(1);
}

// =============================================================================
// Background Writer Metrics
// =============================================================================

pub fn record_background_dropped(label: &'static str) {
    counter!(names::BACKGROUND_WRITES_DROPPED_TOTAL, "label" => label).increment(1);
}

pub fn record_background_failed(label: &'static str) {
    counter!(names::BACKGROUND_WRITES_FAILED_TOTAL, "label" => label).increment(1);
}

pub fn record_batch_fallback() {
    counter!(names::BATCH_FALLBACKS_TOTAL).increment(1);
}
