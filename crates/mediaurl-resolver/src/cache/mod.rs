//! Two-tier signed URL cache.
//!
//! ## Cache Hierarchy
//!
//! ```text
//! resolve → L1 (DashMap) → L2 (Redis, deadline-bounded) → Signer
//!              ↓                ↓                            ↓
//!          <1µs latency    ~1-5ms latency             network round trip
//! ```
//!
//! Both tiers apply the same safety buffer: an entry expiring within it is
//! never served, wherever it was found.
//!
//! ## Graceful Degradation
//!
//! If Redis is unavailable or disabled, the resolver runs in L1-only mode
//! (local cache per instance). Errors from L2 are logged and counted but
//! never fail a resolution.

pub mod distributed;
pub mod local;
pub mod redis;

pub use distributed::DistributedTier;
pub use local::{LocalCache, LocalCacheStats};
pub use redis::RedisDistributedCache;
