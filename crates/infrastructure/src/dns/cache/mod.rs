mod key;
mod metrics;
mod record;
mod storage;

pub use key::CacheKey;
pub use metrics::{CacheMetrics, CacheMetricsSnapshot};
pub use record::CachedRecord;
pub use storage::{CacheUpdate, RecordCache, GOODBYE_GRACE_SECS};
