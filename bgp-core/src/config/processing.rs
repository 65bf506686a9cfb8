//! Background processing schedules.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Delay between automatic reconciliation cycles.
    pub interval: Duration,
    /// How many recent provider transactions one cycle fetches.
    pub fetch_limit: u32,
    /// Mirrored collections older than this are reported as stale.
    pub collection_freshness: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            fetch_limit: 50,
            collection_freshness: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Delivery attempts before an outbox row is abandoned.
    pub max_attempts: u32,
    /// How often the forwarder scans for due retries.
    pub retry_scan: Duration,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            retry_scan: Duration::from_secs(10),
        }
    }
}
