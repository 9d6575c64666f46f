pub mod traffic;

use crate::storage::traffic::TrafficAggregator;
use std::sync::Arc;
use std::time::Duration;

/// Number of hosts shown per frame.
pub const TOP_N: usize = 5;

/// Traffic reporting context
#[derive(Debug, Clone)]
pub struct TrafficModuleContext {
    pub interval_seconds: u64,
    pub aggregator: Arc<TrafficAggregator>,
}

impl TrafficModuleContext {
    /// `interval_seconds` must be non-zero, rates are divided by it.
    pub fn new(interval_seconds: u64, aggregator: Arc<TrafficAggregator>) -> Self {
        Self {
            interval_seconds,
            aggregator,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}
