use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use subtop_common::TrafficRecord;

/// Live aggregation table for one window.
///
/// Records are kept in first-seen order and `index` maps an address to its
/// slot, so a drained window comes out in encounter order.
#[derive(Debug, Default)]
struct AggregationTable {
    index: HashMap<String, usize>,
    records: Vec<TrafficRecord>,
}

impl AggregationTable {
    fn record_mut(&mut self, address: &str) -> &mut TrafficRecord {
        let slot = match self.index.get(address) {
            Some(slot) => *slot,
            None => {
                let slot = self.records.len();
                self.records.push(TrafficRecord::new(address.to_string()));
                self.index.insert(address.to_string(), slot);
                slot
            }
        };
        &mut self.records[slot]
    }
}

/// Per-address inbound/outbound byte counters shared between the capture
/// thread and the reporter.
///
/// One mutex guards the whole table. Increments are a single map lookup and
/// a drain is a pointer swap, so neither side holds the lock for long.
#[derive(Debug, Default)]
pub struct TrafficAggregator {
    table: Mutex<AggregationTable>,
}

impl TrafficAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    // Counters are plain integers, a panic elsewhere cannot leave them torn.
    fn lock(&self) -> MutexGuard<'_, AggregationTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add `bytes` to the inbound counter of `address`.
    pub fn record_inbound(&self, address: &str, bytes: u64) {
        let mut table = self.lock();
        let record = table.record_mut(address);
        record.inbound_bytes = record.inbound_bytes.saturating_add(bytes);
    }

    /// Add `bytes` to the outbound counter of `address`.
    pub fn record_outbound(&self, address: &str, bytes: u64) {
        let mut table = self.lock();
        let record = table.record_mut(address);
        record.outbound_bytes = record.outbound_bytes.saturating_add(bytes);
    }

    /// Take the current window and start a new, empty one.
    ///
    /// The returned records belong to the caller; increments that arrive
    /// after the swap land in the next window.
    pub fn drain_and_reset(&self) -> Vec<TrafficRecord> {
        let drained = std::mem::take(&mut *self.lock());
        drained.records
    }

    /// Number of addresses seen in the current window.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
