#![no_std]

extern crate alloc;

use alloc::string::String;
use core::fmt;

/// Byte counters for one address within the current reporting window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficRecord {
    pub address: String,
    pub inbound_bytes: u64,  // bytes addressed to the host
    pub outbound_bytes: u64, // bytes sent by the host
}

impl TrafficRecord {
    pub fn new(address: String) -> Self {
        Self {
            address,
            inbound_bytes: 0,
            outbound_bytes: 0,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.inbound_bytes.saturating_add(self.outbound_bytes)
    }
}

/// A drained record paired with the total it is ranked by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub record: TrafficRecord,
    pub total: u64,
}

impl From<TrafficRecord> for RankedEntry {
    fn from(record: TrafficRecord) -> Self {
        let total = record.total_bytes();
        Self { record, total }
    }
}

const KIB: f64 = 1024.0;

// Largest first, the first threshold the value reaches wins.
const UNITS: [(f64, &str); 8] = [
    (KIB * KIB * KIB * KIB * KIB * KIB * KIB * KIB, "YiB"),
    (KIB * KIB * KIB * KIB * KIB * KIB * KIB, "ZiB"),
    (KIB * KIB * KIB * KIB * KIB * KIB, "EiB"),
    (KIB * KIB * KIB * KIB * KIB, "PiB"),
    (KIB * KIB * KIB * KIB, "TiB"),
    (KIB * KIB * KIB, "GiB"),
    (KIB * KIB, "MiB"),
    (KIB, "KiB"),
];

/// Human readable byte count using binary (1024-based) prefixes.
///
/// Always prints two decimals: `ByteSize(1536.0)` renders as `1.50 KiB`,
/// anything below 1024 stays in plain bytes.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ByteSize(pub f64);

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        ByteSize(bytes as f64)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (threshold, suffix) in UNITS {
            if self.0 >= threshold {
                return write!(f, "{:.2} {}", self.0 / threshold, suffix);
            }
        }
        write!(f, "{:.2} B", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::ToString;

    #[test]
    fn test_byte_size_plain_bytes() {
        assert_eq!(ByteSize::from(0).to_string(), "0.00 B");
        assert_eq!(ByteSize::from(300).to_string(), "300.00 B");
        assert_eq!(ByteSize::from(1023).to_string(), "1023.00 B");
    }

    #[test]
    fn test_byte_size_thresholds() {
        assert_eq!(ByteSize::from(1024).to_string(), "1.00 KiB");
        assert_eq!(ByteSize::from(1536).to_string(), "1.50 KiB");
        assert_eq!(ByteSize::from(1_048_576).to_string(), "1.00 MiB");
        assert_eq!(ByteSize::from(1u64 << 30).to_string(), "1.00 GiB");
        assert_eq!(ByteSize::from(1u64 << 40).to_string(), "1.00 TiB");
        assert_eq!(ByteSize::from(1u64 << 50).to_string(), "1.00 PiB");
        assert_eq!(ByteSize::from(1u64 << 60).to_string(), "1.00 EiB");
    }

    #[test]
    fn test_byte_size_beyond_u64() {
        let zib = KIB * KIB * KIB * KIB * KIB * KIB * KIB;
        assert_eq!(ByteSize(zib * 3.0).to_string(), "3.00 ZiB");
        assert_eq!(ByteSize(zib * 2048.0).to_string(), "2.00 YiB");
    }

    #[test]
    fn test_byte_size_in_format_string() {
        let line = format!("D: {}/s", ByteSize::from(2560));
        assert_eq!(line, "D: 2.50 KiB/s");
    }

    #[test]
    fn test_ranked_entry_total() {
        let mut record = TrafficRecord::new("10.0.0.1".to_string());
        record.inbound_bytes = 50;
        record.outbound_bytes = 70;
        let entry = RankedEntry::from(record);
        assert_eq!(entry.total, 120);
        assert_eq!(entry.record.address, "10.0.0.1");
    }
}
