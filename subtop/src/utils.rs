pub mod format_utils {
    use subtop_common::ByteSize;

    // Convert rate to human-readable format
    pub fn format_rate(bytes_per_sec: u64) -> String {
        format!("{}/s", ByteSize::from(bytes_per_sec))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_format_rate() {
            assert_eq!(format_rate(0), "0.00 B/s");
            assert_eq!(format_rate(300), "300.00 B/s");
            assert_eq!(format_rate(1536), "1.50 KiB/s");
            assert_eq!(format_rate(1_048_576), "1.00 MiB/s");
        }
    }
}

pub mod network_utils {
    use crate::capture::find_interface;
    use ipnet::Ipv4Net;

    // Parse the monitored subnet, host bits are allowed ("192.168.1.7/24")
    pub fn parse_subnet(value: &str) -> Result<Ipv4Net, String> {
        value
            .trim()
            .parse::<Ipv4Net>()
            .map_err(|e| format!("'{}' is not an IPv4 subnet in CIDR notation: {}", value, e))
    }

    // Get the addresses configured on an interface, for diagnostics
    pub fn get_interface_addresses(iface: &str) -> Vec<String> {
        find_interface(iface)
            .map(|interface| interface.ips.iter().map(|ip| ip.to_string()).collect())
            .unwrap_or_default()
    }

}
