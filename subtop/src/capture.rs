use crate::storage::traffic::TrafficAggregator;
use anyhow::{anyhow, bail, Result};
use ipnet::Ipv4Net;
use log::{debug, info};
use pnet::datalink::{self, Channel::Ethernet, Config, DataLinkReceiver, NetworkInterface};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::Packet;
use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// What the capture side saw for one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Ipv4 {
        source: Ipv4Addr,
        destination: Ipv4Addr,
        length: u64,
    },
    /// A frame that is not a well-formed IPv4 packet.
    Unclassified,
    /// The read timed out with nothing captured.
    Idle,
}

/// Blocking packet source.
///
/// `Ok(None)` ends the stream, an error is fatal for the whole capture.
pub trait PacketSource: Send {
    fn next_observation(&mut self) -> Result<Option<Observation>>;
}

/// Reduce a raw Ethernet frame to the addresses and length the aggregator needs.
pub fn decode_frame(frame: &[u8]) -> Observation {
    let ethernet = match EthernetPacket::new(frame) {
        Some(ethernet) => ethernet,
        None => return Observation::Unclassified,
    };
    if ethernet.get_ethertype() != EtherTypes::Ipv4 {
        return Observation::Unclassified;
    }

    let payload = ethernet.payload();
    match Ipv4Packet::new(payload) {
        Some(ip) if is_well_formed(&ip, payload.len()) => Observation::Ipv4 {
            source: ip.get_source(),
            destination: ip.get_destination(),
            length: frame.len() as u64,
        },
        _ => Observation::Unclassified,
    }
}

// Header length in 32-bit words, total length covers the header and fits the capture.
fn is_well_formed(ip: &Ipv4Packet, captured: usize) -> bool {
    let header_bytes = ip.get_header_length() as usize * 4;
    let total_bytes = ip.get_total_length() as usize;
    ip.get_version() == 4
        && ip.get_header_length() >= 5
        && header_bytes <= captured
        && total_bytes >= header_bytes
        && total_bytes <= captured
}

/// Live capture on one interface through a pnet datalink channel
pub struct InterfaceSource {
    rx: Box<dyn DataLinkReceiver>,
}

impl InterfaceSource {
    pub fn open(iface: &str) -> Result<Self> {
        let interface = find_interface(iface)?;
        let config = Config {
            read_timeout: Some(Duration::from_secs(1)),
            read_buffer_size: 65536,
            promiscuous: true,
            ..Default::default()
        };

        match datalink::channel(&interface, config) {
            Ok(Ethernet(_tx, rx)) => {
                info!("Capturing on {}", interface.name);
                Ok(Self { rx })
            }
            Ok(_) => bail!("{}: unsupported interface type", interface.name),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => bail!(
                "Insufficient permissions to capture on {}, try running as root",
                interface.name
            ),
            Err(e) => Err(anyhow!("Failed to open capture on {}: {}", interface.name, e)),
        }
    }
}

impl PacketSource for InterfaceSource {
    fn next_observation(&mut self) -> Result<Option<Observation>> {
        match self.rx.next() {
            Ok(frame) => Ok(Some(decode_frame(frame))),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(Some(Observation::Idle))
            }
            Err(e) => Err(anyhow!("Packet capture failed: {}", e)),
        }
    }
}

pub fn find_interface(iface: &str) -> Result<NetworkInterface> {
    datalink::interfaces()
        .into_iter()
        .find(|interface| interface.name == iface)
        .ok_or_else(|| anyhow!("Network interface '{}' does not exist", iface))
}

/// Credit one IPv4 packet to the subnet hosts it touches.
///
/// A packet between two hosts of the subnet counts as outbound for the
/// sender and inbound for the receiver.
pub fn attribute_packet(
    aggregator: &TrafficAggregator,
    subnet: &Ipv4Net,
    source: Ipv4Addr,
    destination: Ipv4Addr,
    length: u64,
) {
    if subnet.contains(&source) {
        aggregator.record_outbound(&source.to_string(), length);
    }
    if subnet.contains(&destination) {
        aggregator.record_inbound(&destination.to_string(), length);
    }
}

/// Feed packets from `source` into `aggregator` until the stream ends or
/// `running` is cleared. Returns the number of IPv4 packets seen.
pub fn run_capture<S: PacketSource + ?Sized>(
    source: &mut S,
    subnet: &Ipv4Net,
    aggregator: &TrafficAggregator,
    running: &AtomicBool,
) -> Result<u64> {
    let mut packets = 0u64;

    while running.load(Ordering::SeqCst) {
        match source.next_observation()? {
            Some(Observation::Ipv4 {
                source,
                destination,
                length,
            }) => {
                attribute_packet(aggregator, subnet, source, destination, length);
                packets += 1;
            }
            Some(Observation::Unclassified) | Some(Observation::Idle) => {}
            None => {
                debug!("Capture stream ended");
                break;
            }
        }
    }

    Ok(packets)
}
