use crate::capture::{find_interface, run_capture, InterfaceSource};
use crate::display::FrameRenderer;
use crate::monitor::traffic::TrafficMonitor;
use crate::monitor::TrafficModuleContext;
use crate::storage::traffic::TrafficAggregator;
use crate::system::log_startup_info;
use crate::utils::network_utils::parse_subnet;
use anyhow::Context;
use clap::{Args, Parser};
use ipnet::Ipv4Net;
use log::info;
use log::LevelFilter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;

/// Common arguments
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    #[clap(short = 'i', long, help = "Network interface to capture on (required)")]
    pub iface: String,

    #[clap(
        long,
        default_value = "info",
        value_parser = parse_log_level,
        help = "Log level for diagnostics written to stderr (off, error, warn, info, debug, trace)"
    )]
    pub log_level: LevelFilter,
}

/// Report arguments
#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[clap(
        short = 'n',
        long,
        default_value = "1",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Update interval in seconds"
    )]
    pub interval: u64,

    #[clap(
        value_parser = parse_subnet,
        help = "IPv4 subnet of the hosts to monitor, in CIDR notation (e.g. 192.168.1.0/24)"
    )]
    pub subnet: Ipv4Net,
}

#[derive(Debug, Parser, Clone)]
#[clap(name = "subtop")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Live top-5 per-host bandwidth for a subnet")]
pub struct Options {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[clap(flatten)]
    pub report: ReportArgs,
}

impl Options {
    /// Get iface from common args
    pub fn iface(&self) -> &str {
        &self.common.iface
    }

    /// Get log_level from common args
    pub fn log_level(&self) -> LevelFilter {
        self.common.log_level
    }

    /// Get interval from report args
    pub fn interval(&self) -> u64 {
        self.report.interval
    }

    /// Get subnet from report args
    pub fn subnet(&self) -> Ipv4Net {
        self.report.subnet
    }
}

fn parse_log_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse::<LevelFilter>()
        .map_err(|_| format!("unknown log level '{}'", value))
}

// Validate arguments
fn validate_arguments(opt: &Options) -> Result<(), anyhow::Error> {
    // Interval and subnet are range/format checked by clap
    find_interface(opt.iface())?;

    Ok(())
}

// Start capture on a blocking thread, it clears `running` and wakes the reporter when it ends
fn start_capture_task(
    mut source: InterfaceSource,
    subnet: Ipv4Net,
    aggregator: Arc<TrafficAggregator>,
    running: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
) -> tokio::task::JoinHandle<Result<u64, anyhow::Error>> {
    tokio::task::spawn_blocking(move || {
        let result = run_capture(&mut source, &subnet, &aggregator, &running);
        if let Err(e) = &result {
            log::error!("Capture error: {}", e);
        }
        running.store(false, Ordering::SeqCst);
        shutdown_notify.notify_one();
        result
    })
}

// Run service: capture packets in the background and redraw the top list every interval
async fn run_service(options: &Options) -> Result<(), anyhow::Error> {
    let aggregator = Arc::new(TrafficAggregator::new());
    let running = Arc::new(AtomicBool::new(true));
    let shutdown_notify = Arc::new(Notify::new());

    // A capture handle is required before anything else starts
    let source = InterfaceSource::open(options.iface())?;

    let running_for_signal = running.clone();
    let shutdown_notify_for_signal = shutdown_notify.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, gracefully shutting down...");
            running_for_signal.store(false, Ordering::SeqCst);
            shutdown_notify_for_signal.notify_one();
        }
    });

    let capture_task = start_capture_task(
        source,
        options.subnet(),
        Arc::clone(&aggregator),
        running.clone(),
        shutdown_notify.clone(),
    );

    let ctx = TrafficModuleContext::new(options.interval(), Arc::clone(&aggregator));
    let mut renderer = FrameRenderer::new(std::io::stdout());
    let report_result = TrafficMonitor::new()
        .start(&ctx, &mut renderer, shutdown_notify)
        .await;

    // The capture thread notices within one read timeout
    running.store(false, Ordering::SeqCst);
    let packets = capture_task.await.context("Capture task panicked")??;
    info!(
        "Capture stopped after {} IPv4 packets ({} hosts in the unreported window)",
        packets,
        aggregator.len()
    );

    report_result
}

pub async fn run(options: Options) -> Result<(), anyhow::Error> {
    // Validate arguments
    validate_arguments(&options)?;

    // Set up logging, stdout belongs to the redrawn frame
    env_logger::Builder::new()
        .filter(None, options.log_level())
        .target(env_logger::Target::Stderr)
        .init();

    // Startup diagnostics
    log_startup_info(&options);

    run_service(&options).await?;

    info!("Program exiting");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let options =
            Options::try_parse_from(["subtop", "-i", "eth0", "-n", "5", "192.168.1.0/24"]).unwrap();
        assert_eq!(options.iface(), "eth0");
        assert_eq!(options.interval(), 5);
        assert_eq!(options.subnet(), "192.168.1.0/24".parse::<Ipv4Net>().unwrap());
        assert_eq!(options.log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_interval_defaults_to_one_second() {
        let options = Options::try_parse_from(["subtop", "--iface", "eth0", "10.0.0.0/8"]).unwrap();
        assert_eq!(options.interval(), 1);
    }

    #[test]
    fn test_missing_arguments_are_rejected() {
        assert!(Options::try_parse_from(["subtop", "10.0.0.0/8"]).is_err());
        assert!(Options::try_parse_from(["subtop", "-i", "eth0"]).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Options::try_parse_from(["subtop", "-i", "eth0", "-n", "0", "10.0.0.0/8"]).is_err());
        assert!(Options::try_parse_from(["subtop", "-i", "eth0", "-n", "-1", "10.0.0.0/8"]).is_err());
        assert!(Options::try_parse_from(["subtop", "-i", "eth0", "10.0.0.0"]).is_err());
        assert!(Options::try_parse_from([
            "subtop",
            "-i",
            "eth0",
            "--log-level",
            "loud",
            "10.0.0.0/8"
        ])
        .is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_interface() {
        let options =
            Options::try_parse_from(["subtop", "-i", "no-such-iface0", "10.0.0.0/8"]).unwrap();
        let err = validate_arguments(&options).unwrap_err();
        assert!(err.to_string().contains("no-such-iface0"));
    }
}
