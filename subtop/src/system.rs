use crate::command::Options;
use crate::utils::network_utils::get_interface_addresses;
use log::{info, warn};
use std::env;
use std::fs;

// ---- 启动诊断信息 ----
fn first_line_of(path: &str) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    content.lines().next().map(|line| line.trim().to_string())
}

// `uname -sr` when available, otherwise the release from procfs
fn kernel_version() -> Option<String> {
    std::process::Command::new("uname")
        .arg("-sr")
        .output()
        .ok()
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| first_line_of("/proc/sys/kernel/osrelease"))
}

fn hostname() -> Option<String> {
    first_line_of("/proc/sys/kernel/hostname").or_else(|| first_line_of("/etc/hostname"))
}

// Raw capture sockets need root (or CAP_NET_RAW)
fn effective_ids() -> (u32, u32) {
    // SAFETY: geteuid/getegid cannot fail and touch no memory.
    unsafe { (libc::geteuid() as u32, libc::getegid() as u32) }
}

pub fn log_startup_info(options: &Options) {
    let app_version = env!("CARGO_PKG_VERSION");
    let (uid, gid) = effective_ids();

    let kver = kernel_version().unwrap_or_else(|| "unknown".to_string());
    let host = hostname().unwrap_or_else(|| "unknown".to_string());

    let addresses = get_interface_addresses(options.iface());
    let addresses = if addresses.is_empty() {
        "none".to_string()
    } else {
        addresses.join(", ")
    };

    info!("subtop v{} started", app_version);
    info!("Host: {} (uid={}, gid={})", host, uid, gid);
    info!("OS: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    info!("Kernel: {}", kver);
    if uid != 0 {
        warn!("It is recommended to run as root to open a raw capture socket");
    }
    info!("Interface: {} (addresses: {})", options.iface(), addresses);
    info!("Monitored subnet: {}", options.subnet());
    info!("Update interval: {}s", options.interval());
    info!("Log level: {}", options.log_level());

    if let Ok(cwd) = env::current_dir() {
        log::debug!("Working directory: {}", cwd.display());
    }
}
