use crate::display::FrameRenderer;
use crate::monitor::{TrafficModuleContext, TOP_N};
use crate::utils::format_utils::format_rate;
use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use subtop_common::{RankedEntry, TrafficRecord};
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};

/// Sort a drained window by total bytes, largest first, and keep the top `limit`.
///
/// The sort is stable: hosts with equal totals keep the order the window saw them in.
pub fn rank_entries(records: Vec<TrafficRecord>, limit: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = records.into_iter().map(RankedEntry::from).collect();
    entries.sort_by(|a, b| b.total.cmp(&a.total));
    entries.truncate(limit);
    entries
}

/// One display line with per-second rates over the window.
pub fn format_report_line(entry: &RankedEntry, interval_seconds: u64) -> String {
    let rx_rate = entry.record.inbound_bytes / interval_seconds;
    let tx_rate = entry.record.outbound_bytes / interval_seconds;
    format!(
        "{}  D: {}  U: {}",
        entry.record.address,
        format_rate(rx_rate),
        format_rate(tx_rate)
    )
}

/// Periodic drain, rank and redraw of the aggregation window
pub struct TrafficMonitor;

impl TrafficMonitor {
    pub fn new() -> Self {
        TrafficMonitor
    }

    /// Run the reporting loop until `shutdown_notify` fires.
    ///
    /// The first frame is drawn one full interval after start.
    pub async fn start<W: Write>(
        &self,
        ctx: &TrafficModuleContext,
        renderer: &mut FrameRenderer<W>,
        shutdown_notify: Arc<Notify>,
    ) -> Result<()> {
        let period = ctx.interval();
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.process_reporting_cycle(ctx, renderer)?;
                }
                _ = shutdown_notify.notified() => {
                    log::info!("Traffic reporter received shutdown signal, stopping...");
                    break;
                }
            }
        }

        Ok(())
    }

    fn process_reporting_cycle<W: Write>(
        &self,
        ctx: &TrafficModuleContext,
        renderer: &mut FrameRenderer<W>,
    ) -> Result<()> {
        let snapshot = ctx.aggregator.drain_and_reset();
        let hosts = snapshot.len();

        let lines: Vec<String> = rank_entries(snapshot, TOP_N)
            .iter()
            .map(|entry| format_report_line(entry, ctx.interval_seconds))
            .collect();

        log::debug!("Window closed with {} hosts, showing {}", hosts, lines.len());
        renderer.render(&lines)?;
        Ok(())
    }
}
