//! Control loop
//!
//! Drives the scanner and monitor on fixed intervals. Overlapping
//! invocations of the same job type are prevented by per-job try-lock
//! guards; a job that is still running when its next tick fires is simply
//! skipped. When a monitor cycle reports free capacity with nothing
//! enterable, the orchestrator triggers one out-of-band scan and will not
//! trigger another until that scan completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::monitor::Monitor;
use crate::ports::market_data::MarketDataPort;
use crate::ports::notifier::NotifierPort;
use crate::ports::persistence::PersistencePort;
use crate::scanner::Scanner;

pub struct Orchestrator<M, P, N> {
    scanner: Arc<Scanner<M, P>>,
    monitor: Arc<Monitor<M, P, N>>,
    scan_interval: Duration,
    monitor_interval: Duration,
    is_running: Arc<RwLock<bool>>,
    scan_guard: Arc<Mutex<()>>,
    monitor_guard: Arc<Mutex<()>>,
    rescan_pending: Arc<AtomicBool>,
}

impl<M, P, N> Orchestrator<M, P, N>
where
    M: MarketDataPort + 'static,
    P: PersistencePort + 'static,
    N: NotifierPort + 'static,
{
    pub fn new(
        scanner: Scanner<M, P>,
        monitor: Monitor<M, P, N>,
        scan_interval: Duration,
        monitor_interval: Duration,
    ) -> Self {
        Self {
            scanner: Arc::new(scanner),
            monitor: Arc::new(monitor),
            scan_interval,
            monitor_interval,
            is_running: Arc::new(RwLock::new(false)),
            scan_guard: Arc::new(Mutex::new(())),
            monitor_guard: Arc::new(Mutex::new(())),
            rescan_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the periodic loop until `stop()` is called.
    pub async fn run(&self) -> anyhow::Result<()> {
        *self.is_running.write().await = true;
        info!(
            scan_interval = ?self.scan_interval,
            monitor_interval = ?self.monitor_interval,
            "starting control loop"
        );

        // discover pairs before the first monitor tick
        self.run_scan_once().await;

        let mut scan_tick = tokio::time::interval(self.scan_interval);
        let mut monitor_tick = tokio::time::interval(self.monitor_interval);
        scan_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        monitor_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // both intervals fire immediately once; the scan already ran
        scan_tick.tick().await;
        monitor_tick.tick().await;

        while *self.is_running.read().await {
            tokio::select! {
                _ = scan_tick.tick() => {
                    self.run_scan_once().await;
                }
                _ = monitor_tick.tick() => {
                    self.run_monitor_once().await;
                }
            }
        }

        info!("control loop stopped");
        Ok(())
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        info!("stop signal sent to control loop");
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// One guarded scan. Skipped when a scan is already in flight;
    /// aborted at the deadline (persistence writes are atomic per call,
    /// so an abort between items leaves no half-applied state).
    pub async fn run_scan_once(&self) {
        let Ok(_guard) = self.scan_guard.try_lock() else {
            warn!("scan already in progress, skipping this tick");
            return;
        };
        match tokio::time::timeout(self.scan_interval, self.scanner.run_scan()).await {
            Ok(Ok(report)) => {
                info!(
                    selected = report.selected,
                    pruned = report.pruned,
                    "scan finished"
                );
            }
            Ok(Err(e)) => warn!(error = %e, "scan failed"),
            Err(_) => warn!("scan hit its deadline, remaining pairs abandoned"),
        }
        // a completed scan satisfies any outstanding rescan request
        self.rescan_pending.store(false, Ordering::SeqCst);
    }

    /// One guarded monitor cycle, plus an out-of-band scan when the cycle
    /// asks for one and none is already pending. The cycle deadline is
    /// the monitor interval: a cycle that cannot finish before its next
    /// tick is cut off rather than piling up.
    pub async fn run_monitor_once(&self) {
        let rescan = {
            let Ok(_guard) = self.monitor_guard.try_lock() else {
                warn!("monitor cycle already in progress, skipping this tick");
                return;
            };
            match tokio::time::timeout(self.monitor_interval, self.monitor.run_cycle()).await {
                Ok(Ok(report)) => report.rescan_requested,
                Ok(Err(e)) => {
                    warn!(error = %e, "monitor cycle failed");
                    false
                }
                Err(_) => {
                    warn!("monitor cycle hit its deadline, remaining pairs abandoned");
                    false
                }
            }
        };

        if rescan && !self.rescan_pending.swap(true, Ordering::SeqCst) {
            info!("capacity free with no enterable candidate, requesting rescan");
            self.run_scan_once().await;
        }
    }
}

impl<M, P, N> Clone for Orchestrator<M, P, N> {
    fn clone(&self) -> Self {
        Self {
            scanner: Arc::clone(&self.scanner),
            monitor: Arc::clone(&self.monitor),
            scan_interval: self.scan_interval,
            monitor_interval: self.monitor_interval,
            is_running: Arc::clone(&self.is_running),
            scan_guard: Arc::clone(&self.scan_guard),
            monitor_guard: Arc::clone(&self.monitor_guard),
            rescan_pending: Arc::clone(&self.rescan_pending),
        }
    }
}
