//! Liveness monitoring.
//!
//! The monitor runs on its own thread and periodically sweeps the registry
//! for nodes that have gone silent, publishing a status change for each
//! transition. It mutates nothing but status flags and never removes a
//! node; revival on the next received frame is handled by the engine's
//! touch path, not here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::events::{EngineEvent, EventBus};
use crate::registry::{NodeStatus, Registry};

/// How often to scan, and how much silence marks a node dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between registry sweeps.
    pub period: Duration,
    /// Silence threshold. Defaults above the nodes' own 30 s keep-alive
    /// interval so a healthy node is never flagged between keep-alives.
    pub staleness: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        HeartbeatConfig {
            period: Duration::from_secs(5),
            staleness: Duration::from_millis(31_000),
        }
    }
}

/// Handle to the monitor thread.
pub struct HeartbeatMonitor {
    stop_flag: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl HeartbeatMonitor {
    /// Spawn the monitor thread.
    pub fn start(
        config: HeartbeatConfig,
        registry: Arc<Mutex<Registry>>,
        events: Arc<EventBus>,
    ) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_flag);

        let thread_handle = thread::spawn(move || {
            // Sleep in short slices so stop() returns promptly even with a
            // multi-second scan period.
            let slice = Duration::from_millis(100);

            while !stop.load(Ordering::Relaxed) {
                let mut waited = Duration::ZERO;
                while waited < config.period && !stop.load(Ordering::Relaxed) {
                    thread::sleep(slice);
                    waited += slice;
                }
                if stop.load(Ordering::Relaxed) {
                    break;
                }

                let stale = registry
                    .lock()
                    .sweep_stale(Instant::now(), config.staleness);
                for node in stale {
                    tracing::warn!(node = node.index(), "node stopped responding");
                    events.publish(&EngineEvent::StatusChanged {
                        node,
                        status: NodeStatus::NonResponding,
                    });
                }
            }
        });

        HeartbeatMonitor {
            stop_flag,
            thread_handle: Some(thread_handle),
        }
    }

    /// Stop the monitor and wait for the thread to finish. Shutdown is
    /// synchronous: when this returns, no further sweeps can run.
    pub fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        // Don't join in drop; the thread exits on its own.
    }
}
