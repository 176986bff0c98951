//! Decouples snapshot output from the tick loop.
//!
//! The simulation pushes snapshots into a bounded channel without blocking;
//! a dedicated thread drains it into a [`TransportController`]. When the
//! output side falls behind, new snapshots are dropped rather than slowing
//! the simulation down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use flock_simulation::{Snapshot, SnapshotObserver};
use log::{debug, error, warn};

use crate::{TransportController, TransportError};

/// Observer end of the output channel. Clones feed the same thread and
/// share the drop counter.
#[derive(Clone)]
pub struct ChannelObserver {
    tx: Sender<Arc<Snapshot>>,
    dropped: Arc<AtomicU64>,
    disconnected: bool,
}

impl ChannelObserver {
    /// Number of snapshots discarded because the channel was full.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }
}

impl SnapshotObserver for ChannelObserver {
    fn on_snapshot(&mut self, snapshot: &Arc<Snapshot>) {
        match self.tx.try_send(Arc::clone(snapshot)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                if !self.disconnected {
                    warn!("Output thread is gone; snapshots are no longer delivered");
                    self.disconnected = true;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputStats {
    pub received: u64,
    pub published: u64,
}

/// Handle to the thread draining the output channel.
pub struct OutputWorker {
    handle: JoinHandle<Result<OutputStats, TransportError>>,
}

impl OutputWorker {
    /// Spawns the output thread and returns it with the observer that feeds
    /// it. The thread exits once every observer has been dropped.
    pub fn spawn(
        mut controller: TransportController,
        capacity: usize,
    ) -> Result<(Self, ChannelObserver), TransportError> {
        let (tx, rx) = bounded::<Arc<Snapshot>>(capacity.max(1));
        let handle = thread::Builder::new()
            .name("flock-output".into())
            .spawn(move || drain(&rx, &mut controller))?;

        let observer = ChannelObserver {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            disconnected: false,
        };
        Ok((Self { handle }, observer))
    }

    /// Waits for the thread to finish flushing.
    pub fn join(self) -> Result<OutputStats, TransportError> {
        self.handle
            .join()
            .map_err(|_| TransportError::Channel("output thread panicked".into()))?
    }
}

fn drain(
    rx: &Receiver<Arc<Snapshot>>,
    controller: &mut TransportController,
) -> Result<OutputStats, TransportError> {
    let mut stats = OutputStats::default();
    for snapshot in rx.iter() {
        stats.received += 1;
        if let Err(e) = controller.publish(&snapshot) {
            error!("Failed to publish snapshot for tick {}: {}", snapshot.tick, e);
            return Err(e);
        }
    }
    controller.flush()?;
    stats.published = controller.published();
    debug!("Output thread done: {} received, {} published", stats.received, stats.published);
    Ok(stats)
}
