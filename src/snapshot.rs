//! Edit-thread to render-thread handoff.
//!
//! The editor owns the live `ChainGraph`; the render side only ever sees
//! ordered instance lists copied out of it. The channel holds one pending
//! snapshot and a newer one replaces it.

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::{debug, warn};

use crate::graph::{ChainError, ChainGraph};
use crate::instance::EffectInstance;
use crate::stack::CompiledStackCache;

#[derive(Debug, Clone, PartialEq)]
pub struct StackSnapshot {
    /// Increases by one per publish, starting at 1.
    pub generation: u64,
    pub instances: Vec<EffectInstance>,
}

pub struct SnapshotPublisher {
    tx: Sender<StackSnapshot>,
    drop_rx: Receiver<StackSnapshot>,
    generation: u64,
}

pub struct SnapshotReceiver {
    rx: Receiver<StackSnapshot>,
}

pub fn snapshot_channel() -> (SnapshotPublisher, SnapshotReceiver) {
    let (tx, rx) = crossbeam_channel::bounded::<StackSnapshot>(1);
    let publisher = SnapshotPublisher {
        tx,
        drop_rx: rx.clone(),
        generation: 0,
    };
    (publisher, SnapshotReceiver { rx })
}

impl SnapshotPublisher {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Hand off an instance list and return its generation.
    pub fn publish(&mut self, instances: Vec<EffectInstance>) -> u64 {
        self.generation += 1;
        let snapshot = StackSnapshot {
            generation: self.generation,
            instances,
        };
        if let Err(TrySendError::Full(snapshot)) = self.tx.try_send(snapshot) {
            // Replace the pending snapshot the render side has not picked up.
            while self.drop_rx.try_recv().is_ok() {}
            if self.tx.try_send(snapshot).is_err() {
                debug!("[snapshot] dropped generation {}", self.generation);
            }
        }
        self.generation
    }

    /// Copy the graph's current chain out and publish it. A broken chain is
    /// not published; the render side keeps its previous stack.
    pub fn publish_graph(&mut self, graph: &ChainGraph) -> Result<u64, ChainError> {
        let instances = graph.to_instances()?;
        Ok(self.publish(instances))
    }
}

impl SnapshotReceiver {
    /// Newest pending snapshot, if any.
    pub fn latest(&self) -> Option<StackSnapshot> {
        let mut latest = None;
        while let Ok(snapshot) = self.rx.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }

    /// Run before issuing the frame's render work so the buffer is current.
    /// Returns whether the parameter buffer was republished.
    pub fn sync_cache(&self, cache: &mut CompiledStackCache) -> Result<bool> {
        let Some(snapshot) = self.latest() else {
            return Ok(false);
        };
        match cache.update_if_dirty(&snapshot.instances) {
            Ok(changed) => Ok(changed),
            Err(e) => {
                warn!(
                    "[snapshot] generation {} not published: {e:#}",
                    snapshot.generation
                );
                Err(e)
            }
        }
    }
}
