//! Pipeline stage store: the recruiter funnel with optimistic transitions.
//!
//! Every operation applies its change locally first, then asks the backend to
//! persist it. Per entry we keep:
//! - the displayed stage (possibly optimistic),
//! - the last stage the backend confirmed,
//! - a sequence number bumped on every issued operation,
//! - a queue that serializes backend calls for that entry.
//!
//! When a call resolves, its result is applied only if no newer operation was
//! issued for the entry in the meantime (last write wins). A failed latest call
//! restores the confirmed stage. The displayed state is therefore always either
//! the last confirmed stage or an optimistic stage still awaiting confirmation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::errors::EngineError;
use crate::funnel::backend::StageBackend;
use crate::models::{PipelineEntry, Stage};

/// A confirmed stage change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub entry_id: String,
    pub from: Stage,
    pub to: Stage,
}

/// Per-id outcome of a bulk move. Partial success is normal.
#[derive(Debug, Default)]
pub struct BulkResult {
    pub succeeded: BTreeSet<String>,
    pub failed: BTreeMap<String, EngineError>,
    /// Overtaken by a newer operation; not an error for the user.
    pub superseded: BTreeSet<String>,
}

struct Slot {
    entry: PipelineEntry,
    confirmed: Stage,
    removed: bool,
    seq: u64,
    /// `seq` at the last `track`. Operations issued at or before it are void.
    synced_seq: u64,
    queue: Arc<AsyncMutex<()>>,
}

impl Slot {
    fn new(entry: PipelineEntry) -> Self {
        Self {
            confirmed: entry.stage,
            entry,
            removed: false,
            seq: 0,
            synced_seq: 0,
            queue: Arc::new(AsyncMutex::new(())),
        }
    }

    fn restore_confirmed(&mut self) {
        self.entry.stage = self.confirmed;
        self.removed = false;
    }
}

/// Sole owner and mutator of the saved-candidate set.
pub struct PipelineStageStore {
    slots: Mutex<HashMap<String, Slot>>,
    backend: Arc<dyn StageBackend>,
}

impl PipelineStageStore {
    pub fn new(backend: Arc<dyn StageBackend>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            backend,
        }
    }

    /// Loads a server-confirmed entry. Replacing an entry that has operations in
    /// flight supersedes them: the server copy wins, and their late results no
    /// longer move the confirmed stage.
    pub fn track(&self, entry: PipelineEntry) {
        let mut slots = self.slots.lock();
        match slots.get_mut(&entry.id) {
            Some(slot) => {
                slot.confirmed = entry.stage;
                slot.entry = entry;
                slot.removed = false;
                slot.seq += 1;
                slot.synced_seq = slot.seq;
            }
            None => {
                slots.insert(entry.id.clone(), Slot::new(entry));
            }
        }
    }

    pub fn get(&self, entry_id: &str) -> Option<PipelineEntry> {
        self.slots
            .lock()
            .get(entry_id)
            .filter(|slot| !slot.removed)
            .map(|slot| slot.entry.clone())
    }

    /// Visible entries ordered by save time, then id.
    pub fn entries(&self) -> Vec<PipelineEntry> {
        let mut entries: Vec<PipelineEntry> = self
            .slots
            .lock()
            .values()
            .filter(|slot| !slot.removed)
            .map(|slot| slot.entry.clone())
            .collect();
        entries.sort_by(|a, b| a.saved_at.cmp(&b.saved_at).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    pub fn entries_in_stage(&self, stage: Stage) -> Vec<PipelineEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.stage == stage)
            .collect()
    }

    /// Funnel summary with every stage present.
    pub fn stage_counts(&self) -> BTreeMap<Stage, usize> {
        let mut counts: BTreeMap<Stage, usize> = Stage::ALL.into_iter().map(|s| (s, 0)).collect();
        for slot in self.slots.lock().values().filter(|slot| !slot.removed) {
            *counts.entry(slot.entry.stage).or_insert(0) += 1;
        }
        counts
    }

    /// Moves one entry. The new stage is visible as soon as this is called; the
    /// returned future resolves once the backend has answered.
    pub async fn move_one(&self, entry_id: &str, to: Stage) -> Result<Transition, EngineError> {
        let (seq, from, queue) = {
            let mut slots = self.slots.lock();
            let slot = slots
                .get_mut(entry_id)
                .filter(|slot| !slot.removed)
                .ok_or_else(|| EngineError::NotFound(format!("pipeline entry {entry_id}")))?;
            let from = slot.entry.stage;
            if from.is_terminal() {
                return Err(EngineError::InvalidTransition { from, to });
            }
            slot.seq += 1;
            slot.entry.stage = to;
            (slot.seq, from, Arc::clone(&slot.queue))
        };
        debug!("Optimistic move {entry_id}: {from} -> {to} (seq {seq})");

        let _turn = queue.lock().await;
        let result = self.backend.persist_stage_change(entry_id, to).await;

        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(entry_id) else {
            return Err(EngineError::Superseded);
        };
        let latest = slot.seq == seq;

        match result {
            Ok(()) => {
                if seq > slot.synced_seq {
                    slot.confirmed = to;
                }
                if !latest {
                    debug!("Move {entry_id} -> {to} confirmed but superseded");
                    return Err(EngineError::Superseded);
                }
                info!("Pipeline entry {entry_id} moved {from} -> {to}");
                Ok(Transition {
                    entry_id: entry_id.to_string(),
                    from,
                    to,
                })
            }
            Err(e) if latest => {
                slot.restore_confirmed();
                warn!(
                    "Move {entry_id} -> {to} failed, rolled back to {}: {e}",
                    slot.confirmed
                );
                Err(EngineError::Persistence(e))
            }
            Err(e) => {
                debug!("Discarding failure of superseded move {entry_id} -> {to}: {e}");
                Err(EngineError::Superseded)
            }
        }
    }

    /// Attempts every id independently. One failure never blocks or rolls back another.
    pub async fn move_bulk<I, S>(&self, entry_ids: I, to: Stage) -> BulkResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: BTreeSet<String> = entry_ids.into_iter().map(Into::into).collect();
        let outcomes = join_all(ids.into_iter().map(|id| async move {
            let outcome = self.move_one(&id, to).await;
            (id, outcome)
        }))
        .await;

        let mut result = BulkResult::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(_) => {
                    result.succeeded.insert(id);
                }
                Err(EngineError::Superseded) => {
                    result.superseded.insert(id);
                }
                Err(e) => {
                    result.failed.insert(id, e);
                }
            }
        }
        info!(
            "Bulk move to {to}: {} succeeded, {} failed, {} superseded",
            result.succeeded.len(),
            result.failed.len(),
            result.superseded.len()
        );
        result
    }

    /// Removes an entry optimistically; restores it if the backend refuses.
    pub async fn delete(&self, entry_id: &str) -> Result<(), EngineError> {
        let (seq, queue) = {
            let mut slots = self.slots.lock();
            let slot = slots
                .get_mut(entry_id)
                .filter(|slot| !slot.removed)
                .ok_or_else(|| EngineError::NotFound(format!("pipeline entry {entry_id}")))?;
            slot.seq += 1;
            slot.removed = true;
            (slot.seq, Arc::clone(&slot.queue))
        };
        debug!("Optimistic delete of {entry_id} (seq {seq})");

        let _turn = queue.lock().await;
        let result = self.backend.persist_delete(entry_id).await;

        let mut slots = self.slots.lock();
        let latest = slots.get(entry_id).map_or(false, |slot| slot.seq == seq);

        match result {
            Ok(()) => {
                // Only `track` can follow a pending delete; its copy stays.
                if !latest {
                    return Err(EngineError::Superseded);
                }
                slots.remove(entry_id);
                info!("Pipeline entry {entry_id} deleted");
                Ok(())
            }
            Err(e) if latest => {
                if let Some(slot) = slots.get_mut(entry_id) {
                    slot.restore_confirmed();
                }
                warn!("Delete of {entry_id} failed, entry restored: {e}");
                Err(EngineError::Persistence(e))
            }
            Err(e) => {
                debug!("Discarding failure of superseded delete {entry_id}: {e}");
                Err(EngineError::Superseded)
            }
        }
    }
}
