//! Pending-request table shared by callers and the connection reader.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use editbridge_core::{RequestId, Response};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{BridgeError, BridgeResult};

type Reply = oneshot::Sender<BridgeResult<Value>>;

struct PendingEntry {
    generation: u64,
    reply: Reply,
}

#[derive(Default)]
struct PendingState {
    entries: HashMap<RequestId, PendingEntry>,
    /// Generation of the connection new requests may be registered against
    live_generation: Option<u64>,
}

/// In-flight requests keyed by correlation id.
///
/// Each entry remembers the connection generation it was written on, so a
/// closing connection fails only its own requests.
#[derive(Default)]
pub(crate) struct PendingTable {
    state: Mutex<PendingState>,
}

impl PendingTable {
    fn lock(&self) -> MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `generation` as the connection accepting new requests.
    pub(crate) fn open_generation(&self, generation: u64) {
        self.lock().live_generation = Some(generation);
    }

    /// Whether `generation` still accepts new requests.
    pub(crate) fn is_live(&self, generation: u64) -> bool {
        self.lock().live_generation == Some(generation)
    }

    /// Register a request against a connection.
    ///
    /// Fails with `ConnectionLost` when that connection has already closed.
    pub(crate) fn register(
        &self,
        id: RequestId,
        generation: u64,
    ) -> BridgeResult<oneshot::Receiver<BridgeResult<Value>>> {
        let mut state = self.lock();
        if state.live_generation != Some(generation) {
            return Err(BridgeError::ConnectionLost);
        }

        match state.entries.entry(id) {
            Entry::Occupied(entry) => Err(BridgeError::Protocol(format!(
                "request id {} is already pending",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                let (reply, rx) = oneshot::channel();
                entry.insert(PendingEntry { generation, reply });
                Ok(rx)
            }
        }
    }

    /// Complete the entry matching `response.id`.
    ///
    /// Returns false when no entry exists, e.g. the caller already timed out.
    pub(crate) fn resolve(&self, response: Response) -> bool {
        let entry = self.lock().entries.remove(&response.id);
        match entry {
            // The caller may have stopped waiting between removal and send
            Some(entry) => {
                let _ = entry.reply.send(Ok(response.result));
                true
            }
            None => false,
        }
    }

    /// Drop an entry without completing it.
    pub(crate) fn remove(&self, id: &RequestId) -> bool {
        self.lock().entries.remove(id).is_some()
    }

    /// Fail every entry written on `generation` with `ConnectionLost`.
    ///
    /// Returns how many callers were failed.
    pub(crate) fn fail_generation(&self, generation: u64) -> usize {
        let failed: Vec<PendingEntry> = {
            let mut state = self.lock();
            if state.live_generation == Some(generation) {
                state.live_generation = None;
            }
            let ids: Vec<RequestId> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.generation == generation)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter()
                .filter_map(|id| state.entries.remove(id))
                .collect()
        };

        let count = failed.len();
        for entry in failed {
            let _ = entry.reply.send(Err(BridgeError::ConnectionLost));
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }
}
