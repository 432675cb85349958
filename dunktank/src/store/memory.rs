use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use log::debug;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{CHANGE_FEED_CAPACITY, ChangeEvent, ChangeKind, DocumentStore, PatchOp, Query, apply_patch};
use crate::errors::RepoError;

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// In-process document store. Clones share the same documents and change feed.
#[derive(Clone)]
pub struct MemoryStore {
    collections: Arc<Mutex<Collections>>,
    offline: Arc<AtomicBool>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            collections: Arc::new(Mutex::new(HashMap::new())),
            offline: Arc::new(AtomicBool::new(false)),
            changes,
        }
    }

    /// Simulates an unreachable backend: while offline every call fails with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of documents currently held in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock().get(collection).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_online(&self) -> Result<(), RepoError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepoError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "memory store is offline",
            ))));
        }
        Ok(())
    }

    fn publish(&self, collection: &str, id: &str, kind: ChangeKind) {
        // No receivers is fine: nobody is watching.
        let _ = self.changes.send(ChangeEvent::new(collection, id, kind));
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, RepoError> {
        self.ensure_online()?;
        Ok(self.lock().get(collection).and_then(|documents| documents.get(id)).cloned())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, RepoError> {
        self.ensure_online()?;
        let mut documents: Vec<Value> = self
            .lock()
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default();
        query.apply(&mut documents);
        debug!("memory query on {collection} returned {} documents", documents.len());
        Ok(documents)
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), RepoError> {
        self.ensure_online()?;
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        self.publish(collection, id, ChangeKind::Set);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: &[PatchOp]) -> Result<(), RepoError> {
        self.ensure_online()?;
        {
            let mut collections = self.lock();
            let document = collections
                .get_mut(collection)
                .and_then(|documents| documents.get_mut(id))
                .ok_or_else(|| RepoError::not_found(collection, id))?;
            // Patch a copy so a failing op leaves the stored document untouched.
            let mut patched = document.clone();
            apply_patch(&mut patched, patch)?;
            *document = patched;
        }
        self.publish(collection, id, ChangeKind::Update);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RepoError> {
        self.ensure_online()?;
        let removed = self
            .lock()
            .get_mut(collection)
            .and_then(|documents| documents.remove(id))
            .is_some();
        if removed {
            self.publish(collection, id, ChangeKind::Delete);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
