use std::marker::PhantomData;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::{ChangeEvent, DocumentStore, Query};
use crate::errors::RepoError;

/// Continuously updating view over a query.
///
/// The first call to [`LiveQuery::next`] yields the current result. Each later call
/// waits until a change in the watched collection alters the matching set and yields
/// the re-evaluated result. Bursts of changes are coalesced into one evaluation.
/// Store failures are yielded to the caller; the view stays usable afterwards.
pub struct LiveQuery<S, T> {
    store: S,
    collection: String,
    query: Query,
    changes: broadcast::Receiver<ChangeEvent>,
    started: bool,
    // Cleared on a failed evaluation so the first good result afterwards is always yielded.
    last: Option<Vec<Value>>,
    _marker: PhantomData<fn() -> T>,
}

impl<S, T> LiveQuery<S, T>
where
    S: DocumentStore,
    T: DeserializeOwned,
{
    pub fn new(store: S, collection: impl Into<String>, query: Query) -> Self {
        // Subscribe before the first read so no change slips between read and subscription.
        let changes = store.subscribe();
        Self {
            store,
            collection: collection.into(),
            query,
            changes,
            started: false,
            last: None,
            _marker: PhantomData,
        }
    }

    /// Waits for the next distinct result. Returns `None` once the change feed closes.
    pub async fn next(&mut self) -> Option<Result<Vec<T>, RepoError>> {
        if !self.started {
            self.started = true;
            return Some(self.evaluate().await);
        }

        loop {
            match self.changes.recv().await {
                Ok(event) if event.collection == self.collection => {
                    self.drain_pending();
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("live query on {} lagged by {skipped} change events", self.collection);
                }
                Err(RecvError::Closed) => return None,
            }

            let previous = self.last.clone();
            match self.evaluate().await {
                Ok(_) if self.last == previous => {
                    debug!("live query on {} unchanged after change event", self.collection);
                }
                other => return Some(other),
            }
        }
    }

    fn drain_pending(&mut self) {
        loop {
            match self.changes.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    async fn evaluate(&mut self) -> Result<Vec<T>, RepoError> {
        let outcome = self.read().await;
        if outcome.is_err() {
            self.last = None;
        }
        outcome
    }

    async fn read(&mut self) -> Result<Vec<T>, RepoError> {
        let documents = self.store.query(&self.collection, &self.query).await?;
        let items = documents
            .iter()
            .cloned()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?;
        self.last = Some(documents);
        Ok(items)
    }
}
