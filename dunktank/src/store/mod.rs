//! Document store abstraction.
//!
//! Repositories talk to persistence only through [`DocumentStore`]: keyed JSON
//! documents grouped in collections, equality queries with a single sort key,
//! field-level patches, and a change feed that powers [`LiveQuery`].

mod live;
mod memory;
mod redis_store;

pub use live::LiveQuery;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::errors::{RepoError, ValidationError};

/// Number of change events buffered per subscriber before it starts lagging.
pub const CHANGE_FEED_CAPACITY: usize = 256;

#[allow(async_fn_in_trait)]
pub trait DocumentStore: Clone {
    /// Fetches a single document, `None` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, RepoError>;

    /// Returns every document of `collection` matching `query`, in query order.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, RepoError>;

    /// Writes `document` under `id`, replacing whatever was stored there.
    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), RepoError>;

    /// Applies `patch` to an existing document. Fails with `NotFound` when it is missing.
    async fn update(&self, collection: &str, id: &str, patch: &[PatchOp]) -> Result<(), RepoError>;

    /// Removes a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RepoError>;

    /// Subscribes to change events for all collections of this store.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Equality constraint on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
}

/// Conjunction of equality filters plus an optional sort key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            order,
        });
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.filters
            .iter()
            .all(|filter| document.get(&filter.field) == Some(&filter.value))
    }

    /// Filters and orders `documents` in place. Documents missing the sort field go last.
    pub fn apply(&self, documents: &mut Vec<Value>) {
        documents.retain(|document| self.matches(document));
        if let Some(order_by) = &self.order_by {
            documents.sort_by(|left, right| {
                match (left.get(&order_by.field), right.get(&order_by.field)) {
                    (Some(a), Some(b)) => {
                        let ordering = compare_values(a, b);
                        match order_by.order {
                            SortOrder::Asc => ordering,
                            SortOrder::Desc => ordering.reverse(),
                        }
                    }
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Field-level mutation applied by [`DocumentStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Point write of a single field.
    Assign { field: String, value: Value },
    /// Appends each value not already present in the array field.
    ArrayUnion { field: String, values: Vec<Value> },
    /// Removes every occurrence of each value from the array field.
    ArrayRemove { field: String, values: Vec<Value> },
    /// Adds `delta` to a numeric field, treating a missing field as zero.
    Increment { field: String, delta: i64 },
}

impl PatchOp {
    pub fn assign(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Assign {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn array_union(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayUnion {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    pub fn array_remove(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayRemove {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    pub fn increment(field: impl Into<String>, delta: i64) -> Self {
        Self::Increment {
            field: field.into(),
            delta,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Assign { field, .. }
            | Self::ArrayUnion { field, .. }
            | Self::ArrayRemove { field, .. }
            | Self::Increment { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Set,
    Update,
    Delete,
}

/// Notification that a document changed, broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(collection: &str, id: &str, kind: ChangeKind) -> Self {
        Self {
            collection: collection.to_string(),
            id: id.to_string(),
            kind,
        }
    }
}

/// Applies `patch` to an in-memory document. Dotted field names address nested objects.
pub fn apply_patch(document: &mut Value, patch: &[PatchOp]) -> Result<(), RepoError> {
    for op in patch {
        let segments: Vec<&str> = op.field().split('.').filter(|segment| !segment.is_empty()).collect();
        let Some((key, parents)) = segments.split_last() else {
            return Err(RepoError::Validation(ValidationError::single(
                "",
                "patch.invalid_path",
                "path cannot be empty",
            )));
        };
        let parent = parent_map_mut(document, parents)?;
        match op {
            PatchOp::Assign { value, .. } => {
                parent.insert((*key).to_string(), value.clone());
            }
            PatchOp::ArrayUnion { values, .. } => {
                let array = array_slot(parent, key)?;
                for value in values {
                    if !array.contains(value) {
                        array.push(value.clone());
                    }
                }
            }
            PatchOp::ArrayRemove { values, .. } => {
                let array = array_slot(parent, key)?;
                array.retain(|existing| !values.contains(existing));
            }
            PatchOp::Increment { delta, .. } => {
                let slot = parent.entry((*key).to_string()).or_insert(Value::from(0));
                let current = slot.as_i64().ok_or_else(|| RepoError::InvalidRequest {
                    message: format!("field '{key}' is not an integer"),
                })?;
                let next = current.checked_add(*delta).ok_or_else(|| RepoError::InvalidRequest {
                    message: format!("increment of field '{key}' by {delta} overflows"),
                })?;
                *slot = Value::from(next);
            }
        }
    }
    Ok(())
}

fn array_slot<'a>(parent: &'a mut Map<String, Value>, key: &str) -> Result<&'a mut Vec<Value>, RepoError> {
    parent
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| RepoError::InvalidRequest {
            message: format!("field '{key}' is not an array"),
        })
}

fn parent_map_mut<'a>(value: &'a mut Value, segments: &[&str]) -> Result<&'a mut Map<String, Value>, RepoError> {
    let mut current = value;
    for segment in segments {
        match current {
            Value::Object(map) => {
                current = map.entry((*segment).to_string()).or_insert_with(|| Value::Object(Map::new()));
            }
            _ => {
                return Err(RepoError::Validation(ValidationError::single(
                    (*segment).to_string(),
                    "patch.invalid_path",
                    "expected object while traversing patch path",
                )));
            }
        }
    }
    match current {
        Value::Object(map) => Ok(map),
        _ => Err(RepoError::Validation(ValidationError::single(
            segments.last().copied().unwrap_or("").to_string(),
            "patch.invalid_path",
            "expected object while applying patch",
        ))),
    }
}
