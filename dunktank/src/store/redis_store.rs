use std::{borrow::Cow, sync::LazyLock};

use futures_util::StreamExt;
use log::{debug, warn};
use redis::{Script, aio::ConnectionManager, cmd};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{CHANGE_FEED_CAPACITY, ChangeEvent, ChangeKind, DocumentStore, PatchOp, Query};
use crate::{errors::RepoError, keys::KeyContext};

pub const DOCUMENT_SET_SCRIPT_BODY: &str = include_str!("../../lua/document_set.lua");
pub const DOCUMENT_PATCH_SCRIPT_BODY: &str = include_str!("../../lua/document_patch.lua");
pub const DOCUMENT_DELETE_SCRIPT_BODY: &str = include_str!("../../lua/document_delete.lua");

static DOCUMENT_SET_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(DOCUMENT_SET_SCRIPT_BODY));
static DOCUMENT_PATCH_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(DOCUMENT_PATCH_SCRIPT_BODY));
static DOCUMENT_DELETE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(DOCUMENT_DELETE_SCRIPT_BODY));

const SCAN_COUNT: usize = 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum PatchOperationType {
    Assign,
    ArrayUnion,
    ArrayRemove,
    Increment,
}

/// Wire form of a [`PatchOp`] consumed by `document_patch.lua`. Values travel pre-encoded
/// so Lua never re-encodes them (cjson cannot tell an empty array from an empty object).
#[derive(Debug, Serialize)]
struct PatchOperationPayload {
    field: String,
    #[serde(rename = "type")]
    op_type: PatchOperationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    value_json: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    values_json: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delta: Option<i64>,
}

impl PatchOperationPayload {
    fn from_op(op: &PatchOp) -> Result<Self, RepoError> {
        let encode_all = |values: &[Value]| -> Result<Vec<String>, RepoError> {
            values
                .iter()
                .map(|value| serde_json::to_string(value).map_err(RepoError::from))
                .collect()
        };
        let payload = match op {
            PatchOp::Assign { field, value } => Self {
                field: field.clone(),
                op_type: PatchOperationType::Assign,
                value_json: Some(serde_json::to_string(value)?),
                values_json: Vec::new(),
                delta: None,
            },
            PatchOp::ArrayUnion { field, values } => Self {
                field: field.clone(),
                op_type: PatchOperationType::ArrayUnion,
                value_json: None,
                values_json: encode_all(values)?,
                delta: None,
            },
            PatchOp::ArrayRemove { field, values } => Self {
                field: field.clone(),
                op_type: PatchOperationType::ArrayRemove,
                value_json: None,
                values_json: encode_all(values)?,
                delta: None,
            },
            PatchOp::Increment { field, delta } => Self {
                field: field.clone(),
                op_type: PatchOperationType::Increment,
                value_json: None,
                values_json: Vec::new(),
                delta: Some(*delta),
            },
        };
        Ok(payload)
    }
}

/// Document store backed by Redis Stack: RedisJSON documents under
/// `{prefix}:{collection}:{id}`, Lua scripts for writes, pub/sub for the change feed.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    changes: broadcast::Sender<ChangeEvent>,
}

impl RedisStore {
    /// Connects to `url` and starts relaying the store's change channel to local subscribers.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, RepoError> {
        let prefix = prefix.into();
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);

        let channel = KeyContext::new(&prefix).changes_channel();
        spawn_change_relay(client, channel, changes.clone()).await?;

        Ok(Self { conn, prefix, changes })
    }

    pub fn key_context(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix)
    }

    /// Deletes every key under this store's prefix, returning how many were removed.
    pub async fn purge(&self) -> Result<u64, RepoError> {
        let mut conn = self.conn.clone();
        let keys = scan_keys(&mut conn, &format!("{}:*", self.prefix)).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let deleted: u64 = cmd("DEL").arg(&keys).query_async(&mut conn).await?;
        Ok(deleted)
    }

    fn change_payload(&self, collection: &str, id: &str, kind: ChangeKind) -> Result<String, RepoError> {
        Ok(serde_json::to_string(&ChangeEvent::new(collection, id, kind))?)
    }

    async fn invoke(&self, script: &Script, key: &str, args: &[String]) -> Result<Value, RepoError> {
        let mut conn = self.conn.clone();
        let mut invocation = script.prepare_invoke();
        invocation.key(key);
        for arg in args {
            invocation.arg(arg);
        }
        let raw: String = invocation.invoke_async(&mut conn).await?;
        let value: Value = serde_json::from_str(&raw).map_err(|err| RepoError::Other {
            message: Cow::Owned(format!("failed to parse lua response: {err}")),
        })?;
        Ok(value)
    }
}

fn map_script_error(value: &Value, collection: &str, id: &str) -> Result<(), RepoError> {
    let Some(error) = value.get("error") else {
        return Ok(());
    };
    match error.as_str() {
        Some("entity_not_found") => Err(RepoError::not_found(collection, id)),
        Some("invalid_request") => Err(RepoError::InvalidRequest {
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("invalid patch")
                .to_string(),
        }),
        Some(other) => Err(RepoError::Other {
            message: Cow::Owned(other.to_string()),
        }),
        None => Err(RepoError::Other {
            message: Cow::Borrowed("lua_error"),
        }),
    }
}

async fn scan_keys(conn: &mut ConnectionManager, pattern: &str) -> Result<Vec<String>, RepoError> {
    let mut cursor: u64 = 0;
    let mut keys = Vec::new();
    loop {
        let (next_cursor, batch): (u64, Vec<String>) = cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(conn)
            .await?;
        keys.extend(batch);
        cursor = next_cursor;
        if cursor == 0 {
            break;
        }
    }
    // SCAN may return a key more than once.
    keys.sort();
    keys.dedup();
    Ok(keys)
}

async fn spawn_change_relay(
    client: redis::Client,
    channel: String,
    sender: broadcast::Sender<ChangeEvent>,
) -> Result<(), RepoError> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(&channel).await?;
    debug!("subscribed to change channel {channel}");

    tokio::spawn(async move {
        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(err) => {
                    warn!("dropping change message with unreadable payload: {err}");
                    continue;
                }
            };
            match serde_json::from_str::<ChangeEvent>(&payload) {
                Ok(event) => {
                    let _ = sender.send(event);
                }
                Err(err) => warn!("dropping malformed change event {payload}: {err}"),
            }
        }
        warn!("change channel {channel} subscription ended");
    });

    Ok(())
}

impl DocumentStore for RedisStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, RepoError> {
        let mut conn = self.conn.clone();
        let key = self.key_context().document(collection, id);
        let result: Option<String> = cmd("JSON.GET").arg(&key).query_async(&mut conn).await?;
        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, RepoError> {
        let mut conn = self.conn.clone();
        let keys = scan_keys(&mut conn, &self.key_context().collection_pattern(collection)).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in &keys {
            pipe.cmd("JSON.GET").arg(key);
        }
        let rows: Vec<Option<String>> = pipe.query_async(&mut conn).await?;

        let mut documents = Vec::with_capacity(rows.len());
        for json in rows.into_iter().flatten() {
            documents.push(serde_json::from_str::<Value>(&json)?);
        }
        query.apply(&mut documents);
        debug!("redis query on {collection} scanned {} keys, matched {}", keys.len(), documents.len());
        Ok(documents)
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), RepoError> {
        let key = self.key_context().document(collection, id);
        let args = [
            serde_json::to_string(&document)?,
            self.key_context().changes_channel(),
            self.change_payload(collection, id, ChangeKind::Set)?,
        ];
        let response = self.invoke(&DOCUMENT_SET_SCRIPT, &key, &args).await?;
        map_script_error(&response, collection, id)
    }

    async fn update(&self, collection: &str, id: &str, patch: &[PatchOp]) -> Result<(), RepoError> {
        let key = self.key_context().document(collection, id);
        let operations = patch
            .iter()
            .map(PatchOperationPayload::from_op)
            .collect::<Result<Vec<_>, _>>()?;
        let args = [
            serde_json::to_string(&operations)?,
            self.key_context().changes_channel(),
            self.change_payload(collection, id, ChangeKind::Update)?,
        ];
        let response = self.invoke(&DOCUMENT_PATCH_SCRIPT, &key, &args).await?;
        map_script_error(&response, collection, id)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RepoError> {
        let key = self.key_context().document(collection, id);
        let args = [
            self.key_context().changes_channel(),
            self.change_payload(collection, id, ChangeKind::Delete)?,
        ];
        let response = self.invoke(&DOCUMENT_DELETE_SCRIPT, &key, &args).await?;
        map_script_error(&response, collection, id)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
