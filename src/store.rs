// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document store integration.
//!
//! Defines the event document shape, the query vocabulary the replicator
//! needs (`MatchAll`, `GreaterThan`, single-field sort), and the
//! [`DocumentStore`] trait consumed by the replication loop.
//!
//! Implementations:
//! - [`crate::mongo::MongoStore`]: the production MongoDB collection
//! - [`InMemoryStore`]: standalone/testing store with the same semantics
//!
//! # Document Shape
//!
//! The ingestion stage guarantees a `Timestamp` string (parseable with the
//! configured store format) and a `ReporterId`. All other fields are opaque
//! and passed through untouched.

use crate::error::{ReplicationError, Result};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::RwLock;

/// Field holding the event time.
pub const TIMESTAMP_FIELD: &str = "Timestamp";

/// Field identifying the reporting device/source.
pub const REPORTER_ID_FIELD: &str = "ReporterId";

/// Field holding the store-assigned document id.
pub const ID_FIELD: &str = "_id";

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// An event document: a JSON object with arbitrary fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventDocument {
    fields: Map<String, Value>,
}

impl EventDocument {
    /// Wrap a JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Parse a JSON object from text.
    ///
    /// Anything other than a JSON object is rejected.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(other) => Err(ReplicationError::parse(
                "<unsaved>",
                format!("event payload must be a JSON object, got {}", json_type_name(&other)),
            )),
            Err(e) => Err(ReplicationError::parse(
                "<unsaved>",
                format!("event payload is not valid JSON: {}", e),
            )),
        }
    }

    /// Build a document with the two guaranteed fields (handy for tests).
    pub fn with_event(reporter_id: &str, timestamp: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(REPORTER_ID_FIELD.to_string(), Value::String(reporter_id.to_string()));
        fields.insert(TIMESTAMP_FIELD.to_string(), Value::String(timestamp.to_string()));
        Self { fields }
    }

    /// Add or replace a field.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_field(mut self, field: impl Into<String>, value: Value) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// A field's value if it is a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// The raw `Timestamp` text, if present and textual.
    pub fn timestamp(&self) -> Option<&str> {
        self.get_str(TIMESTAMP_FIELD)
    }

    /// The `ReporterId`, rendered as text.
    ///
    /// Numeric ids are accepted and rendered in their JSON form.
    pub fn reporter_id(&self) -> Option<String> {
        match self.fields.get(REPORTER_ID_FIELD)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// A printable id for log context.
    ///
    /// Understands MongoDB's extended JSON `{"$oid": "..."}`.
    pub fn id(&self) -> String {
        match self.fields.get(ID_FIELD) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(obj)) => match obj.get("$oid").and_then(Value::as_str) {
                Some(oid) => oid.to_string(),
                None => Value::Object(obj.clone()).to_string(),
            },
            Some(other) => other.to_string(),
            None => "<no id>".to_string(),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Compact JSON serialization (the cache value).
    pub fn to_json_string(&self) -> String {
        // Map<String, Value> serialization cannot fail.
        Value::Object(self.fields.clone()).to_string()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Query vocabulary
// ═══════════════════════════════════════════════════════════════════════════════

/// Document selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every document.
    MatchAll,
    /// Documents whose string `field` is strictly greater than `value`.
    GreaterThan { field: String, value: String },
}

impl Filter {
    /// Evaluate the filter against a document.
    ///
    /// `GreaterThan` compares strings lexically and never matches a document
    /// whose field is missing or not a string (MongoDB's type-bracketed `$gt`).
    pub fn matches(&self, document: &EventDocument) -> bool {
        match self {
            Filter::MatchAll => true,
            Filter::GreaterThan { field, value } => document
                .get_str(field)
                .is_some_and(|actual| actual > value.as_str()),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Single-field sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    /// Compare two documents by the sort field.
    ///
    /// Missing/non-string values sort before strings (ascending).
    pub fn compare(&self, a: &EventDocument, b: &EventDocument) -> Ordering {
        let ordering = a.get_str(&self.field).cmp(&b.get_str(&self.field));
        match self.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

/// A filter plus sort, as issued to [`DocumentStore::find`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Sort,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DocumentStore trait
// ═══════════════════════════════════════════════════════════════════════════════

/// What the replicator (and the ingestor) need from the document store.
pub trait DocumentStore: Send + Sync + 'static {
    /// Run a query and materialize the full, ordered result.
    ///
    /// The batch is unbounded: a very large backlog is fetched in one go.
    fn find(&self, query: Query) -> BoxFuture<'_, Vec<EventDocument>>;

    /// Append a document.
    fn insert(&self, document: EventDocument) -> BoxFuture<'_, ()>;
}

/// An in-memory document store for standalone mode and tests.
///
/// Query semantics match [`Filter::matches`] and [`Sort::compare`]; ties keep
/// insertion order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<Vec<EventDocument>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with documents.
    pub fn with_documents(documents: Vec<EventDocument>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Snapshot of all documents in insertion order.
    pub async fn all(&self) -> Vec<EventDocument> {
        self.documents.read().await.clone()
    }
}

impl DocumentStore for InMemoryStore {
    fn find(&self, query: Query) -> BoxFuture<'_, Vec<EventDocument>> {
        Box::pin(async move {
            let documents = self.documents.read().await;
            let mut batch: Vec<EventDocument> = documents
                .iter()
                .filter(|d| query.filter.matches(d))
                .cloned()
                .collect();
            batch.sort_by(|a, b| query.sort.compare(a, b));
            Ok(batch)
        })
    }

    fn insert(&self, document: EventDocument) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            tracing::trace!(document_id = %document.id(), "InMemory: inserting document");
            self.documents.write().await.push(document);
            Ok(())
        })
    }
}
