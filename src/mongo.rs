//! MongoDB-backed [`DocumentStore`].
//!
//! Translates the replicator's query vocabulary into MongoDB filter and sort
//! documents and converts BSON documents to relaxed extended JSON, so the
//! cache value looks like the document as the store would print it
//! (`{"_id": {"$oid": "..."}, ...}`).

use crate::config::StoreConfig;
use crate::error::{ReplicationError, Result};
use crate::store::{BoxFuture, Direction, DocumentStore, EventDocument, Filter, Query, Sort};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection};
use serde_json::Value;
use tracing::{debug, info};

/// A MongoDB collection of event documents.
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect and verify the deployment answers a `ping`.
    ///
    /// The driver connects lazily, so the ping is what surfaces an
    /// unreachable store at startup.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.connection_string)
            .await
            .map_err(|e| ReplicationError::connection("mongodb", e))?;

        let database = client.database(&config.database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ReplicationError::connection("mongodb", e))?;

        info!(
            database = %config.database,
            collection = %config.collection,
            "Connected to document store"
        );

        Ok(Self {
            collection: database.collection::<Document>(&config.collection),
        })
    }
}

/// MongoDB filter document for a [`Filter`].
pub fn filter_document(filter: &Filter) -> Document {
    match filter {
        Filter::MatchAll => Document::new(),
        Filter::GreaterThan { field, value } => {
            let mut document = Document::new();
            document.insert(field.clone(), doc! { "$gt": value.clone() });
            document
        }
    }
}

/// MongoDB sort document for a [`Sort`].
pub fn sort_document(sort: &Sort) -> Document {
    let direction = match sort.direction {
        Direction::Ascending => 1,
        Direction::Descending => -1,
    };
    let mut document = Document::new();
    document.insert(sort.field.clone(), direction);
    document
}

/// Convert a BSON document to an [`EventDocument`] (relaxed extended JSON).
pub fn from_bson(document: Document) -> EventDocument {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(fields) => EventDocument::new(fields),
        // A BSON document always converts to a JSON object.
        _ => EventDocument::default(),
    }
}

/// Convert an [`EventDocument`] to BSON for insertion.
pub fn to_bson(document: &EventDocument) -> Result<Document> {
    mongodb::bson::to_document(document.fields())
        .map_err(|e| ReplicationError::parse(document.id(), format!("cannot convert to BSON: {}", e)))
}

impl DocumentStore for MongoStore {
    fn find(&self, query: Query) -> BoxFuture<'_, Vec<EventDocument>> {
        Box::pin(async move {
            let filter = filter_document(&query.filter);
            let sort = sort_document(&query.sort);
            debug!(filter = %filter, sort = %sort, "Querying document store");

            let cursor = self
                .collection
                .find(filter)
                .sort(sort)
                .await
                .map_err(ReplicationError::query)?;

            let documents: Vec<Document> = cursor.try_collect().await.map_err(ReplicationError::query)?;
            Ok(documents.into_iter().map(from_bson).collect())
        })
    }

    fn insert(&self, document: EventDocument) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let bson = to_bson(&document)?;
            self.collection
                .insert_one(bson)
                .await
                .map_err(|e| ReplicationError::write(self.collection.name(), e))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TIMESTAMP_FIELD;
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn test_filter_document_match_all() {
        assert!(filter_document(&Filter::MatchAll).is_empty());
    }

    #[test]
    fn test_filter_document_greater_than() {
        let filter = Filter::GreaterThan {
            field: TIMESTAMP_FIELD.to_string(),
            value: "2024-01-01T00:00:00.000Z".to_string(),
        };
        assert_eq!(
            filter_document(&filter),
            doc! { "Timestamp": { "$gt": "2024-01-01T00:00:00.000Z" } }
        );
    }

    #[test]
    fn test_sort_document() {
        assert_eq!(sort_document(&Sort::ascending(TIMESTAMP_FIELD)), doc! { "Timestamp": 1 });
        assert_eq!(sort_document(&Sort::descending(TIMESTAMP_FIELD)), doc! { "Timestamp": -1 });
    }

    #[test]
    fn test_from_bson_keeps_fields_and_oid() {
        let oid = ObjectId::new();
        let document = doc! {
            "_id": oid,
            "ReporterId": "r-9",
            "Timestamp": "2024-05-06T07:08:09.010Z",
            "Reading": 12.5,
        };
        let event = from_bson(document);
        assert_eq!(event.id(), oid.to_hex());
        assert_eq!(event.reporter_id().as_deref(), Some("r-9"));
        assert_eq!(event.timestamp(), Some("2024-05-06T07:08:09.010Z"));
        assert_eq!(event.get("Reading"), Some(&json!(12.5)));
    }

    #[test]
    fn test_to_bson() {
        let event = EventDocument::with_event("r-1", "2024-01-01").with_field("Count", json!(3));
        let document = to_bson(&event).unwrap();
        assert_eq!(document.get_str("ReporterId").unwrap(), "r-1");
        assert_eq!(document.get_str("Timestamp").unwrap(), "2024-01-01");
        assert!(document.contains_key("Count"));
    }
}
