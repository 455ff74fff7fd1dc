//! Cache key derivation.
//!
//! A replicated record is stored under
//! `<ReporterId>:<Timestamp rendered with the cache-key format>`, which makes
//! point lookups by reporter and time possible and makes re-delivery of the
//! same document overwrite the same key.

use crate::error::{ReplicationError, Result};
use crate::store::{EventDocument, REPORTER_ID_FIELD, TIMESTAMP_FIELD};
use crate::timestamp::TimestampCodec;
use chrono::{DateTime, Utc};

/// Derives cache keys from documents.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    codec: TimestampCodec,
}

impl KeyDeriver {
    pub fn new(codec: TimestampCodec) -> Self {
        Self { codec }
    }

    /// Parse a document's `Timestamp` with the store format.
    ///
    /// Fails when the field is missing, not a string, or unparseable.
    pub fn document_instant(&self, document: &EventDocument) -> Result<DateTime<Utc>> {
        let raw = document.timestamp().ok_or_else(|| {
            ReplicationError::parse(
                document.id(),
                format!("missing or non-string {} field", TIMESTAMP_FIELD),
            )
        })?;
        self.codec.parse_store(raw).map_err(|e| {
            ReplicationError::parse(
                document.id(),
                format!(
                    "{} {:?} does not match format {:?}: {}",
                    TIMESTAMP_FIELD,
                    raw,
                    self.codec.store_format().as_str(),
                    e
                ),
            )
        })
    }

    /// Derive the cache key for a document.
    pub fn derive_key(&self, document: &EventDocument) -> Result<String> {
        let reporter_id = document.reporter_id().ok_or_else(|| {
            ReplicationError::parse(document.id(), format!("missing {} field", REPORTER_ID_FIELD))
        })?;
        let instant = self.document_instant(document)?;
        let suffix = self.codec.format_cache_key(&instant)?;
        Ok(format!("{}:{}", reporter_id, suffix))
    }
}
