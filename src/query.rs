//! Incremental query construction.
//!
//! Each iteration asks the store only for documents strictly newer than the
//! watermark, oldest first:
//!
//! ```text
//! no watermark  →  find({})                              sort { Timestamp: 1 }
//! watermark W   →  find({ Timestamp: { $gt: "W" } })     sort { Timestamp: 1 }
//! ```
//!
//! The comparison is on raw strings. It is only correct when the store and
//! checkpoint formats satisfy the lexical ordering contract enforced by
//! [`crate::timestamp::TimestampCodec::validate`].
//!
//! Because the bound is strict, a document stored later with a timestamp
//! *equal* to the current watermark is never selected.

use crate::checkpoint::Watermark;
use crate::store::{Filter, Query, Sort, TIMESTAMP_FIELD};

/// Filter selecting documents newer than `watermark` (all if `None`).
pub fn build_filter(watermark: Option<&Watermark>) -> Filter {
    match watermark {
        None => Filter::MatchAll,
        Some(w) => Filter::GreaterThan {
            field: TIMESTAMP_FIELD.to_string(),
            value: w.as_str().to_string(),
        },
    }
}

/// The full query for one iteration: filter plus ascending timestamp sort.
pub fn incremental_query(watermark: Option<&Watermark>) -> Query {
    Query {
        filter: build_filter(watermark),
        sort: Sort::ascending(TIMESTAMP_FIELD),
    }
}
