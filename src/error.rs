// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the event replicator.
//!
//! Errors are categorized by the collaborator they came from (document store,
//! cache, configuration) and carry enough context (offending key or document
//! id) to diagnose from the operational log alone.
//!
//! # Error Categories
//!
//! | Error Type | Kind label | Description |
//! |------------|------------|-------------|
//! | `Connection` | `connection` | Store or cache unreachable |
//! | `Parse` | `parse` | Document timestamp/reporter cannot be interpreted |
//! | `Query` | `query` | Document store query failed |
//! | `Write` | `write` | Cache or store write failed |
//! | `WatermarkRegression` | `watermark_regression` | New watermark would not advance |
//! | `Config` | `config` | Configuration invalid |
//! | `InvalidState` | `invalid_state` | Engine lifecycle misuse |
//! | `Internal` | `internal` | Unexpected internal error |
//!
//! # No Retry Layer
//!
//! Every error is terminal for the replication loop. Operators restart the
//! process, which resumes from the last durable watermark. Because the
//! watermark is only written after a full batch, a restart re-delivers at
//! most one batch (at-least-once).

use thiserror::Error;

/// Result type alias for replicator operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors that can occur while ingesting or replicating events.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// Store or cache unreachable, at startup or during an operation.
    #[error("Connection error ({target}): {message}")]
    Connection { target: String, message: String },

    /// A document could not be interpreted.
    ///
    /// Raised when `Timestamp` does not parse with the store format or when
    /// `ReporterId` is missing. Fatal to the whole batch: skipping the record
    /// could advance the watermark past data that was never cached.
    #[error("Parse error (document {document_id}): {message}")]
    Parse {
        document_id: String,
        message: String,
    },

    /// Document store query failed.
    #[error("Query error: {message}")]
    Query { message: String },

    /// Cache (or store insert) write failed.
    #[error("Write error ({key}): {message}")]
    Write { key: String, message: String },

    /// The proposed watermark does not strictly exceed the previous one.
    ///
    /// Only reachable with inconsistent timestamp formats.
    #[error("Watermark regression: {proposed} does not advance past {previous}")]
    WatermarkRegression { previous: String, proposed: String },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine state machine violation.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReplicationError {
    /// Create a connection error for a named collaborator.
    pub fn connection(target: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Connection {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse error for a document.
    pub fn parse(document_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            document_id: document_id.into(),
            message: message.into(),
        }
    }

    /// Create a query error.
    pub fn query(message: impl std::fmt::Display) -> Self {
        Self::Query {
            message: message.to_string(),
        }
    }

    /// Create a write error for a key.
    pub fn write(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Write {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Parse { .. } => "parse",
            Self::Query { .. } => "query",
            Self::Write { .. } => "write",
            Self::WatermarkRegression { .. } => "watermark_regression",
            Self::Config(_) => "config",
            Self::InvalidState { .. } => "invalid_state",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_formatting() {
        let err = ReplicationError::connection("redis", "connection refused");
        assert_eq!(err.kind(), "connection");
        let msg = err.to_string();
        assert!(msg.contains("redis"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_parse_error_names_document() {
        let err = ReplicationError::parse("65f0c0ffee", "unparseable Timestamp");
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("65f0c0ffee"));
    }

    #[test]
    fn test_write_error_names_key() {
        let err = ReplicationError::write("reporter-7:20240101120000", "READONLY");
        assert_eq!(err.kind(), "write");
        assert!(err.to_string().contains("reporter-7:20240101120000"));
    }

    #[test]
    fn test_watermark_regression_formatting() {
        let err = ReplicationError::WatermarkRegression {
            previous: "2024-01-02".to_string(),
            proposed: "2024-01-01".to_string(),
        };
        assert_eq!(err.kind(), "watermark_regression");
        let msg = err.to_string();
        assert!(msg.contains("2024-01-02"));
        assert!(msg.contains("2024-01-01"));
    }

    #[test]
    fn test_invalid_state_formatting() {
        let err = ReplicationError::InvalidState {
            expected: "Created".to_string(),
            actual: "Running".to_string(),
        };
        assert_eq!(err.kind(), "invalid_state");
        assert!(err.to_string().contains("Created"));
        assert!(err.to_string().contains("Running"));
    }

    #[test]
    fn test_kind_labels_are_distinct() {
        let errors = [
            ReplicationError::connection("x", "y"),
            ReplicationError::parse("x", "y"),
            ReplicationError::query("x"),
            ReplicationError::write("x", "y"),
            ReplicationError::Config("x".into()),
            ReplicationError::Internal("x".into()),
        ];
        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }
}
