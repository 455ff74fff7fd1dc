// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Timestamp codec.
//!
//! Event timestamps exist in three textual shapes, each with its own
//! strftime-style format:
//!
//! | Role | Used for |
//! |------|----------|
//! | store | parsing the `Timestamp` field of stored documents |
//! | checkpoint | rendering the watermark kept in the cache |
//! | cache key | rendering the time suffix of derived cache keys |
//!
//! # Lexical Ordering Contract
//!
//! The incremental query compares the watermark against stored `Timestamp`
//! text with a plain string `>`. That is only correct when:
//!
//! 1. the store and checkpoint formats are *lexically monotonic* (a later
//!    instant never renders as a smaller string; zero-padded, most
//!    significant field first, e.g. ISO-8601), and
//! 2. the checkpoint format renders an instant exactly as the store format
//!    does, so the two strings are comparable at all.
//!
//! [`TimestampCodec::validate`] checks both against a fixed probe set of
//! instants that includes the usual single/double-digit rollovers.
//!
//! Inputs without an offset are interpreted as UTC.

use crate::config::FormatConfig;
use crate::error::{ReplicationError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::fmt::Write;
use tracing::warn;

/// Ascending probe instants: (year, month, day, hour, minute, second, milli).
///
/// Chosen so that every field crosses a 9 → 10 boundary and every field
/// changes on its own at least once. Whole seconds are followed by a
/// fractional instant in the same second, so formats that drop a zero
/// fraction (`%.f`) are caught.
const PROBES: [(i32, u32, u32, u32, u32, u32, u32); 18] = [
    (1999, 12, 31, 23, 59, 59, 999),
    (2000, 1, 1, 0, 0, 0, 0),
    (2000, 1, 1, 0, 0, 0, 5),
    (2000, 1, 1, 0, 0, 9, 0),
    (2000, 1, 1, 0, 0, 10, 0),
    (2000, 1, 1, 0, 0, 10, 500),
    (2000, 1, 1, 0, 9, 10, 0),
    (2000, 1, 1, 0, 10, 0, 0),
    (2000, 1, 1, 9, 0, 0, 0),
    (2000, 1, 1, 10, 0, 0, 0),
    (2000, 1, 9, 0, 0, 0, 0),
    (2000, 1, 10, 0, 0, 0, 0),
    (2000, 2, 1, 0, 0, 0, 0),
    (2000, 9, 30, 0, 0, 0, 0),
    (2000, 10, 1, 0, 0, 0, 0),
    (2009, 1, 1, 0, 0, 0, 0),
    (2010, 1, 1, 0, 0, 0, 0),
    (2024, 2, 29, 13, 45, 30, 500),
];

/// A validated strftime format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat(String);

impl TimestampFormat {
    /// Validate and wrap a format string.
    ///
    /// Rejects empty strings and specifiers chrono cannot interpret, so that
    /// formatting can never fail at replication time.
    pub fn new(format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        if format.is_empty() {
            return Err(ReplicationError::Config(
                "timestamp format must not be empty".to_string(),
            ));
        }
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(ReplicationError::Config(format!(
                "invalid timestamp format: {:?}",
                format
            )));
        }
        Ok(Self(format))
    }

    /// The raw format string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse `raw` with `format`.
///
/// Tries, in order: a full date-time with offset, a naive date-time (taken as
/// UTC), a bare date (midnight UTC).
pub fn parse(raw: &str, format: &TimestampFormat) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    let fmt = format.as_str();
    if let Ok(with_offset) = DateTime::parse_from_str(raw, fmt) {
        return Ok(with_offset.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(raw, fmt) {
        Ok(naive) => Ok(naive.and_utc()),
        Err(datetime_err) => match NaiveDate::parse_from_str(raw, fmt) {
            Ok(date) => Ok(date.and_time(NaiveTime::default()).and_utc()),
            Err(_) => Err(datetime_err),
        },
    }
}

/// Render `instant` with `format`.
pub fn format(instant: &DateTime<Utc>, format: &TimestampFormat) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", instant.format(format.as_str())).map_err(|_| {
        ReplicationError::Config(format!("cannot render timestamp with format {:?}", format.as_str()))
    })?;
    Ok(out)
}

/// The three role-specific formats, bundled.
#[derive(Debug, Clone)]
pub struct TimestampCodec {
    store: TimestampFormat,
    checkpoint: TimestampFormat,
    cache_key: TimestampFormat,
}

impl TimestampCodec {
    /// Build a codec from explicit formats (no consistency validation).
    pub fn new(store: TimestampFormat, checkpoint: TimestampFormat, cache_key: TimestampFormat) -> Self {
        Self {
            store,
            checkpoint,
            cache_key,
        }
    }

    /// Build and validate a codec from configuration.
    ///
    /// With `config.strict` a violation of the lexical ordering contract is a
    /// configuration error; otherwise it is logged and accepted.
    pub fn from_config(config: &FormatConfig) -> Result<Self> {
        let codec = Self::new(
            TimestampFormat::new(&config.store)?,
            TimestampFormat::new(&config.checkpoint)?,
            TimestampFormat::new(&config.cache_key)?,
        );

        if let Err(e) = codec.validate() {
            if config.strict {
                return Err(e);
            }
            warn!(error = %e, "Timestamp formats violate lexical ordering contract (strict mode off)");
        }

        Ok(codec)
    }

    pub fn store_format(&self) -> &TimestampFormat {
        &self.store
    }

    pub fn checkpoint_format(&self) -> &TimestampFormat {
        &self.checkpoint
    }

    pub fn cache_key_format(&self) -> &TimestampFormat {
        &self.cache_key
    }

    /// Parse a stored `Timestamp` value.
    pub fn parse_store(&self, raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
        parse(raw, &self.store)
    }

    /// Render an instant as a watermark string.
    pub fn format_checkpoint(&self, instant: &DateTime<Utc>) -> Result<String> {
        format(instant, &self.checkpoint)
    }

    /// Render an instant as a cache-key suffix.
    pub fn format_cache_key(&self, instant: &DateTime<Utc>) -> Result<String> {
        format(instant, &self.cache_key)
    }

    /// Check the lexical ordering contract (see module docs).
    pub fn validate(&self) -> Result<()> {
        let instants = probe_instants();
        let store = render_all(&instants, &self.store)?;
        let checkpoint = render_all(&instants, &self.checkpoint)?;

        ensure_monotonic("store", &self.store, &store)?;
        ensure_monotonic("checkpoint", &self.checkpoint, &checkpoint)?;

        if let Some((s, c)) = store.iter().zip(&checkpoint).find(|(s, c)| s != c) {
            return Err(ReplicationError::Config(format!(
                "checkpoint format {:?} renders {:?} where store format {:?} renders {:?}; \
                 watermarks would not be comparable with stored timestamps",
                self.checkpoint.as_str(),
                c,
                self.store.as_str(),
                s
            )));
        }

        Ok(())
    }
}

fn probe_instants() -> Vec<DateTime<Utc>> {
    PROBES
        .iter()
        .filter_map(|&(y, mo, d, h, mi, s, ms)| {
            NaiveDate::from_ymd_opt(y, mo, d)
                .and_then(|date| date.and_hms_milli_opt(h, mi, s, ms))
                .map(|naive| naive.and_utc())
        })
        .collect()
}

fn render_all(instants: &[DateTime<Utc>], fmt: &TimestampFormat) -> Result<Vec<String>> {
    instants.iter().map(|i| format(i, fmt)).collect()
}

fn ensure_monotonic(role: &str, fmt: &TimestampFormat, rendered: &[String]) -> Result<()> {
    if let Some(pair) = rendered.windows(2).find(|w| w[0] > w[1]) {
        return Err(ReplicationError::Config(format!(
            "{} format {:?} is not lexically monotonic: {:?} sorts after {:?}",
            role,
            fmt.as_str(),
            pair[0],
            pair[1]
        )));
    }
    if rendered.first() == rendered.last() {
        return Err(ReplicationError::Config(format!(
            "{} format {:?} does not distinguish instants",
            role,
            fmt.as_str()
        )));
    }
    Ok(())
}
