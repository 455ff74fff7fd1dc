//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for all inputs,
//! helping catch edge cases that unit tests might miss.

use chrono::{DateTime, TimeZone, Utc};
use event_replicator::checkpoint::Watermark;
use event_replicator::key::KeyDeriver;
use event_replicator::query::build_filter;
use event_replicator::store::EventDocument;
use event_replicator::timestamp::{self, TimestampCodec, TimestampFormat};
use proptest::prelude::*;

const ISO_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

fn iso() -> TimestampFormat {
    TimestampFormat::new(ISO_MILLIS).unwrap()
}

fn codec() -> TimestampCodec {
    TimestampCodec::new(iso(), iso(), TimestampFormat::new("%Y%m%d%H%M%S").unwrap())
}

/// Millisecond instants between 1970 and 9999.
fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..253_402_300_799_999).prop_map(|ms| Utc.timestamp_millis_opt(ms).unwrap())
}

// =============================================================================
// Timestamp Codec Properties
// =============================================================================

proptest! {
    /// Formatting then parsing with the store format is lossless (ms precision).
    #[test]
    fn iso_format_round_trips(t in instant()) {
        let rendered = timestamp::format(&t, &iso()).unwrap();
        prop_assert_eq!(timestamp::parse(&rendered, &iso()).unwrap(), t);
    }

    /// Second-precision formats round-trip the instant truncated to seconds.
    #[test]
    fn second_precision_formats_round_trip(t in instant()) {
        let truncated = Utc.timestamp_opt(t.timestamp(), 0).unwrap();
        for f in ["%Y%m%d%H%M%S", "%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
            let format = TimestampFormat::new(f).unwrap();
            let rendered = timestamp::format(&t, &format).unwrap();
            prop_assert_eq!(timestamp::parse(&rendered, &format).unwrap(), truncated);
        }
    }

    /// ISO rendering preserves order: a < b implies render(a) < render(b).
    #[test]
    fn iso_rendering_is_lexically_monotonic(a in instant(), b in instant()) {
        prop_assume!(a != b);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let lo_s = timestamp::format(&lo, &iso()).unwrap();
        let hi_s = timestamp::format(&hi, &iso()).unwrap();
        prop_assert!(lo_s < hi_s, "{} !< {}", lo_s, hi_s);
    }

    /// Parsing arbitrary text never panics.
    #[test]
    fn parse_arbitrary_text_no_panic(raw in ".{0,40}") {
        let _ = timestamp::parse(&raw, &iso());
    }
}

// =============================================================================
// Key Derivation Properties
// =============================================================================

proptest! {
    /// The same document always yields the same key.
    #[test]
    fn derive_key_is_deterministic(reporter in "[A-Za-z0-9_-]{1,16}", t in instant(), extra in any::<i64>()) {
        let deriver = KeyDeriver::new(codec());
        let ts = timestamp::format(&t, &iso()).unwrap();
        let doc = EventDocument::with_event(&reporter, &ts).with_field("x", serde_json::json!(extra));

        let k1 = deriver.derive_key(&doc).unwrap();
        let k2 = deriver.derive_key(&doc.clone()).unwrap();
        prop_assert_eq!(&k1, &k2);
        let prefix = format!("{}:", reporter);
        prop_assert!(k1.starts_with(&prefix));
        prop_assert_eq!(k1.len(), reporter.len() + 1 + 14);
    }

    /// Payload fields never influence the key.
    #[test]
    fn derive_key_ignores_payload(reporter in "[a-z]{1,8}", t in instant(), a in any::<u32>(), b in any::<u32>()) {
        let deriver = KeyDeriver::new(codec());
        let ts = timestamp::format(&t, &iso()).unwrap();
        let d1 = EventDocument::with_event(&reporter, &ts).with_field("p", serde_json::json!(a));
        let d2 = EventDocument::with_event(&reporter, &ts).with_field("p", serde_json::json!(b));
        prop_assert_eq!(deriver.derive_key(&d1).unwrap(), deriver.derive_key(&d2).unwrap());
    }
}

// =============================================================================
// Filter Properties
// =============================================================================

proptest! {
    /// With a watermark, a document matches iff its timestamp is strictly newer.
    #[test]
    fn filter_matches_iff_strictly_newer(w in instant(), t in instant()) {
        let watermark = Watermark::new(timestamp::format(&w, &iso()).unwrap()).unwrap();
        let doc = EventDocument::with_event("r", &timestamp::format(&t, &iso()).unwrap());
        prop_assert_eq!(build_filter(Some(&watermark)).matches(&doc), t > w);
    }

    /// Without a watermark every document matches.
    #[test]
    fn no_watermark_matches_everything(t in instant(), reporter in "[a-z]{0,8}") {
        let doc = EventDocument::with_event(&reporter, &timestamp::format(&t, &iso()).unwrap());
        prop_assert!(build_filter(None).matches(&doc));
    }
}

// =============================================================================
// Format Validation
// =============================================================================

#[test]
fn validation_accepts_zero_padded_iso() {
    assert!(codec().validate().is_ok());
}

#[test]
fn validation_rejects_day_first_format() {
    let day_first = TimestampFormat::new("%d/%m/%Y %H:%M:%S").unwrap();
    let codec = TimestampCodec::new(day_first.clone(), day_first, TimestampFormat::new("%Y%m%d%H%M%S").unwrap());
    assert_eq!(codec.validate().unwrap_err().kind(), "config");
}

#[test]
fn validation_rejects_unpadded_format() {
    let unpadded = TimestampFormat::new("%Y-%-m-%-dT%-H:%M:%S").unwrap();
    let codec = TimestampCodec::new(unpadded.clone(), unpadded, TimestampFormat::new("%Y%m%d%H%M%S").unwrap());
    assert!(codec.validate().is_err());
}

#[test]
fn validation_rejects_mismatched_checkpoint_format() {
    let codec = TimestampCodec::new(
        iso(),
        TimestampFormat::new("%Y-%m-%dT%H:%M:%SZ").unwrap(),
        TimestampFormat::new("%Y%m%d%H%M%S").unwrap(),
    );
    assert!(codec.validate().is_err());
}
