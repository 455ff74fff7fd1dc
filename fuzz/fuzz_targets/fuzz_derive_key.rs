//! Fuzz target for cache key derivation.
//!
//! Arbitrary JSON documents must yield either a key or a parse error, and
//! a derived key must be stable and prefixed by the reporter id.

#![no_main]

use event_replicator::key::KeyDeriver;
use event_replicator::store::EventDocument;
use event_replicator::timestamp::{TimestampCodec, TimestampFormat};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(document) = EventDocument::from_json_str(raw) else {
        return;
    };

    let iso = TimestampFormat::new("%Y-%m-%dT%H:%M:%S%.3fZ").expect("valid format");
    let key_format = TimestampFormat::new("%Y%m%d%H%M%S").expect("valid format");
    let deriver = KeyDeriver::new(TimestampCodec::new(iso.clone(), iso, key_format));

    match deriver.derive_key(&document) {
        Ok(key) => {
            let reporter = document.reporter_id().expect("key implies reporter");
            assert!(key.starts_with(&format!("{}:", reporter)));
            assert_eq!(deriver.derive_key(&document).ok(), Some(key));
        }
        Err(e) => assert_eq!(e.kind(), "parse"),
    }
});
