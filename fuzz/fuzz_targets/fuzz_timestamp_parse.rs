//! Fuzz target for timestamp parsing and formatting.
//!
//! Arbitrary (input, format) pairs must never panic, and anything that
//! parses with the default store format must round-trip.

#![no_main]

use event_replicator::timestamp::{format, parse, TimestampFormat};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str)| {
    let (raw, fmt) = data;

    // Arbitrary formats: construction may fail, nothing may panic.
    if let Ok(custom) = TimestampFormat::new(fmt) {
        if let Ok(instant) = parse(raw, &custom) {
            let _ = format(&instant, &custom);
        }
    }

    let iso = match TimestampFormat::new("%Y-%m-%dT%H:%M:%S%.3fZ") {
        Ok(f) => f,
        Err(_) => return,
    };
    if let Ok(instant) = parse(raw, &iso) {
        let rendered = format(&instant, &iso).expect("valid format renders");
        let reparsed = parse(&rendered, &iso).expect("rendered value parses");
        assert_eq!(
            reparsed.timestamp_millis(),
            instant.timestamp_millis(),
            "round trip changed the instant"
        );
    }
});
