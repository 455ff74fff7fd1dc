//! Tracing setup shared by `event-replicator` and `event-ingest`.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `RUST_LOG` | filter directives; default `info` |
//! | `REPLICATOR_DEBUG=true` | human-readable text, default level `debug` |
//!
//! Without `REPLICATOR_DEBUG` every event is one flattened JSON object per
//! line, so fields such as `key`, `watermark` and `document_id` sit at the top
//! level of the record.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::PanicHookInfo;
use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Environment variable selecting text output at debug level.
pub const DEBUG_ENV: &str = "REPLICATOR_DEBUG";

fn panic_message<'a>(panic_info: &'a PanicHookInfo<'_>) -> Option<&'a str> {
    let payload = panic_info.payload();
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

/// Log a panic as a single `error` event.
///
/// A panicking write task would otherwise print to stderr outside the JSON
/// stream. The backtrace is attached only when `RUST_BACKTRACE` enables it.
fn report_panic(panic_info: &PanicHookInfo<'_>) {
    let backtrace = Backtrace::capture();
    let location = panic_info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "<unknown>".to_string());
    let message = panic_message(panic_info).unwrap_or("<non-string panic payload>");

    if backtrace.status() == BacktraceStatus::Captured {
        tracing::error!(%location, panic = message, %backtrace, "Panic");
    } else {
        tracing::error!(%location, panic = message, "Panic");
    }
}

fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Install the global subscriber and panic hook.
///
/// Calling it twice is harmless: the second subscriber is ignored and the
/// hook is only installed once.
pub fn init() {
    let debug_mode = debug_mode();
    let default_level = if debug_mode { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let layer = if debug_mode {
        fmt::layer().with_target(false).boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed()
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_ok();

    if installed {
        std::panic::set_hook(Box::new(report_panic));
    }
}
