//! Engine state types.
//!
//! # State Transitions
//!
//! ```text
//!            start()                 shutdown trigger
//! Created ───────────→ Running ──────────────────────→ ShuttingDown
//!    │                    │                                 │
//!    │ shutdown()         │ (loop error)                    │ (batch finished)
//!    ↓                    ↓                                 ↓
//! Stopped              Failed                            Stopped
//! ```
//!
//! - **Created**: after `ReplicationEngine::new()`. Nothing is running.
//! - **Running**: the loop task is polling.
//! - **ShuttingDown**: shutdown requested; the in-flight batch is finishing.
//! - **Stopped**: the loop exited cleanly.
//! - **Failed**: the loop exited with an error. Restart the process to resume
//!   from the last persisted watermark.

/// State of the replication engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Engine created but not started.
    Created,

    /// Loop task running.
    Running,

    /// Shutdown requested, in-flight batch finishing.
    ShuttingDown,

    /// Loop exited cleanly.
    Stopped,

    /// Loop exited with an error.
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Created => write!(f, "Created"),
            EngineState::Running => write!(f, "Running"),
            EngineState::ShuttingDown => write!(f, "ShuttingDown"),
            EngineState::Stopped => write!(f, "Stopped"),
            EngineState::Failed => write!(f, "Failed"),
        }
    }
}

/// Where the loop is within one iteration.
///
/// ```text
/// Idle → Fetching → Persisting → Idle
///            │
///            └──(empty batch)──→ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Sleeping between polls (or not started).
    Idle,
    /// Reading the watermark and querying the store.
    Fetching,
    /// Writing records, then the watermark.
    Persisting,
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopPhase::Idle => write!(f, "Idle"),
            LoopPhase::Fetching => write!(f, "Fetching"),
            LoopPhase::Persisting => write!(f, "Persisting"),
        }
    }
}
