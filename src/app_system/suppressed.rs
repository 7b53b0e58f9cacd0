use std::fmt::Display;
use std::sync::{Arc, Mutex};

use tracing::warn;

/// Where a swallowed failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressedKind {
    Load,
    Persist,
    Decode,
    Connect,
    Connection,
    Notification,
    Audio,
    StatusUpdate,
    /// The cache service stopped answering.
    Cache,
}

/// A failure that was logged instead of propagated.
#[derive(Debug, Clone, PartialEq)]
pub struct Suppressed {
    pub kind: SuppressedKind,
    pub message: String,
}

/// Single seam for every error the dashboard deliberately does not surface.
///
/// All fire-and-forget paths report here so that the failure is always
/// logged, and so tests can assert on exactly what was swallowed.
#[derive(Clone, Default)]
pub struct Suppressor {
    recorded: Option<Arc<Mutex<Vec<Suppressed>>>>,
}

impl Suppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A suppressor that also keeps every report for later inspection.
    pub fn recording() -> (Self, SuppressedLog) {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                recorded: Some(recorded.clone()),
            },
            SuppressedLog { recorded },
        )
    }

    pub fn report(&self, kind: SuppressedKind, error: impl Display) {
        let message = error.to_string();
        warn!(kind = ?kind, error = %message, "Suppressed failure");

        if let Some(recorded) = &self.recorded {
            if let Ok(mut recorded) = recorded.lock() {
                recorded.push(Suppressed { kind, message });
            }
        }
    }
}

/// Read side of a recording [`Suppressor`].
#[derive(Clone)]
pub struct SuppressedLog {
    recorded: Arc<Mutex<Vec<Suppressed>>>,
}

impl SuppressedLog {
    pub fn entries(&self) -> Vec<Suppressed> {
        self.recorded
            .lock()
            .map(|recorded| recorded.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: SuppressedKind) -> usize {
        self.entries().iter().filter(|s| s.kind == kind).count()
    }
}
