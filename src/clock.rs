use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Source of the current time.
///
/// The manual variant is shared between clones so tests can move time
/// forward for every component holding the clock.
#[derive(Clone, Debug, Default)]
pub enum Clock {
    /// Wall-clock time
    #[default]
    System,
    /// Manually controlled time for testing
    Manual(Arc<Mutex<DateTime<Utc>>>),
}

impl Clock {
    /// Create a manual clock frozen at `now`
    #[must_use]
    pub fn manual(now: DateTime<Utc>) -> Self {
        Self::Manual(Arc::new(Mutex::new(now)))
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System => Utc::now(),
            Self::Manual(now) => *now.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }

    /// Set the current time (manual clock only)
    pub fn set(&self, to: DateTime<Utc>) {
        if let Self::Manual(now) = self {
            *now.lock().unwrap_or_else(|e| e.into_inner()) = to;
        }
    }

    /// Move the current time forward (manual clock only)
    pub fn advance(&self, by: Duration) {
        if let Self::Manual(now) = self {
            let mut guard = now.lock().unwrap_or_else(|e| e.into_inner());
            *guard += by;
        }
    }
}
