//! Scan session identifiers.
//!
//! Every scan start and every explicit stop advances a single monotonic
//! counter. Deferred actions capture the value current when they were armed
//! and compare it against the live value before acting; a mismatch means a
//! newer start or a stop happened in the meantime and the action is stale.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of one scan attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
#[schema(value_type = u64, example = 7)]
pub struct SessionId(u64);

impl SessionId {
    /// The raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic session counter.
///
/// The only mutation is [`advance`](Self::advance), an atomic
/// increment-and-read, so concurrent starts and stops never lose an update
/// and never hand out the same id twice.
#[derive(Debug, Default)]
pub struct SessionCounter {
    value: AtomicU64,
}

impl SessionCounter {
    /// A counter whose current value is session 0 (no scan yet).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Invalidate the current session and return the new one.
    pub fn advance(&self) -> SessionId {
        SessionId(self.value.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The latest session handed out.
    #[must_use]
    pub fn current(&self) -> SessionId {
        SessionId(self.value.load(Ordering::SeqCst))
    }

    /// Whether `session` is still the latest one.
    #[must_use]
    pub fn is_current(&self, session: SessionId) -> bool {
        self.current() == session
    }
}
