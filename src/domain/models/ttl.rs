//! Entry lifetime as reported by the store.

use serde::{Deserialize, Serialize};

/// Remaining lifetime of a cache entry as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "seconds")]
pub enum TtlStatus {
    /// Entry exists and expires after this many seconds.
    Expires(u64),
    /// Entry exists without an expiry.
    Persistent,
    /// No entry under the key.
    Absent,
}

impl TtlStatus {
    /// Interpret the store's TTL reply (`-1` no expiry, `-2` absent).
    pub fn from_store_reply(reply: i64) -> Self {
        match reply {
            -1 => Self::Persistent,
            r if r < 0 => Self::Absent,
            r => Self::Expires(r.unsigned_abs()),
        }
    }

    /// True unless the entry is absent.
    pub const fn exists(self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Remaining seconds of an expiring entry.
    pub const fn seconds(self) -> Option<u64> {
        match self {
            Self::Expires(s) => Some(s),
            _ => None,
        }
    }
}
