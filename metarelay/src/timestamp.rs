//! Unix timestamps for meta-transaction deadlines.
//!
//! A signed meta-transaction carries a `deadline` after which it can no longer
//! be executed. The deadline is a point in time compared against the
//! [`CallContext`](crate::types::CallContext) timestamp at verification; there
//! is no scheduled cancellation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::Add;
use std::time::SystemTime;

/// A Unix timestamp representing seconds since the Unix epoch (1970-01-01T00:00:00Z).
///
/// # Serialization
///
/// Serialized as a stringified integer to avoid loss of precision in JSON, since
/// `JavaScript`'s `Number` type cannot safely represent all 64-bit integers.
/// Bare JSON numbers are accepted on input.
///
/// ```json
/// "1699999999"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash, Default)]
pub struct UnixTimestamp(u64);

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(secs) => Ok(Self(secs)),
            Raw::Text(s) => s
                .parse::<u64>()
                .map(Self)
                .map_err(|_| serde::de::Error::custom("timestamp must be a non-negative integer")),
        }
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl From<UnixTimestamp> for alloy_primitives::U256 {
    fn from(value: UnixTimestamp) -> Self {
        Self::from(value.0)
    }
}

impl UnixTimestamp {
    /// Creates a new [`UnixTimestamp`] from a raw seconds value.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the current system time as a [`UnixTimestamp`].
    ///
    /// A clock set before the Unix epoch reads as zero.
    #[must_use]
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self(now)
    }

    /// Returns the timestamp as raw seconds since the Unix epoch.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Whether this deadline has passed at `now`.
    ///
    /// A deadline equal to `now` is still valid.
    #[must_use]
    pub fn is_expired_at(&self, now: Self) -> bool {
        *self < now
    }
}
