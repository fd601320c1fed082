// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Millisecond timestamp of `now`, bumped past every id in `existing` so
    /// two records created within the same millisecond never collide.
    pub fn generate<I>(now: OffsetDateTime, existing: I) -> Self
    where
        I: IntoIterator<Item = RecordId>,
    {
        let millis = i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX);
        let floor = existing
            .into_iter()
            .map(|id| id.0.saturating_add(1))
            .max()
            .unwrap_or(i64::MIN);
        Self(millis.max(floor))
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::RecordId;
    use time::macros::datetime;

    #[test]
    fn generate_uses_millisecond_clock() {
        let now = datetime!(2024-08-12 10:00:00 UTC);
        let id = RecordId::generate(now, []);
        assert_eq!(id.get(), 1_723_456_800_000);
    }

    #[test]
    fn generate_skips_past_existing_ids() {
        let now = datetime!(2024-08-12 10:00:00 UTC);
        let taken = RecordId::new(1_723_456_800_000);
        let id = RecordId::generate(now, [RecordId::new(1), taken]);
        assert_eq!(id.get(), taken.get() + 1);
    }
}
