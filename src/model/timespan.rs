// src/model/timespan.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ManualError, Result};

/// Declared form of a duration, e.g. `{ minutes = 15 }` or
/// `{ hours = 1, minutes = 30 }`.
///
/// Components are summed; any of them may be omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeSpan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
}

impl TimeSpan {
    pub fn minutes(minutes: u64) -> Self {
        Self {
            minutes: Some(minutes),
            ..Self::default()
        }
    }

    pub fn seconds(seconds: u64) -> Self {
        Self {
            seconds: Some(seconds),
            ..Self::default()
        }
    }

    /// Sum of all components in seconds, `None` if it does not fit a `u64`.
    pub fn total_seconds(&self) -> Option<u64> {
        let part = |v: Option<u64>, unit: u64| v.unwrap_or(0).checked_mul(unit);
        part(self.days, 86_400)?
            .checked_add(part(self.hours, 3_600)?)?
            .checked_add(part(self.minutes, 60)?)?
            .checked_add(self.seconds.unwrap_or(0))
    }

    pub fn to_duration(&self) -> Result<Duration> {
        self.total_seconds()
            .map(Duration::from_secs)
            .ok_or_else(|| ManualError::validation("time span", format!("{self:?} is too long")))
    }

    /// Normalised declared form of a resolved duration (whole seconds).
    pub fn from_duration(d: Duration) -> Self {
        let total = d.as_secs();
        let hours = total / 3_600;
        let minutes = (total % 3_600) / 60;
        let seconds = total % 60;

        let nonzero = |v: u64| (v > 0).then_some(v);
        let mut span = Self {
            days: None,
            hours: nonzero(hours),
            minutes: nonzero(minutes),
            seconds: nonzero(seconds),
        };
        if total == 0 {
            span.seconds = Some(0);
        }
        span
    }
}

impl TryFrom<TimeSpan> for Duration {
    type Error = ManualError;

    fn try_from(span: TimeSpan) -> Result<Self> {
        span.to_duration()
    }
}

/// Serde helpers for `Option<Duration>` fields in resolved views,
/// written as whole seconds.
pub(crate) mod opt_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }
}

pub(crate) mod secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}
