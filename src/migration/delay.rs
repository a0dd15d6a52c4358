//! Residual Delay Calculation

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Time left until `resume_at`, measured from `now`.
///
/// A resume time in the past yields `Duration::ZERO`, so overdue runs are
/// scheduled immediately.
pub fn residual_delay(resume_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (resume_at - now).to_std().unwrap_or(Duration::ZERO)
}
