use chrono::{DateTime, Utc};

pub mod comment;
pub mod media;
pub mod post;

/// Reddit timestamps are float seconds. Anything not representable maps to the epoch.
pub fn datetime_from_secs(secs: f64) -> DateTime<Utc> {
    if !secs.is_finite() {
        return DateTime::default();
    }
    DateTime::from_timestamp(secs.trunc() as i64, 0).unwrap_or_default()
}
