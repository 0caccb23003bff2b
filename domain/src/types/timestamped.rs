use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct TimeStamped<T> {
    pub data: T,
    pub utc_timestamp: DateTime<Utc>,
}

impl<T> TimeStamped<T> {
    pub fn now(data: T) -> Self {
        Self {
            data,
            utc_timestamp: Utc::now(),
        }
    }
}
