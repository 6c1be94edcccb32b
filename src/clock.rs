use std::time::{SystemTime, UNIX_EPOCH};

/// Wall clock in unix seconds, saturating at u32::MAX (year 2106).
pub(crate) fn unix_seconds() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}
