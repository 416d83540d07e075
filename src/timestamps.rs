//! Normalization of exchange timestamps.
//!
//! Candle times arrive as epoch seconds, order times as RFC 3339 strings
//! (`2020-03-31T17:19:03.162429Z`), and both end up as `DateTime<Utc>` so
//! they can be compared directly.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::{BotError, Result};

/// Parse an exchange datetime string into UTC.
///
/// Strings without an offset are taken to be UTC already.
pub fn parse_exchange_datetime(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Convert candle epoch seconds into UTC.
pub fn epoch_to_utc(epoch_secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(epoch_secs, 0)
        .ok_or_else(|| BotError::InvalidParameter(format!("epoch {epoch_secs} out of range")))
}
