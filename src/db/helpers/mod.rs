use std::convert::TryFrom;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;

use crate::db::models::UNRATED;

pub fn to_i32(value: i64, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| anyhow!("{field} value {value} exceeds i32 range"))
}

/// Accepts the unrated sentinel or a value on the 0..=5 scale.
pub fn parse_quality(value: i64, field: &str) -> Result<i32> {
    let quality = to_i32(value, field)?;
    if quality != UNRATED && !(0..=5).contains(&quality) {
        bail!("{field} contains out-of-range value {quality}");
    }
    Ok(quality)
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
