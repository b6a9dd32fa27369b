//! Duration grammar for `./zen`
//!
//! `t?` followed by optional `<N>h`, `<N>m`, `<N>s` components in that
//! order, e.g. `1h30m`, `t45m`, `90s`. At least one component is required
//! and the total must be positive.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use crate::error::DurationError;

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^t?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").expect("duration regex is valid")
});

/// Largest accepted duration, roughly 292 years
pub const MAX_SECS: u64 = (i64::MAX / 1_000_000_000) as u64;

/// Parse duration text such as `1h30m`
pub fn parse(text: &str) -> Result<Duration, DurationError> {
    let text = text.trim();
    let caps = DURATION
        .captures(text)
        .ok_or_else(|| DurationError::Invalid(text.to_string()))?;

    if caps.iter().skip(1).all(|c| c.is_none()) {
        return Err(DurationError::Empty);
    }

    let mut total: u64 = 0;
    for (index, unit_secs) in [(1, 3600u64), (2, 60), (3, 1)] {
        let Some(component) = caps.get(index) else {
            continue;
        };
        let value: u64 = component
            .as_str()
            .parse()
            .map_err(|_| DurationError::Overflow)?;
        total = value
            .checked_mul(unit_secs)
            .and_then(|secs| total.checked_add(secs))
            .ok_or(DurationError::Overflow)?;
    }

    if total == 0 {
        return Err(DurationError::Zero);
    }
    if total > MAX_SECS {
        return Err(DurationError::Overflow);
    }

    Ok(Duration::from_secs(total))
}
