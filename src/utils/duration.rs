use std::time::Duration;

use crate::bot::error::Error;

const UNITS: &[(&str, u64)] = &[
    ("week", 7 * 24 * 60 * 60),
    ("day", 24 * 60 * 60),
    ("hour", 60 * 60),
    ("minute", 60),
    ("second", 1),
];

/// Most components shown by `humanize`
const MAX_COMPONENTS: usize = 2;

/// Format a duration for case notes and log messages, e.g. "2 days, 3 hours"
pub fn humanize(duration: Duration) -> String {
    let mut remaining = duration.as_secs();
    let mut parts = Vec::new();

    for (name, secs) in UNITS {
        if parts.len() == MAX_COMPONENTS {
            break;
        }
        let count = remaining / secs;
        if count == 0 {
            continue;
        }
        parts.push(format!("{} {}{}", count, name, if count == 1 { "" } else { "s" }));
        remaining -= count * secs;
    }

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(", ")
    }
}

/// Parse a duration argument such as `90s`, `1h30m` or `2w`
pub fn parse(input: &str) -> Result<Duration, Error> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidDuration("empty duration".to_string()));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit_secs = match c.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            'w' => 7 * 24 * 60 * 60,
            c if c.is_whitespace() => continue,
            other => {
                return Err(Error::InvalidDuration(format!(
                    "unknown unit '{}' in \"{}\"",
                    other, input
                )))
            }
        };

        if digits.is_empty() {
            return Err(Error::InvalidDuration(format!(
                "missing number before '{}' in \"{}\"",
                c, input
            )));
        }

        let count: u64 = digits
            .parse()
            .map_err(|_| Error::InvalidDuration(format!("number too large in \"{}\"", input)))?;
        digits.clear();

        total = count
            .checked_mul(unit_secs)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| Error::InvalidDuration(format!("\"{}\" is too long", input)))?;
    }

    if !digits.is_empty() {
        return Err(Error::InvalidDuration(format!(
            "missing unit after {} in \"{}\"",
            digits, input
        )));
    }

    Ok(Duration::from_secs(total))
}
