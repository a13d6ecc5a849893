//! Simulated time and unit parsing.
//!
//! The model follows the gem5 convention of one tick per picosecond. Configuration
//! values may be given either as raw integers (ticks, bytes per second) or as
//! strings carrying a unit, e.g. `"30ns"` or `"12.8GiB/s"`.

use serde::{Deserialize, Deserializer};

use super::error::ConfigError;

/// Simulated time in picoseconds.
pub type Tick = u64;

/// Ticks in one simulated second.
pub const TICKS_PER_SEC: u64 = 1_000_000_000_000;

/// Ticks in one simulated nanosecond.
pub const TICKS_PER_NS: Tick = 1_000;

/// Converts nanoseconds to ticks.
#[inline]
pub const fn ns(n: u64) -> Tick {
    n * TICKS_PER_NS
}

/// Splits `"12.8GiB/s"` into `(12.8, "GiB/s")`.
fn split_number(kind: &'static str, text: &str) -> Result<(f64, String), ConfigError> {
    let text = text.trim();
    let idx = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(text.len());
    let (num, unit) = text.split_at(idx);
    let value: f64 = num.parse().map_err(|_| ConfigError::InvalidValue {
        kind,
        value: text.to_string(),
        reason: "expected a number followed by a unit".to_string(),
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidValue {
            kind,
            value: text.to_string(),
            reason: "must be a finite, non-negative number".to_string(),
        });
    }
    Ok((value, unit.trim().to_string()))
}

/// Parses a latency such as `"30ns"`, `"1.5us"`, `"500ps"` or `"2000"` (ticks).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for unknown units, malformed numbers,
/// or negative values.
pub fn parse_latency(text: &str) -> Result<Tick, ConfigError> {
    let (value, unit) = split_number("latency", text)?;
    let scale: f64 = match unit.as_str() {
        "" | "t" | "ps" => 1.0,
        "ns" => 1e3,
        "us" => 1e6,
        "ms" => 1e9,
        "s" => 1e12,
        _ => {
            return Err(ConfigError::InvalidValue {
                kind: "latency",
                value: text.to_string(),
                reason: format!("unknown time unit `{unit}`"),
            });
        }
    };
    Ok((value * scale).round() as Tick)
}

/// Parses a bandwidth such as `"12.8GiB/s"`, `"1GB/s"` or `"1000"` into bytes per second.
///
/// Decimal prefixes (`kB`, `MB`, `GB`, `TB`) scale by powers of 1000, binary
/// prefixes (`KiB`, `MiB`, `GiB`, `TiB`) by powers of 1024. Fractional bytes
/// per second are truncated.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for unknown units, malformed numbers,
/// or negative values.
pub fn parse_bandwidth(text: &str) -> Result<u64, ConfigError> {
    let (value, unit) = split_number("bandwidth", text)?;
    let unit = unit.strip_suffix("/s").unwrap_or(&unit);
    let scale: f64 = match unit {
        "" | "B" => 1.0,
        "kB" | "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => {
            return Err(ConfigError::InvalidValue {
                kind: "bandwidth",
                value: text.to_string(),
                reason: format!("unknown bandwidth unit `{unit}`"),
            });
        }
    };
    Ok((value * scale) as u64)
}

/// Formats a tick count with the largest unit that keeps it readable.
pub fn format_ticks(ticks: Tick) -> String {
    if ticks >= 1_000_000_000 {
        format!("{:.3} ms", ticks as f64 / 1e9)
    } else if ticks >= 1_000_000 {
        format!("{:.3} us", ticks as f64 / 1e6)
    } else if ticks >= TICKS_PER_NS {
        format!("{:.3} ns", ticks as f64 / 1e3)
    } else {
        format!("{ticks} ps")
    }
}

/// Raw configuration value: either a plain number or a string with a unit.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Int(u64),
    Float(f64),
    Text(String),
}

/// Serde adapters for fields that accept either numbers or unit strings.
pub(crate) mod serde_units {
    use super::{Deserialize, Deserializer, RawValue, Tick, parse_bandwidth, parse_latency};

    fn reject_float<E: serde::de::Error>(kind: &str, value: f64) -> Result<u64, E> {
        if value.is_finite() && value >= 0.0 {
            Ok(value.round() as u64)
        } else {
            Err(E::custom(format!("invalid {kind} {value}")))
        }
    }

    /// Deserializes a latency given in ticks or as a `"30ns"` string.
    pub fn latency<'de, D: Deserializer<'de>>(d: D) -> Result<Tick, D::Error> {
        match RawValue::deserialize(d)? {
            RawValue::Int(v) => Ok(v),
            RawValue::Float(v) => reject_float("latency", v),
            RawValue::Text(s) => parse_latency(&s).map_err(serde::de::Error::custom),
        }
    }

    /// Deserializes an optional latency.
    pub fn opt_latency<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Tick>, D::Error> {
        match Option::<RawValue>::deserialize(d)? {
            None => Ok(None),
            Some(RawValue::Int(v)) => Ok(Some(v)),
            Some(RawValue::Float(v)) => reject_float("latency", v).map(Some),
            Some(RawValue::Text(s)) => parse_latency(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    /// Deserializes a bandwidth given in bytes per second or as a `"12.8GiB/s"` string.
    pub fn bandwidth<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        match RawValue::deserialize(d)? {
            RawValue::Int(v) => Ok(v),
            RawValue::Float(v) => reject_float("bandwidth", v),
            RawValue::Text(s) => parse_bandwidth(&s).map_err(serde::de::Error::custom),
        }
    }
}
