use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ModelError;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

/// Fraction digits kept while parsing; more would overflow the hour scale.
const MAX_FRACTION_DIGITS: usize = 18;

/// Wall-clock duration written in the `1h30m`, `10s`, `1µs` notation.
///
/// Parsing accepts a sequence of `<number>[.<fraction>]<unit>` groups with the units
/// `ns`, `us`/`µs`/`μs`, `ms`, `s`, `m`, `h`. Formatting produces the canonical form
/// (`0s`, `1.5µs`, `300ms`, `1m30s`, `1h0m0s`), which is also what run messages quote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GoDuration(Duration);

impl GoDuration {
    pub const fn new(d: Duration) -> Self {
        Self(d)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub const fn from_micros(us: u64) -> Self {
        Self(Duration::from_micros(us))
    }

    pub const fn from_mins(mins: u64) -> Self {
        Self(Duration::from_secs(mins * 60))
    }

    /// Underlying std duration.
    #[inline]
    pub const fn as_std(&self) -> Duration {
        self.0
    }

    #[inline]
    pub fn as_nanos(&self) -> u128 {
        self.0.as_nanos()
    }
}

impl From<Duration> for GoDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl From<GoDuration> for Duration {
    fn from(d: GoDuration) -> Self {
        d.0
    }
}

/// Render `value / 10^precision` with trailing fractional zeros trimmed.
fn fixed_point(value: u128, precision: u32) -> String {
    let scale = 10u128.pow(precision);
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}", width = precision as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

impl fmt::Display for GoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        if nanos == 0 {
            return f.write_str("0s");
        }
        if nanos < NANOS_PER_MICRO {
            return write!(f, "{nanos}ns");
        }
        if nanos < NANOS_PER_MILLI {
            return write!(f, "{}µs", fixed_point(nanos, 3));
        }
        if nanos < NANOS_PER_SEC {
            return write!(f, "{}ms", fixed_point(nanos, 6));
        }

        let hours = nanos / NANOS_PER_HOUR;
        let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MIN;
        let seconds = nanos % NANOS_PER_MIN;

        if hours > 0 {
            write!(f, "{hours}h{minutes}m")?;
        } else if minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        write!(f, "{}s", fixed_point(seconds, 9))
    }
}

fn unit_scale(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(NANOS_PER_MIN),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

impl FromStr for GoDuration {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidDuration(s.to_string());

        let input = s.trim();
        let input = input.strip_prefix('+').unwrap_or(input);
        if input == "0" {
            return Ok(Self::default());
        }
        if input.is_empty() || input.starts_with('-') {
            return Err(invalid());
        }

        let mut total: u128 = 0;
        let mut rest = input;
        while !rest.is_empty() {
            let int_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            let int_part = &rest[..int_end];
            rest = &rest[int_end..];

            let mut frac_part = "";
            if let Some(after_dot) = rest.strip_prefix('.') {
                let frac_end = after_dot
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after_dot.len());
                frac_part = &after_dot[..frac_end];
                rest = &after_dot[frac_end..];
            }
            if int_part.is_empty() && frac_part.is_empty() {
                return Err(invalid());
            }

            let unit_end = rest
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(rest.len());
            let scale = unit_scale(&rest[..unit_end]).ok_or_else(invalid)?;
            rest = &rest[unit_end..];

            let whole: u128 = if int_part.is_empty() {
                0
            } else {
                int_part.parse().map_err(|_| invalid())?
            };
            let mut value = whole.checked_mul(scale).ok_or_else(invalid)?;

            if !frac_part.is_empty() {
                let digits = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
                let frac: u128 = digits.parse().map_err(|_| invalid())?;
                value += frac * scale / 10u128.pow(digits.len() as u32);
            }
            total = total.checked_add(value).ok_or_else(invalid)?;
        }

        let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| invalid())?;
        let nanos = (total % NANOS_PER_SEC) as u32;
        Ok(Self(Duration::new(secs, nanos)))
    }
}

impl Serialize for GoDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for GoDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
