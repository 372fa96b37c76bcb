//! `Subscriber::get` accepts either a plain number of seconds or a
//! human-readable duration string such as `"200ms"`, mirroring the
//! `parse_timedelta`-style ergonomics the original Python implementation
//! exposed. A null/absent timeout means wait forever.

use std::time::Duration;

/// A timeout as given by a caller, not yet resolved to a [`Duration`].
/// `None` (via [`TimeoutSpec::forever`] or the `From<Option<_>>` impls)
/// means wait forever.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeoutSpec(Option<Duration>);

impl TimeoutSpec {
    pub fn forever() -> Self {
        Self(None)
    }

    pub fn as_duration(&self) -> Option<Duration> {
        self.0
    }
}

impl From<Duration> for TimeoutSpec {
    fn from(d: Duration) -> Self {
        Self(Some(d))
    }
}

impl From<Option<Duration>> for TimeoutSpec {
    fn from(d: Option<Duration>) -> Self {
        Self(d)
    }
}

/// Seconds, as a plain number: `Subscriber::get(1.5)`.
impl From<f64> for TimeoutSpec {
    fn from(secs: f64) -> Self {
        Self(Some(Duration::from_secs_f64(secs.max(0.0))))
    }
}

impl From<i64> for TimeoutSpec {
    fn from(secs: i64) -> Self {
        Self(Some(Duration::from_secs(secs.max(0) as u64)))
    }
}

/// A human-readable duration, e.g. `"200ms"`, `"5s"`, `"2m"`, `"1h"`, or a
/// bare number interpreted as seconds. Returns `forever()` for `"none"`/
/// empty input, matching `parse_timedelta(None)`.
impl From<&str> for TimeoutSpec {
    fn from(s: &str) -> Self {
        parse_timedelta(s).map_or_else(Self::forever, |d| Self(Some(d)))
    }
}

impl From<String> for TimeoutSpec {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

fn parse_timedelta(input: &str) -> Option<Duration> {
    let s = input.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("none") {
        return None;
    }

    let split_at = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split_at);
    let number: f64 = number.parse().ok()?;
    let unit = unit.trim();

    let seconds = match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => number,
        "ms" | "millisecond" | "milliseconds" => number / 1_000.0,
        "us" | "microsecond" | "microseconds" => number / 1_000_000.0,
        "m" | "min" | "minute" | "minutes" => number * 60.0,
        "h" | "hour" | "hours" => number * 3_600.0,
        "d" | "day" | "days" => number * 86_400.0,
        _ => return None,
    };

    Some(Duration::from_secs_f64(seconds.max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_seconds() {
        assert_eq!(TimeoutSpec::from(1.5).as_duration(), Some(Duration::from_secs_f64(1.5)));
    }

    #[test]
    fn parses_millisecond_strings() {
        assert_eq!(TimeoutSpec::from("200ms").as_duration(), Some(Duration::from_millis(200)));
    }

    #[test]
    fn parses_minute_strings() {
        assert_eq!(TimeoutSpec::from("2m").as_duration(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn none_and_empty_mean_forever() {
        assert!(TimeoutSpec::from("none").as_duration().is_none());
        assert!(TimeoutSpec::from("").as_duration().is_none());
        assert!(TimeoutSpec::forever().as_duration().is_none());
    }
}
