use std::{fmt, str::FromStr};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frequencies offered by the schedule editor, as `(label, value)`.
pub const FREQUENCY_PRESETS: [(&str, &str); 5] = [
    ("15 min", "15m"),
    ("30 min", "30m"),
    ("1 hour", "1h"),
    ("2 hours", "2h"),
    ("4 hours", "4h"),
];

/// Longest spacing a schedule accepts. Windows are daily, so anything
/// longer could never fire twice inside the same bounds anyway.
pub const MAX_FREQUENCY: Frequency = Frequency::from_hours(24);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrequencyParseError {
    #[error("frequency is empty")]
    Empty,
    #[error("expected a number in frequency '{0}'")]
    MissingNumber(String),
    #[error("missing unit in frequency '{0}'")]
    MissingUnit(String),
    #[error("unknown unit '{unit}' in frequency '{input}' (use h, m or s)")]
    UnknownUnit { input: String, unit: String },
    #[error("frequency '{0}' is too large")]
    Overflow(String),
}

/// Minimum spacing between two scheduled runs of a hook.
///
/// Written as unit-suffixed components: `15m`, `2h`, `1h30m`, `90s`.
/// Zero is representable so that validation can report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    seconds: i64,
}

impl Frequency {
    pub const fn from_seconds(seconds: i64) -> Self {
        Self { seconds }
    }

    pub const fn from_minutes(minutes: i64) -> Self {
        Self {
            seconds: minutes * 60,
        }
    }

    pub const fn from_hours(hours: i64) -> Self {
        Self {
            seconds: hours * 3600,
        }
    }

    pub fn as_seconds(&self) -> i64 {
        self.seconds
    }

    /// Saturates at [`Duration::MAX`] for values chrono can't represent.
    pub fn as_duration(&self) -> Duration {
        Duration::try_seconds(self.seconds).unwrap_or(Duration::MAX)
    }

    pub fn is_positive(&self) -> bool {
        self.seconds > 0
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::from_hours(2)
    }
}

impl FromStr for Frequency {
    type Err = FrequencyParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FrequencyParseError::Empty);
        }

        let mut total: i64 = 0;
        let mut rest = trimmed;
        while !rest.is_empty() {
            let digits_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if digits_end == 0 {
                return Err(FrequencyParseError::MissingNumber(input.to_string()));
            }
            let (digits, tail) = rest.split_at(digits_end);
            let unit_end = tail
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(unit_end);

            let multiplier = match unit {
                "h" => 3600,
                "m" => 60,
                "s" => 1,
                "" => return Err(FrequencyParseError::MissingUnit(input.to_string())),
                other => {
                    return Err(FrequencyParseError::UnknownUnit {
                        input: input.to_string(),
                        unit: other.to_string(),
                    })
                }
            };

            let amount: i64 = digits
                .parse()
                .map_err(|_| FrequencyParseError::Overflow(input.to_string()))?;
            total = amount
                .checked_mul(multiplier)
                .and_then(|component| total.checked_add(component))
                .ok_or_else(|| FrequencyParseError::Overflow(input.to_string()))?;
            rest = tail;
        }

        Ok(Frequency { seconds: total })
    }
}

impl TryFrom<String> for Frequency {
    type Error = FrequencyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seconds <= 0 {
            return write!(f, "{}s", self.seconds.max(0));
        }
        let hours = self.seconds / 3600;
        let minutes = (self.seconds % 3600) / 60;
        let seconds = self.seconds % 60;
        if hours > 0 {
            write!(f, "{hours}h")?;
        }
        if minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        if seconds > 0 {
            write!(f, "{seconds}s")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_presets() {
        for (_, value) in FREQUENCY_PRESETS {
            let parsed: Frequency = value.parse().unwrap();
            assert!(parsed.is_positive());
            assert_eq!(parsed.to_string(), value);
        }
        assert_eq!("2h".parse::<Frequency>().unwrap(), Frequency::from_hours(2));
    }

    #[test]
    fn parses_compound_and_canonicalises() {
        let parsed: Frequency = "1h30m".parse().unwrap();
        assert_eq!(parsed.as_seconds(), 5400);
        assert_eq!("90m".parse::<Frequency>().unwrap().to_string(), "1h30m");
        assert_eq!("45s".parse::<Frequency>().unwrap().as_seconds(), 45);
    }

    #[test]
    fn zero_parses_but_is_not_positive() {
        let zero: Frequency = "0m".parse().unwrap();
        assert!(!zero.is_positive());
        assert_eq!(zero.to_string(), "0s");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!("".parse::<Frequency>(), Err(FrequencyParseError::Empty));
        assert!(matches!(
            "2".parse::<Frequency>(),
            Err(FrequencyParseError::MissingUnit(_))
        ));
        assert!(matches!(
            "2d".parse::<Frequency>(),
            Err(FrequencyParseError::UnknownUnit { .. })
        ));
        assert!(matches!(
            "-1h".parse::<Frequency>(),
            Err(FrequencyParseError::MissingNumber(_))
        ));
        assert!(matches!(
            "h".parse::<Frequency>(),
            Err(FrequencyParseError::MissingNumber(_))
        ));
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&Frequency::from_minutes(15)).unwrap();
        assert_eq!(json, "\"15m\"");
        let back: Frequency = serde_json::from_str("\"4h\"").unwrap();
        assert_eq!(back, Frequency::from_hours(4));
        assert!(serde_json::from_str::<Frequency>("\"soon\"").is_err());
    }

    #[test]
    fn as_duration_saturates() {
        assert_eq!(Frequency::from_minutes(90).as_duration(), Duration::minutes(90));
        let huge: Frequency = "9999999999999999s".parse().unwrap();
        assert_eq!(huge.as_duration(), Duration::MAX);
    }
}
