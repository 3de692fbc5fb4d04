use std::collections::BTreeMap;

use chrono::{Days, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ParamKind, ParamSpec};

use super::{Frequency, MAX_FREQUENCY};

/// A constraint a [`ScheduleWindow`] breaks. Validation reports the first
/// one found, checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleViolation {
    #[error(
        "first run {} is after last run {}",
        .first_run.format("%H:%M"),
        .last_run.format("%H:%M")
    )]
    FirstRunAfterLastRun {
        first_run: NaiveTime,
        last_run: NaiveTime,
    },
    #[error("frequency must be positive (got {frequency})")]
    NonPositiveFrequency { frequency: Frequency },
    #[error("frequency {frequency} is longer than {max}")]
    FrequencyTooLong { frequency: Frequency, max: Frequency },
    #[error("unknown parameter '{key}'")]
    UnknownParameter { key: String },
    #[error("'{value}' is not a valid choice for parameter '{key}'")]
    InvalidChoice { key: String, value: String },
}

/// The recurrence envelope of a hook: enabled flag, daily bounds, minimum
/// spacing between runs and the parameter values to run with.
///
/// Windows never wrap past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub enabled: bool,
    #[serde(with = "time_of_day")]
    pub first_run: NaiveTime,
    #[serde(with = "time_of_day")]
    pub last_run: NaiveTime,
    pub frequency: Frequency,
    #[serde(rename = "params", default)]
    pub parameters: BTreeMap<String, String>,
}

impl ScheduleWindow {
    /// Draft used for hooks that have never been configured: disabled,
    /// 09:00 to 21:00 every two hours, every parameter at its default.
    pub fn with_defaults(schema: &[ParamSpec]) -> Self {
        Self {
            enabled: false,
            first_run: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            last_run: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default(),
            frequency: Frequency::default(),
            parameters: BTreeMap::new(),
        }
        .normalize(schema)
    }

    pub fn validate(&self, schema: &[ParamSpec]) -> Result<(), ScheduleViolation> {
        if self.first_run > self.last_run {
            return Err(ScheduleViolation::FirstRunAfterLastRun {
                first_run: self.first_run,
                last_run: self.last_run,
            });
        }

        if !self.frequency.is_positive() {
            return Err(ScheduleViolation::NonPositiveFrequency {
                frequency: self.frequency,
            });
        }

        if self.frequency > MAX_FREQUENCY {
            return Err(ScheduleViolation::FrequencyTooLong {
                frequency: self.frequency,
                max: MAX_FREQUENCY,
            });
        }

        for (key, value) in &self.parameters {
            let spec = schema
                .iter()
                .find(|spec| &spec.key == key)
                .ok_or_else(|| ScheduleViolation::UnknownParameter { key: key.clone() })?;

            if spec.kind == ParamKind::Choice
                && !spec.choices.is_empty()
                && !spec.choices.iter().any(|choice| choice == value)
            {
                return Err(ScheduleViolation::InvalidChoice {
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }

        Ok(())
    }

    /// Fills every schema parameter missing from `parameters` with its
    /// default. Values already present are kept as they are.
    pub fn normalize(mut self, schema: &[ParamSpec]) -> Self {
        for spec in schema {
            self.parameters
                .entry(spec.key.clone())
                .or_insert_with(|| spec.default_value.clone());
        }
        self
    }

    /// Whether `time` lies inside `[first_run, last_run]`.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.first_run <= time && time <= self.last_run
    }

    /// True iff the window is enabled, `now` falls inside the daily bounds,
    /// and at least `frequency` has passed since `last_fired`.
    pub fn is_due(&self, now: NaiveDateTime, last_fired: Option<NaiveDateTime>) -> bool {
        if !self.enabled || !self.contains(now.time()) {
            return false;
        }

        match last_fired {
            None => true,
            Some(fired) => now - fired >= self.frequency.as_duration(),
        }
    }

    /// Earliest moment at or after `now` at which [`Self::is_due`] holds.
    ///
    /// `None` for disabled or invalid windows, and when the next run would
    /// fall outside the representable calendar.
    pub fn next_eligible(
        &self,
        now: NaiveDateTime,
        last_fired: Option<NaiveDateTime>,
    ) -> Option<NaiveDateTime> {
        if !self.enabled || !self.frequency.is_positive() || self.first_run > self.last_run {
            return None;
        }

        let candidate = match last_fired {
            Some(fired) => now.max(fired.checked_add_signed(self.frequency.as_duration())?),
            None => now,
        };

        let time = candidate.time();
        if time < self.first_run {
            Some(candidate.date().and_time(self.first_run))
        } else if time > self.last_run {
            candidate
                .date()
                .checked_add_days(Days::new(1))
                .map(|day| day.and_time(self.first_run))
        } else {
            Some(candidate)
        }
    }
}

/// `HH:MM` on the wire. `HH:MM:SS` is accepted and written back as such
/// whenever the seconds are non-zero.
mod time_of_day {
    use chrono::{NaiveTime, Timelike};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let format = if value.second() == 0 { "%H:%M" } else { "%H:%M:%S" };
        serializer.serialize_str(&value.format(format).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|err| de::Error::custom(format!("invalid time of day '{raw}': {err}")))
    }
}
