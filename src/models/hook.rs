use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleWindow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ParamKind {
    #[serde(rename = "text")]
    LineText,
    #[serde(rename = "textarea")]
    MultilineText,
    #[serde(rename = "select")]
    Choice,
}

/// Declaration of one hook parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParamSpec {
    pub key: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    #[serde(rename = "default", default)]
    pub default_value: String,
    /// Only meaningful for [`ParamKind::Choice`].
    #[serde(rename = "options", default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

/// Whether a hook has ever been given a schedule.
///
/// Arrives on the wire as `config: null | {...}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Option<ScheduleWindow>", into = "Option<ScheduleWindow>")]
pub enum HookSchedule {
    #[default]
    Unconfigured,
    Configured(ScheduleWindow),
}

impl HookSchedule {
    pub fn window(&self) -> Option<&ScheduleWindow> {
        match self {
            HookSchedule::Configured(window) => Some(window),
            HookSchedule::Unconfigured => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, HookSchedule::Configured(_))
    }
}

impl From<Option<ScheduleWindow>> for HookSchedule {
    fn from(value: Option<ScheduleWindow>) -> Self {
        value.map_or(HookSchedule::Unconfigured, HookSchedule::Configured)
    }
}

impl From<HookSchedule> for Option<ScheduleWindow> {
    fn from(value: HookSchedule) -> Self {
        match value {
            HookSchedule::Configured(window) => Some(window),
            HookSchedule::Unconfigured => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "params", default)]
    pub parameter_schema: Vec<ParamSpec>,
    #[serde(rename = "config", default)]
    pub schedule: HookSchedule,
}

impl HookDefinition {
    pub fn param(&self, key: &str) -> Option<&ParamSpec> {
        self.parameter_schema.iter().find(|spec| spec.key == key)
    }
}

/// One execution outcome of a hook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookResult {
    pub id: String,
    pub hook_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub read: bool,
    #[serde(alias = "created", with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Result timestamps come either as RFC 3339 or in the record store's
/// `2024-01-02 10:00:00.123Z` form.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn decodes_unconfigured_hook() {
        let hook: HookDefinition = serde_json::from_value(json!({
            "id": "ai_request",
            "name": "AI Coaching Prompt",
            "description": "Sends context to AI",
            "params": [
                {"key": "model", "name": "Model", "type": "text", "default": "claude-sonnet-4-5"},
                {"key": "tone", "name": "Tone", "type": "select", "default": "calm", "options": ["calm", "strict"]}
            ],
            "config": null
        }))
        .unwrap();

        assert_eq!(hook.schedule, HookSchedule::Unconfigured);
        assert_eq!(hook.parameter_schema.len(), 2);
        assert_eq!(hook.parameter_schema[1].kind, ParamKind::Choice);
        assert_eq!(hook.param("tone").unwrap().choices, vec!["calm", "strict"]);
    }

    #[test]
    fn decodes_configured_hook() {
        let hook: HookDefinition = serde_json::from_value(json!({
            "id": "ai_request",
            "name": "AI",
            "params": [],
            "config": {
                "id": "rec1",
                "hook_id": "ai_request",
                "enabled": true,
                "trigger": "scheduled",
                "first_run": "09:00",
                "last_run": "21:00",
                "frequency": "2h",
                "params": {}
            }
        }))
        .unwrap();

        let window = hook.schedule.window().unwrap();
        assert!(window.enabled);
        assert_eq!(window.frequency.to_string(), "2h");
    }

    #[test]
    fn result_accepts_both_timestamp_forms() {
        let rfc: HookResult = serde_json::from_value(json!({
            "id": "r1", "hook_id": "h1", "content": "done", "read": false,
            "created_at": "2024-01-02T10:00:00Z"
        }))
        .unwrap();
        let store: HookResult = serde_json::from_value(json!({
            "id": "r2", "hook_id": "h1", "content": "done", "read": true,
            "created": "2024-01-02 10:00:00.000Z"
        }))
        .unwrap();

        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        assert_eq!(rfc.created_at, expected);
        assert_eq!(store.created_at, expected);
    }
}
