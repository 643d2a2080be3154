use super::{ForkDetail, ValueKind};
use chrono::{DateTime, SecondsFormat, Utc};
use compact_str::CompactString;
use core::fmt::{Display, Formatter};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    UInt(u64),
    String(CompactString),
    DateTime(DateTime<Utc>),
    Forks(Vec<ForkDetail>),
}

impl MetricValue {
    /// Rebuild a value of the given kind from its JSON form.
    ///
    /// Returns `None` if the JSON value does not have the expected shape.
    #[must_use]
    pub fn from_json(kind: ValueKind, value: &serde_json::Value) -> Option<Self> {
        match kind {
            ValueKind::Count => value.as_u64().map(Self::UInt),
            ValueKind::Text => value.as_str().map(|s| Self::String(s.into())),
            ValueKind::Timestamp => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| Self::DateTime(dt.with_timezone(&Utc))),
            ValueKind::ForkList => serde_json::from_value(value.clone()).ok().map(Self::Forks),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::UInt(_) => ValueKind::Count,
            Self::String(_) => ValueKind::Text,
            Self::DateTime(_) => ValueKind::Timestamp,
            Self::Forks(_) => ValueKind::ForkList,
        }
    }
}

impl Display for MetricValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UInt(u) => write!(f, "{u}"),
            Self::String(s) => write!(f, "{s}"),
            Self::DateTime(dt) => write!(f, "{}", format_timestamp(dt)),
            Self::Forks(forks) => write!(f, "{} fork(s)", forks.len()),
        }
    }
}

/// Timestamps are rendered as RFC 3339 in UTC with second precision.
#[must_use]
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<DateTime<Utc>> for MetricValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<Vec<ForkDetail>> for MetricValue {
    fn from(value: Vec<ForkDetail>) -> Self {
        Self::Forks(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        assert_eq!(MetricValue::UInt(42).to_string(), "42");
        assert_eq!(MetricValue::String("octo/cat".into()).to_string(), "octo/cat");

        let dt = DateTime::parse_from_rfc3339("2024-01-15T10:30:00.250Z").unwrap().with_timezone(&Utc);
        assert_eq!(MetricValue::DateTime(dt).to_string(), "2024-01-15T10:30:00Z");
    }

    #[test]
    fn test_serialize_untagged() {
        assert_eq!(serde_json::to_value(MetricValue::UInt(7)).unwrap(), json!(7));
        assert_eq!(serde_json::to_value(MetricValue::String("x".into())).unwrap(), json!("x"));
        assert_eq!(serde_json::to_value(MetricValue::Forks(vec![])).unwrap(), json!([]));
    }

    #[test]
    fn test_from_json_rejects_wrong_shape() {
        assert_eq!(MetricValue::from_json(ValueKind::Count, &json!("12")), None);
        assert_eq!(MetricValue::from_json(ValueKind::Count, &json!(-1)), None);
        assert_eq!(MetricValue::from_json(ValueKind::Timestamp, &json!("yesterday")), None);
        assert_eq!(MetricValue::from_json(ValueKind::ForkList, &json!({"name": "x"})), None);
    }

    #[test]
    fn test_from_json_timestamp() {
        let value = MetricValue::from_json(ValueKind::Timestamp, &json!("2024-03-01T08:00:00Z")).unwrap();
        let MetricValue::DateTime(dt) = value else {
            panic!("expected a timestamp");
        };
        assert_eq!(dt.timestamp(), 1_709_280_000);
    }
}
