use crate::Result;
use crate::metrics::MetricRecord;
use core::fmt::Write;
use ohno::IntoAppError;

/// Write the record as a single pretty-printed JSON object.
pub fn generate<W: Write>(record: &MetricRecord, writer: &mut W) -> Result<()> {
    write!(writer, "{}", serde_json::to_string_pretty(record)?)?;
    Ok(())
}

/// Read a record back from its JSON form.
pub fn parse(text: &str) -> Result<MetricRecord> {
    serde_json::from_str(text).into_app_err("parsing metric record")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{ForkDetail, MetricKey, MetricValue};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_every_key_present_with_nulls() {
        let mut record = MetricRecord::new();
        record.set(MetricKey::Stars, Some(MetricValue::UInt(7)));

        let mut output = String::new();
        generate(&record, &mut output).unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 13);
        assert_eq!(object["stars"], 7);
        assert!(object["views"].is_null());
        assert!(object["fork_details"].is_null());
    }

    #[test]
    fn test_fork_details_nested_array() {
        let mut record = MetricRecord::new();
        record.set(
            MetricKey::ForkDetails,
            Some(MetricValue::Forks(vec![ForkDetail {
                name: Some("cat".into()),
                owner: None,
                stars: Some(1),
                created_at: Some(Utc.with_ymd_and_hms(2022, 1, 2, 3, 4, 5).unwrap()),
                updated_at: None,
            }])),
        );

        let mut output = String::new();
        generate(&record, &mut output).unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        let forks = value["fork_details"].as_array().unwrap();
        assert_eq!(forks.len(), 1);
        assert_eq!(forks[0]["name"], "cat");
        assert!(forks[0]["owner"].is_null());
        assert_eq!(forks[0]["created_at"], "2022-01-02T03:04:05Z");
    }

    #[test]
    fn test_read_back_preserves_values_and_nulls() {
        let mut record = MetricRecord::new();
        record.set(MetricKey::Timestamp, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into()));
        record.set(MetricKey::Repository, Some(MetricValue::String("octo/cat".into())));
        record.set(MetricKey::Watchers, Some(MetricValue::UInt(3)));
        record.set(MetricKey::ForkDetails, Some(MetricValue::Forks(Vec::new())));

        let mut output = String::new();
        generate(&record, &mut output).unwrap();

        let parsed = parse(&output).unwrap();
        assert_eq!(parsed, record);
        assert!(parsed.is_null(MetricKey::ForkCount));
    }

    #[test]
    fn test_parse_rejects_incomplete_record() {
        assert!(parse(r#"{"stars": 1}"#).is_err());
        assert!(parse("not json").is_err());
    }
}
