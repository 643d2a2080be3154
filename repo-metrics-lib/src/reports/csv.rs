use crate::Result;
use crate::metrics::{ForkDetail, MetricKey, MetricRecord, MetricValue, format_timestamp};
use core::iter::once;
use ohno::IntoAppError;
use std::io::Write;
use strum::IntoEnumIterator;

const FORK_COLUMNS: [&str; 5] = ["fork_name", "fork_owner", "fork_stars", "fork_created_at", "fork_updated_at"];

/// Write the record as CSV.
///
/// The header is `record_type`, every scalar metric, then the fork columns. One
/// `summary` row carries the scalar metrics, followed by one `fork` row per fork
/// in API order. Fork rows leave the scalar columns empty except `repository`.
/// Null values are written as empty cells.
pub fn generate<W: Write>(record: &MetricRecord, writer: W) -> Result<()> {
    let scalar_keys: Vec<MetricKey> = MetricKey::iter().filter(|key| key.is_scalar()).collect();
    let mut out = csv::Writer::from_writer(writer);

    out.write_record(once("record_type").chain(scalar_keys.iter().map(|key| key.name())).chain(FORK_COLUMNS))
        .into_app_err("writing CSV header")?;

    let summary = once("summary".to_string())
        .chain(scalar_keys.iter().map(|key| cell(record.get(*key))))
        .chain(FORK_COLUMNS.iter().map(|_| String::new()));
    out.write_record(summary).into_app_err("writing CSV summary row")?;

    let repository = cell(record.get(MetricKey::Repository));
    for fork in record.fork_details() {
        let scalars = scalar_keys.iter().map(|key| {
            if *key == MetricKey::Repository {
                repository.clone()
            } else {
                String::new()
            }
        });

        out.write_record(once("fork".to_string()).chain(scalars).chain(fork_cells(fork)))
            .into_app_err("writing CSV fork row")?;
    }

    out.flush().into_app_err("flushing CSV output")?;
    Ok(())
}

fn cell(value: Option<&MetricValue>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

fn fork_cells(fork: &ForkDetail) -> [String; 5] {
    [
        fork.name.as_deref().unwrap_or_default().to_string(),
        fork.owner.as_deref().unwrap_or_default().to_string(),
        fork.stars.map(|s| s.to_string()).unwrap_or_default(),
        fork.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
        fork.updated_at.as_ref().map(format_timestamp).unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_record(forks: Vec<ForkDetail>) -> MetricRecord {
        let mut record = MetricRecord::new();
        record.set(MetricKey::Timestamp, Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap().into()));
        record.set(MetricKey::Repository, Some(MetricValue::String("octo/cat".into())));
        record.set(MetricKey::Stars, Some(MetricValue::UInt(42)));
        record.set(MetricKey::Forks, Some(MetricValue::UInt(2)));
        record.set(MetricKey::ForkCount, Some(MetricValue::UInt(2)));
        record.set(MetricKey::ForkDetails, Some(forks.into()));
        record
    }

    fn fork(name: &str, stars: Option<u64>) -> ForkDetail {
        ForkDetail {
            name: Some(name.into()),
            owner: Some("someone".into()),
            stars,
            created_at: Some(Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap()),
            updated_at: None,
        }
    }

    fn rows(output: &[u8]) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::Reader::from_reader(output);
        let header = reader.headers().unwrap().iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        (header, rows)
    }

    #[test]
    fn test_header_layout() {
        let mut output = Vec::new();
        generate(&MetricRecord::new(), &mut output).unwrap();

        let (header, _) = rows(&output);
        assert_eq!(header[0], "record_type");
        assert_eq!(header[1], "timestamp");
        assert_eq!(header[2], "repository");
        assert!(header.contains(&"fork_count".to_string()));
        assert!(!header.contains(&"fork_details".to_string()));
        assert_eq!(&header[header.len() - 5..], FORK_COLUMNS.map(str::to_string).as_slice());
    }

    #[test]
    fn test_one_row_per_fork_plus_summary() {
        let record = sample_record(vec![fork("cat", Some(3)), fork("cat-fork", None)]);
        let mut output = Vec::new();
        generate(&record, &mut output).unwrap();

        let (header, rows) = rows(&output);
        assert_eq!(rows.len(), 3);

        let column = |name: &str| header.iter().position(|h| h == name).unwrap();

        assert_eq!(rows[0][0], "summary");
        assert_eq!(rows[0][column("stars")], "42");
        assert_eq!(rows[0][column("timestamp")], "2024-03-01T12:00:00Z");
        assert_eq!(rows[0][column("views")], "");
        assert_eq!(rows[0][column("fork_name")], "");

        assert_eq!(rows[1][0], "fork");
        assert_eq!(rows[1][column("repository")], "octo/cat");
        assert_eq!(rows[1][column("stars")], "");
        assert_eq!(rows[1][column("fork_name")], "cat");
        assert_eq!(rows[1][column("fork_stars")], "3");
        assert_eq!(rows[1][column("fork_created_at")], "2023-05-06T07:08:09Z");
        assert_eq!(rows[1][column("fork_updated_at")], "");

        assert_eq!(rows[2][column("fork_name")], "cat-fork");
        assert_eq!(rows[2][column("fork_stars")], "");
    }

    #[test]
    fn test_no_forks_gives_single_row() {
        let mut output = Vec::new();
        generate(&sample_record(Vec::new()), &mut output).unwrap();

        let (_, rows) = rows(&output);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_output_is_deterministic() {
        let record = sample_record(vec![fork("a", Some(1)), fork("b", Some(2))]);

        let mut first = Vec::new();
        let mut second = Vec::new();
        generate(&record, &mut first).unwrap();
        generate(&record, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_values_with_commas_are_quoted() {
        let record = sample_record(vec![fork("with,comma", None)]);
        let mut output = Vec::new();
        generate(&record, &mut output).unwrap();

        assert!(String::from_utf8(output.clone()).unwrap().contains("\"with,comma\""));
        let (_, rows) = rows(&output);
        assert!(rows[1].contains(&"with,comma".to_string()));
    }
}
