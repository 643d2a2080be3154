//! The metric record assembled for a repository
//!
//! A collection run produces exactly one [`MetricRecord`]: a flat mapping from a
//! fixed set of metric names ([`MetricKey`]) to optional typed values
//! ([`MetricValue`]). Every key is present in every record; a value that could
//! not be obtained (for example traffic data without push access) is null.
//!
//! # Implementation Model
//!
//! Records are created with all keys seeded to null and are then filled in by the
//! collector as each API call succeeds. Exporters iterate the record in key order,
//! which keeps the shape of CSV and JSON output stable from run to run.
//!
//! Fork details are the one nested value: a list of [`ForkDetail`] entries, each
//! of whose fields may also be null.

mod fork_detail;
mod metric_key;
mod metric_record;
mod metric_value;

pub use fork_detail::ForkDetail;
pub use metric_key::{MetricKey, ValueKind};
pub use metric_record::MetricRecord;
pub use metric_value::{MetricValue, format_timestamp};
