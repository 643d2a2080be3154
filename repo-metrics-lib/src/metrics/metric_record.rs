use super::{ForkDetail, MetricKey, MetricValue};
use core::str::FromStr;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// All metrics collected for one repository in one run.
///
/// Every [`MetricKey`] is always present; keys whose value could not be obtained
/// hold `None` and are exported as null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    values: BTreeMap<MetricKey, Option<MetricValue>>,
}

impl MetricRecord {
    /// Create a record with every metric set to null.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: MetricKey::iter().map(|key| (key, None)).collect(),
        }
    }

    pub fn set(&mut self, key: MetricKey, value: Option<MetricValue>) {
        let _ = self.values.insert(key, value);
    }

    #[must_use]
    pub fn get(&self, key: MetricKey) -> Option<&MetricValue> {
        self.values.get(&key).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn is_null(&self, key: MetricKey) -> bool {
        self.get(key).is_none()
    }

    /// Iterate over every metric in key order, including null ones.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, Option<&MetricValue>)> {
        self.values.iter().map(|(key, value)| (*key, value.as_ref()))
    }

    /// The fork list, or an empty slice if fork details are null.
    #[must_use]
    pub fn fork_details(&self) -> &[ForkDetail] {
        match self.get(MetricKey::ForkDetails) {
            Some(MetricValue::Forks(forks)) => forks,
            _ => &[],
        }
    }
}

impl Default for MetricRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for MetricRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(key, value)| (key.name(), value)))
    }
}

impl<'de> Deserialize<'de> for MetricRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut record = Self::new();

        for (name, value) in &map {
            let key = MetricKey::from_str(name).map_err(|e| D::Error::custom(format!("unknown metric '{name}': {e}")))?;
            if value.is_null() {
                continue;
            }

            let parsed = MetricValue::from_json(key.kind(), value)
                .ok_or_else(|| D::Error::custom(format!("invalid value for metric '{name}': {value}")))?;
            record.set(key, Some(parsed));
        }

        if let Some(missing) = MetricKey::iter().find(|key| !map.contains_key(key.name())) {
            return Err(D::Error::custom(format!("missing metric '{missing}'")));
        }

        Ok(record)
    }
}
