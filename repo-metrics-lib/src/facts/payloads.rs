//! Typed shapes of the API responses the collector consumes.
//!
//! Every field is parsed leniently: a field that is missing, null, or of an
//! unexpected type becomes `None` instead of failing the whole response.

use crate::metrics::ForkDetail;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// `GET /repos/{owner}/{repo}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Repository {
    #[serde(default, deserialize_with = "lenient")]
    pub stargazers_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub forks_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub subscribers_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub open_issues_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `GET /repos/{owner}/{repo}/traffic/views` and `.../traffic/clones`
///
/// Both endpoints report a 14-day total and a unique count; the per-day
/// breakdown is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrafficSummary {
    #[serde(default, deserialize_with = "lenient")]
    pub count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub uniques: Option<u64>,
}

/// One entry of `GET /repos/{owner}/{repo}/forks`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Fork {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<CompactString>,
    #[serde(default, deserialize_with = "lenient")]
    pub owner: Option<Owner>,
    #[serde(default, deserialize_with = "lenient")]
    pub stargazers_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Owner {
    #[serde(default, deserialize_with = "lenient")]
    pub login: Option<CompactString>,
}

impl From<Fork> for ForkDetail {
    fn from(fork: Fork) -> Self {
        Self {
            name: fork.name,
            owner: fork.owner.and_then(|owner| owner.login),
            stars: fork.stargazers_count,
            created_at: fork.created_at,
            updated_at: fork.updated_at,
        }
    }
}

/// Deserialize a field, mapping any value that does not fit `T` to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_deserialize() {
        let json = r#"{
            "full_name": "octo/cat",
            "stargazers_count": 1000,
            "forks_count": 200,
            "subscribers_count": 50,
            "open_issues_count": 7,
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;

        let repo: Repository = serde_json::from_str(json).unwrap();
        assert_eq!(repo.stargazers_count, Some(1000));
        assert_eq!(repo.forks_count, Some(200));
        assert_eq!(repo.subscribers_count, Some(50));
        assert_eq!(repo.open_issues_count, Some(7));
        assert_eq!(repo.updated_at.unwrap().timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_repository_missing_fields() {
        let repo: Repository = serde_json::from_str(r#"{"stargazers_count": 3}"#).unwrap();
        assert_eq!(repo.stargazers_count, Some(3));
        assert_eq!(repo.forks_count, None);
        assert_eq!(repo.subscribers_count, None);
        assert_eq!(repo.updated_at, None);
    }

    #[test]
    fn test_repository_invalid_fields_become_none() {
        let json = r#"{
            "stargazers_count": "lots",
            "forks_count": -4,
            "subscribers_count": null,
            "updated_at": "not a date"
        }"#;

        let repo: Repository = serde_json::from_str(json).unwrap();
        assert_eq!(repo.stargazers_count, None);
        assert_eq!(repo.forks_count, None);
        assert_eq!(repo.subscribers_count, None);
        assert_eq!(repo.updated_at, None);
    }

    #[test]
    fn test_repository_rejects_non_object() {
        assert!(serde_json::from_str::<Repository>("[1, 2]").is_err());
    }

    #[test]
    fn test_traffic_summary_ignores_breakdown() {
        let json = r#"{
            "count": 14850,
            "uniques": 3782,
            "views": [{"timestamp": "2016-10-10T00:00:00Z", "count": 440, "uniques": 143}]
        }"#;

        let traffic: TrafficSummary = serde_json::from_str(json).unwrap();
        assert_eq!(traffic.count, Some(14850));
        assert_eq!(traffic.uniques, Some(3782));
    }

    #[test]
    fn test_fork_to_detail() {
        let json = r#"{
            "name": "cat",
            "owner": {"login": "someone"},
            "stargazers_count": 4,
            "created_at": "2023-05-01T12:00:00Z",
            "updated_at": "2023-06-01T12:00:00Z"
        }"#;

        let fork: Fork = serde_json::from_str(json).unwrap();
        let detail = ForkDetail::from(fork);
        assert_eq!(detail.name.as_deref(), Some("cat"));
        assert_eq!(detail.owner.as_deref(), Some("someone"));
        assert_eq!(detail.stars, Some(4));
        assert!(detail.created_at.is_some());
        assert!(detail.updated_at.is_some());
    }

    #[test]
    fn test_fork_with_broken_owner() {
        let fork: Fork = serde_json::from_str(r#"{"name": "cat", "owner": "not-an-object"}"#).unwrap();
        let detail = ForkDetail::from(fork);
        assert_eq!(detail.name.as_deref(), Some("cat"));
        assert_eq!(detail.owner, None);
        assert_eq!(detail.stars, None);
    }
}
