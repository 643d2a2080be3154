use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The fixed set of metrics collected for a repository.
///
/// The declaration order is the order in which metrics appear in exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum MetricKey {
    /// When the metrics were collected
    Timestamp,

    /// The repository, as `owner/repo`
    Repository,

    Stars,
    Forks,
    Watchers,
    OpenIssues,

    /// Last time the repository was updated
    UpdatedAt,

    /// Views over the last 14 days (requires push access)
    Views,
    UniqueVisitors,

    /// Clones over the last 14 days (requires push access)
    Clones,
    UniqueCloners,

    /// Number of entries in the fork listing
    ForkCount,

    /// Per-fork details
    ForkDetails,
}

/// The shape of the value stored under a metric key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Count,
    Text,
    Timestamp,
    ForkList,
}

impl MetricKey {
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    #[must_use]
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::Timestamp | Self::UpdatedAt => ValueKind::Timestamp,
            Self::Repository => ValueKind::Text,
            Self::Stars
            | Self::Forks
            | Self::Watchers
            | Self::OpenIssues
            | Self::Views
            | Self::UniqueVisitors
            | Self::Clones
            | Self::UniqueCloners
            | Self::ForkCount => ValueKind::Count,
            Self::ForkDetails => ValueKind::ForkList,
        }
    }

    /// Whether the value fits in a single CSV cell.
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        !matches!(self.kind(), ValueKind::ForkList)
    }
}
