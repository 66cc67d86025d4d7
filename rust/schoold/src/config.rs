use crate::features::DEFAULT_SCHOOL_ID;
use std::path::PathBuf;

pub const DEFAULT_LOG_FILTER: &str = "schoold=info";

/// Daemon settings read from the environment (and `.env`, if present).
///
/// | Env Var                     | Default        |
/// |-----------------------------|----------------|
/// | `SCHOOLD_WORKSPACE`         | unset          |
/// | `SCHOOLD_LOG`               | `schoold=info` |
/// | `SCHOOLD_DEFAULT_SCHOOL_ID` | `1`            |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Workspace opened before the first request, if any.
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
    /// School used when no current school has been stored.
    pub default_school_id: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            workspace: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            default_school_id: DEFAULT_SCHOOL_ID.to_string(),
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        Self {
            workspace: non_empty("SCHOOLD_WORKSPACE").map(PathBuf::from),
            log_filter: non_empty("SCHOOLD_LOG").unwrap_or(defaults.log_filter),
            default_school_id: non_empty("SCHOOLD_DEFAULT_SCHOOL_ID")
                .unwrap_or(defaults.default_school_id),
        }
    }
}
