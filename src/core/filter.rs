//! Candidate selection over walked paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Image extensions picked up when no filter is configured.
pub const DEFAULT_FILTER_PATTERN: &str = r"(?i)\.(png|jpe?g|gif|bmp|svg|webp)$";

/// Decides which walked files are candidates for compression.
///
/// A pattern is matched against the full path string; a predicate receives the
/// path itself. `All` lets everything through.
#[derive(Clone)]
pub enum CandidateFilter {
    Pattern(Regex),
    Predicate(Arc<dyn Fn(&Path) -> bool + Send + Sync>),
    All,
}

impl CandidateFilter {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Build a pattern filter, falling back to `All` when the pattern does not
    /// compile. A bad filter widens the selection instead of failing the build.
    pub fn from_pattern(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(re) => Self::Pattern(re),
            Err(e) => {
                warn!("Ignoring invalid filter pattern {:?}: {}", pattern, e);
                Self::All
            }
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(&path.to_string_lossy()),
            Self::Predicate(f) => f(path),
            Self::All => true,
        }
    }

    /// Keep the paths this filter accepts, preserving their order.
    pub fn filter(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths.into_iter().filter(|p| self.matches(p)).collect()
    }
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self::from_pattern(DEFAULT_FILTER_PATTERN)
    }
}

impl fmt::Debug for CandidateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
            Self::All => f.write_str("All"),
        }
    }
}

impl<'de> Deserialize<'de> for CandidateFilter {
    /// Strings become patterns; any other JSON shape is not a filter we
    /// understand and means "no filtering".
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(pattern) => Self::from_pattern(&pattern),
            other => {
                warn!("Unrecognized filter value {}, not filtering", other);
                Self::All
            }
        })
    }
}
