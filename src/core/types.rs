//! Configuration types for one optimization run.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::CandidateFilter;

/// Per-codec switch: off, on with the codec's defaults, or on with options.
///
/// Options are kept as raw JSON and handed to the codec untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecSetting {
    Disabled,
    Enabled,
    Options(serde_json::Value),
}

impl CodecSetting {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Options to pass to the codec, if any were given
    pub fn options(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Options(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for CodecSetting {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

impl From<serde_json::Value> for CodecSetting {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(enabled) => enabled.into(),
            other => Self::Options(other),
        }
    }
}

impl<'de> Deserialize<'de> for CodecSetting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

impl Serialize for CodecSetting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Disabled => serializer.serialize_bool(false),
            Self::Enabled => serializer.serialize_bool(true),
            Self::Options(value) => value.serialize(serializer),
        }
    }
}

/// User-facing plugin options, as found in a JSON config file.
///
/// Every field is optional. Keys other than the named ones are codec
/// settings, e.g. `{"pngquant": {"quality": [65, 80]}, "svgo": false}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginOptions {
    /// Skip the whole pipeline
    pub disable: bool,
    /// Which walked files are candidates
    pub filter: CandidateFilter,
    /// Render the summary after a run
    pub verbose: bool,
    /// Cap on concurrently processed files; unset means one task per file
    pub max_concurrency: Option<usize>,
    /// Codec key -> setting, in config order
    #[serde(flatten)]
    pub codecs: IndexMap<String, CodecSetting>,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            disable: false,
            filter: CandidateFilter::default(),
            verbose: true,
            max_concurrency: None,
            codecs: IndexMap::new(),
        }
    }
}

impl PluginOptions {
    /// Set one codec's setting, replacing any earlier value for the key.
    pub fn codec(mut self, key: impl Into<String>, setting: impl Into<CodecSetting>) -> Self {
        self.codecs.insert(key.into(), setting.into());
        self
    }
}

/// Where the build tool wrote its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Project root
    pub root: PathBuf,
    /// Output directory, relative to `root` unless absolute
    pub out_dir: PathBuf,
}

impl BuildConfig {
    pub fn new(root: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            out_dir: out_dir.into(),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.out_dir)
    }
}

/// Resolved, immutable configuration for one invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub filter: CandidateFilter,
    pub verbose: bool,
    pub max_concurrency: Option<usize>,
    pub codecs: IndexMap<String, CodecSetting>,
}

impl RunConfig {
    pub fn resolve(build: &BuildConfig, options: &PluginOptions) -> Self {
        Self {
            root: build.root.clone(),
            output_dir: build.output_dir(),
            filter: options.filter.clone(),
            verbose: options.verbose,
            max_concurrency: options.max_concurrency,
            codecs: options.codecs.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
