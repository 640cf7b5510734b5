//! Codec registrations and per-run pipeline construction.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::CodecSetting;
use crate::processing::{CodecAdapter, CodecPipeline, external};

/// Builds an adapter from the user's options (`None` = adapter defaults).
pub type CodecFactory = Arc<dyn Fn(Option<&Value>) -> Arc<dyn CodecAdapter> + Send + Sync>;

struct Registration {
    key: String,
    enabled_by_default: bool,
    factory: CodecFactory,
}

/// Ordered set of known codecs with their default on/off state.
///
/// Registration order is pipeline order.
pub struct CodecRegistry {
    registrations: Vec<Registration>,
}

impl CodecRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// The built-in external optimizers, with their shipped defaults.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry
            .register("gifsicle", true, |opts| Arc::new(external::gifsicle(opts)))
            .register("webp", false, |opts| Arc::new(external::webp(opts)))
            .register("mozjpeg", false, |opts| Arc::new(external::mozjpeg(opts)))
            .register("pngquant", false, |opts| Arc::new(external::pngquant(opts)))
            .register("optipng", true, |opts| Arc::new(external::optipng(opts)))
            .register("svgo", true, |opts| Arc::new(external::svgo(opts)))
            .register("jpegTran", true, |opts| Arc::new(external::jpegtran(opts)));
        registry
    }

    /// Register a codec. Re-registering a key replaces the factory and default
    /// but keeps the key's original position.
    pub fn register<F>(&mut self, key: impl Into<String>, enabled_by_default: bool, factory: F) -> &mut Self
    where
        F: Fn(Option<&Value>) -> Arc<dyn CodecAdapter> + Send + Sync + 'static,
    {
        let key = key.into();
        let factory: CodecFactory = Arc::new(factory);
        match self.registrations.iter_mut().find(|r| r.key == key) {
            Some(existing) => {
                existing.enabled_by_default = enabled_by_default;
                existing.factory = factory;
            }
            None => self.registrations.push(Registration {
                key,
                enabled_by_default,
                factory,
            }),
        }
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(|r| r.key.as_str())
    }

    pub fn default_enabled(&self, key: &str) -> Option<bool> {
        self.registrations
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.enabled_by_default)
    }

    /// Build this run's pipeline from per-codec settings.
    ///
    /// A missing setting falls back to the codec's default; `false` drops the
    /// codec, `true` uses its defaults, anything else is handed over as options.
    pub fn build_pipeline(&self, settings: &IndexMap<String, CodecSetting>) -> CodecPipeline {
        for key in settings.keys() {
            if self.default_enabled(key).is_none() {
                warn!("Ignoring settings for unknown codec `{}`", key);
            }
        }

        let adapters: Vec<Arc<dyn CodecAdapter>> = self
            .registrations
            .iter()
            .filter_map(|r| match settings.get(&r.key) {
                Some(CodecSetting::Disabled) => None,
                Some(setting) => Some((r.factory)(setting.options())),
                None if r.enabled_by_default => Some((r.factory)(None)),
                None => None,
            })
            .collect();

        let pipeline = CodecPipeline::new(adapters);
        debug!("Codec pipeline: {:?}", pipeline);
        pipeline
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
