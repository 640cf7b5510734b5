//! Entry points invoked by a build tool.
//!
//! - [`OptimizerPlugin::close_bundle`]: run the optimizer over a finished build

mod hook;

pub use hook::{OptimizerPlugin, PluginRun};
