pub mod error;
pub mod formats;
pub mod fs;

pub use error::{CodecError, OptimizerError, OptimizerResult};
pub use formats::ImageFormat;
pub use fs::{stat_file, walk};
