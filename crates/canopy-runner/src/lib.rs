//! # canopy-runner
//!
//! Configuration and orchestration for a canopy change run, plus the
//! `canopy` command-line binary.
//!
//! ```no_run
//! use canopy_runner::{Pipeline, RunConfig};
//!
//! let config = RunConfig::new("Portland", "OR", 2011, 2021)?;
//! let output = Pipeline::new(config)?.run()?;
//! println!("{}", output.summary);
//! # Ok::<(), canopy_runner::PipelineError>(())
//! ```

mod config;
mod error;
mod pipeline;

pub use config::{
    default_output_dir, title_case, HttpConfig, RunConfig, SourcesConfig, TigerwebConfig,
    WcsConfig, DEFAULT_CACHE_DIR,
};
pub use error::{ConfigError, PipelineError};
pub use pipeline::{Pipeline, PipelineOutput};

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
