pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::app::pipelines::BibPipeline;
pub use crate::config::{cli::LocalStorage, settings::PipelineSettings, toml_config::TomlConfig};
pub use crate::core::{dedupe::Deduplicator, etl::EtlEngine, extract::extract};
pub use crate::utils::error::{EtlError, Result};
