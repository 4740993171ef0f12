pub mod bib_pipeline;

pub use bib_pipeline::BibPipeline;
