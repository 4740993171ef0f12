pub mod aliases;
pub mod dedupe;
pub mod etl;
pub mod extract;
pub mod normalize;
pub mod report;

pub use crate::domain::model::{
    DuplicateAnnotation, ExtractResult, NormalizedRecord, Partition, RawEntry, SkippedEntry,
    SourceBatch, TransformResult,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
