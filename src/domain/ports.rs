use crate::config::settings::PipelineSettings;
use crate::core::report::OutputFormat;
use crate::domain::model::{ExtractResult, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Paths of the files in `dir` ending in `.{extension}`. No ordering is promised.
    fn list_files(
        &self,
        dir: &str,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn sources_dir(&self) -> &str;
    fn source_extension(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[OutputFormat];
    /// Zip bundle file name; `None` writes one file per sheet and format.
    fn bundle_name(&self) -> Option<&str>;
    fn settings(&self) -> &PipelineSettings;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractResult>;
    async fn transform(&self, data: ExtractResult) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
