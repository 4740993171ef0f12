use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting consolidation");

        // Extract
        let extracted = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} entries from {} sources ({} skipped)",
            extracted.entry_count(),
            extracted.batches.len(),
            extracted.skipped.len()
        );

        // Transform
        let transformed = self.pipeline.transform(extracted).await?;
        tracing::info!(
            "Kept {} unique entries, flagged {} duplicates",
            transformed.partition.unique.len(),
            transformed.partition.duplicates.len()
        );
        if !transformed.summary.skipped_entries.is_empty() {
            tracing::warn!(
                "{} unparseable entries were dropped",
                transformed.summary.skipped_entries.len()
            );
        }
        if transformed.summary.without_key > 0 {
            tracing::warn!(
                "{} entries have no {} and were kept without deduplication",
                transformed.summary.without_key,
                transformed.summary.dedup_key
            );
        }

        // Load
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!(
            "Report written to {} in {:?}",
            output_path,
            started.elapsed()
        );

        Ok(output_path)
    }
}
