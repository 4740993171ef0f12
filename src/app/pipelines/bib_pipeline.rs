use crate::app::bibtex::{parse_entries, source_label};
use crate::core::dedupe::Deduplicator;
use crate::core::extract::extract;
use crate::core::report::{build_sheets, bundle_zip, render_files, render_summary};
use crate::core::{ConfigProvider, ExtractResult, Pipeline, SourceBatch, Storage, TransformResult};
use crate::domain::model::{Partition, RunSummary, SkippedSource, SourceSummary};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Reads every BibTeX export in the sources directory, normalizes the
/// entries, and writes the unique/duplicate report.
pub struct BibPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    deduplicator: Deduplicator,
}

impl<S: Storage, C: ConfigProvider> BibPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let deduplicator = Deduplicator::new(config.settings().dedup_key());
        Self {
            storage,
            config,
            deduplicator,
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// Source files in the order they are consolidated (sorted by path).
    pub async fn discover_sources(&self) -> Result<Vec<String>> {
        let dir = self.config.sources_dir();
        let extension = self.config.source_extension();

        let mut files = self.storage.list_files(dir, extension).await?;
        if files.is_empty() {
            return Err(EtlError::NoSourceFiles {
                dir: dir.to_string(),
                extension: extension.to_string(),
            });
        }

        // 目錄列舉順序不固定，排序後「先出現者保留」才可重現
        files.sort();
        Ok(files)
    }

    async fn read_source(&self, path: &str) -> Result<SourceBatch> {
        let bytes = self.storage.read_file(path).await?;
        let content = String::from_utf8(bytes).map_err(|e| EtlError::BibParseError {
            file: path.to_string(),
            message: format!("not valid UTF-8: {}", e),
        })?;

        let parsed = parse_entries(path, &content);
        Ok(SourceBatch {
            label: source_label(path),
            path: path.to_string(),
            entries: parsed.entries,
            skipped: parsed.skipped,
        })
    }

    fn summarize(
        &self,
        batches: &[SourceBatch],
        skipped: Vec<SkippedSource>,
        partition: &Partition,
    ) -> RunSummary {
        let mut per_source: Vec<SourceSummary> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for batch in batches {
            let i = *index.entry(batch.label.clone()).or_insert_with(|| {
                per_source.push(SourceSummary {
                    label: batch.label.clone(),
                    ..Default::default()
                });
                per_source.len() - 1
            });
            per_source[i].records += batch.entries.len();
            per_source[i].skipped_entries += batch.skipped.len();
        }

        let mut without_key = 0;
        for record in &partition.unique {
            if let Some(&i) = index.get(record.source()) {
                per_source[i].unique += 1;
                if self.deduplicator.key_of(record).is_none() {
                    per_source[i].without_key += 1;
                    without_key += 1;
                }
            }
        }
        for duplicate in &partition.duplicates {
            if let Some(&i) = index.get(duplicate.record.source()) {
                per_source[i].duplicates += 1;
            }
        }

        RunSummary {
            generated_at: chrono::Utc::now(),
            dedup_key: self.deduplicator.key_column().to_string(),
            total_records: partition.unique.len() + partition.duplicates.len(),
            unique: partition.unique.len(),
            duplicates: partition.duplicates.len(),
            without_key,
            sources: per_source,
            skipped,
            skipped_entries: batches
                .iter()
                .flat_map(|batch| batch.skipped.iter().cloned())
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for BibPipeline<S, C> {
    async fn extract(&self) -> Result<ExtractResult> {
        let mut result = ExtractResult::default();

        for path in self.discover_sources().await? {
            match self.read_source(&path).await {
                Ok(batch) => {
                    tracing::info!(
                        "Read {} entries from {} (source '{}')",
                        batch.entries.len(),
                        path,
                        batch.label
                    );
                    if !batch.skipped.is_empty() {
                        tracing::warn!(
                            "{} unparseable entries dropped from {}",
                            batch.skipped.len(),
                            path
                        );
                    }
                    result.batches.push(batch);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path, e);
                    result.skipped.push(SkippedSource {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }

    async fn transform(&self, data: ExtractResult) -> Result<TransformResult> {
        let settings = self.config.settings();

        let records: Vec<_> = data
            .batches
            .iter()
            .flat_map(|batch| {
                batch
                    .entries
                    .iter()
                    .map(move |entry| extract(entry, &entry.entry_type, &batch.label, settings))
            })
            .collect();
        tracing::debug!("Normalized {} records", records.len());

        let partition = self.deduplicator.partition(records);
        let summary = self.summarize(&data.batches, data.skipped, &partition);

        Ok(TransformResult { partition, summary })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output_dir = Path::new(self.config.output_path());
        let sheets = build_sheets(&result.partition, self.config.settings().relevant_columns());
        let mut files = render_files(&sheets, self.config.output_formats())?;
        files.push(render_summary(&result.summary)?);

        match self.config.bundle_name() {
            Some(bundle) => {
                let zip_data = bundle_zip(&files)?;
                let path = output_dir.join(bundle).to_string_lossy().into_owned();
                tracing::debug!(
                    "Writing bundle ({} bytes, {} files) to {}",
                    zip_data.len(),
                    files.len(),
                    path
                );
                self.storage.write_file(&path, &zip_data).await?;
                Ok(path)
            }
            None => {
                for file in &files {
                    let path = output_dir.join(&file.name).to_string_lossy().into_owned();
                    tracing::debug!("Writing {} ({} bytes)", path, file.data.len());
                    self.storage.write_file(&path, &file.data).await?;
                }
                Ok(self.config.output_path().to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::PipelineSettings;
    use crate::core::report::OutputFormat;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put(&self, path: &str, content: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), content.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn list_files(&self, dir: &str, extension: &str) -> Result<Vec<String>> {
            let files = self.files.lock().await;
            let prefix = format!("{}/", dir);
            let suffix = format!(".{}", extension);
            // 刻意以相反順序回傳，確認管道自行排序
            let mut found: Vec<String> = files
                .keys()
                .filter(|k| k.starts_with(&prefix) && k.ends_with(&suffix))
                .cloned()
                .collect();
            found.sort();
            found.reverse();
            Ok(found)
        }
    }

    struct MockConfig {
        formats: Vec<OutputFormat>,
        bundle: Option<String>,
        settings: PipelineSettings,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                formats: vec![OutputFormat::Csv],
                bundle: None,
                settings: PipelineSettings::default(),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn sources_dir(&self) -> &str {
            "sources"
        }

        fn source_extension(&self) -> &str {
            "bib"
        }

        fn output_path(&self) -> &str {
            "out"
        }

        fn output_formats(&self) -> &[OutputFormat] {
            &self.formats
        }

        fn bundle_name(&self) -> Option<&str> {
            self.bundle.as_deref()
        }

        fn settings(&self) -> &PipelineSettings {
            &self.settings
        }
    }

    const SCOPUS: &str = r#"
@article{a1,
  title = {Dragonfire Storage},
  journal = {energy research and social science},
  doi = {https://doi.org/10.1/A},
  year = {2025},
}
@article{a2,
  title = {No Identifier Here},
  year = {2024},
}
"#;

    const WOS: &str = r#"
@article{b1,
  title = {Dragonfire Storage},
  doi = {10.1/a},
}
@article{b2,
  title = {Mana Grids},
  doi = {10.1/b},
}
@article{b3,
  title = {No Identifier Here},
  year = {2024},
}
"#;

    async fn storage_with_sources() -> MockStorage {
        let storage = MockStorage::new();
        storage.put("sources/wos.bib", WOS).await;
        storage.put("sources/scopus.bib", SCOPUS).await;
        storage
    }

    #[tokio::test]
    async fn test_extract_reads_sources_in_sorted_order() {
        let pipeline = BibPipeline::new(storage_with_sources().await, MockConfig::new());

        let result = pipeline.extract().await.unwrap();

        let labels: Vec<&str> = result.batches.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["scopus", "wos"]);
        assert_eq!(result.entry_count(), 5);
        assert!(result.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_extract_skips_undecodable_file() {
        let storage = storage_with_sources().await;
        {
            let mut files = storage.files.lock().await;
            files.insert("sources/broken.bib".to_string(), vec![0x40, 0xff, 0xfe]);
        }
        let pipeline = BibPipeline::new(storage, MockConfig::new());

        let result = pipeline.extract().await.unwrap();

        assert_eq!(result.batches.len(), 2);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].path, "sources/broken.bib");
    }

    #[tokio::test]
    async fn test_bad_entry_keeps_rest_of_source() {
        let storage = MockStorage::new();
        storage
            .put(
                "sources/scopus.bib",
                "@article{s1,\n  title = {Dragonfire Storage},\n  doi = {10.1/a},\n}\n\
                 @article{s1,\n  title = {Same Key Again},\n  doi = {10.1/c},\n}\n\
                 @article{s2,\n  title = {Broken,\n\
                 @article{s3,\n  title = {Mana Grids},\n  doi = {10.1/b},\n}\n",
            )
            .await;
        storage.put("sources/wos.bib", WOS).await;
        let pipeline = BibPipeline::new(storage, MockConfig::new());

        let extracted = pipeline.extract().await.unwrap();
        assert!(extracted.skipped.is_empty());
        assert_eq!(extracted.batches[0].entries.len(), 3);

        let result = pipeline.transform(extracted).await.unwrap();

        // 兩筆 wos 重複項都應指回 scopus
        let back_refs: Vec<&str> = result
            .partition
            .duplicates
            .iter()
            .map(|d| d.duplicate_in.as_str())
            .collect();
        assert_eq!(back_refs, vec!["scopus", "scopus"]);

        let summary = &result.summary;
        assert_eq!(summary.sources[0].records, 3);
        assert_eq!(summary.sources[0].skipped_entries, 1);
        assert_eq!(summary.skipped_entries.len(), 1);
        assert_eq!(summary.skipped_entries[0].key, "s2");
        assert_eq!(summary.skipped_entries[0].path, "sources/scopus.bib");
    }

    #[tokio::test]
    async fn test_extract_without_sources_fails() {
        let pipeline = BibPipeline::new(MockStorage::new(), MockConfig::new());

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::NoSourceFiles { .. }));
    }

    #[tokio::test]
    async fn test_transform_partitions_and_summarizes() {
        let pipeline = BibPipeline::new(storage_with_sources().await, MockConfig::new());
        let extracted = pipeline.extract().await.unwrap();

        let result = pipeline.transform(extracted).await.unwrap();
        let partition = &result.partition;

        let unique_titles: Vec<&str> = partition.unique.iter().map(|r| r.value("title")).collect();
        assert_eq!(
            unique_titles,
            vec!["Dragonfire Storage", "No Identifier Here", "Mana Grids", "No Identifier Here"]
        );
        assert_eq!(partition.unique[0].value("journal"), "Energy Research & Social Science");
        assert_eq!(partition.duplicates.len(), 1);
        assert_eq!(partition.duplicates[0].record.source(), "wos");
        assert_eq!(partition.duplicates[0].duplicate_in, "scopus");

        let summary = &result.summary;
        assert_eq!(summary.total_records, 5);
        assert_eq!(summary.without_key, 2);
        assert_eq!(summary.sources[0].label, "scopus");
        assert_eq!(summary.sources[0].records, 2);
        assert_eq!(summary.sources[1].duplicates, 1);
        assert_eq!(summary.sources[1].unique, 2);
    }

    #[tokio::test]
    async fn test_load_writes_plain_files() {
        let storage = storage_with_sources().await;
        let pipeline = BibPipeline::new(storage.clone(), MockConfig::new());
        let extracted = pipeline.extract().await.unwrap();
        let transformed = pipeline.transform(extracted).await.unwrap();

        let output = pipeline.load(transformed).await.unwrap();
        assert_eq!(output, "out");

        let unique = storage.get_file("out/unique_entries.csv").await.unwrap();
        let unique = String::from_utf8(unique).unwrap();
        assert!(unique.starts_with("doi,title,journal,year,author,url,keywords,entry_type,source,abstract"));
        assert_eq!(unique.lines().count(), 5);

        let duplicates = storage.get_file("out/duplicates.csv").await.unwrap();
        let duplicates = String::from_utf8(duplicates).unwrap();
        assert!(duplicates.lines().next().unwrap().ends_with(",duplicate_in"));
        assert!(duplicates.lines().nth(1).unwrap().ends_with(",wos,,scopus"));

        assert!(storage.get_file("out/summary.json").await.is_some());
    }

    #[tokio::test]
    async fn test_load_writes_bundle() {
        let storage = storage_with_sources().await;
        let mut config = MockConfig::new();
        config.bundle = Some("bibfile_summary.zip".to_string());
        config.formats = vec![OutputFormat::Csv, OutputFormat::Json];
        let pipeline = BibPipeline::new(storage.clone(), config);

        let extracted = pipeline.extract().await.unwrap();
        let transformed = pipeline.transform(extracted).await.unwrap();
        let output = pipeline.load(transformed).await.unwrap();
        assert_eq!(output, "out/bibfile_summary.zip");

        let zip_bytes = storage.get_file("out/bibfile_summary.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "duplicates.csv",
                "duplicates.json",
                "summary.json",
                "unique_entries.csv",
                "unique_entries.json"
            ]
        );
    }
}
