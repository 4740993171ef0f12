//! First-seen-wins deduplication over an ordered record stream.
//!
//! Records whose key column is empty are always unique: without an
//! identifier there is nothing reliable to merge on, so two DOI-less entries
//! with identical titles both survive.

use crate::config::settings::DEFAULT_DEDUP_KEY;
use crate::domain::model::{DuplicateAnnotation, NormalizedRecord, Partition};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Deduplicator {
    key_column: String,
}

impl Deduplicator {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            key_column: key_column.into(),
        }
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Key of `record`, or `None` when it must never be deduplicated.
    pub fn key_of<'a>(&self, record: &'a NormalizedRecord) -> Option<&'a str> {
        Some(record.value(&self.key_column)).filter(|k| !k.is_empty())
    }

    /// Callers must pass records in a deterministic order; the first record
    /// with a given key is kept.
    pub fn partition<I>(&self, records: I) -> Partition
    where
        I: IntoIterator<Item = NormalizedRecord>,
    {
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut partition = Partition::default();

        for record in records {
            let Some(key) = self.key_of(&record) else {
                partition.unique.push(record);
                continue;
            };

            match seen.get(key) {
                Some(original_source) => {
                    tracing::debug!(
                        "Duplicate {}='{}' in '{}' (first seen in '{}')",
                        self.key_column,
                        key,
                        record.source(),
                        original_source
                    );
                    let duplicate_in = original_source.clone();
                    partition.duplicates.push(DuplicateAnnotation {
                        record,
                        duplicate_in,
                    });
                }
                None => {
                    seen.insert(key.to_string(), record.source().to_string());
                    partition.unique.push(record);
                }
            }
        }

        partition
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_KEY)
    }
}
