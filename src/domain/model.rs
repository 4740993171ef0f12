use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// One parsed BibTeX record before normalization.
///
/// Field names keep whatever casing the parser produced; use [`RawEntry::get`]
/// or [`RawEntry::field`] for case-insensitive access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub key: String,
    pub entry_type: String,
    fields: Vec<(String, String)>,
}

impl RawEntry {
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entry_type: entry_type.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_field(name, value);
        self
    }

    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Case-insensitive lookup; the first matching field wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Like [`RawEntry::get`] but missing fields read as `""`.
    pub fn field(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A record reduced to the configured columns, in configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    fields: Vec<(String, String)>,
}

impl NormalizedRecord {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn doi(&self) -> &str {
        self.value("doi")
    }

    pub fn source(&self) -> &str {
        self.value("source")
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A record whose identity key was already taken by an earlier record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateAnnotation {
    pub record: NormalizedRecord,
    /// Source label of the first-seen record with the same key.
    pub duplicate_in: String,
}

impl Serialize for DuplicateAnnotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.record.len() + 1))?;
        for (k, v) in &self.record.fields {
            map.serialize_entry(k, v)?;
        }
        map.serialize_entry("duplicate_in", &self.duplicate_in)?;
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub unique: Vec<NormalizedRecord>,
    pub duplicates: Vec<DuplicateAnnotation>,
}

/// All entries read from one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBatch {
    pub label: String,
    pub path: String,
    pub entries: Vec<RawEntry>,
    /// Blocks in this file that could not be parsed.
    pub skipped: Vec<SkippedEntry>,
}

/// A single BibTeX block dropped because it did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: String,
    /// Citation key as far as it could be read; may be empty.
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    pub batches: Vec<SourceBatch>,
    pub skipped: Vec<SkippedSource>,
}

impl ExtractResult {
    pub fn entry_count(&self) -> usize {
        self.batches.iter().map(|b| b.entries.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub label: String,
    pub records: usize,
    pub unique: usize,
    pub duplicates: usize,
    /// Records kept as unique only because their identity key was empty.
    pub without_key: usize,
    pub skipped_entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub dedup_key: String,
    pub total_records: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub without_key: usize,
    pub sources: Vec<SourceSummary>,
    /// Files that could not be read at all.
    pub skipped: Vec<SkippedSource>,
    pub skipped_entries: Vec<SkippedEntry>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub partition: Partition,
    pub summary: RunSummary,
}
