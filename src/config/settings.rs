use crate::core::aliases::{default_alias_table, AliasTable, JournalAliases};
use crate::utils::error::Result;
use crate::utils::validation::{validate_contains, validate_unique_names, Validate};

pub const DEFAULT_COLUMNS: [&str; 10] = [
    "doi",
    "title",
    "journal",
    "year",
    "author",
    "url",
    "keywords",
    "entry_type",
    "source",
    "abstract",
];

pub const DEFAULT_DEDUP_KEY: &str = "doi";

/// Validated configuration shared read-only by the extractor and deduplicator.
///
/// Column names are stored trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    relevant_columns: Vec<String>,
    journal_aliases: JournalAliases,
    dedup_key: String,
}

impl PipelineSettings {
    pub fn new(columns: &[String], aliases: AliasTable, dedup_key: &str) -> Result<Self> {
        let relevant_columns: Vec<String> =
            columns.iter().map(|c| c.trim().to_lowercase()).collect();
        let dedup_key = dedup_key.trim().to_lowercase();

        let settings = Self {
            relevant_columns,
            journal_aliases: JournalAliases::new(aliases)?,
            dedup_key,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn relevant_columns(&self) -> &[String] {
        &self.relevant_columns
    }

    pub fn journal_aliases(&self) -> &JournalAliases {
        &self.journal_aliases
    }

    pub fn dedup_key(&self) -> &str {
        &self.dedup_key
    }
}

impl Validate for PipelineSettings {
    fn validate(&self) -> Result<()> {
        validate_unique_names("relevant_columns", &self.relevant_columns)?;
        validate_contains("relevant_columns", &self.relevant_columns, &self.dedup_key)?;
        // duplicate rows point back to the original's source
        validate_contains("relevant_columns", &self.relevant_columns, "source")?;
        Ok(())
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            relevant_columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            journal_aliases: JournalAliases::default(),
            dedup_key: DEFAULT_DEDUP_KEY.to_string(),
        }
    }
}

pub fn default_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

pub fn default_aliases() -> AliasTable {
    default_alias_table()
}
