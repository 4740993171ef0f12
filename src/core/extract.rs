use crate::config::settings::PipelineSettings;
use crate::core::normalize::{normalize_doi, normalize_entry_type, normalize_journal, normalize_text};
use crate::domain::model::{NormalizedRecord, RawEntry};

/// Builds a record holding exactly `settings.relevant_columns()`, in order.
///
/// `entry_type` and `source` come from the arguments, never from `raw`.
pub fn extract(
    raw: &RawEntry,
    entry_type: &str,
    source: &str,
    settings: &PipelineSettings,
) -> NormalizedRecord {
    NormalizedRecord::from_pairs(settings.relevant_columns().iter().map(|column| {
        let value = match column.as_str() {
            "doi" => normalize_doi(raw.get(column)),
            "journal" => normalize_journal(raw.get(column), settings.journal_aliases()),
            "entry_type" => normalize_entry_type(entry_type),
            "source" => source.to_string(),
            _ => normalize_text(raw.get(column)),
        };
        (column.clone(), value)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::DEFAULT_COLUMNS;
    use crate::core::aliases::AliasTable;

    fn sample_entry() -> RawEntry {
        RawEntry::new("ELDRYN2025", "article")
            .with_field("Title", "  The Dragonfire Conundrum ")
            .with_field("JOURNAL", "journal of arcane engineering")
            .with_field("doi", "https://doi.org/10.1234/JAE.2025.123456")
            .with_field("year", "2025")
            .with_field("volume", "42")
            .with_field("source", "from-the-file")
    }

    #[test]
    fn test_extract_keeps_configured_columns_in_order() {
        let settings = PipelineSettings::default();
        let record = extract(&sample_entry(), "article", "scopus", &settings);

        let columns: Vec<&str> = record.columns().collect();
        assert_eq!(columns, DEFAULT_COLUMNS);
        assert_eq!(record.get("volume"), None);
    }

    #[test]
    fn test_extract_normalizes_fields() {
        let settings = PipelineSettings::default();
        let record = extract(&sample_entry(), "Article", "scopus", &settings);

        assert_eq!(record.doi(), "10.1234/jae.2025.123456");
        assert_eq!(record.value("title"), "The Dragonfire Conundrum");
        assert_eq!(record.value("journal"), "Journal Of Arcane Engineering");
        assert_eq!(record.value("year"), "2025");
        assert_eq!(record.value("entry_type"), "article");
        assert_eq!(record.value("abstract"), "");
    }

    #[test]
    fn test_extract_source_comes_from_argument() {
        let settings = PipelineSettings::default();
        let record = extract(&sample_entry(), "article", "wos", &settings);
        assert_eq!(record.source(), "wos");
    }

    #[test]
    fn test_extract_empty_entry_yields_empty_values() {
        let settings = PipelineSettings::default();
        let record = extract(&RawEntry::new("k", "misc"), "misc", "scopus", &settings);

        assert_eq!(record.len(), DEFAULT_COLUMNS.len());
        for column in ["doi", "title", "journal", "year", "author", "url", "keywords", "abstract"] {
            assert_eq!(record.value(column), "", "column {column}");
        }
    }

    #[test]
    fn test_extract_custom_columns() {
        let columns = vec![
            "source".to_string(),
            "issn".to_string(),
            "doi".to_string(),
        ];
        let settings = PipelineSettings::new(&columns, AliasTable::new(), "doi").unwrap();
        let entry = RawEntry::new("k", "article")
            .with_field("ISSN", " 1234-5678 ")
            .with_field("doi", "doi:10.9/X");

        let record = extract(&entry, "article", "ieee", &settings);
        let pairs: Vec<(&str, &str)> = record.columns().zip(record.values()).collect();
        assert_eq!(
            pairs,
            vec![("source", "ieee"), ("issn", "1234-5678"), ("doi", "10.9/x")]
        );
    }
}
