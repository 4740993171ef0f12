use crate::domain::model::{Partition, RunSummary};
use crate::utils::error::{EtlError, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;
use zip::write::{FileOptions, ZipWriter};

pub const UNIQUE_SHEET: &str = "Unique Entries";
pub const DUPLICATES_SHEET: &str = "Duplicates";
pub const DUPLICATE_IN_COLUMN: &str = "duplicate_in";
pub const SUMMARY_FILE: &str = "summary.json";
pub const DEFAULT_BUNDLE_NAME: &str = "bibfile_summary.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Tsv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            other => Err(EtlError::InvalidConfigValueError {
                field: "output_formats".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: csv, tsv, json".to_string(),
            }),
        }
    }
}

/// One table of the report, e.g. the unique entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSheet {
    pub name: String,
    pub file_stem: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A rendered output file, relative to the output directory or zip root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub name: String,
    pub data: Vec<u8>,
}

struct JsonRow<'a> {
    headers: &'a [String],
    values: &'a [String],
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (k, v) in self.headers.iter().zip(self.values) {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl ReportSheet {
    pub fn file_name(&self, format: OutputFormat) -> String {
        format!("{}.{}", self.file_stem, format.extension())
    }

    pub fn render(&self, format: OutputFormat) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Csv => self.render_delimited(b','),
            OutputFormat::Tsv => self.render_delimited(b'\t'),
            OutputFormat::Json => {
                let rows: Vec<JsonRow<'_>> = self
                    .rows
                    .iter()
                    .map(|values| JsonRow {
                        headers: &self.headers,
                        values,
                    })
                    .collect();
                Ok(serde_json::to_vec_pretty(&rows)?)
            }
        }
    }

    fn render_delimited(&self, delimiter: u8) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }

        writer
            .into_inner()
            .map_err(|e| EtlError::IoError(e.into_error()))
    }
}

/// Builds the "Unique Entries" and "Duplicates" sheets.
pub fn build_sheets(partition: &Partition, columns: &[String]) -> Vec<ReportSheet> {
    let unique = ReportSheet {
        name: UNIQUE_SHEET.to_string(),
        file_stem: "unique_entries".to_string(),
        headers: columns.to_vec(),
        rows: partition
            .unique
            .iter()
            .map(|r| r.values().map(str::to_string).collect())
            .collect(),
    };

    let mut duplicate_headers = columns.to_vec();
    duplicate_headers.push(DUPLICATE_IN_COLUMN.to_string());
    let duplicates = ReportSheet {
        name: DUPLICATES_SHEET.to_string(),
        file_stem: "duplicates".to_string(),
        headers: duplicate_headers,
        rows: partition
            .duplicates
            .iter()
            .map(|d| {
                d.record
                    .values()
                    .map(str::to_string)
                    .chain(std::iter::once(d.duplicate_in.clone()))
                    .collect()
            })
            .collect(),
    };

    vec![unique, duplicates]
}

pub fn render_files(sheets: &[ReportSheet], formats: &[OutputFormat]) -> Result<Vec<ReportFile>> {
    let mut files = Vec::with_capacity(sheets.len() * formats.len());
    for format in formats {
        for sheet in sheets {
            files.push(ReportFile {
                name: sheet.file_name(*format),
                data: sheet.render(*format)?,
            });
        }
    }
    Ok(files)
}

pub fn render_summary(summary: &RunSummary) -> Result<ReportFile> {
    Ok(ReportFile {
        name: SUMMARY_FILE.to_string(),
        data: serde_json::to_vec_pretty(summary)?,
    })
}

pub fn bundle_zip(files: &[ReportFile]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for file in files {
        zip.start_file::<_, ()>(file.name.as_str(), FileOptions::default())?;
        zip.write_all(&file.data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
