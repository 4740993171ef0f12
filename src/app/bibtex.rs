use crate::domain::model::{RawEntry, SkippedEntry};
use biblatex::{Field, RawBibliography, RawChunk};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static ENTRY_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*@[a-zA-Z]").expect("valid entry start pattern"));

/// `@string` values may reference each other; stop following after this many hops.
const MAX_ABBREVIATION_DEPTH: usize = 16;

/// Source label for a file: its stem, lower-cased (`sources/Scopus.bib` -> `scopus`).
pub fn source_label(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Entries recovered from one file, plus the blocks that could not be parsed.
#[derive(Debug, Default)]
pub struct ParsedSource {
    pub entries: Vec<RawEntry>,
    pub skipped: Vec<SkippedEntry>,
}

type Abbreviations<'s> = HashMap<String, &'s Field<'s>>;

fn field_to_string(field: &Field<'_>, abbreviations: &Abbreviations<'_>, depth: usize) -> String {
    field
        .iter()
        .map(|chunk| match &chunk.v {
            RawChunk::Normal(s) => s.to_string(),
            RawChunk::Abbreviation(name) => match abbreviations.get(&name.to_lowercase()) {
                Some(value) if depth < MAX_ABBREVIATION_DEPTH => {
                    field_to_string(value, abbreviations, depth + 1)
                }
                // 未定義的巨集（如 month = sep）保留原文
                _ => name.to_string(),
            },
        })
        .collect()
}

/// Best-effort citation key of a block that failed to parse.
fn block_key(block: &str) -> String {
    block
        .split_once(['{', '('])
        .and_then(|(_, rest)| rest.split([',', '}', '\n']).next())
        .map(|key| key.trim().to_string())
        .unwrap_or_default()
}

/// Parses each `@` block on its own so one bad block only costs itself.
fn parse_blocks<'s>(
    file: &str,
    content: &'s str,
    skipped: &mut Vec<SkippedEntry>,
) -> Vec<RawBibliography<'s>> {
    let starts: Vec<usize> = ENTRY_START_RE.find_iter(content).map(|m| m.start()).collect();
    let mut parsed = Vec::with_capacity(starts.len());

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(content.len());
        let block = &content[start..end];

        match RawBibliography::parse(block) {
            Ok(raw) => parsed.push(raw),
            Err(e) => {
                let key = block_key(block);
                let reason = format!("{} at byte {}", e.kind, start + e.span.start);
                tracing::warn!("Skipping entry '{}' in {}: {}", key, file, reason);
                skipped.push(SkippedEntry {
                    path: file.to_string(),
                    key,
                    reason,
                });
            }
        }
    }

    parsed
}

/// Parses a BibTeX file; entries keep their order in the file.
///
/// Field values are the literal text between the delimiters. `@string`
/// macros are expanded, unknown macros are kept as written. Repeated
/// citation keys are all kept. A block with a syntax error is dropped and
/// reported in [`ParsedSource::skipped`] without affecting its neighbours.
pub fn parse_entries(file: &str, content: &str) -> ParsedSource {
    let mut result = ParsedSource::default();

    let bibliographies = match RawBibliography::parse(content) {
        Ok(raw) => vec![raw],
        Err(e) => {
            tracing::debug!(
                "{} did not parse as a whole ({}), parsing entry by entry",
                file,
                e
            );
            parse_blocks(file, content, &mut result.skipped)
        }
    };

    let abbreviations: Abbreviations<'_> = bibliographies
        .iter()
        .flat_map(|raw| raw.abbreviations.iter())
        .map(|pair| (pair.key.v.to_lowercase(), &pair.value.v))
        .collect();

    for raw in &bibliographies {
        for entry in &raw.entries {
            let mut parsed = RawEntry::new(entry.v.key.v, entry.v.kind.v);
            for pair in &entry.v.fields {
                parsed.push_field(pair.key.v, field_to_string(&pair.value.v, &abbreviations, 0));
            }
            result.entries.push(parsed);
        }
    }

    result
}
