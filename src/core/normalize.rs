//! Field-level canonicalization. Every function here is pure and never fails;
//! a missing value normalizes to the empty string.

use crate::core::aliases::JournalAliases;

/// Prefixes stripped from DOIs, checked in this order after lower-casing.
pub const DOI_PREFIXES: [&str; 7] = [
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "urn:doi:",
    "doi:",
];

pub fn normalize_doi(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    let lowered = raw.trim().to_lowercase();
    let stripped = DOI_PREFIXES
        .iter()
        .find_map(|prefix| lowered.strip_prefix(prefix))
        .unwrap_or(lowered.as_str());

    stripped.trim().to_string()
}

/// Upper-cases every letter that follows a non-letter and lower-cases the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_is_letter = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }

    out
}

pub fn normalize_journal(raw: Option<&str>, aliases: &JournalAliases) -> String {
    let raw = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return String::new(),
    };

    let titled = title_case(raw);
    match aliases.resolve(&titled).or_else(|| aliases.resolve(raw)) {
        Some(canonical) => canonical.to_string(),
        None => titled,
    }
}

pub fn normalize_entry_type(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn normalize_text(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}
