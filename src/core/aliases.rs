use crate::utils::error::{EtlError, Result};
use std::collections::{BTreeMap, HashMap};

/// Canonical journal name -> alternative spellings, as written in configuration.
pub type AliasTable = BTreeMap<String, Vec<String>>;

pub fn default_alias_table() -> AliasTable {
    let mut table = AliasTable::new();
    table.insert(
        "Energy Research & Social Science".to_string(),
        vec![
            "Energy Research And Social Science".to_string(),
            "Energy Research \\& Social Science".to_string(),
        ],
    );
    table
}

/// Key used to compare journal spellings: `\&` read as `&`, whitespace
/// collapsed, lower-cased.
pub fn match_key(value: &str) -> String {
    value
        .replace("\\&", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Validated, read-only journal alias lookup.
///
/// Every canonical name also resolves to itself. Construction fails when one
/// spelling would resolve to two different canonical names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalAliases {
    table: AliasTable,
    lookup: HashMap<String, String>,
}

impl JournalAliases {
    pub fn new(table: AliasTable) -> Result<Self> {
        let mut lookup: HashMap<String, String> = HashMap::new();

        for (canonical, aliases) in &table {
            let spellings = std::iter::once(canonical).chain(aliases.iter());
            for spelling in spellings {
                let key = match_key(spelling);
                if key.is_empty() {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "journal_aliases".to_string(),
                        value: canonical.clone(),
                        reason: "Empty journal spelling".to_string(),
                    });
                }
                match lookup.get(&key) {
                    Some(existing) if existing != canonical => {
                        return Err(EtlError::AmbiguousJournalAlias {
                            alias: spelling.clone(),
                            first: existing.clone(),
                            second: canonical.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        lookup.insert(key, canonical.clone());
                    }
                }
            }
        }

        tracing::debug!(
            "Loaded {} canonical journals ({} spellings)",
            table.len(),
            lookup.len()
        );
        Ok(Self { table, lookup })
    }

    pub fn empty() -> Self {
        Self {
            table: AliasTable::new(),
            lookup: HashMap::new(),
        }
    }

    pub fn resolve(&self, value: &str) -> Option<&str> {
        self.lookup.get(&match_key(value)).map(String::as_str)
    }

    pub fn table(&self) -> &AliasTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for JournalAliases {
    fn default() -> Self {
        Self::new(default_alias_table()).expect("built-in alias table is unambiguous")
    }
}
