use crate::config::settings::{default_aliases, default_columns, PipelineSettings, DEFAULT_DEDUP_KEY};
use crate::core::aliases::AliasTable;
use crate::core::report::{OutputFormat, DEFAULT_BUNDLE_NAME};
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_extension, validate_non_empty_string, validate_path, Validate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static ENV_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default = "default_aliases")]
    pub journal_aliases: AliasTable,
    #[serde(default)]
    pub load: LoadConfig,
    /// 由 schema 與 journal_aliases 建立，載入後不再變動
    #[serde(skip)]
    settings: PipelineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_sources_dir")]
    pub dir: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_columns")]
    pub relevant_columns: Vec<String>,
    #[serde(default = "default_dedup_key")]
    pub dedup_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_formats")]
    pub output_formats: Vec<OutputFormat>,
    /// Zip bundle name; set to "" to write plain files.
    #[serde(default = "default_bundle")]
    pub bundle: Option<String>,
}

fn default_sources_dir() -> String {
    "sources".to_string()
}

fn default_extension() -> String {
    "bib".to_string()
}

fn default_dedup_key() -> String {
    DEFAULT_DEDUP_KEY.to_string()
}

fn default_output_path() -> String {
    ".".to_string()
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Csv]
}

fn default_bundle() -> Option<String> {
    Some(DEFAULT_BUNDLE_NAME.to_string())
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            dir: default_sources_dir(),
            extension: default_extension(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            relevant_columns: default_columns(),
            dedup_key: default_dedup_key(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            output_formats: default_formats(),
            bundle: default_bundle(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            schema: SchemaConfig::default(),
            journal_aliases: default_aliases(),
            load: LoadConfig::default(),
            settings: PipelineSettings::default(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，別名表有歧義時立即失敗
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        let mut config: TomlConfig =
            toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        if config.load.bundle.as_deref().is_some_and(|b| b.trim().is_empty()) {
            config.load.bundle = None;
        }

        config.settings = PipelineSettings::new(
            &config.schema.relevant_columns,
            config.journal_aliases.clone(),
            &config.schema.dedup_key,
        )?;
        Ok(config)
    }

    /// 替換環境變數 (例如 ${SOURCES_DIR})，未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_path("sources.dir", &self.sources.dir)?;
        validate_extension("sources.extension", &self.sources.extension)?;
        validate_path("load.output_path", &self.load.output_path)?;

        if self.load.output_formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }

        if let Some(bundle) = &self.load.bundle {
            validate_non_empty_string("load.bundle", bundle)?;
        }

        self.settings.validate()
    }
}

impl ConfigProvider for TomlConfig {
    fn sources_dir(&self) -> &str {
        &self.sources.dir
    }

    fn source_extension(&self) -> &str {
        &self.sources.extension
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[OutputFormat] {
        &self.load.output_formats
    }

    fn bundle_name(&self) -> Option<&str> {
        self.load.bundle.as_deref()
    }

    fn settings(&self) -> &PipelineSettings {
        &self.settings
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert_eq!(config.sources_dir(), "sources");
        assert_eq!(config.source_extension(), "bib");
        assert_eq!(config.output_formats(), [OutputFormat::Csv]);
        assert_eq!(config.bundle_name(), Some(DEFAULT_BUNDLE_NAME));
        assert_eq!(config.settings(), &PipelineSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[sources]
dir = "exports"
extension = "bibtex"

[schema]
relevant_columns = ["doi", "title", "journal", "source"]
dedup_key = "doi"

[journal_aliases]
"Energy Policy" = ["Energy Pol.", "En. Policy"]

[load]
output_path = "./out"
output_formats = ["csv", "json"]
bundle = ""
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.sources_dir(), "exports");
        assert_eq!(config.source_extension(), "bibtex");
        assert_eq!(config.settings().relevant_columns().len(), 4);
        assert_eq!(
            config.settings().journal_aliases().resolve("en. policy"),
            Some("Energy Policy")
        );
        assert_eq!(
            config.output_formats(),
            [OutputFormat::Csv, OutputFormat::Json]
        );
        assert_eq!(config.bundle_name(), None);
    }

    #[test]
    fn test_ambiguous_aliases_rejected_on_load() {
        let toml_content = r#"
[journal_aliases]
"Journal A" = ["J. A"]
"Journal B" = ["j. a"]
"#;

        let err = TomlConfig::from_toml_str(toml_content).unwrap_err();
        assert!(matches!(err, EtlError::AmbiguousJournalAlias { .. }));
    }

    #[test]
    fn test_unknown_output_format_rejected() {
        let toml_content = r#"
[load]
output_formats = ["xlsx"]
"#;
        assert!(TomlConfig::from_toml_str(toml_content).is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("BIB_CONSOLIDATE_TEST_SOURCES", "/data/exports");

        let toml_content = r#"
[sources]
dir = "${BIB_CONSOLIDATE_TEST_SOURCES}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.sources_dir(), "/data/exports");

        std::env::remove_var("BIB_CONSOLIDATE_TEST_SOURCES");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[sources]
extension = ".bib"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[sources]\ndir = \"from-file\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.sources_dir(), "from-file");
    }
}
