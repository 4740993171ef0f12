pub mod cli;
pub mod settings;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use self::cli_args::CliConfig;

#[cfg(feature = "cli")]
mod cli_args {
    use crate::config::toml_config::TomlConfig;
    use crate::core::report::OutputFormat;
    use crate::utils::error::Result;
    use clap::Parser;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "bib-consolidate")]
    #[command(about = "Merge BibTeX exports from several databases and flag duplicates")]
    pub struct CliConfig {
        /// Path to a TOML configuration file
        #[arg(short, long)]
        pub config: Option<String>,

        /// Directory holding one BibTeX export per database
        #[arg(long)]
        pub sources_dir: Option<String>,

        #[arg(long)]
        pub output_path: Option<String>,

        /// Output formats, e.g. csv,json
        #[arg(long, value_delimiter = ',')]
        pub formats: Vec<OutputFormat>,

        /// Zip bundle file name
        #[arg(long, conflicts_with = "no_bundle")]
        pub bundle: Option<String>,

        /// Write plain files instead of a zip bundle
        #[arg(long)]
        pub no_bundle: bool,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub json_logs: bool,

        /// List the sources that would be read, without writing a report
        #[arg(long)]
        pub dry_run: bool,
    }

    impl CliConfig {
        /// 載入設定檔 (若有) 並套用命令列覆蓋
        pub fn load_config(&self) -> Result<TomlConfig> {
            let mut config = match &self.config {
                Some(path) => TomlConfig::from_file(path)?,
                None => TomlConfig::default(),
            };
            self.apply_overrides(&mut config);
            Ok(config)
        }

        pub fn apply_overrides(&self, config: &mut TomlConfig) {
            if let Some(dir) = &self.sources_dir {
                config.sources.dir = dir.clone();
            }
            if let Some(path) = &self.output_path {
                config.load.output_path = path.clone();
            }
            if !self.formats.is_empty() {
                config.load.output_formats = self.formats.clone();
            }
            if let Some(bundle) = &self.bundle {
                config.load.bundle = Some(bundle.clone());
            }
            if self.no_bundle {
                config.load.bundle = None;
            }
        }
    }

}
