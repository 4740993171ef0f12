use bib_consolidate::core::ConfigProvider;
use bib_consolidate::utils::{logger, validation::Validate};
use bib_consolidate::{BibPipeline, CliConfig, EtlEngine, EtlError, LocalStorage, TomlConfig};
use clap::Parser;

fn fail(e: &EtlError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.severity().exit_code());
}

fn display_config_summary(config: &TomlConfig) {
    let settings = config.settings();
    println!("📋 Configuration Summary:");
    println!(
        "  Sources: {}/*.{}",
        config.sources_dir(),
        config.source_extension()
    );
    println!("  Columns: {}", settings.relevant_columns().join(", "));
    println!("  Dedup key: {}", settings.dedup_key());
    println!("  Journal aliases: {}", settings.journal_aliases().len());
    let formats: Vec<&str> = config
        .output_formats()
        .iter()
        .map(|f| f.extension())
        .collect();
    println!("  Formats: {}", formats.join(", "));
    match config.bundle_name() {
        Some(bundle) => println!("  Output: {}/{}", config.output_path(), bundle),
        None => println!("  Output: {}/", config.output_path()),
    }
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::debug!("CLI args: {:?}", args);

    // 載入並驗證配置，任何設定錯誤都在處理記錄前終止
    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    if let Err(e) = config.validate() {
        fail(&e);
    }
    tracing::info!("✅ Configuration loaded and validated");

    display_config_summary(&config);

    let storage = LocalStorage::new(".".to_string());
    let pipeline = BibPipeline::new(storage, config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no report will be written");
        match pipeline.discover_sources().await {
            Ok(sources) => {
                println!("🔍 Sources (in consolidation order):");
                for source in sources {
                    println!("  {}", source);
                }
            }
            Err(e) => fail(&e),
        }
        return Ok(());
    }

    let engine = EtlEngine::new(pipeline);
    match engine.run().await {
        Ok(output_path) => {
            println!("✅ Consolidation completed");
            println!("📁 Report saved to: {}", output_path);
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
