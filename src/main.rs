//! bt-export
//!
//! Exports the datasets and experiments of a Braintrust project to CSV.
//!
//! # Usage
//!
//! ```bash
//! export BRAINTRUST_API_KEY=...
//! bt-export <PROJECT_ID>
//! ```
//!
//! Files land under `exports/<project>/datasets/` and
//! `exports/<project>/experiments/`.

use std::sync::Arc;
use std::time::Duration;

use bt_export::cli::CliInterface;
use bt_export::error::Result;
use bt_export::export::ExportSummary;
use bt_export::utils::time::format_duration;
use bt_export::{CsvWriter, EntityKind, ExportCoordinator, HttpTransport};
use tracing::info;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// This function orchestrates the application startup:
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands or run the export
///
/// # Returns
/// * `Result<()>` - Success or error
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    run_export(&cli).await
}

/// Export the whole project and print the summary
async fn run_export(cli: &CliInterface) -> Result<()> {
    // Credential check happens before any prompt or network call
    let api_key = cli.config().read_api_key()?;
    let project_id = cli.project_id()?;

    let export_config = cli.config().export_config(project_id, api_key);
    info!(
        "Exporting project {} from {} (page size {})",
        export_config.project_id, export_config.base_url, export_config.page_size
    );

    let transport = HttpTransport::new(&export_config)?;
    let mut coordinator =
        ExportCoordinator::new(export_config, Arc::new(transport), Box::new(CsvWriter::new()))
            .with_progress(cli.show_progress());

    let summary = coordinator.execute().await?;
    print_summary(&summary);
    Ok(())
}

/// Print the per-entity table and where the files went
fn print_summary(summary: &ExportSummary) {
    if !summary.reports.is_empty() {
        println!("{}", summary.render_table());
    }

    println!("Export completed!");
    println!(
        "Datasets: {}",
        summary.dir_for(EntityKind::Dataset).display()
    );
    println!(
        "Experiments: {}",
        summary.dir_for(EntityKind::Experiment).display()
    );
    println!(
        "{} files written in {}",
        summary.files_written(),
        format_duration(Duration::from_millis(summary.elapsed_ms))
    );

    let failures = summary.failures().count();
    if failures > 0 {
        eprintln!("{} entities had errors; see the table above", failures);
    }
}

/// Initialize logging system based on configured level
///
/// Verbosity flags have already been folded into the configuration.
///
/// # Arguments
/// * `cli` - CLI interface with logging settings
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
