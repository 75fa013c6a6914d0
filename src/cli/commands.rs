//! Command execution: progress reporting and summary output

use crate::app::services::formats::{self, FileFormat, FilePreview};
use crate::app::services::importer::Importer;
use crate::app::services::progress::{ProgressCallback, Summary};
use crate::app::services::scanner::WatchFolder;
use crate::app::storage::InMemoryStorage;
use crate::cli::args::{Args, Commands, ImportArgs, PreviewArgs, WatchArgs};
use crate::config::IngestConfig;
use crate::{Error, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Dispatch the parsed arguments to their command
pub async fn run(args: Args, token: CancellationToken) -> Result<()> {
    args.validate()?;
    debug!(?args, "running command");

    match &args.command {
        Some(Commands::Import(import)) => run_import(import),
        Some(Commands::Preview(preview)) => run_preview(preview),
        Some(Commands::Watch(watch)) => run_watch(watch, token).await,
        None => Ok(()),
    }
}

fn run_import(args: &ImportArgs) -> Result<()> {
    let storage = InMemoryStorage::new(args.ingest_config().stack.clone());
    let importer = Importer::new(&storage, args.ingest_config());

    let bar = progress_bar();
    let callback: ProgressCallback = {
        let bar = bar.clone();
        Box::new(move |summary: &Summary| {
            if bar.length().unwrap_or(0) != summary.total_rows as u64 {
                bar.set_length(summary.total_rows as u64);
            }
            bar.set_position(summary.total_processed as u64);
        })
    };

    let summary = importer.import_path(&args.file, args.kind, Some(callback))?;
    bar.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.success == 0 && summary.error > 0 {
        return Err(Error::validation("import produced no successful rows"));
    }
    Ok(())
}

fn run_preview(args: &PreviewArgs) -> Result<()> {
    let format = FileFormat::from_path(&args.file)?;
    let bytes = std::fs::read(&args.file)?;

    match formats::preview(&bytes, format)? {
        FilePreview::Table {
            fieldnames,
            rows,
            total_rows,
        } => {
            println!("{}", fieldnames.join(" | ").bold());
            for row in &rows {
                println!("{}", row.join(" | "));
            }
            println!(
                "{}",
                format!("{} of {} rows shown", rows.len(), total_rows).dimmed()
            );
        }
        FilePreview::Unavailable { message } => {
            println!("{}", message.yellow());
        }
    }
    Ok(())
}

async fn run_watch(args: &WatchArgs, token: CancellationToken) -> Result<()> {
    let config = IngestConfig::default().with_batch_size(args.batch_size);
    let storage = InMemoryStorage::new(config.stack.clone());
    let folder = WatchFolder::new(&args.folder, Duration::from_secs(args.interval), args.kind);

    println!(
        "Watching {} for {} files every {}s (Ctrl-C to stop)",
        args.folder.display().to_string().bold(),
        args.kind,
        args.interval
    );
    let report = folder.run(&storage, config, token).await;

    println!(
        "\n{} {} file(s), {} row(s) imported, {} row(s) failed",
        "Done:".green().bold(),
        report.files_imported,
        report.rows_succeeded,
        report.rows_failed
    );
    Ok(())
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-"),
    );
    bar
}

fn print_summary(summary: &Summary) {
    let headline = if summary.error == 0 {
        "Import complete".green().bold()
    } else if summary.success > 0 {
        "Import finished with errors".yellow().bold()
    } else {
        "Import failed".red().bold()
    };
    println!("{headline}");
    println!(
        "  {} succeeded, {} failed of {} rows in {:.2}s",
        summary.success.to_string().green(),
        summary.error.to_string().red(),
        summary.total_rows,
        summary.duration_seconds
    );

    for record in summary.errors.iter().take(10) {
        match record.line {
            Some(line) => println!("  {} line {}: {}", "error".red(), line, record.message),
            None => println!("  {} {}", "error".red(), record.message),
        }
    }
    if summary.errors.len() > 10 {
        println!("  ... and {} more errors", summary.error - 10);
    }

    for record in summary.warnings.iter().take(10) {
        match record.line {
            Some(line) => println!("  {} line {}: {}", "warning".yellow(), line, record.message),
            None => println!("  {} {}", "warning".yellow(), record.message),
        }
    }
}
