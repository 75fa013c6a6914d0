//! Command-line argument definitions
//!
//! Defines the CLI surface with the clap derive API: `import` runs a file
//! through the pipeline, `preview` samples it without importing, `watch`
//! keeps scanning a folder on an interval.

use crate::app::services::strategies::ImportKind;
use crate::config::{IngestConfig, StackConfig};
use crate::{Error, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI arguments for the climate data ingestion tool
#[derive(Debug, Clone, Parser)]
#[command(
    name = "climate-ingest",
    version,
    about = "Batched, fault-tolerant ingestion of climate observation files",
    long_about = "Imports station, climate-reading, data-type and country files \
                  (CSV, JSON, Excel) of unknown encoding and dialect. Rows are \
                  processed in transactional batches; individual bad rows are \
                  recorded and skipped rather than aborting the file."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Import a data file
    Import(ImportArgs),
    /// Show the first rows of a file without importing it
    Preview(PreviewArgs),
    /// Watch a folder and import files as they appear
    Watch(WatchArgs),
}

/// Arguments for the import command
#[derive(Debug, Clone, Parser)]
pub struct ImportArgs {
    /// Path of the file to import (.csv, .txt, .json, .xls, .xlsx)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Import type: stations, climate-data, climate-data-stack,
    /// weather-data-types or countries
    #[arg(
        short = 't',
        long = "type",
        value_name = "TYPE",
        value_parser = ImportKind::from_str
    )]
    pub kind: ImportKind,

    /// Rows per transactional batch
    #[arg(long, value_name = "N", default_value_t = crate::constants::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Overwrite records that already exist instead of skipping them
    #[arg(long)]
    pub update_existing: bool,

    /// Maximum buffered readings per station in stack mode
    #[arg(long, value_name = "N", default_value_t = crate::constants::DEFAULT_STACK_MAX_SIZE)]
    pub stack_max_size: usize,

    /// Auto-flush threshold for stack mode (0 disables auto-processing)
    #[arg(long, value_name = "N", default_value_t = crate::constants::DEFAULT_STACK_THRESHOLD)]
    pub stack_threshold: usize,

    /// Print the summary as JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the preview command
#[derive(Debug, Clone, Parser)]
pub struct PreviewArgs {
    /// Path of the file to sample
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for the watch command
#[derive(Debug, Clone, Parser)]
pub struct WatchArgs {
    /// Folder to scan for new data files
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,

    /// Import type applied to every discovered file
    #[arg(
        short = 't',
        long = "type",
        value_name = "TYPE",
        value_parser = ImportKind::from_str
    )]
    pub kind: ImportKind,

    /// Seconds between scans
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub interval: u64,

    /// Rows per transactional batch
    #[arg(long, value_name = "N", default_value_t = crate::constants::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

impl Args {
    /// Validate argument combinations before running
    pub fn validate(&self) -> Result<()> {
        match &self.command {
            Some(Commands::Import(import)) => {
                if import.batch_size == 0 {
                    return Err(Error::configuration("batch size must be at least 1"));
                }
                if import.stack_max_size == 0 {
                    return Err(Error::configuration("stack max size must be at least 1"));
                }
                Ok(())
            }
            Some(Commands::Watch(watch)) => {
                if watch.interval == 0 {
                    return Err(Error::configuration("scan interval must be at least 1 second"));
                }
                if watch.batch_size == 0 {
                    return Err(Error::configuration("batch size must be at least 1"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl ImportArgs {
    /// Build the pipeline configuration from the parsed flags
    pub fn ingest_config(&self) -> IngestConfig {
        let stack = StackConfig {
            max_size: self.stack_max_size,
            auto_process: self.stack_threshold > 0,
            process_threshold: if self.stack_threshold > 0 {
                self.stack_threshold
            } else {
                self.stack_max_size
            },
        };
        IngestConfig::default()
            .with_batch_size(self.batch_size)
            .with_update_existing(self.update_existing)
            .with_stack(stack)
    }
}
