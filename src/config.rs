//! Configuration for import runs and data stacks.
//!
//! Provides the tunable parameters for batch sizing, upsert behavior,
//! and per-entity stack buffering, with builder-style construction.

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_STACK_MAX_SIZE, DEFAULT_STACK_THRESHOLD};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for one import operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Number of rows per transactional batch
    pub batch_size: usize,

    /// Whether station/data-type/country imports overwrite existing records.
    /// When false, a row matching an existing record is left untouched and a
    /// warning is recorded.
    pub update_existing: bool,

    /// Stack parameters applied to newly created station/device buffers
    pub stack: StackConfig,
}

/// Parameters for a bounded per-entity data stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Maximum number of buffered readings; pushes are rejected beyond this
    pub max_size: usize,

    /// Whether the stack flushes itself once the threshold is reached
    pub auto_process: bool,

    /// Buffer size at which an auto-process flush fires (must be <= max_size)
    pub process_threshold: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            update_existing: true,
            stack: StackConfig::default(),
        }
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_STACK_MAX_SIZE,
            auto_process: false,
            process_threshold: DEFAULT_STACK_THRESHOLD,
        }
    }
}

impl IngestConfig {
    /// Create configuration with a custom batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Control whether imports overwrite existing records
    pub fn with_update_existing(mut self, update_existing: bool) -> Self {
        self.update_existing = update_existing;
        self
    }

    /// Replace the stack parameters
    pub fn with_stack(mut self, stack: StackConfig) -> Self {
        self.stack = stack;
        self
    }

    /// Validate internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::configuration("batch_size must be at least 1"));
        }
        self.stack.validate()
    }
}

impl StackConfig {
    /// Create stack parameters with a custom capacity
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Enable auto-processing at the given threshold
    pub fn with_auto_process(mut self, process_threshold: usize) -> Self {
        self.auto_process = true;
        self.process_threshold = process_threshold;
        self
    }

    /// Validate internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::configuration("stack max_size must be at least 1"));
        }
        if self.process_threshold > self.max_size {
            return Err(Error::configuration(format!(
                "process_threshold {} exceeds max_size {}",
                self.process_threshold, self.max_size
            )));
        }
        Ok(())
    }
}
