//! Country import strategy

use super::fields::{parse_flag, require};
use super::RowStrategy;
use crate::app::models::CountryRecord;
use crate::app::services::batch_runner::BatchContext;
use crate::app::services::dialect::RawRow;
use crate::app::services::progress::ImportProgress;
use crate::app::storage::DomainOp;
use crate::Result;

/// Upserts countries keyed by code.
///
/// Requires `name` and `code`; the code is normalized to uppercase, and a
/// shape outside 2-3 letters is a warning, not a row failure. The hemisphere
/// flag uses the permissive truthy set.
pub struct CountriesStrategy {
    update_existing: bool,
}

impl CountriesStrategy {
    pub fn new(update_existing: bool) -> Self {
        Self { update_existing }
    }
}

impl RowStrategy for CountriesStrategy {
    fn process(
        &self,
        row: &RawRow,
        line: usize,
        ctx: &mut BatchContext<'_>,
        progress: &mut ImportProgress,
    ) -> Result<()> {
        let name = require(row, "name")?;
        let code = require(row, "code")?.to_ascii_uppercase();

        let record = CountryRecord {
            code,
            name: name.to_string(),
            southern_hemisphere: parse_flag(row, "southern_hemisphere"),
        };

        if !record.code_is_well_formed() {
            progress.warning(
                format!("Country code '{}' is not 2-3 letters", record.code),
                Some(line),
                Some("code".to_string()),
                Some(row.snippet()),
            );
        }

        if !self.update_existing && ctx.storage().country_exists(&record.code)? {
            progress.warning(
                format!("Country '{}' already exists, left unchanged", record.code),
                Some(line),
                None,
                Some(row.snippet()),
            );
            return Ok(());
        }

        ctx.stage(DomainOp::UpsertCountry(record));
        Ok(())
    }
}
