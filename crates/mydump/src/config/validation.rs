//! Option validation.

use super::DumpOptions;
use crate::error::{DumpError, Result};
use crate::matcher::parse_patterns;

/// Validate an option record.
///
/// Pattern entries are compiled here so a bad regex fails at construction
/// instead of mid-dump.
pub fn validate(options: &DumpOptions) -> Result<()> {
    if options.net_buffer_length == 0 {
        return Err(DumpError::Config(
            "net_buffer_length must be at least 1".into(),
        ));
    }
    if options.default_character_set.is_empty() {
        return Err(DumpError::Config(
            "default-character-set must not be empty".into(),
        ));
    }

    parse_patterns(&options.include_tables)?;
    parse_patterns(&options.exclude_tables)?;
    if let Some(views) = &options.include_views {
        parse_patterns(views)?;
    }
    parse_patterns(options.no_data.patterns())?;

    for (table, keep) in &options.keep_data {
        if keep.column.is_empty() {
            return Err(DumpError::Config(format!(
                "keep-data for table '{}' names an empty column",
                table
            )));
        }
        if keep.rows.is_empty() {
            return Err(DumpError::Config(format!(
                "keep-data for table '{}' lists no rows",
                table
            )));
        }
    }

    Ok(())
}
