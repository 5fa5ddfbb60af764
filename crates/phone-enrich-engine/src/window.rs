//! Row windows.

use serde::{Deserialize, Serialize};

use crate::config::WindowConfig;
use crate::{EnrichError, Result};

/// Inclusive, 1-based row range of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    /// Resolve the configured selector against the input's row count.
    ///
    /// Selector exclusivity is checked by [`WindowConfig::validate`]; this
    /// checks bounds. `limit` larger than the table is capped, every other
    /// out-of-range value is an error.
    pub fn resolve(config: &WindowConfig, row_count: usize) -> Result<Self> {
        config.validate()?;
        if row_count == 0 {
            return Err(EnrichError::Range("input has no rows".to_string()));
        }

        if let Some(limit) = config.limit {
            return Ok(Self {
                start: 1,
                end: limit.min(row_count),
            });
        }

        if let Some(last) = config.last {
            if last > row_count {
                return Err(EnrichError::Range(format!(
                    "cannot take the last {last} rows of an input with {row_count} rows"
                )));
            }
            return Ok(Self {
                start: row_count - last + 1,
                end: row_count,
            });
        }

        let start = config.from_row.unwrap_or(1);
        let end = config.to_row.unwrap_or(row_count);
        if start > row_count {
            return Err(EnrichError::Range(format!(
                "from_row {start} exceeds the input's {row_count} rows"
            )));
        }
        if end > row_count {
            return Err(EnrichError::Range(format!(
                "to_row {end} exceeds the input's {row_count} rows"
            )));
        }
        if start > end {
            return Err(EnrichError::Range(format!(
                "from_row {start} is after to_row {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, row: usize) -> bool {
        (self.start..=self.end).contains(&row)
    }
}
