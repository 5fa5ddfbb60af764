//! Input and output CSV tables.
//!
//! The input is read once into memory and never modified. The output mirrors
//! the input columns plus `Phone1..Phone4`; only the phone cells change.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use phone_enrich_cache::{write_atomic, CacheKey};
use phone_enrich_lookup::LookupQuery;
use phone_enrich_match::normalize::normalize_state;
use phone_enrich_match::{LocationLine, NameOrder, PhoneSlots, Target};

use crate::config::ColumnMap;
use crate::digest::input_digest;
use crate::window::Window;
use crate::{EnrichError, Result};

pub const PHONE_COLUMNS: [&str; 4] = ["Phone1", "Phone2", "Phone3", "Phone4"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ============================================================================
// Input
// ============================================================================

#[derive(Debug, Clone)]
pub struct InputTable {
    pub path: PathBuf,
    pub headers: Vec<String>,
    /// Data rows, each padded to the header width.
    pub rows: Vec<Vec<String>>,
    /// FNV-1a digest of the raw file bytes.
    pub digest: String,
}

/// Column positions resolved against one input's headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub name: usize,
    pub address: usize,
    pub city: Option<usize>,
    pub state: Option<usize>,
    pub unit: Option<usize>,
}

/// Everything the driver derives from one input row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowIdentity {
    pub name: String,
    pub target: Target,
    pub key: CacheKey,
    pub query: LookupQuery,
}

impl InputTable {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| EnrichError::Input {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_bytes(path, &bytes)
    }

    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        let input_error = |message: String| EnrichError::Input {
            path: path.to_path_buf(),
            message,
        };
        let digest = input_digest(bytes);
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(body);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| input_error(format!("failed to read header: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(input_error("missing header row".to_string()));
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| input_error(format!("row {}: {e}", idx + 1)))?;
            if record.len() > headers.len() {
                return Err(input_error(format!(
                    "row {} has {} fields but the header has {}",
                    idx + 1,
                    record.len(),
                    headers.len()
                )));
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
            digest,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive header lookup.
    pub fn column(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Resolve the configured columns. Every configured column must exist.
    pub fn columns(&self, map: &ColumnMap) -> Result<ColumnIndex> {
        let require = |name: &str| {
            self.column(name).ok_or_else(|| EnrichError::Input {
                path: self.path.clone(),
                message: format!(
                    "missing column {name:?} (have: {})",
                    self.headers.join(", ")
                ),
            })
        };
        let optional = |name: &Option<String>| name.as_deref().map(require).transpose();
        Ok(ColumnIndex {
            name: require(&map.name)?,
            address: require(&map.address)?,
            city: optional(&map.city)?,
            state: optional(&map.state)?,
            unit: optional(&map.unit)?,
        })
    }

    /// Fields of a 1-based row.
    pub fn row(&self, row: usize) -> &[String] {
        &self.rows[row - 1]
    }

    /// Derive name, scoring target, cache key and query for a 1-based row.
    ///
    /// City and state come from their own columns when configured and
    /// non-empty, otherwise from the address text, otherwise from the
    /// defaults.
    pub fn identity(
        &self,
        row: usize,
        columns: &ColumnIndex,
        map: &ColumnMap,
        order: NameOrder,
    ) -> RowIdentity {
        let fields = self.row(row);
        let field = |idx: Option<usize>| {
            idx.and_then(|i| fields.get(i))
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
        };

        let name = field(Some(columns.name)).unwrap_or_default().to_string();
        let address = field(Some(columns.address)).unwrap_or_default();
        let city_column = field(columns.city);
        let state_column = field(columns.state);

        let hint = city_column.unwrap_or(map.default_city.as_str());
        let line = LocationLine::parse_with_city(address, hint);

        let mut street = line.street.clone();
        if let Some(unit) = field(columns.unit) {
            if !street.is_empty() {
                street.push(' ');
            }
            street.push_str(unit);
        }
        let city = city_column
            .map(str::to_string)
            .or_else(|| Some(line.city.clone()).filter(|c| !c.is_empty()))
            .unwrap_or_else(|| map.default_city.clone());
        let state = state_column
            .map(str::to_string)
            .or_else(|| Some(line.state.clone()).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| map.default_state.clone());

        RowIdentity {
            key: CacheKey::new(&name, &city, &normalize_state(&state)),
            query: LookupQuery::from_record(&name, &city, &state, order),
            target: Target {
                name: name.clone(),
                street,
                city,
                state,
            },
            name,
        }
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    phone_columns: [usize; 4],
}

impl OutputTable {
    /// Input columns plus `Phone1..Phone4`. Phone columns already present
    /// in the input are reused in place.
    pub fn from_input(input: &InputTable) -> Self {
        let mut headers = input.headers.clone();
        let mut phone_columns = [0; 4];
        for (slot, name) in PHONE_COLUMNS.iter().enumerate() {
            phone_columns[slot] = match input.column(name) {
                Some(idx) => idx,
                None => {
                    headers.push(name.to_string());
                    headers.len() - 1
                }
            };
        }
        let rows = input
            .rows
            .iter()
            .map(|row| {
                let mut out = row.clone();
                out.resize(headers.len(), String::new());
                out
            })
            .collect();
        Self {
            headers,
            rows,
            phone_columns,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Adopt phone cells from a previous output of the same input.
    ///
    /// Only applied when headers and row count match; anything else is
    /// logged and the previous file is ignored. Returns whether it merged.
    pub fn merge_previous(&mut self, path: &Path) -> bool {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return false,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot read previous output, starting fresh");
                return false;
            }
        };
        let previous = match InputTable::from_bytes(path, &bytes) {
            Ok(table) => table,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "previous output does not parse, starting fresh");
                return false;
            }
        };
        if previous.headers != self.headers || previous.len() != self.len() {
            tracing::warn!(
                path = %path.display(),
                previous_rows = previous.len(),
                rows = self.len(),
                "previous output has a different shape, starting fresh"
            );
            return false;
        }
        for (out, prev) in self.rows.iter_mut().zip(&previous.rows) {
            for &col in &self.phone_columns {
                out[col] = prev[col].clone();
            }
        }
        tracing::debug!(path = %path.display(), "merged previous output");
        true
    }

    /// Overwrite all four slots of a 1-based row.
    pub fn set_phones(&mut self, row: usize, slots: &PhoneSlots) {
        let out = &mut self.rows[row - 1];
        for (slot, &col) in self.phone_columns.iter().enumerate() {
            out[col] = slots.slot(slot).to_string();
        }
    }

    pub fn phones(&self, row: usize) -> [&str; 4] {
        let out = &self.rows[row - 1];
        self.phone_columns.map(|col| out[col].as_str())
    }

    /// Non-empty cells per phone column over all rows.
    pub fn fill_counts(&self) -> [usize; 4] {
        self.fill_counts_in(Window {
            start: 1,
            end: self.rows.len(),
        })
    }

    /// Non-empty cells per phone column over a window.
    pub fn fill_counts_in(&self, window: Window) -> [usize; 4] {
        let mut counts = [0; 4];
        for row in window.start..=window.end.min(self.rows.len()) {
            for (slot, phone) in self.phones(row).iter().enumerate() {
                if !phone.trim().is_empty() {
                    counts[slot] += 1;
                }
            }
        }
        counts
    }

    pub fn to_csv_bytes(&self) -> io::Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.into_inner().map_err(|e| e.into_error())
    }

    /// Replace the file at `path` with the whole table.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        write_atomic(path, &self.to_csv_bytes()?)
    }
}
