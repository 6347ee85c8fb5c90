//! Library statistics input: the list of document libraries to sweep.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::ids::{normalize_library_id, normalize_site_id};

const UNKNOWN: &str = "Unknown";

/// One row of the library statistics report. Unknown columns are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryRow {
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub library_id: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub library_name: Option<String>,
    #[serde(default)]
    pub library_url: Option<String>,
}

impl LibraryRow {
    pub fn site_name(&self) -> &str {
        non_empty(&self.site_name).unwrap_or(UNKNOWN)
    }

    pub fn library_name(&self) -> &str {
        non_empty(&self.library_name).unwrap_or(UNKNOWN)
    }

    /// Validated `(site_id, library_id)`, or why this row cannot be resolved.
    pub fn ids(&self) -> std::result::Result<(String, String), String> {
        let site = non_empty(&self.site_id).ok_or_else(|| "site_id missing".to_string())?;
        let library = non_empty(&self.library_id).ok_or_else(|| "library_id missing".to_string())?;
        let site = normalize_site_id(site).map_err(|e| e.to_string())?;
        let library = normalize_library_id(library).map_err(|e| e.to_string())?;
        Ok((site, library))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Read every row of a library statistics CSV.
pub fn read_libraries(path: &Path) -> Result<Vec<LibraryRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
