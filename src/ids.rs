//! Normalisation of the site and library ids found in library inventories.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, SweepError};

const GUID: &str = r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";

/// Graph composite site id: `hostname,site-collection-guid,web-guid`.
static COMPOSITE_SITE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^[A-Za-z0-9.-]+,({GUID}),({GUID})$"))
        .expect("Invalid composite site regex")
});

/// Bare GUID, optionally wrapped in braces as SharePoint exports list ids.
static GUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\{{?({GUID})\}}?$")).expect("Invalid GUID regex")
});

/// Validate a site id from an inventory row.
///
/// Accepts the Graph composite form `contoso.sharepoint.com,<guid>,<guid>` or a
/// bare site-collection GUID. Surrounding whitespace is ignored.
///
/// # Examples
///
/// ```
/// use drive_sweep::ids::normalize_site_id;
///
/// let id = normalize_site_id(
///     "contoso.sharepoint.com,2c9a3a4e-0000-4000-8000-000000000001,7d1f0c2b-0000-4000-8000-000000000002",
/// )
/// .unwrap();
/// assert!(id.starts_with("contoso.sharepoint.com,"));
/// ```
pub fn normalize_site_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    if COMPOSITE_SITE_REGEX.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    if let Some(captures) = GUID_REGEX.captures(trimmed) {
        if let Some(guid) = captures.get(1) {
            return Ok(guid.as_str().to_lowercase());
        }
    }

    Err(SweepError::InvalidId {
        kind: "site",
        value: raw.to_string(),
    })
}

/// Validate a document library (list) id, stripping the braces SharePoint adds.
pub fn normalize_library_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    if let Some(captures) = GUID_REGEX.captures(trimmed) {
        if let Some(guid) = captures.get(1) {
            return Ok(guid.as_str().to_lowercase());
        }
    }

    Err(SweepError::InvalidId {
        kind: "library",
        value: raw.to_string(),
    })
}
