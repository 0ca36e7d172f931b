//! Opaque coordinate reference system identifiers.
//!
//! Projection math lives with the dataset backends. The request model only
//! needs a normalized identifier with an equality test and a small metadata
//! document for the request sidecar.

use serde_json::json;
use std::fmt;

/// A CRS identifier in normalized `AUTHORITY:CODE` form.
///
/// Bare numeric codes are taken as EPSG. Equality is equality of the
/// normalized identifier; no datum or parameter comparison happens here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Crs {
    id: String,
}

impl Crs {
    /// Parse an identifier like `"EPSG:4326"`, `"epsg:4326"`, or `"4326"`.
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CrsParseError::Empty);
        }

        let (authority, code) = match trimmed.split_once(':') {
            Some((authority, code)) => (authority.trim(), code.trim()),
            None => ("EPSG", trimmed),
        };

        let valid_part =
            |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_part(authority) || !valid_part(code) {
            return Err(CrsParseError::Invalid(s.to_string()));
        }

        Ok(Self {
            id: format!(
                "{}:{}",
                authority.to_ascii_uppercase(),
                code.to_ascii_uppercase()
            ),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// The numeric code when the authority is EPSG.
    pub fn epsg(&self) -> Option<u32> {
        self.id.strip_prefix("EPSG:")?.parse().ok()
    }

    /// True for the geographic (degree-unit) systems the delivery pipeline
    /// recognizes.
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg(), Some(4326) | Some(4269))
    }

    /// Descriptor embedded in request metadata documents.
    pub fn metadata(&self) -> serde_json::Value {
        let (authority, code) = self.id.split_once(':').unwrap_or(("EPSG", &self.id));
        json!({
            "name": self.id,
            "authority": authority,
            "code": code,
            "epsg": self.epsg(),
        })
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Empty CRS identifier")]
    Empty,
    #[error("Invalid CRS identifier: {0}")]
    Invalid(String),
}
