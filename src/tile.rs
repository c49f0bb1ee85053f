use crate::error::ValidationError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A Sentinel-2 MGRS tile, stored in the catalog's `##XXX` form
/// (upper case, without the optional leading `T`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(String);

fn tile_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^T?(?<tile>[0-9]{2}[A-Z]{3})$")
            .expect("Regex pattern should always compile")
    })
}

impl TileId {
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let upper = text.trim().to_uppercase();
        let captures = tile_pattern()
            .captures(&upper)
            .ok_or_else(|| ValidationError::TileFormat(text.to_string()))?;
        Ok(Self(captures["tile"].to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TileId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
