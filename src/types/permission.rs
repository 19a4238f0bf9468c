//! ACI permission keywords.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::AciError;

/// A permission keyword as it appears in an `allow (...)` or `deny (...)`
/// list. The vocabulary is fixed by the 389 ACI syntax.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Add,
    Delete,
    Search,
    Compare,
    SelfWrite,
    Proxy,
    Moddn,
    Import,
    Export,
    All,
}

impl Permission {
    /// Parse one keyword from an `allow`/`deny` list. Matching is
    /// case-insensitive, as the server accepts any casing.
    pub fn parse(keyword: &str) -> Result<Self, AciError> {
        keyword
            .trim()
            .to_lowercase()
            .parse()
            .map_err(|_| AciError::UnknownPermission(keyword.trim().to_string()))
    }
}
