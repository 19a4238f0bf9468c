//! Target-side ACI clauses: `(targetattr = "cn || sn")` and friends.

use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

/// The fixed vocabulary of target-side clause keywords.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    StrumDisplay,
    EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TermKey {
    Target,
    TargetAttr,
    TargetFilter,
    TargetScope,
    TargetAttrFilters,
    TargAttrFilters,
}

impl TermKey {
    /// Keys in dispatch/emission order. Longer keywords come before their
    /// prefixes so that prefix matching never swallows a longer keyword
    /// (`targetattrfilters` before `targetattr` before `target`); rebuild
    /// walks the same order.
    pub const ORDERED: [TermKey; 6] = [
        TermKey::TargetScope,
        TermKey::TargetAttrFilters,
        TermKey::TargAttrFilters,
        TermKey::TargetFilter,
        TermKey::TargetAttr,
        TermKey::Target,
    ];

    /// Values of this key carry an `ldap:///` prefix on the wire that the
    /// parsed form drops and the rebuild re-adds.
    pub fn is_url_key(&self) -> bool {
        matches!(self, TermKey::Target)
    }
}

/// One parsed target clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Term {
    pub key: TermKey,
    /// `true` for `=`, `false` for `!=`.
    pub equal: bool,
    /// Values as split on `||`, trimmed, without any `ldap:///` prefix.
    pub values: Vec<String>,
}

impl Term {
    pub fn new(key: TermKey, equal: bool, values: Vec<String>) -> Self {
        Term { key, equal, values }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let op = if self.equal { "=" } else { "!=" };
        let joined = if self.key.is_url_key() {
            self.values
                .iter()
                .map(|v| format!("ldap:///{v}"))
                .join(" || ")
        } else {
            self.values.iter().join(" || ")
        };
        write!(f, r#"({} {op}"{joined}")"#, self.key)
    }
}
