//! Raw bind-rule expressions.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

/// The boolean expression trailing an `allow (...)`/`deny (...)` list,
/// e.g. `userdn = "ldap:///anyone" and authmethod = "simple"`.
///
/// Kept deliberately opaque: bind rules may combine predicates with
/// `and`/`or`/`not`, and nothing downstream needs the expression tree.
/// One level of wrapping parentheses is removed on parse; the rebuild
/// re-wraps the expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct BindRule(String);

impl BindRule {
    pub fn new(raw: impl Into<String>) -> Self {
        BindRule(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the expression mentions the given bind keyword anywhere.
    /// A convenience for callers that want to sniff a rule without
    /// parsing it.
    pub fn mentions(&self, keyword: BindKeyword) -> bool {
        self.0.to_lowercase().contains(&keyword.to_string())
    }
}

impl Display for BindRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Keywords that may appear inside a bind rule. The parser never splits
/// on these; they exist for callers inspecting rules.
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
pub enum BindKeyword {
    UserDn,
    GroupDn,
    RoleDn,
    UserAttr,
    Ip,
    Dns,
    DayOfWeek,
    TimeOfDay,
    AuthMethod,
}
