//! The parsed form of one `aci` attribute value.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AciError;
use crate::parser;
use crate::types::{BindRule, Permission, Term, TermKey};

/// One `allow (...)` or `deny (...)` statement from the version 3.0
/// stanza: the permission list plus its bind rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionClause {
    pub permissions: Vec<Permission>,
    pub bind_rule: BindRule,
}

/// A whole ACI attribute value, broken into its clauses. Parse with
/// [`Aci::parse`], mutate the fields, and render back with `to_string`.
///
/// Rendering is not byte-identical to the input (whitespace and clause
/// order may differ) but is semantically equivalent and accepted by the
/// server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Aci {
    /// The display name from the `acl "..."` segment.
    pub name: String,
    /// Target-side clauses, canonicalized to [`TermKey::ORDERED`] on
    /// parse so that equality and rebuild agree regardless of how the
    /// source ordered them.
    pub terms: Vec<Term>,
    pub allow: Option<PermissionClause>,
    pub deny: Option<PermissionClause>,
}

impl Aci {
    pub fn parse(raw: &str) -> Result<Self, AciError> {
        parser::parse_aci(raw)
    }

    /// All target clauses recorded under one key. An ACI may carry the
    /// same key more than once.
    pub fn terms_for(&self, key: TermKey) -> impl Iterator<Item = &Term> {
        self.terms.iter().filter(move |t| t.key == key)
    }
}

impl FromStr for Aci {
    type Err = AciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Aci::parse(s)
    }
}

impl Display for Aci {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for key in TermKey::ORDERED {
            for term in self.terms_for(key) {
                write!(f, "{term}")?;
            }
        }
        write!(f, r#"(version 3.0; acl "{}";"#, self.name)?;
        for (keyword, clause) in [("allow", &self.allow), ("deny", &self.deny)] {
            if let Some(clause) = clause {
                let perms = clause.permissions.iter().join(", ");
                write!(f, "{keyword} ({perms})({});", clause.bind_rule)?;
            }
        }
        write!(f, ")")
    }
}
