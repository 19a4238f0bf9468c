//! Data model for parsed ACI attribute values.
//!
//! Canonical string forms:
//! - Term: `(targetattr ="cn || sn")`, `(target ="ldap:///dc=example,dc=com")`
//! - Stanza: `(version 3.0; acl "name";allow (read, search)(bind rule);)`
//!
//! Rebuilt strings are semantically equivalent to their source, not
//! byte-identical: whitespace is normalized and target clauses are emitted
//! in the fixed [`TermKey::ORDERED`] order.

mod aci;
mod bind_rule;
mod permission;
mod term;

pub use aci::{Aci, PermissionClause};
pub use bind_rule::{BindKeyword, BindRule};
pub use permission::Permission;
pub use term::{Term, TermKey};
