// src/lib.rs
pub use dseldif::DseLdif;
pub use error::{AciError, DseError};
pub use nsstate::{ReplicaState, decode_ns_state};
pub use types::{Aci, BindKeyword, BindRule, Permission, PermissionClause, Term, TermKey};

mod dseldif;
mod error;
mod nsstate;
mod parser;
mod types;

#[cfg(test)]
mod tests;
