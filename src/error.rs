use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing or rebuilding an ACI attribute string.
///
/// The parser is validating: malformed input is reported, never silently
/// folded into an empty structure.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum AciError {
    #[error("unbalanced parentheses in aci string")]
    UnbalancedParens,

    #[error("unrecognized aci clause: {0}")]
    UnknownClause(String),

    #[error("aci clause has no '=' separator: {0}")]
    MissingEquals(String),

    #[error("version 3.0 stanza has no acl name")]
    MissingAclName,

    #[error("aci has no version 3.0 stanza")]
    MissingVersionStanza,

    #[error("no parenthesized permission list after '{0}'")]
    MissingPermissionList(String),

    #[error("unknown permission keyword: {0}")]
    UnknownPermission(String),
}

/// Errors produced by the dse.ldif editor.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum DseError {
    #[error("failed to read or write dse.ldif: {0}")]
    Io(String),

    #[error("no such entry: {0}")]
    EntryNotFound(String),

    #[error("entry {dn} has no attribute {attr}")]
    AttributeNotFound { dn: String, attr: String },

    #[error("invalid base64 in nsState value: {0}")]
    Base64(String),

    #[error("nsState blob has unexpected length {len}")]
    InvalidNsState { len: usize },
}

impl From<std::io::Error> for DseError {
    fn from(err: std::io::Error) -> Self {
        DseError::Io(err.to_string())
    }
}

impl From<base64::DecodeError> for DseError {
    fn from(err: base64::DecodeError) -> Self {
        DseError::Base64(err.to_string())
    }
}
