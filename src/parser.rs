//! Turns a raw ACI attribute string into an [`Aci`] structure.
//!
//! The grammar worked against here is the 389 ACI syntax:
//!
//! ```text
//! aci     = 1*clause
//! clause  = "(" content ")"            ; only depth-0 parens delimit clauses
//! content = termkey [!]"=" quoted-vals ; target-side clause
//!         / "version 3.0;" 1*segment   ; the trailing stanza
//! segment = ("acl" name / permkw "(" perms ")" bindrule) ";"
//! ```
//!
//! Bind rules and target filters legitimately contain nested parentheses;
//! those never split into separate clauses because only parens opening at
//! depth zero count.

use tracing::debug;

use crate::error::AciError;
use crate::types::{Aci, BindRule, Permission, PermissionClause, Term, TermKey};

const VERSION_PREFIX: &str = "version 3.0;";

/// A cursor over the raw string that yields the content of each top-level
/// parenthesized clause.
struct ClauseScanner<'a> {
    raw: &'a str,
    pos: usize,
}

impl<'a> ClauseScanner<'a> {
    fn new(raw: &'a str) -> Self {
        ClauseScanner { raw, pos: 0 }
    }

    /// Content of the next depth-0 clause, without its outer parens.
    /// Text between clauses is skipped. `Ok(None)` at end of input.
    fn next_clause(&mut self) -> Result<Option<&'a str>, AciError> {
        let bytes = self.raw.as_bytes();
        let mut start = None;
        let mut depth = 0usize;
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'(' => {
                    if depth == 0 {
                        start = Some(self.pos + 1);
                    }
                    depth += 1;
                }
                b')' => {
                    if depth == 0 {
                        return Err(AciError::UnbalancedParens);
                    }
                    depth -= 1;
                    if depth == 0 {
                        let clause = &self.raw[start.unwrap_or(self.pos)..self.pos];
                        self.pos += 1;
                        return Ok(Some(clause));
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        if depth != 0 {
            return Err(AciError::UnbalancedParens);
        }
        Ok(None)
    }
}

/// Collapse whitespace runs to single spaces. A `version 3.0 ;` clause
/// additionally loses the space before the semicolon, since stanza
/// detection is a strict prefix test.
fn normalize_clause(clause: &str) -> String {
    let normalized = clause.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.to_lowercase().starts_with("version 3.0")
        && let Some((head, tail)) = normalized.split_once(';')
    {
        return format!("{};{}", head.trim_end(), tail);
    }
    normalized
}

/// Parse one target-side clause body (keyword already stripped).
fn parse_term(key: TermKey, rest: &str) -> Result<Term, AciError> {
    let Some((pre, value)) = rest.split_once('=') else {
        return Err(AciError::MissingEquals(format!("{key}{rest}")));
    };
    let equal = pre.trim() != "!";
    let value = value.replace('"', "");
    let values = value
        .split("||")
        .map(|v| {
            if key.is_url_key() {
                v.replace("ldap:///", "").trim().to_string()
            } else {
                v.trim().to_string()
            }
        })
        .collect();
    Ok(Term::new(key, equal, values))
}

/// Parse one `allow`/`deny` stanza segment: the parenthesized permission
/// list plus the trailing bind rule.
fn parse_permission_clause(keyword: &str, segment: &str) -> Result<PermissionClause, AciError> {
    let open = segment
        .find('(')
        .ok_or_else(|| AciError::MissingPermissionList(keyword.to_string()))?;
    let close = segment[open..]
        .find(')')
        .map(|i| open + i)
        .ok_or_else(|| AciError::MissingPermissionList(keyword.to_string()))?;

    let permissions = segment[open + 1..close]
        .split(',')
        .map(Permission::parse)
        .collect::<Result<Vec<_>, _>>()?;

    // The rest of the segment is the bind rule, with one level of
    // wrapping parens removed.
    let mut rule = segment[close + 1..].trim();
    if rule.starts_with('(') && rule.ends_with(')') {
        rule = &rule[1..rule.len() - 1];
    }
    Ok(PermissionClause {
        permissions,
        bind_rule: BindRule::new(rule),
    })
}

/// Parse the body of the `version 3.0;` stanza into name and
/// allow/deny clauses.
fn parse_version_stanza(body: &str, aci: &mut Aci) -> Result<(), AciError> {
    for segment in body.split(';').map(str::trim) {
        if let Some(rest) = segment.strip_prefix("acl") {
            let name = rest.trim().replace('"', "");
            if name.is_empty() {
                return Err(AciError::MissingAclName);
            }
            if aci.name.is_empty() {
                aci.name = name;
            }
        } else if segment.starts_with("allow") {
            let clause = parse_permission_clause("allow", segment)?;
            aci.allow.get_or_insert(clause);
        } else if segment.starts_with("deny") {
            let clause = parse_permission_clause("deny", segment)?;
            aci.deny.get_or_insert(clause);
        }
        // Bare bind-rule segments (userdn = ..., ip = ..., and so on)
        // belong to the rule text of a preceding allow/deny and carry no
        // standalone meaning here.
    }
    if aci.name.is_empty() {
        return Err(AciError::MissingAclName);
    }
    Ok(())
}

pub(crate) fn parse_aci(raw: &str) -> Result<Aci, AciError> {
    debug!(event = "AciParse", phase = "Start", raw = raw);

    let mut aci = Aci {
        name: String::new(),
        terms: Vec::new(),
        allow: None,
        deny: None,
    };

    let mut scanner = ClauseScanner::new(raw);
    let mut saw_version = false;
    while let Some(clause) = scanner.next_clause()? {
        let clause = normalize_clause(clause);
        if let Some(body) = clause.strip_prefix(VERSION_PREFIX) {
            parse_version_stanza(body, &mut aci)?;
            saw_version = true;
            continue;
        }
        let key = TermKey::ORDERED
            .into_iter()
            .find(|key| clause.starts_with(&key.to_string()))
            .ok_or_else(|| AciError::UnknownClause(clause.clone()))?;
        let rest = &clause[key.to_string().len()..];
        aci.terms.push(parse_term(key, rest)?);
    }

    if !saw_version {
        return Err(AciError::MissingVersionStanza);
    }

    // Canonicalize to the emission order so a reparse of a rebuilt
    // string compares equal to the original parse.
    aci.terms
        .sort_by_key(|term| TermKey::ORDERED.iter().position(|key| *key == term.key));

    debug!(
        event = "AciParse",
        phase = "Done",
        name = aci.name,
        terms = aci.terms.len()
    );
    Ok(aci)
}
