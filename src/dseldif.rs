//! Structured editing of a `dse.ldif` configuration file.
//!
//! `dse.ldif` is a restricted LDIF dialect: entries separated by blank
//! lines, each starting with a `dn:` line, attributes as `name: value`
//! with continuation lines prefixed by exactly one space, and binary
//! values base64-encoded behind a double colon.
//!
//! The whole file is read at construction and rewritten on every mutating
//! call. There is no locking: callers hold exclusive access by contract
//! (the server is stopped while its configuration is edited).

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::DseError;
use crate::nsstate::{ReplicaState, decode_ns_state};

/// Matches an attribute-index DN fragment and captures the indexed
/// attribute name and the backend it belongs to.
static INDEX_DN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)cn=([^,]+),cn=index,cn=([^,]+),").unwrap());

const NSSTATE_PREFIX: &str = "nsstate:: ";
// The replica root attribute shows up under both spellings in the wild.
const REPLICA_ROOT_PREFIXES: [&str; 2] = ["nsds5replicareplicaroot: ", "nsds5replicaroot: "];

/// Case-insensitive `strip_prefix` for ASCII attribute names.
fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &line[prefix.len()..])
}

/// In-memory editor for one `dse.ldif` file.
///
/// Lines are stored as complete logical LDIF lines (continuations already
/// joined, each ending in `\n`); `dn:` lines are lowercased on load so DN
/// lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct DseLdif {
    path: PathBuf,
    lines: Vec<String>,
}

impl DseLdif {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DseError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path)?;
        let lines = assemble_lines(&raw);
        debug!(
            event = "DseLdif",
            phase = "Load",
            path = %path.display(),
            lines = lines.len()
        );
        Ok(DseLdif { path, lines })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index of the `dn:` line for an entry.
    fn find_entry(&self, entry_dn: &str) -> Result<usize, DseError> {
        let needle = format!("dn: {}\n", entry_dn.to_lowercase());
        self.lines
            .iter()
            .position(|line| *line == needle)
            .ok_or_else(|| DseError::EntryNotFound(entry_dn.to_string()))
    }

    /// All occurrences of an attribute within an entry's span, as
    /// (line index, value) pairs.
    fn find_attr(&self, entry_dn: &str, attr: &str) -> Result<Vec<(usize, String)>, DseError> {
        let start = self.find_entry(entry_dn)?;
        let prefix = format!("{attr}:");
        let mut found = Vec::new();
        for (i, line) in self.lines.iter().enumerate().skip(start + 1) {
            if line.trim().is_empty() {
                break;
            }
            if let Some(rest) = line.strip_prefix(&prefix) {
                // A second colon marks a base64 value; the caller gets
                // the base64 text.
                let value = rest.strip_prefix(':').unwrap_or(rest);
                found.push((i, value.trim().to_string()));
            }
        }
        if found.is_empty() {
            return Err(DseError::AttributeNotFound {
                dn: entry_dn.to_string(),
                attr: attr.to_string(),
            });
        }
        Ok(found)
    }

    /// All values of `attr` on the entry. Absence of the entry or the
    /// attribute is an error.
    pub fn get(&self, entry_dn: &str, attr: &str) -> Result<Vec<String>, DseError> {
        Ok(self
            .find_attr(entry_dn, attr)?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// First value of `attr` on the entry.
    pub fn get_single(&self, entry_dn: &str, attr: &str) -> Result<String, DseError> {
        let mut values = self.get(entry_dn, attr)?;
        Ok(values.remove(0))
    }

    /// Add one attribute value to an entry. The new line lands directly
    /// after the `dn:` line, so repeated adds stack in reverse order.
    pub fn add(&mut self, entry_dn: &str, attr: &str, value: &str) -> Result<(), DseError> {
        let start = self.find_entry(entry_dn)?;
        self.lines.insert(start + 1, format!("{attr}: {value}\n"));
        debug!(event = "DseLdif", phase = "Add", dn = entry_dn, attr = attr);
        self.flush()
    }

    /// Delete attribute values from an entry: all occurrences, or only
    /// those whose value matches `value` exactly.
    pub fn delete(
        &mut self,
        entry_dn: &str,
        attr: &str,
        value: Option<&str>,
    ) -> Result<(), DseError> {
        let occurrences = self.find_attr(entry_dn, attr)?;
        // Descending order keeps the remaining indices valid.
        for (i, found) in occurrences.into_iter().rev() {
            if value.is_none_or(|v| v == found) {
                self.lines.remove(i);
            }
        }
        debug!(event = "DseLdif", phase = "Delete", dn = entry_dn, attr = attr);
        self.flush()
    }

    /// Replace all values of an attribute with a single value. The
    /// attribute not existing beforehand is fine.
    pub fn replace(&mut self, entry_dn: &str, attr: &str, value: &str) -> Result<(), DseError> {
        match self.delete(entry_dn, attr, None) {
            Ok(()) => {}
            Err(DseError::AttributeNotFound { .. }) => {
                debug!(
                    event = "DseLdif",
                    phase = "Replace",
                    dn = entry_dn,
                    attr = attr,
                    note = "attribute did not previously exist"
                );
            }
            Err(err) => return Err(err),
        }
        self.add(entry_dn, attr, value)
    }

    /// Names of the attribute indexes configured for a backend, in file
    /// order. An unknown backend yields an empty list.
    pub fn get_indexes(&self, backend: &str) -> Vec<String> {
        let backend = backend.to_lowercase();
        self.lines
            .iter()
            .filter_map(|line| INDEX_DN.captures(line))
            .filter(|caps| caps[2].to_lowercase() == backend)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Decode the `nsState` replication state of every `cn=replica`
    /// entry, or of just the replica whose root matches `suffix`.
    pub fn read_ns_state(
        &self,
        suffix: Option<&str>,
        flip: bool,
    ) -> Result<Vec<ReplicaState>, DseError> {
        let mut states = Vec::new();
        let mut scan = ReplicaScan::default();
        for line in &self.lines {
            if let Some(dn) = line.strip_prefix("dn: ") {
                scan.enter_entry(dn.starts_with("cn=replica"));
                continue;
            }
            if !scan.in_replica {
                continue;
            }
            if let Some(b64) = strip_prefix_ci(line, NSSTATE_PREFIX) {
                scan.blob = Some(STANDARD.decode(b64.trim())?);
            } else if let Some(root) = REPLICA_ROOT_PREFIXES
                .iter()
                .find_map(|prefix| strip_prefix_ci(line, prefix))
            {
                scan.root = Some(root.trim().to_string());
            }
            if let (Some(root), Some(blob)) = (&scan.root, &scan.blob) {
                let state = decode_ns_state(root, blob, flip)?;
                if let Some(wanted) = suffix
                    && wanted.eq_ignore_ascii_case(root)
                {
                    return Ok(vec![state]);
                }
                states.push(state);
                scan.enter_entry(false);
            }
        }
        Ok(states)
    }

    /// Rewrite the whole file from the in-memory lines.
    fn flush(&self) -> Result<(), DseError> {
        fs::write(&self.path, self.lines.concat())?;
        Ok(())
    }
}

/// Scan state for [`DseLdif::read_ns_state`]: which fields of the current
/// replica entry have been seen so far.
#[derive(Debug, Default)]
struct ReplicaScan {
    in_replica: bool,
    root: Option<String>,
    blob: Option<Vec<u8>>,
}

impl ReplicaScan {
    fn enter_entry(&mut self, in_replica: bool) {
        self.in_replica = in_replica;
        self.root = None;
        self.blob = None;
    }
}

/// Join continuation lines and lowercase `dn:` lines.
fn assemble_lines(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.split_inclusive('\n') {
        if let Some(rest) = line.strip_prefix(' ')
            && let Some(previous) = lines.last_mut()
        {
            // Continuation of the previous logical line: drop its
            // newline and concatenate without a separator.
            if previous.ends_with('\n') {
                previous.pop();
            }
            previous.push_str(rest);
            continue;
        }
        if line.to_lowercase().starts_with("dn:") {
            lines.push(line.to_lowercase());
        } else {
            lines.push(line.to_string());
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        "dn: cn=config\n",
        "cn: config\n",
        "nsslapd-port: 389\n",
        "\n",
        "dn: cn=test,cn=config\n",
        "cn: test\n",
        "description: part1\n",
        " part2\n",
        "objectClass: top\n",
        "objectClass: extensibleObject\n",
    );

    fn editor(contents: &str) -> (tempfile::TempDir, DseLdif) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dse.ldif");
        fs::write(&path, contents).unwrap();
        (dir, DseLdif::new(&path).unwrap())
    }

    #[test]
    fn test_get_collects_all_values() {
        let (_dir, dse) = editor(SAMPLE);
        let values = dse.get("cn=test,cn=config", "objectClass").unwrap();
        assert_eq!(values, vec!["top", "extensibleObject"]);
    }

    #[test]
    fn test_get_is_dn_case_insensitive() {
        let (_dir, dse) = editor(SAMPLE);
        let values = dse.get("cn=Test,cn=CONFIG", "cn").unwrap();
        assert_eq!(values, vec!["test"]);
    }

    #[test]
    fn test_get_unknown_entry() {
        let (_dir, dse) = editor(SAMPLE);
        let err = dse.get("cn=missing", "cn").unwrap_err();
        assert!(matches!(err, DseError::EntryNotFound(_)));
    }

    #[test]
    fn test_get_unknown_attribute() {
        let (_dir, dse) = editor(SAMPLE);
        let err = dse.get("cn=test,cn=config", "missing").unwrap_err();
        assert!(matches!(err, DseError::AttributeNotFound { .. }));
    }

    #[test]
    fn test_continuation_lines_are_joined() {
        let (_dir, dse) = editor(SAMPLE);
        let value = dse.get_single("cn=test,cn=config", "description").unwrap();
        assert_eq!(value, "part1part2");
    }

    #[test]
    fn test_attribute_scan_stops_at_entry_boundary() {
        let (_dir, dse) = editor(SAMPLE);
        // `cn: config` belongs to the first entry only.
        let values = dse.get("cn=config", "cn").unwrap();
        assert_eq!(values, vec!["config"]);
    }

    #[test]
    fn test_add_then_get() {
        let (_dir, mut dse) = editor(SAMPLE);
        dse.add("cn=test,cn=config", "foo", "bar").unwrap();
        assert_eq!(dse.get("cn=test,cn=config", "foo").unwrap(), vec!["bar"]);
    }

    #[test]
    fn test_add_inserts_directly_after_dn_line() {
        let (_dir, mut dse) = editor(SAMPLE);
        dse.add("cn=test,cn=config", "first", "1").unwrap();
        dse.add("cn=test,cn=config", "second", "2").unwrap();
        let dn_index = dse.find_entry("cn=test,cn=config").unwrap();
        assert_eq!(dse.lines[dn_index + 1], "second: 2\n");
        assert_eq!(dse.lines[dn_index + 2], "first: 1\n");
    }

    #[test]
    fn test_delete_by_value() {
        let (_dir, mut dse) = editor(SAMPLE);
        dse.delete("cn=test,cn=config", "objectClass", Some("top"))
            .unwrap();
        let values = dse.get("cn=test,cn=config", "objectClass").unwrap();
        assert_eq!(values, vec!["extensibleObject"]);
    }

    #[test]
    fn test_delete_all_then_get_errors() {
        let (_dir, mut dse) = editor(SAMPLE);
        dse.delete("cn=test,cn=config", "objectClass", None).unwrap();
        let err = dse.get("cn=test,cn=config", "objectClass").unwrap_err();
        assert!(matches!(err, DseError::AttributeNotFound { .. }));
    }

    #[test]
    fn test_replace_existing_leaves_single_occurrence() {
        let (_dir, mut dse) = editor(SAMPLE);
        dse.replace("cn=test,cn=config", "objectClass", "device")
            .unwrap();
        let values = dse.get("cn=test,cn=config", "objectClass").unwrap();
        assert_eq!(values, vec!["device"]);
    }

    #[test]
    fn test_replace_tolerates_missing_attribute() {
        let (_dir, mut dse) = editor(SAMPLE);
        dse.replace("cn=test,cn=config", "foo", "baz").unwrap();
        assert_eq!(dse.get_single("cn=test,cn=config", "foo").unwrap(), "baz");
    }

    #[test]
    fn test_mutations_persist_to_disk() {
        let (_dir, mut dse) = editor(SAMPLE);
        dse.replace("cn=config", "nsslapd-port", "636").unwrap();
        let reloaded = DseLdif::new(dse.path()).unwrap();
        assert_eq!(
            reloaded.get_single("cn=config", "nsslapd-port").unwrap(),
            "636"
        );
    }

    #[test]
    fn test_get_indexes() {
        let contents = concat!(
            "dn: cn=uid,cn=index,cn=userroot,cn=ldbm database,cn=plugins,cn=config\n",
            "cn: uid\n",
            "\n",
            "dn: cn=aci,cn=index,cn=userroot,cn=ldbm database,cn=plugins,cn=config\n",
            "cn: aci\n",
            "\n",
            "dn: cn=cn,cn=index,cn=otherroot,cn=ldbm database,cn=plugins,cn=config\n",
            "cn: cn\n",
        );
        let (_dir, dse) = editor(contents);
        assert_eq!(dse.get_indexes("userRoot"), vec!["uid", "aci"]);
        assert_eq!(dse.get_indexes("otherRoot"), vec!["cn"]);
        assert!(dse.get_indexes("norootatall").is_empty());
    }
}
