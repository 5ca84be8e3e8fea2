//! Persisted version ledger
//!
//! The ledger is the durable record of every released version and the
//! per-provider download metadata (url, checksum) behind it. It is read once
//! per run, mutated at most once (one appended provider record), and written
//! back at most once.
//!
//! The persisted form is a single JSON object. One reserved key designates the
//! active version; every dotted-numeric key maps to a version entry with a
//! `provider` array. Anything else in the document is carried through a
//! read-modify-write cycle untouched, so fields written by other tooling
//! survive our runs.
//!
//! There is no inter-process locking: two concurrent runs against the same
//! metadata file can race. That is an accepted limitation of the tool, not an
//! invariant this module defends.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, warn};

/// Reserved top-level key designating the active version
///
/// The value is read and preserved as-is; it is never recomputed from the
/// position of version keys in the document.
pub const ACTIVE_VERSION_KEY: &str = "current-version";

/// One provider's release of one version: where to download it and how to
/// verify it. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub name: String,
    pub url: String,
    pub checksum_type: String,
    pub checksum: String,
}

/// All provider releases recorded for a single version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Provider records in append order; repeated provider names are kept
    #[serde(default)]
    pub provider: Vec<ProviderRecord>,

    /// Fields this tool does not understand, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// In-memory release metadata for one box family
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    active: Option<String>,
    versions: Vec<(String, VersionEntry)>,
    extra: Map<String, Value>,
}

impl Ledger {
    /// The version currently designated as active, if any
    pub fn active_version(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Mark a version as the active one
    pub fn set_active_version(&mut self, version: &str) {
        self.active = Some(version.to_string());
    }

    /// Append a provider record under `version`, creating the entry if absent
    ///
    /// Append-only: existing records are never overwritten or removed, even
    /// for a repeated version+provider pair.
    pub fn add_provider_record(&mut self, version: &str, record: ProviderRecord) {
        debug!(
            "Recording {} release of version {} -> {}",
            record.name, version, record.url
        );

        match self.versions.iter_mut().find(|(v, _)| v == version) {
            Some((_, entry)) => entry.provider.push(record),
            None => self.versions.push((
                version.to_string(),
                VersionEntry {
                    provider: vec![record],
                    extra: Map::new(),
                },
            )),
        }
    }

    /// Look up the entry for a version
    pub fn version_entry(&self, version: &str) -> Option<&VersionEntry> {
        self.versions
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, entry)| entry)
    }

    /// Version strings in insertion order
    pub fn versions(&self) -> impl Iterator<Item = &str> + '_ {
        self.versions.iter().map(|(v, _)| v.as_str())
    }

    /// True when no version has ever been recorded and nothing is active
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.versions.is_empty() && self.extra.is_empty()
    }

    /// Load the ledger from disk
    ///
    /// A missing file is not an error: first runs start from an empty ledger,
    /// with a warning so the operator knows a fresh record will be created.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        if !path.exists() {
            warn!(
                "No release metadata at {}; starting with an empty ledger",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| LedgerError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let doc: Map<String, Value> =
            serde_json::from_str(&content).map_err(|e| LedgerError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;

        Self::from_document(doc, path)
    }

    /// Serialize the full ledger back to disk
    ///
    /// Writes to a sibling temp file and renames it into place, so a crash
    /// mid-write never leaves a torn file readable as valid JSON.
    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let doc = self.to_document();
        let mut content =
            serde_json::to_string_pretty(&Value::Object(doc)).map_err(|e| LedgerError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        content.push('\n');

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LedgerError::Write {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        std::fs::write(&tmp, content).map_err(|e| LedgerError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::rename(&tmp, path).map_err(|e| LedgerError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;

        debug!("Wrote release metadata to {}", path.display());
        Ok(())
    }

    /// Build a ledger from the raw persisted document
    ///
    /// The active designation is read first so that a non-numeric active
    /// version string (it is opaque, nothing requires it to be dotted
    /// numerals) still classifies its own entry as a version entry.
    fn from_document(doc: Map<String, Value>, path: &Path) -> Result<Self, LedgerError> {
        let mut ledger = Ledger::default();
        ledger.active = doc
            .get(ACTIVE_VERSION_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);

        for (key, value) in doc {
            if key == ACTIVE_VERSION_KEY {
                if ledger.active.is_none() {
                    // Opaque designation we don't understand; keep it verbatim
                    ledger.extra.insert(key, value);
                }
            } else if is_version_entry(&key, &value, ledger.active.as_deref()) {
                let entry: VersionEntry =
                    serde_json::from_value(value).map_err(|e| LedgerError::Parse {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
                ledger.versions.push((key, entry));
            } else {
                ledger.extra.insert(key, value);
            }
        }

        Ok(ledger)
    }

    /// Reassemble the persisted document: active designation first, then
    /// versions in insertion order, then preserved unknown fields
    ///
    /// An unknown field sharing a key with a version entry is merged into it
    /// field-by-field, with the version entry winning on conflicts; appended
    /// release records are never clobbered by preserved opaque data.
    fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();

        if let Some(active) = &self.active {
            doc.insert(
                ACTIVE_VERSION_KEY.to_string(),
                Value::String(active.clone()),
            );
        }

        for (version, entry) in &self.versions {
            // VersionEntry serialization cannot fail: plain strings and maps
            let value = serde_json::to_value(entry).unwrap_or(Value::Null);
            doc.insert(version.clone(), value);
        }

        for (key, value) in &self.extra {
            match doc.get_mut(key) {
                Some(Value::Object(existing)) => {
                    if let Value::Object(fields) = value {
                        for (k, v) in fields {
                            existing.entry(k.clone()).or_insert_with(|| v.clone());
                        }
                    }
                }
                Some(_) => {}
                None => {
                    doc.insert(key.clone(), value.clone());
                }
            }
        }

        doc
    }
}

/// A top-level key holds a version entry when its value is an object and any
/// of these hold: the key is dotted-numeric, the object carries a `provider`
/// array, or the key is the active version (an opaque string that need not be
/// numeric)
fn is_version_entry(key: &str, value: &Value, active: Option<&str>) -> bool {
    if !value.is_object() {
        return false;
    }
    looks_like_version(key)
        || value.get("provider").is_some_and(Value::is_array)
        || active.is_some_and(|a| a == key)
}

/// Every dotted segment is a non-empty run of ASCII digits
fn looks_like_version(key: &str) -> bool {
    !key.is_empty()
        && key
            .split('.')
            .all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
}
