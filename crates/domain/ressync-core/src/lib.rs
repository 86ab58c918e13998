use serde::{Deserialize, Serialize};

pub mod stage;
pub mod target;

pub use stage::SyncStage;
pub use target::TargetFile;

/// Wire envelope returned by the modlist endpoint: `{ "data": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModList {
    #[serde(default)]
    pub data: Vec<ModEntry>,
}

/// One remote asset as described by the manifest.
///
/// The upstream API spells the category field `catelog`; the rename keeps
/// the wire format intact while the Rust side uses the correct word.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "catelog", default)]
    pub catalog: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub raw_name: String,
    /// Download URL. Empty means no download is available for this entry.
    #[serde(rename = "res", default)]
    pub res_url: String,
    /// Expected MD5 digest, lowercase or uppercase hex. Empty means the
    /// entry cannot be verified beyond file existence.
    #[serde(default)]
    pub hash: String,
    #[serde(rename = "is_require", default)]
    pub required: bool,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
}

impl ModEntry {
    /// Display name for logs and progress output.
    pub fn display_name(&self) -> &str {
        if !self.friendly_name.is_empty() {
            &self.friendly_name
        } else if !self.raw_name.is_empty() {
            &self.raw_name
        } else {
            "<unnamed>"
        }
    }

    pub fn has_url(&self) -> bool {
        !self.res_url.trim().is_empty()
    }

    pub fn has_hash(&self) -> bool {
        !self.hash.trim().is_empty()
    }
}

/// Reconciliation verdict for one entry against current directory state.
///
/// Computed fresh on every call; the directory is externally mutable, so a
/// verdict must never be cached across stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The exact target file exists and, when a hash was given, matches it.
    UpToDate(camino::Utf8PathBuf),
    /// The exact target file exists but its digest differs.
    NeedsUpdate(camino::Utf8PathBuf),
    /// No file at the target path, but this file carries the expected digest.
    NeedsRename(camino::Utf8PathBuf),
    /// Nothing usable in the directory.
    NotFound,
}

impl Disposition {
    /// Whether the entry still needs a download after any in-place fix-up.
    pub fn requires_download(&self) -> bool {
        matches!(self, Disposition::NeedsUpdate(_) | Disposition::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upstream_modlist_shape() {
        let json = r#"{
            "data": [
                {
                    "id": 7,
                    "catelog": "mods",
                    "friendly_name": "fancyMenu",
                    "raw_name": "fancymenu-1.2.jar",
                    "res": "https://cdn.example.com/files/fancymenu-1.2.jar",
                    "hash": "ABCDEF0123456789ABCDEF0123456789",
                    "is_require": true,
                    "subject": "others",
                    "description": "menu overhaul"
                }
            ]
        }"#;

        let list: ModList = serde_json::from_str(json).unwrap();
        assert_eq!(list.data.len(), 1);
        let entry = &list.data[0];
        assert_eq!(entry.id, 7);
        assert_eq!(entry.catalog, "mods");
        assert_eq!(entry.friendly_name, "fancyMenu");
        assert!(entry.required);
        assert!(entry.has_url());
        assert!(entry.has_hash());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let json = r#"{"data": [{"id": 1, "catelog": "config"}]}"#;
        let list: ModList = serde_json::from_str(json).unwrap();
        let entry = &list.data[0];
        assert!(!entry.required);
        assert!(!entry.has_url());
        assert!(!entry.has_hash());
        assert_eq!(entry.display_name(), "<unnamed>");
    }

    #[test]
    fn disposition_download_requirement() {
        use camino::Utf8PathBuf;
        let p = Utf8PathBuf::from("mods/a.jar");
        assert!(!Disposition::UpToDate(p.clone()).requires_download());
        assert!(!Disposition::NeedsRename(p.clone()).requires_download());
        assert!(Disposition::NeedsUpdate(p).requires_download());
        assert!(Disposition::NotFound.requires_download());
    }
}
