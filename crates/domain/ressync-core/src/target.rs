use crate::ModEntry;
use std::time::{SystemTime, UNIX_EPOCH};

/// Computed local identity of a manifest entry: which catalog subdirectory
/// it belongs to and what the file must be called there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    pub dir_name: String,
    pub file_name: String,
}

impl TargetFile {
    pub fn for_entry(entry: &ModEntry) -> Self {
        Self {
            dir_name: catalog_dir_name(&entry.catalog),
            file_name: target_file_name(entry),
        }
    }
}

/// Subdirectory name for a catalog. Known catalogs get fixed names; unknown
/// catalogs map to their lowercased form so new buckets need no code change.
pub fn catalog_dir_name(catalog: &str) -> String {
    match catalog.to_lowercase().as_str() {
        "mods" => "mods".to_string(),
        "resourcepacks" => "resourcepacks".to_string(),
        "shaderpacks" => "shaderpacks".to_string(),
        "config" => "config".to_string(),
        other => other.to_string(),
    }
}

/// Target file name: `friendly_name` plus a resolved extension, falling back
/// to `raw_name`, then the URL's last path segment, then a timestamp
/// placeholder when nothing else is usable.
pub fn target_file_name(entry: &ModEntry) -> String {
    let friendly = entry.friendly_name.trim();
    if friendly.is_empty() {
        let raw = entry.raw_name.trim();
        if !raw.is_empty() {
            return raw.to_string();
        }
        return file_name_from_url(&entry.res_url);
    }

    format!("{}{}", friendly, resolve_extension(entry))
}

/// Extension resolution chain: `raw_name`, then the URL path, then a
/// catalog-based default.
fn resolve_extension(entry: &ModEntry) -> String {
    if let Some(ext) = extension_of(entry.raw_name.trim()) {
        return ext;
    }
    if let Some(ext) = url_path(&entry.res_url).and_then(|p| extension_of(&p)) {
        return ext;
    }

    match entry.catalog.to_lowercase().as_str() {
        "mods" => ".jar".to_string(),
        "resourcepacks" | "shaderpacks" => ".zip".to_string(),
        "config" => ".json".to_string(),
        _ => ".jar".to_string(),
    }
}

/// `".jar"` from `"foo.jar"`. A leading dot or trailing dot does not count.
fn extension_of(name: &str) -> Option<String> {
    let dot = name.rfind('.')?;
    if dot == 0 || dot == name.len() - 1 {
        return None;
    }
    Some(name[dot..].to_string())
}

/// The path component of an http(s) URL, without query or fragment.
fn url_path(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))?;
    let path_start = rest.find('/')?;
    let path = &rest[path_start..];
    let end = path.find(['?', '#']).unwrap_or(path.len());
    Some(path[..end].to_string())
}

fn file_name_from_url(url: &str) -> String {
    if let Some(path) = url_path(url) {
        if let Some(seg) = path.rsplit('/').next() {
            if !seg.is_empty() {
                return seg.to_string();
            }
        }
    }
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("download_{millis}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(catalog: &str, friendly: &str, raw: &str, url: &str) -> ModEntry {
        ModEntry {
            catalog: catalog.to_string(),
            friendly_name: friendly.to_string(),
            raw_name: raw.to_string(),
            res_url: url.to_string(),
            ..ModEntry::default()
        }
    }

    #[test]
    fn known_catalogs_map_to_fixed_dirs() {
        assert_eq!(catalog_dir_name("mods"), "mods");
        assert_eq!(catalog_dir_name("Mods"), "mods");
        assert_eq!(catalog_dir_name("resourcepacks"), "resourcepacks");
        assert_eq!(catalog_dir_name("shaderpacks"), "shaderpacks");
        assert_eq!(catalog_dir_name("config"), "config");
    }

    #[test]
    fn unknown_catalog_maps_to_lowercased_name() {
        assert_eq!(catalog_dir_name("Datapacks"), "datapacks");
    }

    #[test]
    fn extension_taken_from_raw_name_first() {
        let e = entry(
            "mods",
            "fancyMenu",
            "fancymenu-1.2.jar",
            "https://cdn.example.com/dl/fancymenu.zip",
        );
        assert_eq!(target_file_name(&e), "fancyMenu.jar");
    }

    #[test]
    fn extension_falls_back_to_url_path() {
        let e = entry(
            "mods",
            "seasons",
            "",
            "https://cdn.example.com/dl/seasons-2.0.jar?token=abc",
        );
        assert_eq!(target_file_name(&e), "seasons.jar");
    }

    #[test]
    fn extension_falls_back_to_catalog_default() {
        assert_eq!(
            target_file_name(&entry("mods", "alpha", "", "")),
            "alpha.jar"
        );
        assert_eq!(
            target_file_name(&entry("resourcepacks", "pack", "", "")),
            "pack.zip"
        );
        assert_eq!(
            target_file_name(&entry("shaderpacks", "glow", "", "")),
            "glow.zip"
        );
        assert_eq!(
            target_file_name(&entry("config", "keybinds", "", "")),
            "keybinds.json"
        );
        assert_eq!(
            target_file_name(&entry("datapacks", "wild", "", "")),
            "wild.jar"
        );
    }

    #[test]
    fn empty_friendly_name_uses_raw_name() {
        let e = entry("mods", "", "upstream-file.jar", "");
        assert_eq!(target_file_name(&e), "upstream-file.jar");
    }

    #[test]
    fn empty_names_fall_back_to_url_segment() {
        let e = entry("mods", "", "", "https://cdn.example.com/files/archive.zip");
        assert_eq!(target_file_name(&e), "archive.zip");
    }

    #[test]
    fn nothing_usable_yields_timestamp_placeholder() {
        let e = entry("mods", "", "", "");
        assert!(target_file_name(&e).starts_with("download_"));
    }

    #[test]
    fn target_file_combines_dir_and_name() {
        let e = entry("Config", "keybinds", "", "");
        let t = TargetFile::for_entry(&e);
        assert_eq!(t.dir_name, "config");
        assert_eq!(t.file_name, "keybinds.json");
    }
}
