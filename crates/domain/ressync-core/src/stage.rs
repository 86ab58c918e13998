use crate::ModEntry;

/// Ordered phases of the synchronization workflow.
///
/// The sequence is fixed: every stage advances to exactly one successor and
/// `Completed` is terminal. Re-running a finished workflow requires a fresh
/// session starting at `FetchManifest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStage {
    FetchManifest,
    Prerequisites,
    Configs,
    RequiredMods,
    SelectOptional,
    ResourcePacks,
    Shaders,
    Completed,
}

impl SyncStage {
    pub const COUNT: usize = 8;

    pub const ALL: [SyncStage; Self::COUNT] = [
        SyncStage::FetchManifest,
        SyncStage::Prerequisites,
        SyncStage::Configs,
        SyncStage::RequiredMods,
        SyncStage::SelectOptional,
        SyncStage::ResourcePacks,
        SyncStage::Shaders,
        SyncStage::Completed,
    ];

    pub fn next(self) -> SyncStage {
        match self {
            SyncStage::FetchManifest => SyncStage::Prerequisites,
            SyncStage::Prerequisites => SyncStage::Configs,
            SyncStage::Configs => SyncStage::RequiredMods,
            SyncStage::RequiredMods => SyncStage::SelectOptional,
            SyncStage::SelectOptional => SyncStage::ResourcePacks,
            SyncStage::ResourcePacks => SyncStage::Shaders,
            SyncStage::Shaders => SyncStage::Completed,
            SyncStage::Completed => SyncStage::Completed,
        }
    }

    /// Zero-based position in the fixed sequence.
    pub fn index(self) -> usize {
        match self {
            SyncStage::FetchManifest => 0,
            SyncStage::Prerequisites => 1,
            SyncStage::Configs => 2,
            SyncStage::RequiredMods => 3,
            SyncStage::SelectOptional => 4,
            SyncStage::ResourcePacks => 5,
            SyncStage::Shaders => 6,
            SyncStage::Completed => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SyncStage::FetchManifest => "fetch manifest",
            SyncStage::Prerequisites => "prerequisite libraries",
            SyncStage::Configs => "config files",
            SyncStage::RequiredMods => "required mods",
            SyncStage::SelectOptional => "optional mods",
            SyncStage::ResourcePacks => "resource packs",
            SyncStage::Shaders => "shader packs",
            SyncStage::Completed => "completed",
        }
    }

    /// Whether entries matched by this stage download without further input.
    /// `SelectOptional` suspends for a user selection instead.
    pub fn auto_downloads(self) -> bool {
        matches!(
            self,
            SyncStage::Prerequisites
                | SyncStage::Configs
                | SyncStage::RequiredMods
                | SyncStage::ResourcePacks
                | SyncStage::Shaders
        )
    }

    /// Stage filter predicate over a manifest entry. `FetchManifest` and
    /// `Completed` carry no entries.
    pub fn matches(self, entry: &ModEntry) -> bool {
        let catalog = entry.catalog.to_lowercase();
        match self {
            SyncStage::FetchManifest | SyncStage::Completed => false,
            SyncStage::Prerequisites => {
                catalog == "mods" && entry.required && entry.subject == "libs"
            }
            SyncStage::Configs => catalog == "config",
            SyncStage::RequiredMods => {
                catalog == "mods" && entry.required && entry.subject != "libs"
            }
            SyncStage::SelectOptional => catalog == "mods" && !entry.required,
            SyncStage::ResourcePacks => catalog == "resourcepacks" && entry.required,
            SyncStage::Shaders => catalog == "shaderpacks",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(catalog: &str, required: bool, subject: &str) -> ModEntry {
        ModEntry {
            catalog: catalog.to_string(),
            required,
            subject: subject.to_string(),
            ..ModEntry::default()
        }
    }

    #[test]
    fn stage_order_is_fixed_and_terminal() {
        let mut stage = SyncStage::FetchManifest;
        let mut visited = vec![stage];
        while stage != SyncStage::Completed {
            stage = stage.next();
            visited.push(stage);
        }
        assert_eq!(visited, SyncStage::ALL);
        assert_eq!(SyncStage::Completed.next(), SyncStage::Completed);
    }

    #[test]
    fn indices_match_sequence_position() {
        for (i, stage) in SyncStage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn libs_entries_belong_to_prerequisites_only() {
        let lib = entry("mods", true, "libs");
        assert!(SyncStage::Prerequisites.matches(&lib));
        assert!(!SyncStage::RequiredMods.matches(&lib));
        assert!(!SyncStage::SelectOptional.matches(&lib));
    }

    #[test]
    fn required_mods_excludes_libs_and_optional() {
        assert!(SyncStage::RequiredMods.matches(&entry("mods", true, "others")));
        assert!(!SyncStage::RequiredMods.matches(&entry("mods", true, "libs")));
        assert!(!SyncStage::RequiredMods.matches(&entry("mods", false, "others")));
    }

    #[test]
    fn optional_stage_takes_non_required_mods() {
        assert!(SyncStage::SelectOptional.matches(&entry("mods", false, "misc")));
        assert!(!SyncStage::SelectOptional.matches(&entry("mods", true, "misc")));
        assert!(!SyncStage::SelectOptional.matches(&entry("resourcepacks", false, "misc")));
    }

    #[test]
    fn resourcepacks_requires_required_flag_but_shaders_does_not() {
        assert!(SyncStage::ResourcePacks.matches(&entry("resourcepacks", true, "")));
        assert!(!SyncStage::ResourcePacks.matches(&entry("resourcepacks", false, "")));
        assert!(SyncStage::Shaders.matches(&entry("shaderpacks", true, "")));
        assert!(SyncStage::Shaders.matches(&entry("shaderpacks", false, "")));
    }

    #[test]
    fn configs_ignore_flags() {
        assert!(SyncStage::Configs.matches(&entry("config", false, "libs")));
        assert!(!SyncStage::Configs.matches(&entry("mods", true, "libs")));
    }

    #[test]
    fn catalog_matching_is_case_insensitive() {
        assert!(SyncStage::Configs.matches(&entry("Config", false, "")));
        assert!(SyncStage::Shaders.matches(&entry("ShaderPacks", false, "")));
    }

    #[test]
    fn stage_filters_are_disjoint_per_entry() {
        let samples = [
            entry("mods", true, "libs"),
            entry("mods", true, "others"),
            entry("mods", false, "misc"),
            entry("config", false, ""),
            entry("resourcepacks", true, ""),
            entry("shaderpacks", false, ""),
        ];
        let download_stages = [
            SyncStage::Prerequisites,
            SyncStage::Configs,
            SyncStage::RequiredMods,
            SyncStage::SelectOptional,
            SyncStage::ResourcePacks,
            SyncStage::Shaders,
        ];
        for e in &samples {
            let hits = download_stages.iter().filter(|s| s.matches(e)).count();
            assert_eq!(hits, 1, "entry {e:?} matched {hits} stages");
        }
    }
}
