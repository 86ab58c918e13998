pub mod commands;

use clap::ValueEnum;

/// How the optional-mods stage resolves without an interactive prompt.
#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum CliOptionalMode {
    /// Skip every optional entry (default).
    None,
    /// Take every optional entry.
    All,
    /// Take only the entries named with --optional-ids.
    Ids,
}
