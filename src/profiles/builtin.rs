//! Bundled catalogue: nine districts, five gameplay contexts, event sounds and
//! emotional cues.

/// Source text of the compiled-in catalogue (`assets/profiles.toml`).
pub const BUILTIN_CATALOGUE: &str = include_str!("../../assets/profiles.toml");
