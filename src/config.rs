//! Interpreter configuration: defaults, then `zvm.toml`, then environment
//! variables, in that order of increasing precedence.

use crate::display_manager::DisplayMode;
use crate::error::ZError;
use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfigMode,
    /// Fixed RNG seed for `random`, for reproducible playthroughs in tests.
    pub random_seed: Option<u64>,
    pub save_dir: PathBuf,
    pub max_instructions: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayConfigMode {
    #[default]
    Auto,
    Terminal,
    Headless,
}

impl From<DisplayConfigMode> for DisplayMode {
    fn from(mode: DisplayConfigMode) -> Self {
        match mode {
            DisplayConfigMode::Auto => DisplayMode::Auto,
            DisplayConfigMode::Terminal => DisplayMode::Terminal,
            DisplayConfigMode::Headless => DisplayMode::Headless,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config { display: DisplayConfigMode::Auto, random_seed: None, save_dir: PathBuf::from("."), max_instructions: None }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ZError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| ZError::execution(0, format!("invalid config at {path:?}: {e}")))
    }

    /// Load `path` if given, else look for `zvm.toml` alongside `story_path`
    /// or in the current directory, else fall back to defaults; then apply
    /// env overrides. A discovered `zvm.toml` that fails to parse is logged
    /// and skipped, since the file is optional; an explicitly given `path`
    /// that fails to parse is a fatal configuration error.
    pub fn resolve(path: Option<&Path>, story_path: &Path) -> Result<Self, ZError> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => {
                let candidates = [story_path.parent().map(|dir| dir.join("zvm.toml")), Some(PathBuf::from("zvm.toml"))];
                let discovered = candidates.into_iter().flatten().find(|p| p.exists());
                match discovered {
                    Some(p) => Self::load(&p).unwrap_or_else(|e| {
                        warn!("ignoring invalid config at {p:?}: {e}");
                        Config::default()
                    }),
                    None => Config::default(),
                }
            }
        };

        if let Ok(seed) = std::env::var("ZVM_SEED") {
            config.random_seed =
                Some(seed.parse().map_err(|_| ZError::execution(0, "ZVM_SEED must be an integer"))?);
        }
        if let Ok(dir) = std::env::var("ZVM_SAVE_DIR") {
            config.save_dir = PathBuf::from(dir);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_auto_display_and_no_fixed_seed() {
        let config = Config::default();
        assert_eq!(config.display, DisplayConfigMode::Auto);
        assert_eq!(config.random_seed, None);
    }

    #[test]
    fn parses_a_minimal_toml_document() {
        let config: Config = toml::from_str("display = \"headless\"\nrandom_seed = 42\n").unwrap();
        assert_eq!(config.display, DisplayConfigMode::Headless);
        assert_eq!(config.random_seed, Some(42));
    }
}
