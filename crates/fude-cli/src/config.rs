//! `config.ron` loading.
//!
//! Every field has a default, so an empty file (or none at all) is a valid
//! configuration:
//!
//! ```ron
//! (
//!     provider: gemini,
//!     gemini: (model: "gemini-1.5-pro", timeout_ms: Some(30000)),
//!     session: (generation_timeout_ms: None),
//!     markup: (strip_html: false),
//! )
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fude_block::SessionConfig;
use fude_llm::{GeminiConfig, ProviderKind};
use fude_markup::ConverterOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FudeConfig {
    pub provider: ProviderKind,
    pub gemini: GeminiConfig,
    pub session: SessionConfig,
    pub markup: ConverterOptions,
    /// Where the credential store lives. Defaults to the local data dir.
    pub credentials_path: Option<PathBuf>,
}

impl FudeConfig {
    /// `<config dir>/fude/config.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fude").join("config.ron"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        ron::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = FudeConfig::load(Some(&dir.path().join("config.ron"))).unwrap();
        assert_eq!(config, FudeConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ron");
        std::fs::write(
            &path,
            r#"(provider: echo, session: (generation_timeout_ms: Some(500)), markup: (strip_html: true))"#,
        )
        .unwrap();

        let config = FudeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.provider, ProviderKind::Echo);
        assert_eq!(config.session.generation_timeout_ms, Some(500));
        assert!(config.markup.strip_html);
        assert_eq!(config.gemini, GeminiConfig::default());
        assert_eq!(config.credentials_path, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ron");
        std::fs::write(&path, "(provider: ").unwrap();
        let err = FudeConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }
}
