//! Engine configuration.
//!
//! Looked up in order:
//!
//! 1. the `[lens]` table of `qail.toml` in the working directory,
//! 2. `<config dir>/qail/lens.toml` (top-level keys),
//! 3. built-in defaults.
//!
//! ```toml
//! [lens]
//! match_budget_ms = 250
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{LensError, LensResult};
use crate::patterns::MatchBudget;

/// Project file shared with the rest of the qail tooling.
pub const PROJECT_FILE: &str = "qail.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LensConfig {
    /// Wall-clock budget per pattern evaluation, in milliseconds.
    pub match_budget_ms: u64,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            match_budget_ms: MatchBudget::DEFAULT_MILLIS,
        }
    }
}

/// `qail.toml`: only the `[lens]` table is ours.
#[derive(Debug, Deserialize)]
struct ProjectFile {
    lens: Option<LensConfig>,
}

impl LensConfig {
    /// Load from the standard locations.
    pub fn load() -> LensResult<Self> {
        Self::load_from(Path::new(PROJECT_FILE), user_config_path().as_deref())
    }

    /// Load from explicit locations; missing files are skipped.
    pub fn load_from(project: &Path, user: Option<&Path>) -> LensResult<Self> {
        if project.exists() {
            let content = fs::read_to_string(project)?;
            if let Some(config) = Self::from_project_toml(&content)? {
                tracing::debug!(path = %project.display(), "lens config loaded");
                return Ok(config);
            }
        }

        if let Some(user) = user.filter(|p| p.exists()) {
            let content = fs::read_to_string(user)?;
            let config = Self::from_toml(&content)?;
            tracing::debug!(path = %user.display(), "lens config loaded");
            return Ok(config);
        }

        Ok(Self::default())
    }

    /// Parse the `[lens]` table of a project file, if it has one.
    pub fn from_project_toml(content: &str) -> LensResult<Option<Self>> {
        let file: ProjectFile = toml::from_str(content)?;
        file.lens.map(Self::validated).transpose()
    }

    /// Parse a standalone `lens.toml`.
    pub fn from_toml(content: &str) -> LensResult<Self> {
        Self::validated(toml::from_str(content)?)
    }

    fn validated(self) -> LensResult<Self> {
        if self.match_budget_ms == 0 {
            return Err(LensError::Config("match_budget_ms must be greater than zero".to_string()));
        }
        Ok(self)
    }

    pub fn budget(&self) -> MatchBudget {
        MatchBudget::from_millis(self.match_budget_ms)
    }
}

/// `<config dir>/qail/lens.toml`, when the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("qail").join("lens.toml"))
}
