use crate::launch::target::expand_user;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoreConfig {
    /// Base directory for the installer script tree.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// Flat category/tools catalog consumed by the selective installer.
    #[serde(default = "default_catalog")]
    pub catalog: String,

    /// Use exec instead of spawn for top-level menu transitions.
    #[serde(default)]
    pub exec_launch: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstallConfig {
    #[serde(default = "default_install_program")]
    pub program: String,

    #[serde(default = "default_install_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub install: InstallConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            install: InstallConfig::default(),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            catalog: default_catalog(),
            exec_launch: false,
        }
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            program: default_install_program(),
            args: default_install_args(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_cascading(None)
    }

    pub fn load_with_override(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_cascading(config_path)
    }

    fn load_cascading(override_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        // Built-in defaults, then global config, then the nearest project
        // config walking up, then an explicit override, then environment.
        if let Some(global_config_path) = Self::get_global_config_path() {
            if global_config_path.exists() {
                let global_config = Self::load_from_file(&global_config_path)?;
                config = config.merge_with(global_config);
            }
        }

        if let Some(project_config_path) = Self::find_project_config()? {
            let project_config = Self::load_from_file(&project_config_path)?;
            config = config.merge_with(project_config);
        }

        if let Some(override_path) = override_path {
            if override_path.exists() {
                let override_config = Self::load_from_file(&override_path)?;
                config = config.merge_with(override_config);
            } else {
                return Err(anyhow!(
                    "Config file not found: {}",
                    override_path.display()
                ));
            }
        }

        Ok(config.apply_env_overrides())
    }

    fn get_global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("toolshed").join("toolshed.toml"))
    }

    fn find_project_config() -> Result<Option<PathBuf>> {
        let current_dir = std::env::current_dir()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join(".toolshed.toml");
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }

        Ok(None)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    fn merge_with(mut self, other: Self) -> Self {
        if other.core.scripts_dir != default_scripts_dir() {
            self.core.scripts_dir = other.core.scripts_dir;
        }
        if other.core.catalog != default_catalog() {
            self.core.catalog = other.core.catalog;
        }
        if other.core.exec_launch {
            self.core.exec_launch = other.core.exec_launch;
        }

        if other.install.program != default_install_program() {
            self.install.program = other.install.program;
        }
        if other.install.args != default_install_args() {
            self.install.args = other.install.args;
        }

        self
    }

    fn apply_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("TOOLSHED_SCRIPTS_DIR") {
            if !val.is_empty() {
                self.core.scripts_dir = val;
            }
        }

        if let Ok(val) = std::env::var("TOOLSHED_CATALOG") {
            if !val.is_empty() {
                self.core.catalog = val;
            }
        }

        if let Ok(val) = std::env::var("TOOLSHED_EXEC_LAUNCH") {
            self.core.exec_launch = val.parse().unwrap_or(false);
        }

        self
    }

    pub fn scripts_root(&self) -> PathBuf {
        expand_user(Path::new(&self.core.scripts_dir))
    }

    pub fn catalog_path(&self) -> PathBuf {
        expand_user(Path::new(&self.core.catalog))
    }
}

fn default_scripts_dir() -> String {
    "core".to_string()
}

fn default_catalog() -> String {
    "core/tools/list-tools.txt".to_string()
}

fn default_install_program() -> String {
    "apt-get".to_string()
}

fn default_install_args() -> Vec<String> {
    vec!["install".to_string(), "-y".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_bundled_tree() {
        let config = Config::default();
        assert_eq!(config.core.scripts_dir, "core");
        assert_eq!(config.core.catalog, "core/tools/list-tools.txt");
        assert!(!config.core.exec_launch);
        assert_eq!(config.install.program, "apt-get");
        assert_eq!(config.install.args, vec!["install", "-y"]);
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let parsed: Config = toml::from_str("[core]\nscripts_dir = \"/opt/shed\"\n").unwrap();
        assert_eq!(parsed.core.scripts_dir, "/opt/shed");
        assert_eq!(parsed.core.catalog, "core/tools/list-tools.txt");
        assert_eq!(parsed.install.program, "apt-get");
    }

    #[test]
    fn merge_prefers_non_default_values() {
        let base = Config::default();
        let overlay: Config = toml::from_str(
            "[core]\ncatalog = \"lists/extra.txt\"\nexec_launch = true\n\n[install]\nprogram = \"apt\"\n",
        )
        .unwrap();

        let merged = base.merge_with(overlay);
        assert_eq!(merged.core.catalog, "lists/extra.txt");
        assert!(merged.core.exec_launch);
        assert_eq!(merged.install.program, "apt");
        // Untouched key keeps its default.
        assert_eq!(merged.core.scripts_dir, "core");
    }
}
