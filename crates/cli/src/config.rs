use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// CLI configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Change store directory used when `--store` is not given
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    /// Rule book for the local-files mode
    #[serde(default)]
    pub rules_file: Option<PathBuf>,

    /// Rule set selected from the rule book (its default when unset)
    #[serde(default)]
    pub rule_set: Option<String>,

    /// Working-folder roots swept in local-files mode
    #[serde(default)]
    pub local_roots: Vec<PathBuf>,

    /// Ask before overwriting an existing archive
    #[serde(default = "default_confirm_overwrite")]
    pub confirm_overwrite: bool,
}

fn default_confirm_overwrite() -> bool {
    true
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            rules_file: None,
            rule_set: None,
            local_roots: Vec::new(),
            confirm_overwrite: default_confirm_overwrite(),
        }
    }
}

impl CliConfig {
    /// Return the default config directory path: ~/.config/shelvepack/
    pub fn default_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("shelvepack");
        Ok(config_dir)
    }

    /// Return the default config file path.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load config from the given path, or the default path.
    /// Returns default config if the file does not exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            debug!(?config_path, "Loading config");
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read config: {}", config_path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("failed to parse config: {}", config_path.display()))?;
            Ok(config)
        } else {
            debug!(?config_path, "Config file not found, using defaults");
            let config = Self::default();
            // Create directory and write default config
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let toml_str = toml::to_string_pretty(&config)
                .context("failed to serialize default config")?;
            std::fs::write(&config_path, toml_str).ok();
            Ok(config)
        }
    }

    /// Resolve the store directory.
    /// Priority: cli_override > config file > current directory.
    pub fn resolve_store_dir(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override
            .or_else(|| self.store_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve the sweep roots.
    /// Priority: cli_override > config file > store working folders.
    pub fn resolve_roots(&self, cli_override: Vec<PathBuf>, store: Vec<PathBuf>) -> Vec<PathBuf> {
        if !cli_override.is_empty() {
            cli_override
        } else if !self.local_roots.is_empty() {
            self.local_roots.clone()
        } else {
            store
        }
    }

    /// Resolve rule book file and rule set name; cli values win over config.
    pub fn resolve_rules(
        &self,
        file: Option<PathBuf>,
        rule_set: Option<String>,
    ) -> (Option<PathBuf>, Option<String>) {
        (
            file.or_else(|| self.rules_file.clone()),
            rule_set.or_else(|| self.rule_set.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.confirm_overwrite);
        assert!(config.local_roots.is_empty());
        assert!(config.store_dir.is_none());
    }

    #[test]
    fn test_load_writes_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");
        let config = CliConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config, CliConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "rule_set = \"all\"\nlocal_roots = [\"/src/a\"]\nconfirm_overwrite = false\n",
        )
        .unwrap();
        let config = CliConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.rule_set.as_deref(), Some("all"));
        assert_eq!(config.local_roots, vec![PathBuf::from("/src/a")]);
        assert!(!config.confirm_overwrite);
    }

    #[test]
    fn test_roots_priority() {
        let mut config = CliConfig::default();
        let store = vec![PathBuf::from("store")];
        assert_eq!(config.resolve_roots(Vec::new(), store.clone()), store);

        config.local_roots = vec![PathBuf::from("cfg")];
        assert_eq!(
            config.resolve_roots(Vec::new(), store.clone()),
            vec![PathBuf::from("cfg")]
        );
        assert_eq!(
            config.resolve_roots(vec![PathBuf::from("cli")], store),
            vec![PathBuf::from("cli")]
        );
    }

    #[test]
    fn test_store_and_rules_override() {
        let config = CliConfig {
            store_dir: Some(PathBuf::from("/cfg/store")),
            rule_set: Some("cfg".into()),
            ..CliConfig::default()
        };
        assert_eq!(config.resolve_store_dir(None), PathBuf::from("/cfg/store"));
        assert_eq!(
            config.resolve_store_dir(Some(PathBuf::from("cli"))),
            PathBuf::from("cli")
        );
        let (file, set) = config.resolve_rules(None, Some("cli".into()));
        assert!(file.is_none());
        assert_eq!(set.as_deref(), Some("cli"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = CliConfig {
            rules_file: Some(PathBuf::from("rules.yml")),
            ..CliConfig::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
