/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

use super::validation::Validate;
use super::{ConfigError, GridportConfig};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "GRIDPORT_CONFIG";

pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory
        search_paths.push(PathBuf::from("./gridport.toml"));

        // 2. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("gridport").join("config.toml"));
        }

        // 3. System config directory
        search_paths.push(PathBuf::from("/etc/gridport/config.toml"));

        Self { search_paths }
    }

    /// Create a config loader with custom search paths
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Load configuration from the specified file or auto-discover
    pub fn load_config(&self, config_file: Option<&Path>) -> Result<GridportConfig, ConfigError> {
        let config_path = if let Some(path) = config_file {
            path.to_path_buf()
        } else if let Ok(env_config) = env::var(CONFIG_ENV_VAR) {
            PathBuf::from(env_config)
        } else {
            self.find_config_file().ok_or(ConfigError::ConfigNotFound)?
        };

        self.load_config_from_file(&config_path)
    }

    /// Load and validate configuration from a specific file
    pub fn load_config_from_file(&self, path: &Path) -> Result<GridportConfig, ConfigError> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let substituted_content = self.substitute_env_vars(&content)?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") | None => toml::from_str::<GridportConfig>(&substituted_content)?,
            Some(ext) => {
                return Err(ConfigError::UnsupportedFormat {
                    extension: ext.to_string(),
                })
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Find the first existing configuration file in search paths
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .find(|path| path.is_file())
            .cloned()
    }

    /// Substitute environment variables in configuration content
    fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        // ${VAR}, ${VAR:-default}, ${VAR:?error}
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::EnvSubstitutionError(e.to_string()))?;
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let full_match = &cap[0];
            let var_expr = &cap[1];

            let replacement = self.process_var_expression(var_expr)?;
            result = result.replace(full_match, &replacement);
        }

        Ok(result)
    }

    /// Process a variable expression like "VAR", "VAR:-default", or "VAR:?error"
    fn process_var_expression(&self, expr: &str) -> Result<String, ConfigError> {
        if let Some((var_name, default_value)) = expr.split_once(":-") {
            Ok(env::var(var_name).unwrap_or_else(|_| default_value.to_string()))
        } else if let Some((var_name, error_msg)) = expr.split_once(":?") {
            env::var(var_name).map_err(|_| {
                ConfigError::EnvSubstitutionError(format!(
                    "Required environment variable '{}' is not set: {}",
                    var_name, error_msg
                ))
            })
        } else {
            env::var(expr).map_err(|_| {
                ConfigError::EnvSubstitutionError(format!(
                    "Required environment variable '{}' is not set",
                    expr
                ))
            })
        }
    }

    /// Get all search paths for debugging
    pub fn get_search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryBackend;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_env_substitution_with_default() {
        let loader = ConfigLoader::new();
        env::remove_var("GRIDPORT_TEST_DEFAULT");

        let content = "url = \"${GRIDPORT_TEST_DEFAULT:-sqlite://registry.db}\"";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, "url = \"sqlite://registry.db\"");
    }

    #[test]
    #[serial]
    fn test_env_substitution_with_existing_var() {
        let loader = ConfigLoader::new();
        env::set_var("GRIDPORT_TEST_VAR", "custom_value");

        let content = "url = \"${GRIDPORT_TEST_VAR:-sqlite://registry.db}\"";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, "url = \"custom_value\"");

        env::remove_var("GRIDPORT_TEST_VAR");
    }

    #[test]
    #[serial]
    fn test_env_substitution_required_var_missing() {
        let loader = ConfigLoader::new();
        env::remove_var("GRIDPORT_REQUIRED_VAR");

        let result = loader.substitute_env_vars("url = \"${GRIDPORT_REQUIRED_VAR}\"");
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_env_substitution_custom_error() {
        let loader = ConfigLoader::new();
        env::remove_var("GRIDPORT_REQUIRED_VAR");

        let content = "url = \"${GRIDPORT_REQUIRED_VAR:?Database URL must be provided}\"";
        let result = loader.substitute_env_vars(content);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Database URL must be provided"));
    }

    #[test]
    #[serial]
    fn test_load_from_file_substitutes_and_validates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gridport.toml");
        env::set_var("GRIDPORT_TEST_DB", "/tmp/registry.db");
        fs::write(
            &path,
            r#"
            [registry]
            backend = "database"

            [database]
            url = "${GRIDPORT_TEST_DB}"
            pool_size = 2
            "#,
        )
        .unwrap();

        let config = ConfigLoader::with_search_paths(vec![path.clone()])
            .load_config_from_file(&path)
            .unwrap();
        env::remove_var("GRIDPORT_TEST_DB");

        assert_eq!(config.registry.backend, RegistryBackend::Database);
        assert_eq!(config.database.url.as_deref(), Some("/tmp/registry.db"));
        assert_eq!(config.database.pool_size, 2);
    }

    #[test]
    #[serial]
    fn test_incomplete_backend_settings_fail_validation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gridport.toml");
        fs::write(&path, "[registry]\nbackend = \"remote\"\n").unwrap();

        let err = ConfigLoader::new().load_config_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    #[serial]
    fn test_search_paths_pick_first_existing() {
        env::remove_var(CONFIG_ENV_VAR);
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        let present = temp_dir.path().join("present.toml");
        fs::write(&present, "[logging]\nlevel = \"debug\"\n").unwrap();

        let loader = ConfigLoader::with_search_paths(vec![missing, present.clone()]);
        assert_eq!(loader.find_config_file(), Some(present));
        assert_eq!(loader.load_config(None).unwrap().logging.level, "debug");
    }

    #[test]
    #[serial]
    fn test_nothing_found_is_config_not_found() {
        env::remove_var(CONFIG_ENV_VAR);
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_search_paths(vec![temp_dir.path().join("nope.toml")]);
        assert!(matches!(
            loader.load_config(None),
            Err(ConfigError::ConfigNotFound)
        ));
    }

    #[test]
    fn test_yaml_is_unsupported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gridport.yaml");
        fs::write(&path, "registry: {}").unwrap();

        assert!(matches!(
            ConfigLoader::new().load_config_from_file(&path),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }
}
