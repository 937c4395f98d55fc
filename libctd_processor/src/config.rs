use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use super::scan::config_file_path;
use super::step::ProcessingStep;
use super::tool::Executable;

/// Name of the pointer file recording the most recently used configuration
pub const LAST_USED_CONFIG_FILE: &str = "last_used_config.yaml";

/// Structure representing a run configuration: every selection needed to reproduce a processing
/// run. Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub raw_files: Vec<PathBuf>,
    pub config_dir: PathBuf,
    pub executables_dir: PathBuf,
    pub output_dir: PathBuf,
    pub executables: Vec<Executable>,
    pub steps: Vec<ProcessingStep>,
}

impl RunConfig {
    /// Read the configuration in a YAML file
    /// Returns a RunConfig if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Full path to a step's PSA file
    pub fn get_config_file_path(&self, step: &ProcessingStep) -> PathBuf {
        config_file_path(&self.config_dir, &step.config_file)
    }

    /// Find a step by its PSA file name
    pub fn get_step(&self, config_file: &str) -> Option<&ProcessingStep> {
        self.steps.iter().find(|s| s.config_file == config_file)
    }

    pub fn get_step_mut(&mut self, config_file: &str) -> Option<&mut ProcessingStep> {
        self.steps.iter_mut().find(|s| s.config_file == config_file)
    }

    pub fn has_output_dir(&self) -> bool {
        !self.output_dir.as_os_str().is_empty()
    }
}

/// The pointer file: names the run configuration that was used last
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastUsed {
    pub config_file_path: PathBuf,
}

impl LastUsed {
    /// Default pointer location: next to the running executable
    pub fn default_path() -> PathBuf {
        let base_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        base_dir.join(LAST_USED_CONFIG_FILE)
    }

    /// Read the pointer file
    pub fn read(pointer_path: &Path) -> Result<Self, ConfigError> {
        if !pointer_path.exists() {
            return Err(ConfigError::NoLastUsed(pointer_path.to_path_buf()));
        }
        let yaml_str = std::fs::read_to_string(pointer_path)?;
        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Record a configuration file as the last used one
    pub fn write(pointer_path: &Path, config_file_path: &Path) -> Result<(), ConfigError> {
        let pointer = Self {
            config_file_path: config_file_path.to_path_buf(),
        };
        std::fs::write(pointer_path, serde_yaml::to_string(&pointer)?)?;
        Ok(())
    }

    /// Resolve the pointer to an existing configuration file.
    ///
    /// A missing pointer or a pointer to a file that no longer exists yields None.
    pub fn resolve(pointer_path: &Path) -> Result<Option<PathBuf>, ConfigError> {
        let pointer = match Self::read(pointer_path) {
            Ok(p) => p,
            Err(ConfigError::NoLastUsed(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        if pointer.config_file_path.exists() {
            Ok(Some(pointer.config_file_path))
        } else {
            Ok(None)
        }
    }
}
