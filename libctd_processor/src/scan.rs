use std::path::{Path, PathBuf};

use super::error::ScanError;
use super::tool::Executable;

pub const CONFIG_EXTENSION: &str = "psa";
pub const EXECUTABLE_EXTENSION: &str = "exe";

/// List the names of all files in a directory with the given extension (case-insensitive), sorted
fn get_file_names(parent_path: &Path, extension: &str) -> Result<Vec<String>, ScanError> {
    if !parent_path.is_dir() {
        return Err(ScanError::BadDirectory(parent_path.to_path_buf()));
    }
    let mut names: Vec<String> = Vec::new();
    for item in parent_path.read_dir()? {
        let item_path = item?.path();
        if !item_path.is_file() {
            continue;
        }
        let matches = item_path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
        if let (true, Some(name)) = (matches, item_path.file_name()) {
            names.push(name.to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Find the PSA configuration files of a directory
pub fn scan_config_files(config_dir: &Path) -> Result<Vec<String>, ScanError> {
    get_file_names(config_dir, CONFIG_EXTENSION)
}

/// Find the candidate executables of a directory
pub fn scan_executable_names(exe_dir: &Path) -> Result<Vec<String>, ScanError> {
    get_file_names(exe_dir, EXECUTABLE_EXTENSION)
}

/// Find and register (classify) the executables of a directory
pub fn scan_executables(exe_dir: &Path) -> Result<Vec<Executable>, ScanError> {
    Ok(scan_executable_names(exe_dir)?
        .into_iter()
        .map(|name| Executable::new(exe_dir.join(name)))
        .collect())
}

/// Path of a configuration file within the configuration directory
pub fn config_file_path(config_dir: &Path, config_file: &str) -> PathBuf {
    config_dir.join(config_file)
}
