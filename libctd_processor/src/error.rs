use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("No last used configuration is recorded at {0:?}")]
    NoLastUsed(PathBuf),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan failed because directory {0:?} does not exist or is not a directory")]
    BadDirectory(PathBuf),
    #[error("Scan failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("Rewrite of {path:?} failed due to IO error: {source}")]
    IOError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No valid PSA directory selected: {0:?}")]
    BadConfigDirectory(PathBuf),
    #[error("No raw files selected")]
    NoRawFiles,
    #[error("No PSA files found in the PSA directory {0:?}")]
    NoConfigFiles(PathBuf),
    #[error("Resolver failed due to scan error: {0}")]
    ScanError(#[from] ScanError),
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Please select one or more raw files")]
    NoRawFiles,
    #[error("Raw file {0:?} does not exist or is not a file")]
    BadRawFile(PathBuf),
    #[error("Please select a valid directory containing PSA files: {0:?}")]
    BadConfigDirectory(PathBuf),
    #[error("Please select an output directory")]
    NoOutputDirectory,
    #[error("Please select an executable for {0}")]
    MissingExecutable(String),
    #[error("Invalid order number '{value}' for {step}; please enter a valid integer")]
    InvalidOrder { step: String, value: String },
    #[error("Please select at least one PSA file to process")]
    NoStepsSelected,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Executable not found at: {0:?}")]
    NotFound(PathBuf),
    #[error("Failed to launch {path:?}: {source}")]
    IOError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Session failed due to Scan error: {0}")]
    ScanError(#[from] ScanError),
    #[error("Session failed due to Resolver error: {0}")]
    ResolveError(#[from] ResolveError),
    #[error("Session failed due to Planner error: {0}")]
    PlanError(#[from] PlanError),
    #[error("Session failed due to Launch error: {0}")]
    LaunchError(#[from] LaunchError),
    #[error("No step named {0} in the current configuration")]
    UnknownStep(String),
    #[error("Step {0} has no executable selected")]
    MissingExecutable(String),
    #[error("The PSA file {0:?} does not exist")]
    MissingConfigFile(PathBuf),
    #[error("{tool} {} while opening {step}: {stderr}", exit_description(.code))]
    EditorFailed {
        tool: String,
        step: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => String::from("was terminated by a signal"),
    }
}
