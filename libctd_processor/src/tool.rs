use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONVERSION_KEYWORD: &str = "datcnvw";
const SUMMARY_KEYWORD: &str = "bottlesumw";
const DERIVATION_KEYWORD: &str = "derivew";

/// The role a third-party executable plays in a processing run.
///
/// The kind decides which input file the tool receives and whether the
/// instrument-definition flag is appended to its command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolKind {
    /// Converts the raw instrument file (DatCnvW)
    Conversion,
    /// Summarizes bottle data from the .ros file (BottleSumW)
    Summary,
    /// Derives variables from the converted .cnv file (DeriveW)
    Derivation,
    #[default]
    Other,
}

impl ToolKind {
    /// Classify an executable by the recognized substrings of its base name (case-insensitive)
    pub fn classify(path: &Path) -> Self {
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().to_lowercase(),
            None => return Self::Other,
        };
        if name.contains(CONVERSION_KEYWORD) {
            Self::Conversion
        } else if name.contains(SUMMARY_KEYWORD) {
            Self::Summary
        } else if name.contains(DERIVATION_KEYWORD) {
            Self::Derivation
        } else {
            Self::Other
        }
    }

    /// Does the tool take the instrument-definition (/c) flag
    pub fn needs_instrument_file(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// A registered executable. The kind is computed once on registration and carried from then on.
///
/// Serializes as its bare path; the kind is recomputed when a configuration is read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PathBuf", into = "PathBuf")]
pub struct Executable {
    path: PathBuf,
    kind: ToolKind,
}

impl Executable {
    pub fn new(path: PathBuf) -> Self {
        let kind = ToolKind::classify(&path);
        Self { path, kind }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    /// The executable's file name, used when reporting on a tool
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    /// Does the executable's stem appear in the given configuration file name (case-insensitive)
    pub fn matches_config_name(&self, config_file: &str) -> bool {
        match self.path.file_stem() {
            Some(stem) if !stem.is_empty() => config_file
                .to_lowercase()
                .contains(&stem.to_string_lossy().to_lowercase()),
            _ => false,
        }
    }
}

impl From<PathBuf> for Executable {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<Executable> for PathBuf {
    fn from(exe: Executable) -> Self {
        exe.path
    }
}

/// Find the first executable that pairs with a configuration file by name
pub fn match_executable<'a>(
    executables: &'a [Executable],
    config_file: &str,
) -> Option<&'a Executable> {
    executables
        .iter()
        .find(|exe| exe.matches_config_name(config_file))
}
