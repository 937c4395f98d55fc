use std::path::{Component, Path, PathBuf};

use super::config::RunConfig;
use super::error::ResolveError;
use super::rewrite::{forward_slashes, rewrite_file, StepFields};
use super::scan::{config_file_path, scan_config_files};
use super::tool::{match_executable, ToolKind};

/// Base name of a raw file without its extension. This is the key all companion files share.
pub fn raw_base_name(raw_file: &Path) -> String {
    raw_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Directory holding a raw file
pub fn raw_directory(raw_file: &Path) -> PathBuf {
    raw_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Make a path absolute against the current directory and collapse `.` and `..` lexically
pub fn absolute_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normal = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other.as_os_str()),
        }
    }
    normal
}

fn absolute_string(path: &Path) -> String {
    forward_slashes(&absolute_path(path).to_string_lossy())
}

/// The InputDir value a step of the given kind needs for a raw file.
///
/// The summary tool reads `<output_dir>/<base>.ros`, so its "directory" is that file's path.
pub fn resolve_input_dir(raw_file: &Path, kind: ToolKind, output_dir: &Path) -> PathBuf {
    match kind {
        ToolKind::Conversion => raw_directory(raw_file),
        ToolKind::Summary => output_dir.join(format!("{}.ros", raw_base_name(raw_file))),
        _ => output_dir.to_path_buf(),
    }
}

/// The instrument-definition file that accompanies a raw file
pub fn resolve_instrument_path(raw_file: &Path) -> PathBuf {
    raw_directory(raw_file).join(format!("{}.XMLCON", raw_base_name(raw_file)))
}

/// Compute the absolute, forward-slashed values to write into a step's PSA file
pub fn resolve_fields(raw_file: &Path, kind: ToolKind, output_dir: &Path) -> StepFields {
    StepFields {
        input_dir: absolute_string(&resolve_input_dir(raw_file, kind, output_dir)),
        output_dir: absolute_string(output_dir),
        instrument_path: Some(absolute_string(&resolve_instrument_path(raw_file))),
    }
}

/// Outcome of updating a directory of PSA files
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub updated: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

impl UpdateReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Tool kind for a PSA file: the step's own executable if one is selected, otherwise the first
/// known executable whose name appears in the file name
fn kind_for_config(config: &RunConfig, config_file: &str) -> ToolKind {
    let selected = config
        .steps
        .iter()
        .find(|s| s.config_file == config_file)
        .and_then(|s| s.executable.as_ref());
    selected
        .or_else(|| match_executable(&config.executables, config_file))
        .map(|exe| exe.kind())
        .unwrap_or_default()
}

/// Point every PSA file in the configuration directory at the right locations for each raw file.
///
/// Each (raw file, PSA file) pair is handled on its own; a failure is recorded and the rest
/// continue. Validation errors abort before any file is touched.
pub fn update_config_files(config: &RunConfig) -> Result<UpdateReport, ResolveError> {
    let config_dir = absolute_path(&config.config_dir);
    if config.config_dir.as_os_str().is_empty() || !config_dir.is_dir() {
        return Err(ResolveError::BadConfigDirectory(config.config_dir.clone()));
    }
    if config.raw_files.is_empty() {
        return Err(ResolveError::NoRawFiles);
    }

    let config_files = scan_config_files(&config_dir)?;
    if config_files.is_empty() {
        return Err(ResolveError::NoConfigFiles(config_dir));
    }

    let output_dir = absolute_path(&config.output_dir);
    let mut report = UpdateReport::default();
    for raw_file in config.raw_files.iter() {
        let raw_file = absolute_path(raw_file);
        log::info!("Updating PSA files for raw file {}", raw_file.display());
        for config_file in config_files.iter() {
            let psa_path = config_file_path(&config_dir, config_file);
            let kind = kind_for_config(config, config_file);
            let fields = resolve_fields(&raw_file, kind, &output_dir);
            match rewrite_file(&psa_path, &fields) {
                Ok(()) => {
                    log::info!("Updated {}", psa_path.display());
                    report.updated.push(psa_path);
                }
                Err(e) => {
                    log::error!("{e}");
                    report.failures.push((psa_path, e.to_string()));
                }
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{ProcessingStep, StepOrder};
    use crate::tool::Executable;

    #[test]
    fn test_input_dir_policy() {
        let raw = Path::new("/data/sample1.hex");
        let out = Path::new("/out");
        assert_eq!(
            resolve_input_dir(raw, ToolKind::classify(Path::new("DatCnvW.exe")), out),
            PathBuf::from("/data")
        );
        assert_eq!(
            resolve_input_dir(raw, ToolKind::classify(Path::new("BottleSumW.exe")), out),
            PathBuf::from("/out/sample1.ros")
        );
        assert_eq!(
            resolve_input_dir(raw, ToolKind::classify(Path::new("DeriveW.exe")), out),
            PathBuf::from("/out")
        );
        assert_eq!(
            resolve_input_dir(raw, ToolKind::Other, out),
            PathBuf::from("/out")
        );
    }

    #[test]
    fn test_instrument_path() {
        assert_eq!(
            resolve_instrument_path(Path::new("/data/sample1.hex")),
            PathBuf::from("/data/sample1.XMLCON")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_fields() {
        let fields = resolve_fields(
            Path::new("/data/./raw/../sample1.hex"),
            ToolKind::Summary,
            Path::new("/out"),
        );
        assert_eq!(fields.input_dir, "/out/sample1.ros");
        assert_eq!(fields.output_dir, "/out");
        assert_eq!(
            fields.instrument_path.as_deref(),
            Some("/data/sample1.XMLCON")
        );
    }

    fn write_psa(dir: &Path, name: &str) {
        std::fs::write(
            dir.join(name),
            concat!(
                "<S>\n",
                "  <InputDir value=\"old\" />\n",
                "  <OutputDir value=\"old\" />\n",
                "  <InstrumentPath value=\"old\" />\n",
                "</S>\n",
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_update_config_files() {
        let psa_dir = tempfile::tempdir().unwrap();
        let raw_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        write_psa(psa_dir.path(), "DatCnvW.psa");
        write_psa(psa_dir.path(), "Filter.psa");
        let raw = raw_dir.path().join("cast7.hex");

        let mut filter_step = ProcessingStep::new("Filter.psa", StepOrder::Number(2));
        filter_step.executable = Some(Executable::new(PathBuf::from("/sbe/FilterW.exe")));
        let config = RunConfig {
            raw_files: vec![raw.clone()],
            config_dir: psa_dir.path().to_path_buf(),
            output_dir: out_dir.path().to_path_buf(),
            executables: vec![Executable::new(PathBuf::from("/sbe/DatCnvW.exe"))],
            steps: vec![filter_step],
            ..Default::default()
        };

        let report = update_config_files(&config).unwrap();
        assert_eq!(report.updated.len(), 2);
        assert!(!report.has_failures());

        let raw_dir_str = absolute_string(raw_dir.path());
        let out_dir_str = absolute_string(out_dir.path());
        let datcnv = std::fs::read_to_string(psa_dir.path().join("DatCnvW.psa")).unwrap();
        assert!(datcnv.contains(&format!("<InputDir value=\"{raw_dir_str}\" />")));
        assert!(datcnv.contains(&format!(
            "<InstrumentPath value=\"{raw_dir_str}/cast7.XMLCON\" />"
        )));
        let filter = std::fs::read_to_string(psa_dir.path().join("Filter.psa")).unwrap();
        assert!(filter.contains(&format!("<InputDir value=\"{out_dir_str}\" />")));
        assert!(filter.contains(&format!("<OutputDir value=\"{out_dir_str}\" />")));
    }

    #[test]
    fn test_update_validation() {
        let psa_dir = tempfile::tempdir().unwrap();
        let mut config = RunConfig {
            config_dir: psa_dir.path().join("missing"),
            raw_files: vec![PathBuf::from("a.hex")],
            ..Default::default()
        };
        assert!(matches!(
            update_config_files(&config),
            Err(ResolveError::BadConfigDirectory(_))
        ));

        config.config_dir = psa_dir.path().to_path_buf();
        assert!(matches!(
            update_config_files(&config),
            Err(ResolveError::NoConfigFiles(_))
        ));

        config.raw_files.clear();
        assert!(matches!(
            update_config_files(&config),
            Err(ResolveError::NoRawFiles)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_update_collects_failures() {
        use std::os::unix::fs::PermissionsExt;

        let psa_dir = tempfile::tempdir().unwrap();
        write_psa(psa_dir.path(), "a.psa");
        write_psa(psa_dir.path(), "b.psa");
        let locked = psa_dir.path().join("a.psa");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Root ignores file permissions, nothing to observe then
        if std::fs::read_to_string(&locked).is_ok() {
            return;
        }

        let config = RunConfig {
            raw_files: vec![PathBuf::from("/data/a.hex"), PathBuf::from("/data/b.hex")],
            config_dir: psa_dir.path().to_path_buf(),
            output_dir: PathBuf::from("/out"),
            ..Default::default()
        };
        let report = update_config_files(&config).unwrap();
        assert_eq!(report.updated.len(), 2);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|(p, _)| *p == locked));
    }
}
