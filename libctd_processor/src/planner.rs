use std::fmt;
use std::path::{Path, PathBuf};

use super::config::RunConfig;
use super::error::PlanError;
use super::launcher::{ToolCommand, ToolLauncher};
use super::resolver::{raw_base_name, raw_directory, resolve_fields};
use super::rewrite::rewrite_file;
use super::status::RunStatus;
use super::tool::{Executable, ToolKind};

/// An enabled step, validated and ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub config_file: String,
    pub config_path: PathBuf,
    pub executable: Executable,
    pub order: i64,
}

/// The validated, ordered work of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub raw_files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub steps: Vec<PlannedStep>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Rewrite each step's PSA file for the current raw file before running it
    pub rewrite_configs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The tool ran but exited unsuccessfully
    ExitStatus { code: Option<i32>, stderr: String },
    /// The tool could not be started
    Launch(String),
    /// The PSA file could not be prepared, so the tool was not started
    Rewrite(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitStatus {
                code: Some(code),
                stderr,
            } => write!(f, "exited with code {code}: {stderr}"),
            Self::ExitStatus { code: None, stderr } => {
                write!(f, "terminated by signal: {stderr}")
            }
            Self::Launch(msg) => write!(f, "failed to launch: {msg}"),
            Self::Rewrite(msg) => write!(f, "PSA file not updated: {msg}"),
        }
    }
}

/// One step of one raw file that did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub raw_file: PathBuf,
    pub config_file: String,
    pub tool: String,
    pub reason: FailureReason,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error running {} for {} with raw file {}: {}",
            self.tool,
            self.config_file,
            self.raw_file.display(),
            self.reason
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub succeeded: usize,
    pub failures: Vec<StepFailure>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// The file a tool reads for a given raw file
pub fn input_file_for(raw_file: &Path, kind: ToolKind, output_dir: &Path) -> PathBuf {
    let base_name = raw_base_name(raw_file);
    match kind {
        ToolKind::Conversion => raw_file.to_path_buf(),
        ToolKind::Summary => output_dir.join(format!("{base_name}.ros")),
        _ => output_dir.join(format!("{base_name}.cnv")),
    }
}

/// Build the exact command line for one tool run.
///
/// The flag grammar is fixed by the tools: `/i` input file, `/o` output directory, `/f` output
/// file name, `/p` PSA file, `/s` to start without a dialog, and `/c` instrument file for the
/// tools that need one.
pub fn build_command(
    raw_file: &Path,
    executable: &Executable,
    config_path: &Path,
    output_dir: &Path,
) -> ToolCommand {
    let base_name = raw_base_name(raw_file);
    let input_file = input_file_for(raw_file, executable.kind(), output_dir);
    let mut args = vec![
        format!("/i{}", input_file.display()),
        format!("/o{}", output_dir.display()),
        format!("/f{base_name}.cnv"),
        format!("/p{}", config_path.display()),
        String::from("/s"),
    ];
    if executable.kind().needs_instrument_file() {
        let xmlcon = raw_directory(raw_file).join(format!("{}.xmlcon", base_name.to_uppercase()));
        args.push(format!("/c{}", xmlcon.display()));
    }
    ToolCommand::new(executable.path(), args)
}

/// Validate a configuration and turn its enabled steps into an ordered plan.
///
/// Nothing is launched here; any error rejects the whole run.
pub fn plan_run(config: &RunConfig) -> Result<RunPlan, PlanError> {
    if config.raw_files.is_empty() {
        return Err(PlanError::NoRawFiles);
    }
    if let Some(bad) = config.raw_files.iter().find(|f| !f.is_file()) {
        return Err(PlanError::BadRawFile(bad.clone()));
    }
    if !config.config_dir.is_dir() {
        return Err(PlanError::BadConfigDirectory(config.config_dir.clone()));
    }
    if !config.has_output_dir() {
        return Err(PlanError::NoOutputDirectory);
    }

    let mut steps: Vec<PlannedStep> = Vec::new();
    for step in config.steps.iter().filter(|s| s.enabled) {
        let executable = match &step.executable {
            Some(exe) => exe.clone(),
            None => return Err(PlanError::MissingExecutable(step.config_file.clone())),
        };
        let order = step.order.value().ok_or_else(|| PlanError::InvalidOrder {
            step: step.config_file.clone(),
            value: step.order.to_string(),
        })?;
        steps.push(PlannedStep {
            config_file: step.config_file.clone(),
            config_path: config.get_config_file_path(step),
            executable,
            order,
        });
    }

    if steps.is_empty() {
        return Err(PlanError::NoStepsSelected);
    }

    // Stable, so equal orders keep their listed order
    steps.sort_by_key(|s| s.order);

    Ok(RunPlan {
        raw_files: config.raw_files.clone(),
        output_dir: config.output_dir.clone(),
        steps,
    })
}

/// Run every planned step for every raw file, one process at a time.
///
/// Failures are collected into the report and never stop the remaining steps or raw files.
pub fn execute_plan<L, F>(
    plan: &RunPlan,
    options: &RunOptions,
    launcher: &mut L,
    mut on_status: F,
) -> RunReport
where
    L: ToolLauncher + ?Sized,
    F: FnMut(RunStatus),
{
    let mut report = RunReport::default();
    let raw_total = plan.raw_files.len();
    let step_total = plan.steps.len();

    for (raw_index, raw_file) in plan.raw_files.iter().enumerate() {
        log::info!("Processing raw file {}...", raw_file.display());
        for (step_index, step) in plan.steps.iter().enumerate() {
            on_status(RunStatus::new(
                raw_index,
                raw_total,
                step_index,
                step_total,
                &step.config_file,
            ));
            let tool = step.executable.name();
            let failure = |reason: FailureReason| StepFailure {
                raw_file: raw_file.clone(),
                config_file: step.config_file.clone(),
                tool: tool.clone(),
                reason,
            };

            if options.rewrite_configs {
                let fields = resolve_fields(raw_file, step.executable.kind(), &plan.output_dir);
                if let Err(e) = rewrite_file(&step.config_path, &fields) {
                    log::error!("{e}");
                    report
                        .failures
                        .push(failure(FailureReason::Rewrite(e.to_string())));
                    continue;
                }
            }

            let command = build_command(
                raw_file,
                &step.executable,
                &step.config_path,
                &plan.output_dir,
            );
            log::info!(
                "Running {} for {} with raw file {}",
                tool,
                step.config_file,
                raw_file.display()
            );
            match launcher.launch(&command) {
                Ok(output) if output.success() => {
                    log::info!("{} ran successfully for {}", tool, step.config_file);
                    if !output.stdout.trim().is_empty() {
                        log::debug!("{}", output.stdout.trim());
                    }
                    report.succeeded += 1;
                }
                Ok(output) => {
                    let f = failure(FailureReason::ExitStatus {
                        code: output.code,
                        stderr: output.stderr.trim().to_string(),
                    });
                    log::error!("{f}");
                    report.failures.push(f);
                }
                Err(e) => {
                    let f = failure(FailureReason::Launch(e.to_string()));
                    log::error!("{f}");
                    report.failures.push(f);
                }
            }
        }
        log::info!("Finished raw file {}.", raw_file.display());
    }
    on_status(RunStatus::finished(raw_total, step_total));

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchError;
    use crate::launcher::ToolOutput;
    use crate::step::{ProcessingStep, StepOrder};
    use std::collections::HashMap;

    /// Records every command and answers with a scripted exit code per tool name
    #[derive(Default)]
    struct FakeLauncher {
        calls: Vec<ToolCommand>,
        exit_codes: HashMap<String, i32>,
        missing: Vec<String>,
    }

    impl ToolLauncher for FakeLauncher {
        fn launch(&mut self, command: &ToolCommand) -> Result<ToolOutput, LaunchError> {
            self.calls.push(command.clone());
            let name = command.program.to_string_lossy().to_string();
            if self.missing.contains(&name) {
                return Err(LaunchError::NotFound(command.program.clone()));
            }
            let code = self.exit_codes.get(&name).copied().unwrap_or(0);
            Ok(ToolOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: if code == 0 {
                    String::new()
                } else {
                    String::from("bad things")
                },
            })
        }
    }

    fn step(name: &str, exe: &str, order: StepOrder) -> ProcessingStep {
        let mut s = ProcessingStep::new(name, order);
        s.executable = Some(Executable::new(PathBuf::from(exe)));
        s
    }

    struct Fixture {
        _raw_dir: tempfile::TempDir,
        _psa_dir: tempfile::TempDir,
        config: RunConfig,
    }

    fn fixture(raw_names: &[&str], steps: Vec<ProcessingStep>) -> Fixture {
        let raw_dir = tempfile::tempdir().unwrap();
        let psa_dir = tempfile::tempdir().unwrap();
        let raw_files = raw_names
            .iter()
            .map(|n| {
                let p = raw_dir.path().join(n);
                std::fs::write(&p, b"raw").unwrap();
                p
            })
            .collect();
        let config = RunConfig {
            raw_files,
            config_dir: psa_dir.path().to_path_buf(),
            output_dir: PathBuf::from("/out"),
            steps,
            ..Default::default()
        };
        Fixture {
            _raw_dir: raw_dir,
            _psa_dir: psa_dir,
            config,
        }
    }

    fn program_names(calls: &[ToolCommand]) -> Vec<String> {
        calls
            .iter()
            .map(|c| c.program.to_string_lossy().to_string())
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_conversion_command() {
        let exe = Executable::new(PathBuf::from("DatCnvW.exe"));
        let cmd = build_command(
            Path::new("/data/sample1.hex"),
            &exe,
            Path::new("/cfg/step.psa"),
            Path::new("/out"),
        );
        assert_eq!(
            cmd.argv(),
            vec![
                "DatCnvW.exe",
                "/i/data/sample1.hex",
                "/o/out",
                "/fsample1.cnv",
                "/p/cfg/step.psa",
                "/s",
                "/c/data/SAMPLE1.xmlcon",
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_other_commands() {
        let raw = Path::new("/data/sample1.hex");
        let psa = Path::new("/cfg/step.psa");
        let out = Path::new("/out");

        let summary = build_command(raw, &Executable::new("BottleSumW.exe".into()), psa, out);
        assert_eq!(summary.args[0], "/i/out/sample1.ros");
        assert_eq!(summary.args.last().unwrap(), "/c/data/SAMPLE1.xmlcon");

        let derive = build_command(raw, &Executable::new("DeriveW.exe".into()), psa, out);
        assert_eq!(derive.args[0], "/i/out/sample1.cnv");
        assert_eq!(derive.args.len(), 6);

        let filter = build_command(raw, &Executable::new("FilterW.exe".into()), psa, out);
        assert_eq!(
            filter.argv(),
            vec![
                "FilterW.exe",
                "/i/out/sample1.cnv",
                "/o/out",
                "/fsample1.cnv",
                "/p/cfg/step.psa",
                "/s",
            ]
        );
    }

    #[test]
    fn test_plan_sorts_stably() {
        let f = fixture(
            &["a.hex"],
            vec![
                step("c.psa", "FilterW.exe", StepOrder::Number(3)),
                step("b1.psa", "DeriveW.exe", StepOrder::from("2")),
                step("a.psa", "DatCnvW.exe", StepOrder::Number(1)),
                step("b2.psa", "LoopEditW.exe", StepOrder::Number(2)),
            ],
        );
        let plan = plan_run(&f.config).unwrap();
        let names: Vec<&str> = plan.steps.iter().map(|s| s.config_file.as_str()).collect();
        assert_eq!(names, vec!["a.psa", "b1.psa", "b2.psa", "c.psa"]);
    }

    #[test]
    fn test_plan_skips_disabled_steps() {
        let mut disabled = ProcessingStep::new("off.psa", StepOrder::from("not a number"));
        disabled.enabled = false;
        let f = fixture(
            &["a.hex"],
            vec![step("a.psa", "DatCnvW.exe", StepOrder::Number(1)), disabled],
        );
        let plan = plan_run(&f.config).unwrap();
        assert_eq!(plan.steps.len(), 1);
    }

    #[test]
    fn test_bad_order_launches_nothing() {
        let f = fixture(
            &["a.hex", "b.hex"],
            vec![
                step("a.psa", "DatCnvW.exe", StepOrder::Number(1)),
                step("b.psa", "FilterW.exe", StepOrder::from("second")),
            ],
        );
        let mut launcher = FakeLauncher::default();
        let result = plan_run(&f.config)
            .map(|plan| execute_plan(&plan, &RunOptions::default(), &mut launcher, |_| ()));
        assert!(matches!(
            result,
            Err(PlanError::InvalidOrder { step: ref name, ref value })
                if name == "b.psa" && value == "second"
        ));
        assert!(launcher.calls.is_empty());
    }

    #[test]
    fn test_fractional_order_loads_then_rejects_run() {
        let f = fixture(
            &["a.hex"],
            vec![
                step("a.psa", "DatCnvW.exe", StepOrder::Number(1)),
                step("b.psa", "FilterW.exe", StepOrder::Number(2)),
            ],
        );
        let yaml = serde_yaml::to_string(&f.config)
            .unwrap()
            .replace("order: 2", "order: 1.5");
        let path = f._psa_dir.path().join("run.yaml");
        std::fs::write(&path, yaml).unwrap();

        let config = RunConfig::read_config_file(&path).unwrap();
        assert_eq!(config.steps[1].order, StepOrder::from("1.5"));

        let mut launcher = FakeLauncher::default();
        let result = plan_run(&config)
            .map(|plan| execute_plan(&plan, &RunOptions::default(), &mut launcher, |_| ()));
        assert!(matches!(
            result,
            Err(PlanError::InvalidOrder { step: ref name, ref value })
                if name == "b.psa" && value == "1.5"
        ));
        assert!(launcher.calls.is_empty());
    }

    #[test]
    fn test_plan_validation() {
        let f = fixture(&["a.hex"], vec![ProcessingStep::new("a.psa", StepOrder::Number(1))]);
        assert!(matches!(
            plan_run(&f.config),
            Err(PlanError::MissingExecutable(ref s)) if s == "a.psa"
        ));

        let mut config = f.config.clone();
        config.steps[0].enabled = false;
        assert!(matches!(plan_run(&config), Err(PlanError::NoStepsSelected)));

        config.output_dir = PathBuf::new();
        assert!(matches!(plan_run(&config), Err(PlanError::NoOutputDirectory)));

        config.config_dir = config.config_dir.join("missing");
        assert!(matches!(
            plan_run(&config),
            Err(PlanError::BadConfigDirectory(_))
        ));

        config.raw_files.push(PathBuf::from("/no/such/raw.hex"));
        assert!(matches!(plan_run(&config), Err(PlanError::BadRawFile(_))));

        config.raw_files.clear();
        assert!(matches!(plan_run(&config), Err(PlanError::NoRawFiles)));
    }

    #[test]
    fn test_failures_do_not_stop_run() {
        let f = fixture(
            &["a.hex", "b.hex"],
            vec![
                step("1.psa", "DatCnvW.exe", StepOrder::Number(1)),
                step("2.psa", "FilterW.exe", StepOrder::Number(2)),
                step("3.psa", "Missing.exe", StepOrder::Number(3)),
                step("4.psa", "DeriveW.exe", StepOrder::Number(4)),
            ],
        );
        let plan = plan_run(&f.config).unwrap();
        let mut launcher = FakeLauncher::default();
        launcher.exit_codes.insert(String::from("FilterW.exe"), 1);
        launcher.missing.push(String::from("Missing.exe"));

        let mut statuses = Vec::new();
        let report = execute_plan(&plan, &RunOptions::default(), &mut launcher, |s| {
            statuses.push(s)
        });

        assert_eq!(
            program_names(&launcher.calls),
            vec![
                "DatCnvW.exe",
                "FilterW.exe",
                "Missing.exe",
                "DeriveW.exe",
                "DatCnvW.exe",
                "FilterW.exe",
                "Missing.exe",
                "DeriveW.exe",
            ]
        );
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failures.len(), 4);
        assert_eq!(report.failures[0].tool, "FilterW.exe");
        assert_eq!(report.failures[0].config_file, "2.psa");
        assert_eq!(
            report.failures[0].reason,
            FailureReason::ExitStatus {
                code: Some(1),
                stderr: String::from("bad things")
            }
        );
        assert!(matches!(report.failures[1].reason, FailureReason::Launch(_)));
        assert_eq!(report.failures[2].raw_file, f.config.raw_files[1]);

        assert_eq!(statuses.len(), 9);
        assert_eq!(statuses.last().unwrap().progress, 1.0);
    }

    #[test]
    fn test_rewrite_before_run() {
        let mut f = fixture(
            &["cast3.hex"],
            vec![
                step("1.psa", "DatCnvW.exe", StepOrder::Number(1)),
                step("2.psa", "FilterW.exe", StepOrder::Number(2)),
            ],
        );
        let out_dir = tempfile::tempdir().unwrap();
        f.config.output_dir = out_dir.path().to_path_buf();
        std::fs::write(
            f.config.config_dir.join("1.psa"),
            "<S><OutputDir value=\"old\"/></S>",
        )
        .unwrap();
        // 2.psa is missing, so its step is skipped

        let plan = plan_run(&f.config).unwrap();
        let mut launcher = FakeLauncher::default();
        let options = RunOptions {
            rewrite_configs: true,
        };
        let report = execute_plan(&plan, &options, &mut launcher, |_| ());

        assert_eq!(program_names(&launcher.calls), vec!["DatCnvW.exe"]);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].reason, FailureReason::Rewrite(_)));
        let content = std::fs::read_to_string(f.config.config_dir.join("1.psa")).unwrap();
        assert!(!content.contains("\"old\""));
    }
}
