use std::path::{Path, PathBuf};

use super::config::{LastUsed, RunConfig};
use super::error::SessionError;
use super::launcher::{ToolCommand, ToolLauncher, ToolOutput};
use super::planner::{execute_plan, plan_run, RunOptions, RunPlan, RunReport};
use super::resolver::{update_config_files, UpdateReport};
use super::scan::{scan_config_files, scan_executables};
use super::status::RunStatus;
use super::step::{ProcessingStep, StepOrder};
use super::tool::{match_executable, Executable};

/// The working state behind the front end.
///
/// Owns the current run configuration and remembers where it came from. Every operation a
/// front end needs goes through here; the resolver and planner only ever see the config it
/// hands them.
#[derive(Debug, Clone)]
pub struct Session {
    config: RunConfig,
    config_path: Option<PathBuf>,
    pointer_path: PathBuf,
}

impl Session {
    /// Create an empty session that records its last used config at `pointer_path`
    pub fn new(pointer_path: PathBuf) -> Self {
        Self {
            config: RunConfig::default(),
            config_path: None,
            pointer_path,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn pointer_path(&self) -> &Path {
        &self.pointer_path
    }

    pub fn set_raw_files(&mut self, raw_files: Vec<PathBuf>) {
        self.config.raw_files = raw_files;
    }

    pub fn set_output_dir(&mut self, output_dir: PathBuf) {
        self.config.output_dir = output_dir;
    }

    /// Replace the step list with the PSA files of a directory, all with default settings
    pub fn scan_config_dir(
        &mut self,
        config_dir: &Path,
    ) -> Result<&[ProcessingStep], SessionError> {
        let names = scan_config_files(config_dir)?;
        if names.is_empty() {
            log::warn!("No PSA files found in {}", config_dir.display());
        }
        self.config.config_dir = config_dir.to_path_buf();
        self.config.steps = ProcessingStep::from_names(&names);
        Ok(&self.config.steps)
    }

    /// Register the executables of a directory. Previous executable choices are cleared.
    pub fn register_executables(
        &mut self,
        exe_dir: &Path,
    ) -> Result<&[Executable], SessionError> {
        let executables = scan_executables(exe_dir)?;
        log::info!(
            "Available executables: {}",
            executables
                .iter()
                .map(Executable::name)
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.config.executables_dir = exe_dir.to_path_buf();
        self.config.executables = executables;
        for step in self.config.steps.iter_mut() {
            step.executable = None;
        }
        Ok(&self.config.executables)
    }

    /// Give every step without an executable the known executable its file name refers to.
    /// Returns how many steps were assigned.
    pub fn auto_assign_executables(&mut self) -> usize {
        let mut assigned = 0;
        for step in self.config.steps.iter_mut() {
            if step.executable.is_some() {
                continue;
            }
            if let Some(exe) = match_executable(&self.config.executables, &step.config_file) {
                log::info!("Assigned {} to {}", exe.name(), step.config_file);
                step.executable = Some(exe.clone());
                assigned += 1;
            }
        }
        assigned
    }

    fn step_mut(&mut self, config_file: &str) -> Result<&mut ProcessingStep, SessionError> {
        self.config
            .get_step_mut(config_file)
            .ok_or_else(|| SessionError::UnknownStep(config_file.to_string()))
    }

    /// Select an executable for a step, by the name of a registered executable or by path.
    ///
    /// An unregistered bare file name is taken to live in the executables directory.
    pub fn select_executable(
        &mut self,
        config_file: &str,
        executable: &str,
    ) -> Result<(), SessionError> {
        let exe = match self
            .config
            .executables
            .iter()
            .find(|e| e.name().eq_ignore_ascii_case(executable))
        {
            Some(exe) => exe.clone(),
            None => {
                let path = PathBuf::from(executable);
                if path.components().count() == 1 {
                    Executable::new(self.config.executables_dir.join(path))
                } else {
                    Executable::new(path)
                }
            }
        };
        self.step_mut(config_file)?.executable = Some(exe);
        Ok(())
    }

    pub fn clear_executable(&mut self, config_file: &str) -> Result<(), SessionError> {
        self.step_mut(config_file)?.executable = None;
        Ok(())
    }

    pub fn set_order(&mut self, config_file: &str, order: StepOrder) -> Result<(), SessionError> {
        self.step_mut(config_file)?.order = order;
        Ok(())
    }

    pub fn set_enabled(&mut self, config_file: &str, enabled: bool) -> Result<(), SessionError> {
        self.step_mut(config_file)?.enabled = enabled;
        Ok(())
    }

    /// Replace the session with a configuration read from a file.
    ///
    /// The configuration directory is re-scanned when possible and the saved step settings are
    /// applied by file name. On error the session is left as it was.
    pub fn load(&mut self, config_path: &Path) -> Result<(), SessionError> {
        let mut config = RunConfig::read_config_file(config_path)?;
        match scan_config_files(&config.config_dir) {
            Ok(names) => {
                let mut steps = ProcessingStep::from_names(&names);
                for step in steps.iter_mut() {
                    if let Some(saved) = config.get_step(&step.config_file) {
                        step.apply_saved(saved);
                    }
                }
                config.steps = steps;
            }
            Err(e) => log::warn!("Could not re-scan PSA directory, keeping saved steps: {e}"),
        }
        self.config = config;
        self.config_path = Some(config_path.to_path_buf());
        self.remember(config_path);
        Ok(())
    }

    /// Load whichever configuration the pointer file names.
    ///
    /// Returns false when there is no usable last used configuration; the caller should then ask
    /// for one.
    pub fn load_last_used(&mut self) -> Result<bool, SessionError> {
        match LastUsed::resolve(&self.pointer_path)? {
            Some(path) => {
                self.load(&path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write the current configuration and record it as the last used one
    pub fn save(&mut self, config_path: &Path) -> Result<(), SessionError> {
        self.config.write_config_file(config_path)?;
        self.config_path = Some(config_path.to_path_buf());
        self.remember(config_path);
        Ok(())
    }

    fn remember(&self, config_path: &Path) {
        let absolute =
            std::path::absolute(config_path).unwrap_or_else(|_| config_path.to_path_buf());
        match LastUsed::write(&self.pointer_path, &absolute) {
            Ok(()) => log::info!(
                "Saved last used config file path: {} to {}",
                absolute.display(),
                self.pointer_path.display()
            ),
            Err(e) => log::warn!("Error saving last used config: {e}"),
        }
    }

    /// Rewrite the PSA files for the session's raw files
    pub fn update_config_files(&self) -> Result<UpdateReport, SessionError> {
        Ok(update_config_files(&self.config)?)
    }

    pub fn plan(&self) -> Result<RunPlan, SessionError> {
        Ok(plan_run(&self.config)?)
    }

    /// Validate, order and run the enabled steps for every raw file
    pub fn run<L, F>(
        &self,
        options: &RunOptions,
        launcher: &mut L,
        on_status: F,
    ) -> Result<RunReport, SessionError>
    where
        L: ToolLauncher + ?Sized,
        F: FnMut(RunStatus),
    {
        let plan = self.plan()?;
        log::info!(
            "Running {} step(s) for {} raw file(s)",
            plan.steps.len(),
            plan.raw_files.len()
        );
        Ok(execute_plan(&plan, options, launcher, on_status))
    }

    /// Open a step's PSA file in its own tool so it can be edited
    pub fn open_step_in_tool<L>(
        &self,
        config_file: &str,
        launcher: &mut L,
    ) -> Result<ToolOutput, SessionError>
    where
        L: ToolLauncher + ?Sized,
    {
        let step = self
            .config
            .get_step(config_file)
            .ok_or_else(|| SessionError::UnknownStep(config_file.to_string()))?;
        let exe = step
            .executable
            .as_ref()
            .ok_or_else(|| SessionError::MissingExecutable(config_file.to_string()))?;
        let psa_path = self.config.get_config_file_path(step);
        if !psa_path.is_file() {
            return Err(SessionError::MissingConfigFile(psa_path));
        }

        log::info!("Opening {} with {}", psa_path.display(), exe.name());
        let command =
            ToolCommand::new(exe.path(), vec![psa_path.to_string_lossy().to_string()]);
        let output = launcher.launch(&command)?;
        if !output.success() {
            return Err(SessionError::EditorFailed {
                tool: exe.name(),
                step: config_file.to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}
