use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::error::LaunchError;

/// A fully built invocation of one third-party tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: &Path, args: Vec<String>) -> Self {
        Self {
            program: program.to_path_buf(),
            args,
        }
    }

    /// The complete argument vector, program first
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.program.to_string_lossy().to_string()];
        argv.extend(self.args.iter().cloned());
        argv
    }
}

/// What a finished tool left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a tool to completion. The planner only talks to tools through this trait.
pub trait ToolLauncher {
    fn launch(&mut self, command: &ToolCommand) -> Result<ToolOutput, LaunchError>;
}

/// Launches tools as child processes, blocking until each exits
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher;

impl ToolLauncher for ProcessLauncher {
    fn launch(&mut self, command: &ToolCommand) -> Result<ToolOutput, LaunchError> {
        log::debug!("Running: {}", command.argv().join(" "));
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => LaunchError::NotFound(command.program.clone()),
                _ => LaunchError::IOError {
                    path: command.program.clone(),
                    source: e,
                },
            })?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv() {
        let cmd = ToolCommand::new(
            Path::new("DatCnvW.exe"),
            vec![String::from("/s"), String::from("/ofoo")],
        );
        assert_eq!(cmd.argv(), vec!["DatCnvW.exe", "/s", "/ofoo"]);
    }

    #[test]
    fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = ToolCommand::new(&dir.path().join("NoSuchTool.exe"), vec![]);
        let result = ProcessLauncher.launch(&cmd);
        assert!(matches!(result, Err(LaunchError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_and_output() {
        let cmd = ToolCommand::new(
            Path::new("sh"),
            vec![
                String::from("-c"),
                String::from("echo out; echo err 1>&2; exit 3"),
            ],
        );
        let output = ProcessLauncher.launch(&cmd).unwrap();
        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }
}
