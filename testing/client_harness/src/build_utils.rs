use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// A program invocation, kept as data so it can be logged and inspected before it is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            current_dir: None,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Run `command` to completion.
///
/// When `verbose` the child inherits stdout/stderr; otherwise its output is captured and returned
/// as part of the error on failure.
pub fn run_to_completion(command: &CommandLine, verbose: bool) -> Result<(), String> {
    let mut cmd = command.to_command();
    if verbose {
        let status = cmd
            .stdin(Stdio::null())
            .status()
            .map_err(|e| format!("failed to run {}: {}", command, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", command, status))
        }
    } else {
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("failed to run {}: {}", command, e))?;
        check_command_output(output, || format!("{} failed", command))
    }
}

pub fn check_command_output<F>(output: Output, failure_msg: F) -> Result<(), String>
where
    F: FnOnce() -> String,
{
    if output.status.success() {
        return Ok(());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(format!(
        "{} ({}); stdout: {:?}; stderr: {:?}",
        failure_msg(),
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}

/// Builds the stdout/stderr handler for a long-running client.
pub fn build_stdio(verbose: bool) -> Stdio {
    if verbose {
        Stdio::inherit()
    } else {
        Stdio::null()
    }
}
