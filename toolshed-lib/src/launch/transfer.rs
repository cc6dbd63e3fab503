use crate::error::ToolshedError;
use std::collections::VecDeque;
use std::os::unix::process::CommandExt;
use std::process::{Command, ExitStatus, Stdio};

/// A fully resolved launch: program, ordered arguments, and environment
/// entries to set on top of the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl LaunchPlan {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
        }
    }

    pub fn env_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.push((key.into(), value.into()));
    }

    /// Human-readable command line, for launch banners and error reports.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }

    fn transfer_failed(&self, source: std::io::Error) -> ToolshedError {
        ToolshedError::TransferFailed {
            command: self.command_line(),
            source,
        }
    }
}

/// The seam between menu logic and the operating system.
///
/// `exec` replaces the current process image and therefore only ever returns
/// an error; a successful exec never comes back. `spawn` runs the plan as a
/// foreground child with inherited stdio and blocks until it exits.
pub trait Transfer {
    fn exec(&mut self, plan: &LaunchPlan) -> Result<(), ToolshedError>;
    fn spawn(&mut self, plan: &LaunchPlan) -> Result<ExitStatus, ToolshedError>;
}

/// Real process transfers.
#[derive(Debug, Default)]
pub struct OsTransfer;

impl Transfer for OsTransfer {
    fn exec(&mut self, plan: &LaunchPlan) -> Result<(), ToolshedError> {
        // On success this call does not return: the OS replaces the program
        // image in place, keeping the PID and inherited descriptors.
        let err = plan.command().exec();
        Err(plan.transfer_failed(err))
    }

    fn spawn(&mut self, plan: &LaunchPlan) -> Result<ExitStatus, ToolshedError> {
        plan.command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|err| plan.transfer_failed(err))
    }
}

/// Test double that records every plan instead of touching the OS.
///
/// `exec` reports success, standing in for "the process image was replaced";
/// callers under test stop exactly where a real exec would have taken over.
/// `spawn` hands back scripted exit codes in order, defaulting to 0.
#[derive(Debug, Default)]
pub struct RecordingTransfer {
    pub execs: Vec<LaunchPlan>,
    pub spawns: Vec<LaunchPlan>,
    spawn_codes: VecDeque<i32>,
}

impl RecordingTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spawn_codes(codes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            spawn_codes: codes.into_iter().collect(),
            ..Self::default()
        }
    }

    fn status_from_code(code: i32) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status encoding: exit code in the high byte.
        ExitStatus::from_raw(code << 8)
    }
}

impl Transfer for RecordingTransfer {
    fn exec(&mut self, plan: &LaunchPlan) -> Result<(), ToolshedError> {
        self.execs.push(plan.clone());
        Ok(())
    }

    fn spawn(&mut self, plan: &LaunchPlan) -> Result<ExitStatus, ToolshedError> {
        self.spawns.push(plan.clone());
        let code = self.spawn_codes.pop_front().unwrap_or(0);
        Ok(Self::status_from_code(code))
    }
}
