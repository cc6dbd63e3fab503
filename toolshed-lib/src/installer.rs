use crate::config::InstallConfig;
use std::io;
use std::process::{Command, ExitStatus, Stdio};

/// Outcome of one install batch. Every requested package is attempted in
/// order; failures are collected, never aborting the batch early.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl InstallReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn fail_count(&self) -> usize {
        self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Invokes the system package manager once per requested package
/// (`apt-get install -y <name>` unless configured otherwise).
#[derive(Debug, Clone)]
pub struct PackageInstaller {
    program: String,
    args: Vec<String>,
}

impl PackageInstaller {
    pub fn new() -> Self {
        Self {
            program: "apt-get".to_string(),
            args: vec!["install".to_string(), "-y".to_string()],
        }
    }

    pub fn from_config(config: &InstallConfig) -> Self {
        Self::with_command(config.program.clone(), config.args.clone())
    }

    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Run the batch, streaming package-manager output to the terminal.
    pub fn install(&self, packages: &[String]) -> InstallReport {
        let mut report = InstallReport::default();

        for package in packages {
            println!("Installing {package}...");
            match self.run_one(package) {
                Ok(status) if status.success() => report.succeeded.push(package.clone()),
                Ok(status) => {
                    eprintln!("Install failed for {package} ({status})");
                    report.failed.push(package.clone());
                }
                Err(err) => {
                    eprintln!("Install failed for {package}: {err}");
                    report.failed.push(package.clone());
                }
            }
        }

        report
    }

    fn run_one(&self, package: &str) -> io::Result<ExitStatus> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(package)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
    }
}

impl Default for PackageInstaller {
    fn default() -> Self {
        Self::new()
    }
}
