//! Child process task.

use std::path::PathBuf;
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::TaskError;
use crate::task::TaskDescriptor;

const NPM: &str = if cfg!(windows) { "npm.cmd" } else { "npm" };

/// A command to run as a pipeline step.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Program to execute (PATH lookup applies).
    pub program: String,

    /// Arguments.
    pub args: Vec<String>,

    /// Working directory (optional).
    pub cwd: Option<PathBuf>,

    /// Additional environment variables.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Create a spec for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Append arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// `npm install` in `dir`, limited to `packages` when any are given.
    pub fn npm_install<I, S>(dir: impl Into<PathBuf>, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(NPM)
            .with_args(["install"])
            .with_args(packages)
            .with_cwd(dir)
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run the command with inherited stdio and wait for it to exit.
    ///
    /// The child is killed if the returned future is dropped.
    pub async fn execute(&self) -> Result<ExitStatus, TaskError> {
        info!(program = %self.program, args = ?self.args, cwd = ?self.cwd, "Running command");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let status = cmd
            .status()
            .await
            .map_err(|source| TaskError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            warn!(program = %self.program, status = %status, "Command failed");
            return Err(TaskError::CommandFailed {
                program: self.program.clone(),
                status,
            });
        }
        Ok(status)
    }
}

/// Task that runs `spec` to completion; a non-zero exit fails the pipeline.
pub fn run_command(spec: CommandSpec) -> TaskDescriptor {
    command_task("runCommand", spec)
}

/// Task that installs npm dependencies in `dir`.
pub fn install_packages<I, S>(dir: impl Into<PathBuf>, packages: I) -> TaskDescriptor
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    command_task("installPackages", CommandSpec::npm_install(dir, packages))
}

fn command_task(label: &str, spec: CommandSpec) -> TaskDescriptor {
    TaskDescriptor::named(
        label,
        move |_, _| {
            let spec = spec.clone();
            async move { spec.execute().await }
        },
        Vec::new(),
    )
}
