//! Process execution for the CLI-backed collaborators.

use std::io;
use std::process::Output;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{FleetError, Result};

/// Runs an external program to completion and captures its output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &'static str, args: &[String]) -> io::Result<Output>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &'static str, args: &[String]) -> io::Result<Output> {
        tokio::process::Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
    }
}

/// The subcommand words of an invocation, for error messages ("ecs list-services").
fn action(args: &[String]) -> String {
    args.iter()
        .take_while(|a| !a.starts_with('-'))
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

fn output_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !stdout.is_empty() {
        return stdout;
    }
    format!("exit status {}", output.status)
}

/// Run a command and return its stdout, mapping spawn failures and non-zero
/// exits to errors.
pub async fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &'static str,
    args: &[String],
) -> Result<Vec<u8>> {
    debug!(program, args = %args.join(" "), "running command");
    let output = runner
        .run(program, args)
        .await
        .map_err(|source| FleetError::Spawn { program, source })?;
    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(FleetError::CommandFailed {
            program,
            action: action(args),
            stderr: output_detail(&output),
        })
    }
}

/// Run a command and decode its stdout as JSON.
pub async fn run_json<T: DeserializeOwned, R: CommandRunner + ?Sized>(
    runner: &R,
    program: &'static str,
    context: &'static str,
    args: &[String],
) -> Result<T> {
    let stdout = run_checked(runner, program, args).await?;
    serde_json::from_slice(&stdout).map_err(|source| FleetError::Parse { context, source })
}

pub fn args<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
