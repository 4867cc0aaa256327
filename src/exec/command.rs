// src/exec/command.rs

//! Shell command jobs, used by the `gracecron` binary.

use std::process::Stdio;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use super::job::{Job, JobFuture};

/// A [`Job`] that runs `cmd` through the platform shell.
///
/// A non-zero exit status fails the execution. The child process is never
/// killed by the scheduler; a deadline only changes what gets recorded.
#[derive(Debug, Clone)]
pub struct CommandJob {
    name: String,
    cmd: String,
}

impl CommandJob {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
        }
    }
}

impl Job for CommandJob {
    fn run(&self) -> JobFuture {
        let name = self.name.clone();
        let cmd = self.cmd.clone();
        Box::pin(async move { run_command(&name, &cmd).await })
    }
}

async fn run_command(name: &str, cmd_line: &str) -> anyhow::Result<()> {
    debug!(job = %name, cmd = %cmd_line, "spawning command");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd_line);
        c
    };

    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for job '{}'", name))?;

    if let Some(stdout) = child.stdout.take() {
        let job = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(job = %job, "stdout: {}", line);
            }
        });
    }

    // Always consume stderr so buffers don't fill; log at debug.
    if let Some(stderr) = child.stderr.take() {
        let job = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(job = %job, "stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of job '{}'", name))?;

    if !status.success() {
        bail!(
            "command exited with status {}",
            status
                .code()
                .map_or_else(|| "unknown".to_string(), |c| c.to_string())
        );
    }
    Ok(())
}
