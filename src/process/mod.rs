//! External process execution -- argv-vector commands, captured or streamed.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

#[cfg(test)]
pub(crate) mod fake;

/// A command exited non-zero where success was required.
#[derive(Debug, Error)]
#[error("command `{command}` exited with status {exit_code}: {stderr}")]
pub struct CommandFailed {
    pub command: String,
    pub exit_code: i32,
    pub stderr: String,
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Handle to a long-running background process (the PHP web server).
///
/// Exclusively owned by the server lifecycle. No timeout applies; the
/// process only ends when `stop` is called.
#[derive(Debug)]
pub struct ManagedProcess {
    child: Option<Child>,
    stopped: bool,
}

impl ManagedProcess {
    fn new(child: Child) -> Self {
        Self {
            child: Some(child),
            stopped: false,
        }
    }

    /// Test-only handle with no OS process behind it.
    #[cfg(test)]
    pub(crate) fn stub() -> Self {
        Self {
            child: None,
            stopped: false,
        }
    }

    /// Signal the process and reap it. Idempotent.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            // The process may have exited on its own; reap it either way.
            let _ = child.start_kill();
            child
                .wait()
                .await
                .context("waiting for the web server to exit")?;
        }
        self.stopped = true;
        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Process facade. Every external tool goes through this seam so the
/// orchestration layers can be exercised without spawning anything real.
///
/// Commands are argument vectors, never shell strings.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion with output captured.
    async fn run(&self, argv: &[String], cwd: Option<&Path>) -> Result<ProcessOutput>;

    /// Run to completion, forwarding output live while capturing it.
    async fn run_streaming(&self, argv: &[String], cwd: Option<&Path>) -> Result<ProcessOutput>;

    /// Like `run`, but a non-zero exit becomes a [`CommandFailed`] error.
    async fn run_or_fail(&self, argv: &[String], cwd: Option<&Path>) -> Result<ProcessOutput> {
        let output = self.run(argv, cwd).await?;
        if !output.success() {
            return Err(CommandFailed {
                command: argv.join(" "),
                exit_code: output.exit_code,
                stderr: output.stderr.clone(),
            }
            .into());
        }
        Ok(output)
    }

    /// Start a background process with all stdio discarded and no timeout.
    async fn spawn_detached(&self, argv: &[String], cwd: Option<&Path>) -> Result<ManagedProcess>;
}

/// The real runner backed by `tokio::process`.
pub struct SystemRunner;

fn build_command(argv: &[String], cwd: Option<&Path>) -> Result<Command> {
    let (program, args) = argv.split_first().context("empty command line")?;
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    Ok(cmd)
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, argv: &[String], cwd: Option<&Path>) -> Result<ProcessOutput> {
        let output = build_command(argv, cwd)?
            .output()
            .await
            .with_context(|| format!("failed to execute `{}`", argv.join(" ")))?;
        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn run_streaming(&self, argv: &[String], cwd: Option<&Path>) -> Result<ProcessOutput> {
        let mut child = build_command(argv, cwd)?
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute `{}`", argv.join(" ")))?;

        let stdout = child.stdout.take().context("child stdout not piped")?;
        let stderr = child.stderr.take().context("child stderr not piped")?;

        let forward_stdout = async {
            let mut lines = BufReader::new(stdout).lines();
            let mut captured = String::new();
            while let Some(line) = lines.next_line().await? {
                println!("{}", line);
                captured.push_str(&line);
                captured.push('\n');
            }
            Ok::<_, std::io::Error>(captured)
        };
        let forward_stderr = async {
            let mut lines = BufReader::new(stderr).lines();
            let mut captured = String::new();
            while let Some(line) = lines.next_line().await? {
                eprintln!("{}", line);
                captured.push_str(&line);
                captured.push('\n');
            }
            Ok::<_, std::io::Error>(captured)
        };

        let (stdout_buf, stderr_buf) = tokio::try_join!(forward_stdout, forward_stderr)
            .context("forwarding command output")?;
        let status = child.wait().await.context("waiting for command to exit")?;

        Ok(ProcessOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: stdout_buf,
            stderr: stderr_buf,
        })
    }

    async fn spawn_detached(&self, argv: &[String], cwd: Option<&Path>) -> Result<ManagedProcess> {
        let child = build_command(argv, cwd)?
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start `{}`", argv.join(" ")))?;
        Ok(ManagedProcess::new(child))
    }
}
