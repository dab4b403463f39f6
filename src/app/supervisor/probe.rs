//! Synchronous probe commands
//!
//! Probes (remote listings, status checks) run one subprocess to completion
//! and capture its output. A probe that outlives the hang ceiling is killed
//! and reported as [`SubprocessError::Timeout`].

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, error};

use crate::constants::stream::PROBE_TIMEOUT;
use crate::errors::{SubprocessError, SubprocessResult};

/// Captured result of a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutput {
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ProbeOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout as lossy UTF-8 lines
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.stdout)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Runs single foreground subprocesses with a hang ceiling
#[derive(Debug, Clone)]
pub struct ProbeRunner {
    timeout: Duration,
    env: Vec<(String, String)>,
}

impl Default for ProbeRunner {
    fn default() -> Self {
        Self::new(PROBE_TIMEOUT)
    }
}

impl ProbeRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            env: Vec::new(),
        }
    }

    /// Add an environment variable to every probe
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program` and capture its output regardless of exit status
    pub async fn run<S: AsRef<str>>(
        &self,
        program: &str,
        args: &[S],
    ) -> SubprocessResult<ProbeOutput> {
        let mut command = Command::new(program);
        command
            .args(args.iter().map(AsRef::as_ref))
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(
            "[foreground]$ {} {}",
            program,
            args.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ")
        );

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|source| SubprocessError::Spawn {
                program: program.to_string(),
                source,
            })?,
            Err(_) => {
                error!("Process {} still running after {:?}, killed", program, self.timeout);
                return Err(SubprocessError::Timeout {
                    program: program.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let probe = ProbeOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !probe.success() {
            error!("{} exited with status {:?}", program, probe.code);
            if !probe.stderr.is_empty() {
                error!("STDERR = \n{}", probe.stderr);
            }
        }
        Ok(probe)
    }

    /// Run `program`, failing on a nonzero exit
    pub async fn run_checked<S: AsRef<str>>(
        &self,
        program: &str,
        args: &[S],
    ) -> SubprocessResult<ProbeOutput> {
        let output = self.run(program, args).await?;
        if !output.success() {
            return Err(SubprocessError::NonZeroExit {
                program: program.to_string(),
                code: output.code,
            });
        }
        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_output() {
        let output = ProbeRunner::default()
            .run("sh", &["-c", "echo one; echo two; echo oops >&2"])
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.lines(), vec!["one", "two"]);
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_nonzero_exit() {
        let runner = ProbeRunner::default();
        let output = runner.run("sh", &["-c", "exit 3"]).await.unwrap();
        assert_eq!(output.code, Some(3));
        assert!(matches!(
            runner.run_checked("sh", &["-c", "exit 3"]).await,
            Err(SubprocessError::NonZeroExit { code: Some(3), .. })
        ));
    }

    #[tokio::test]
    async fn test_hang_ceiling_kills() {
        let runner = ProbeRunner::new(Duration::from_millis(200));
        let result = runner.run("sh", &["-c", "sleep 30"]).await;
        assert!(matches!(result, Err(SubprocessError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_env_is_passed() {
        let runner = ProbeRunner::default().with_env("RSYNC_PASSWORD", "s3cret");
        let output = runner
            .run("sh", &["-c", "printf %s \"$RSYNC_PASSWORD\""])
            .await
            .unwrap();
        assert_eq!(output.stdout, b"s3cret");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let result = ProbeRunner::default()
            .run::<&str>("/nonexistent/sas-sync-probe", &[])
            .await;
        assert!(matches!(result, Err(SubprocessError::Spawn { .. })));
    }
}
