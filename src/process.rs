// Process supervisor
//
// One supervised child-process invocation: spawn, line-buffered stream
// decoding with per-line callbacks, deadline with graceful-then-forced
// termination, and exactly one structured resolution. Spawn failures
// resolve to a `SpawnError` status instead of an Err so callers can drive
// fallback logic uniformly.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// Grace period between the termination signal and the forced kill.
const DEFAULT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RunSpec {
    pub command: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub grace: Duration,
}

impl RunSpec {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
            grace: DEFAULT_GRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Exited(i32),
    TimedOut,
    SpawnError(String),
}

/// One supervised invocation, owned by the supervisor until it resolves.
#[derive(Debug)]
pub struct ProcessRun {
    pub command: String,
    pub args: Vec<String>,
    pub started_at: Instant,
    pub stdout: String,
    pub stderr: String,
    pub status: RunStatus,
}

impl ProcessRun {
    fn pending(spec: &RunSpec) -> Self {
        Self {
            command: spec.command.clone(),
            args: spec.args.clone(),
            started_at: Instant::now(),
            stdout: String::new(),
            stderr: String::new(),
            status: RunStatus::Running,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.status, RunStatus::Exited(0))
    }
}

pub type LineHandler<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Seam between the orchestrator and real child processes. Tests drive the
/// orchestrator with a scripted implementation.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(
        &self,
        spec: RunSpec,
        on_stdout: LineHandler<'_>,
        on_stderr: LineHandler<'_>,
    ) -> ProcessRun;
}

pub struct ProcessSupervisor;

#[async_trait]
impl ToolRunner for ProcessSupervisor {
    async fn run(
        &self,
        spec: RunSpec,
        on_stdout: LineHandler<'_>,
        on_stderr: LineHandler<'_>,
    ) -> ProcessRun {
        let mut run = ProcessRun::pending(&spec);

        let mut child = match Command::new(&spec.command)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::warn!("[Supervisor] failed to start {}: {}", spec.command, e);
                run.status = RunStatus::SpawnError(e.to_string());
                return run;
            }
        };

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                run.status = RunStatus::SpawnError("failed to capture output pipes".to_string());
                let _ = child.kill().await;
                return run;
            }
        };

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut stdout_done = false;
        let mut stderr_done = false;

        let deadline = tokio::time::sleep(spec.timeout);
        tokio::pin!(deadline);

        while !(stdout_done && stderr_done) {
            tokio::select! {
                line = out_lines.next_line(), if !stdout_done => match line {
                    Ok(Some(line)) => {
                        on_stdout(&line);
                        run.stdout.push_str(&line);
                        run.stdout.push('\n');
                    }
                    _ => stdout_done = true,
                },
                line = err_lines.next_line(), if !stderr_done => match line {
                    Ok(Some(line)) => {
                        on_stderr(&line);
                        run.stderr.push_str(&line);
                        run.stderr.push('\n');
                    }
                    _ => stderr_done = true,
                },
                _ = &mut deadline => {
                    log::warn!(
                        "[Supervisor] {} exceeded {}s deadline, terminating",
                        spec.command,
                        spec.timeout.as_secs()
                    );
                    terminate(&mut child, spec.grace).await;
                    run.status = RunStatus::TimedOut;
                    return run;
                }
            }
        }

        // Both pipes closed; collect the exit within whatever deadline is left.
        let remaining = spec.timeout.saturating_sub(run.started_at.elapsed());
        run.status = match timeout(remaining, child.wait()).await {
            Ok(Ok(status)) => RunStatus::Exited(status.code().unwrap_or(-1)),
            Ok(Err(e)) => RunStatus::SpawnError(format!("wait failed: {}", e)),
            Err(_) => {
                terminate(&mut child, spec.grace).await;
                RunStatus::TimedOut
            }
        };
        run
    }
}

/// Two-stage termination: a graceful signal first, a forced kill once the
/// grace period expires. Processes that ignore the first signal must not
/// survive as orphans.
async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }
        if timeout(grace, child.wait()).await.is_ok() {
            return;
        }
    }
    #[cfg(windows)]
    if let Some(pid) = child.id() {
        let _ = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string()])
            .output();
        if timeout(grace, child.wait()).await.is_ok() {
            return;
        }
    }
    let _ = child.kill().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(command: &str, args: &[&str], timeout_ms: u64) -> RunSpec {
        let mut spec = RunSpec::new(
            command,
            args.iter().map(|s| s.to_string()).collect(),
            Duration::from_millis(timeout_ms),
        );
        spec.grace = Duration::from_millis(200);
        spec
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streams_lines_and_exits_zero() {
        let mut seen = Vec::new();
        let mut noop = |_: &str| {};
        let run = ProcessSupervisor
            .run(
                spec("sh", &["-c", "printf 'one\\ntwo\\n'"], 5_000),
                &mut |line: &str| seen.push(line.to_string()),
                &mut noop,
            )
            .await;
        assert_eq!(run.status, RunStatus::Exited(0));
        assert!(run.success());
        assert_eq!(seen, vec!["one", "two"]);
        assert_eq!(run.stdout, "one\ntwo\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_captured() {
        let mut noop_out = |_: &str| {};
        let mut noop_err = |_: &str| {};
        let run = ProcessSupervisor
            .run(
                spec("sh", &["-c", "echo oops >&2; exit 3"], 5_000),
                &mut noop_out,
                &mut noop_err,
            )
            .await;
        assert_eq!(run.status, RunStatus::Exited(3));
        assert!(run.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn test_spawn_error_resolves_instead_of_panicking() {
        let mut noop_out = |_: &str| {};
        let mut noop_err = |_: &str| {};
        let run = ProcessSupervisor
            .run(
                spec("definitely-not-a-real-binary-xyz", &[], 1_000),
                &mut noop_out,
                &mut noop_err,
            )
            .await;
        assert!(matches!(run.status, RunStatus::SpawnError(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_escalation_kills_within_bound() {
        let mut noop_out = |_: &str| {};
        let mut noop_err = |_: &str| {};
        let started = Instant::now();
        let run = ProcessSupervisor
            .run(spec("sleep", &["30"], 200), &mut noop_out, &mut noop_err)
            .await;
        assert_eq!(run.status, RunStatus::TimedOut);
        // deadline 200ms + grace 200ms + slack; nowhere near the 30s sleep
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
