use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// An external command together with its wall-clock bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Captured result of a process that exited on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// Terminating signal, if the process did not exit normally
    pub signal: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human readable description of how the process ended
    pub fn status_line(&self) -> String {
        match (self.exit_code, self.signal) {
            (Some(code), _) => format!("Process exited with code {code}"),
            (None, Some(signal)) => format!("Process terminated by signal {signal}"),
            (None, None) => "Process terminated abnormally".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Completed(ProcessOutput),
    TimedOut,
    OutputTooLarge,
    Cancelled,
}

#[derive(Debug, Error)]
enum CaptureError {
    #[error("output exceeded {0} bytes")]
    Overflow(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

enum Race {
    Finished(Vec<u8>, Vec<u8>, ExitStatus),
    TimedOut,
    Overflow,
    Cancelled,
    Failed(io::Error),
}

/// Runs one external command with an enforced timeout and bounded capture
///
/// The child is placed in its own process group. Whenever the run does not
/// finish cleanly (timeout, cancellation, oversized output, I/O failure) the
/// whole group is killed and the child reaped before returning, so nothing
/// the submission spawned outlives the call.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    output_limit: usize,
}

impl ProcessExecutor {
    pub fn new(output_limit: usize) -> Self {
        Self { output_limit }
    }

    pub fn output_limit(&self) -> usize {
        self.output_limit
    }

    pub async fn execute(
        &self,
        command: &CommandSpec,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> io::Result<Execution> {
        if cancel.is_cancelled() {
            return Ok(Execution::Cancelled);
        }

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;
        let mut group = ProcessGroup::new(child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr was not captured"))?;
        let limit = self.output_limit;

        let race = {
            let run = async {
                let capture = async {
                    tokio::try_join!(read_capped(stdout, limit), read_capped(stderr, limit))
                };
                tokio::pin!(capture);

                let status = tokio::select! {
                    captured = &mut capture => {
                        let (out, err) = captured?;
                        // Sweep stragglers while the leader is still unreaped,
                        // so the group id cannot have been recycled yet
                        group.kill();
                        let status = child.wait().await?;
                        return Ok((out, err, status));
                    }
                    status = child.wait() => status?,
                };

                // The leader exited while something in its group still holds
                // the pipes open; kill the group so the drain can finish
                group.kill();
                let (out, err) = capture.await?;
                Ok::<_, CaptureError>((out, err, status))
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Race::Cancelled,
                res = tokio::time::timeout(command.timeout, run) => match res {
                    Err(_) => Race::TimedOut,
                    Ok(Err(CaptureError::Overflow(_))) => Race::Overflow,
                    Ok(Err(CaptureError::Io(e))) => Race::Failed(e),
                    Ok(Ok((out, err, status))) => Race::Finished(out, err, status),
                },
            }
        };

        let outcome = match race {
            Race::Finished(out, err, status) => {
                group.disarm();
                return Ok(Execution::Completed(ProcessOutput {
                    stdout: String::from_utf8_lossy(&out).into_owned(),
                    stderr: String::from_utf8_lossy(&err).into_owned(),
                    exit_code: status.code(),
                    signal: exit_signal(&status),
                }));
            }
            Race::TimedOut => {
                log::warn!(
                    "`{}` exceeded {:?} and was killed",
                    command.program,
                    command.timeout
                );
                Ok(Execution::TimedOut)
            }
            Race::Overflow => {
                log::warn!(
                    "`{}` exceeded the {limit} byte output limit and was killed",
                    command.program
                );
                Ok(Execution::OutputTooLarge)
            }
            Race::Cancelled => {
                log::info!("`{}` killed on cancellation", command.program);
                Ok(Execution::Cancelled)
            }
            Race::Failed(e) => Err(e),
        };

        group.kill();
        // The leader may already be reaped if it exited before the drain failed
        if !matches!(child.try_wait(), Ok(Some(_))) {
            if let Err(e) = child.kill().await {
                log::warn!("Failed to reap `{}`: {e}", command.program);
            }
        }
        group.disarm();

        outcome
    }
}

async fn read_capped<R>(reader: R, limit: usize) -> Result<Vec<u8>, CaptureError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .await?;
    if buf.len() > limit {
        return Err(CaptureError::Overflow(limit));
    }
    Ok(buf)
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Kills the child's process group when dropped unless disarmed
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|p| i32::try_from(p).ok()),
        }
    }

    fn kill(&self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => log::warn!("Failed to kill process group {pgid}: {e}"),
            }
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Instant;

    use super::*;

    fn sh(script: &str, timeout_ms: u64) -> CommandSpec {
        CommandSpec::new("sh", Duration::from_millis(timeout_ms))
            .arg("-c")
            .arg(script)
    }

    /// A pid counts as gone once it no longer exists or is a zombie
    fn process_gone(pid: i32) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
                Err(_) => return true,
                Ok(stat) => {
                    let state = stat
                        .rsplit_once(')')
                        .and_then(|(_, rest)| rest.split_whitespace().next());
                    if state == Some("Z") {
                        return true;
                    }
                }
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        false
    }

    #[tokio::test]
    async fn test_clean_exit_captures_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = ProcessExecutor::new(1024);
        let result = executor
            .execute(
                &sh("echo hello; echo oops >&2", 5000),
                dir.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let Execution::Completed(output) = result else {
            panic!("unexpected outcome: {result:?}");
        };
        assert!(output.success());
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = ProcessExecutor::new(1024);
        let result = executor
            .execute(&sh("exit 3", 5000), dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        let Execution::Completed(output) = result else {
            panic!("unexpected outcome: {result:?}");
        };
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.status_line(), "Process exited with code 3");
    }

    #[tokio::test]
    async fn test_runs_in_work_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let executor = ProcessExecutor::new(1024);
        let result = executor
            .execute(&sh("cat marker.txt", 5000), dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        let Execution::Completed(output) = result else {
            panic!("unexpected outcome: {result:?}");
        };
        assert_eq!(output.stdout, "here");
    }

    #[tokio::test]
    async fn test_timeout_kills_process_tree() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = ProcessExecutor::new(1024);
        let start = Instant::now();
        let result = executor
            .execute(
                &sh("sleep 30 & echo $! > bg.pid; echo partial; wait", 300),
                dir.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result, Execution::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(5));

        let pid: i32 = std::fs::read_to_string(dir.path().join("bg.pid"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(process_gone(pid), "background sleep {pid} survived");
    }

    #[tokio::test]
    async fn test_stragglers_are_swept_after_clean_exit() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = ProcessExecutor::new(1024);
        let result = executor
            .execute(
                &sh("sleep 30 >/dev/null 2>&1 & echo $! > bg.pid", 5000),
                dir.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(matches!(result, Execution::Completed(ref o) if o.success()));
        let pid: i32 = std::fs::read_to_string(dir.path().join("bg.pid"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(process_gone(pid), "background sleep {pid} survived");
    }

    #[tokio::test]
    async fn test_stragglers_holding_stdout_do_not_stall_exit() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = ProcessExecutor::new(1024);
        let start = Instant::now();
        let result = executor
            .execute(
                &sh("sleep 30 & echo $! > bg.pid; echo done", 10_000),
                dir.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let Execution::Completed(output) = result else {
            panic!("unexpected outcome: {result:?}");
        };
        assert!(output.success());
        assert_eq!(output.stdout, "done\n");
        assert!(start.elapsed() < Duration::from_secs(5));

        let pid: i32 = std::fs::read_to_string(dir.path().join("bg.pid"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(process_gone(pid), "background sleep {pid} survived");
    }

    #[tokio::test]
    async fn test_oversized_output_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = ProcessExecutor::new(1000);
        let start = Instant::now();
        let result = executor
            .execute(&sh("yes", 10_000), dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, Execution::OutputTooLarge);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_output_at_limit_is_accepted() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = ProcessExecutor::new(6);
        let result = executor
            .execute(&sh("printf abcdef", 5000), dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(result, Execution::Completed(ref o) if o.stdout == "abcdef"));
    }

    #[tokio::test]
    async fn test_cancellation_kills_process() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = ProcessExecutor::new(1024);
        let token = CancellationToken::new();

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = executor
            .execute(&sh("sleep 30", 20_000), dir.path(), &token)
            .await
            .unwrap();
        assert_eq!(result, Execution::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(5));

        // Already-cancelled tokens never spawn anything
        let result = executor
            .execute(&sh("touch spawned", 5000), dir.path(), &token)
            .await
            .unwrap();
        assert_eq!(result, Execution::Cancelled);
        assert!(!dir.path().join("spawned").exists());
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = ProcessExecutor::new(1024);
        let command = CommandSpec::new("definitely-not-a-real-binary", Duration::from_secs(1));
        let result = executor
            .execute(&command, dir.path(), &CancellationToken::new())
            .await;
        assert!(result.is_err());
    }
}
