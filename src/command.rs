//! Shell command processes - run a command line and stream its output
//!
//! Child stdout/stderr are read in chunks and copied into the process's
//! sinks, which take care of line buffering. On unix each command runs in
//! its own process group; when the run's cancellation token fires the group
//! gets SIGTERM, then SIGKILL for whatever outlives [`STOP_GRACE`]. A
//! dropped task only kills the shell itself.

use crate::core::{OutputSink, ProcessContext, ProcessDescriptor};
use crate::error::MuxError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

const READ_CHUNK: usize = 8 * 1024;

/// Time a cancelled command gets to exit after SIGTERM
pub const STOP_GRACE: Duration = Duration::from_secs(3);

/// A labelled shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub label: String,
    pub command: String,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    /// Parse a `LABEL=COMMAND` argument
    pub fn parse_arg(arg: &str) -> Result<Self, MuxError> {
        let Some((label, command)) = arg.split_once('=') else {
            return Err(MuxError::ProcessArg(arg.to_string()));
        };

        let label = label.trim();
        if label.is_empty() || command.trim().is_empty() {
            return Err(MuxError::ProcessArg(arg.to_string()));
        }
        Ok(Self::new(label, command.trim()))
    }

    pub fn into_descriptor(self) -> ProcessDescriptor {
        let label = self.label.clone();
        ProcessDescriptor::new(label, move |ctx| run_command(self, ctx))
    }
}

fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

async fn run_command(spec: CommandSpec, ctx: ProcessContext) -> Result<()> {
    let ProcessContext {
        mut stdout,
        mut stderr,
        cancel,
    } = ctx;

    if spec.command.trim().is_empty() {
        return Err(MuxError::EmptyCommand(spec.label).into());
    }

    log::debug!("Spawning {}: {}", spec.label, spec.command);
    let mut cmd = shell_command(&spec.command);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }
    cmd.envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to start '{}'", spec.command))?;

    let finished = tokio::select! {
        status = drive(&mut child, &mut stdout, &mut stderr) => Some(status),
        _ = cancel.cancelled() => None,
    };

    let Some(status) = finished else {
        log::info!("Stopping {}", spec.label);
        stop(&mut child, &spec.label).await;
        return Ok(());
    };

    let status = status.with_context(|| format!("lost track of '{}'", spec.command))?;
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => anyhow::bail!("{} exited with status {}", spec.label, code),
        None => anyhow::bail!("{} was terminated by a signal", spec.label),
    }
}

/// Stop a cancelled command along with everything it started
#[cfg(unix)]
async fn stop(child: &mut Child, label: &str) {
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;

    let Some(id) = child.id() else {
        return;
    };
    let group = Pid::from_raw(id as i32);

    signal_group(group, Signal::SIGTERM, label);
    let exited = tokio::time::timeout(STOP_GRACE, child.wait()).await.is_ok();
    if !exited {
        log::warn!("{} still running after {:?}, killing it", label, STOP_GRACE);
    }
    // background jobs may outlive the shell
    signal_group(group, Signal::SIGKILL, label);
    if !exited {
        if let Err(e) = child.wait().await {
            log::warn!("Failed to reap {}: {}", label, e);
        }
    }
}

#[cfg(unix)]
fn signal_group(group: nix::unistd::Pid, signal: nix::sys::signal::Signal, label: &str) {
    match nix::sys::signal::killpg(group, signal) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => log::warn!("Failed to send {:?} to {}: {}", signal, label, e),
    }
}

#[cfg(not(unix))]
async fn stop(child: &mut Child, label: &str) {
    if let Err(e) = child.kill().await {
        log::warn!("Failed to kill {}: {}", label, e);
    }
}

/// Copy both pipes to their sinks until EOF, then reap the child
async fn drive(
    child: &mut Child,
    stdout: &mut OutputSink,
    stderr: &mut OutputSink,
) -> std::io::Result<ExitStatus> {
    let out = child.stdout.take();
    let err = child.stderr.take();
    let (out, err) = tokio::join!(pump(out, stdout), pump(err, stderr));
    out?;
    err?;
    child.wait().await
}

async fn pump<R>(reader: Option<R>, sink: &mut OutputSink) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(());
    };

    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        sink.write_bytes(&buf[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg() {
        let spec = CommandSpec::parse_arg("web=npm run dev -- --port=3000").unwrap();
        assert_eq!(spec.label, "web");
        assert_eq!(spec.command, "npm run dev -- --port=3000");
    }

    #[test]
    fn test_parse_arg_rejects_malformed() {
        for arg in ["no-separator", "=cmd", "label=", "  =  "] {
            assert!(
                matches!(CommandSpec::parse_arg(arg), Err(MuxError::ProcessArg(_))),
                "{arg:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_descriptor_keeps_label() {
        let descriptor = CommandSpec::new("tunnel", "true").into_descriptor();
        assert_eq!(descriptor.label(), "tunnel");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::core::{Outcome, Scheduler};
        use crate::surface::MemorySurface;
        use std::time::Duration;
        use tokio::time::timeout;
        use tokio_util::sync::CancellationToken;

        #[tokio::test]
        async fn test_streams_stdout_and_stderr() {
            let surface = MemorySurface::new();
            let spec = CommandSpec::new("job", "echo hello; echo oops 1>&2; printf tail");
            let handle =
                Scheduler::new(surface.clone()).run(vec![spec.into_descriptor()], CancellationToken::new());

            timeout(Duration::from_secs(10), handle.wait())
                .await
                .unwrap()
                .unwrap();

            let text = surface.text();
            assert!(text.contains("│ job │ hello\n"));
            assert!(text.contains("│ job │ oops\n"));
            assert!(text.contains("│ job │ tail\n"));
        }

        #[tokio::test]
        async fn test_env_and_cwd() {
            let dir = tempfile::tempdir().unwrap();
            let mut spec = CommandSpec::new("env", "echo $GREETING; pwd");
            spec.env.insert("GREETING".to_string(), "hi there".to_string());
            spec.cwd = Some(dir.path().to_path_buf());

            let surface = MemorySurface::new();
            let handle =
                Scheduler::new(surface.clone()).run(vec![spec.into_descriptor()], CancellationToken::new());
            timeout(Duration::from_secs(10), handle.wait())
                .await
                .unwrap()
                .unwrap();

            let rows = surface.rows();
            assert!(rows[0].ends_with("│ hi there"));
            let dir_name = dir.path().file_name().unwrap().to_str().unwrap();
            assert!(rows[1].contains(dir_name));
        }

        #[tokio::test]
        async fn test_non_zero_exit_fails() {
            let spec = CommandSpec::new("job", "echo before; exit 3");
            let handle = Scheduler::new(MemorySurface::new())
                .run(vec![spec.into_descriptor()], CancellationToken::new());

            let err = timeout(Duration::from_secs(10), handle.wait())
                .await
                .unwrap()
                .unwrap_err();
            assert_eq!(err.to_string(), "job exited with status 3");
        }

        #[tokio::test]
        async fn test_cancellation_kills_child() {
            let cancel = CancellationToken::new();
            let spec = CommandSpec::new("server", "echo up; sleep 30");
            let surface = MemorySurface::new();
            let handle = Scheduler::new(surface.clone()).run(vec![spec.into_descriptor()], cancel.clone());

            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();

            let outcome = timeout(Duration::from_secs(5), handle.settled()).await.unwrap();
            assert!(matches!(outcome, Outcome::Resolved));
            assert!(surface.text().contains("│ server │ up\n"));
        }

        /// Whether `pid` exists and is not a zombie
        #[cfg(target_os = "linux")]
        fn is_running(pid: u32) -> bool {
            std::fs::read_to_string(format!("/proc/{pid}/stat"))
                .ok()
                .and_then(|stat| {
                    let (_, rest) = stat.rsplit_once(')')?;
                    rest.trim_start().chars().next()
                })
                .is_some_and(|state| !matches!(state, 'Z' | 'X'))
        }

        #[cfg(target_os = "linux")]
        #[tokio::test]
        async fn test_cancellation_stops_background_jobs() {
            let dir = tempfile::tempdir().unwrap();
            let mut spec = CommandSpec::new("server", "sleep 300 & echo $! > pid; wait");
            spec.cwd = Some(dir.path().to_path_buf());

            let cancel = CancellationToken::new();
            let handle = Scheduler::new(MemorySurface::new())
                .run(vec![spec.into_descriptor()], cancel.clone());

            let pid_file = dir.path().join("pid");
            let pid = timeout(Duration::from_secs(5), async {
                loop {
                    let written = std::fs::read_to_string(&pid_file).unwrap_or_default();
                    if let Ok(pid) = written.trim().parse::<u32>() {
                        return pid;
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            })
            .await
            .unwrap();
            assert!(is_running(pid));

            cancel.cancel();
            let outcome = timeout(Duration::from_secs(10), handle.settled()).await.unwrap();
            assert!(matches!(outcome, Outcome::Resolved));

            let gone = timeout(Duration::from_secs(5), async {
                while is_running(pid) {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            })
            .await;
            assert!(gone.is_ok(), "background job {pid} outlived cancellation");
        }

        #[tokio::test]
        async fn test_empty_command_fails() {
            let handle = Scheduler::new(MemorySurface::new()).run(
                vec![CommandSpec::new("blank", "   ").into_descriptor()],
                CancellationToken::new(),
            );
            let err = handle.wait().await.unwrap_err();
            assert_eq!(err.to_string(), "process 'blank' has an empty command");
            assert!(err.downcast_ref::<MuxError>().is_some());
        }
    }
}
