//! External process bridge.
//!
//! [`Sequence::pipe`] streams a sequence into a child process's stdin on a
//! background writer thread while the calling thread lazily reads the child's
//! stdout as a new sequence. The OS pipe provides backpressure in both
//! directions: a full pipe blocks the writer, an empty one blocks the reader.
//!
//! # Lifecycle
//!
//! - stdout reaches EOF: the child is reaped and a non-zero exit is logged.
//! - the returned sequence is closed or dropped early: the child is killed and
//!   reaped. The writer thread then fails its next write with a broken pipe
//!   and stops.
//!
//! On Unix each child runs in its own process group and the whole group is
//! killed, so every stage of a shell pipeline such as `"grep x | sort"` goes
//! with it. The group is also detached from the terminal's job control: a
//! Ctrl-C reaches the calling process, which then tears the group down.

use crate::error::{Result, SeqError};
use crate::handle::{Release, ResourceHandle};
use crate::io::buffers::PIPE_BUFFER;
use crate::io::lines::LineSource;
use crate::io::sink::write_to;
use crate::sequence::{Sequence, Source};
use crate::text::ToLine;
use std::io::{self, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

/// Shell used to run command strings.
pub const SHELL: &str = "sh";

/// Observer for a bridged child process.
///
/// The exit status is recorded when the child is reaped, which happens when
/// its output is drained or when the output sequence is closed or dropped.
#[derive(Debug, Clone)]
pub struct ProcessMonitor {
    pid: u32,
    command: String,
    status: Arc<OnceLock<ExitStatus>>,
}

impl ProcessMonitor {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Exit status, once the child has been reaped.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status.get().copied()
    }

    pub fn is_terminated(&self) -> bool {
        self.status.get().is_some()
    }
}

/// A spawned child plus the thread feeding its stdin.
struct ChildProcess {
    child: Child,
    command: String,
    status: Arc<OnceLock<ExitStatus>>,
    writer: Option<JoinHandle<()>>,
}

impl ChildProcess {
    fn reap(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait()?;
        let _ = self.status.set(status);
        Ok(status)
    }

    fn join_writer(&mut self) {
        if let Some(writer) = self.writer.take() {
            // An unfinished writer is detached; it stops at its next write.
            if writer.is_finished() && writer.join().is_err() {
                tracing::warn!(command = %self.command, "pipe writer panicked");
            }
        }
    }

    /// SIGKILL the child's process group.
    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        let group = libc::pid_t::try_from(self.child.id()).map_err(io::Error::other)?;
        // SAFETY: kill(2) only takes integers; the group was created at spawn.
        if unsafe { libc::kill(-group, libc::SIGKILL) } == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        Err(err)
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        match self.child.kill() {
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }
}

impl Release for ChildProcess {
    fn release(mut self) -> io::Result<()> {
        if self.child.try_wait()?.is_none() {
            tracing::debug!(
                command = %self.command,
                pid = self.child.id(),
                "terminating child process"
            );
            self.terminate()?;
        }
        self.reap()?;
        self.join_writer();
        Ok(())
    }
}

/// Lines from a child's stdout; owns the child.
struct ProcessSource {
    lines: LineSource<BufReader<ChildStdout>>,
    child: ResourceHandle<ChildProcess>,
}

impl ProcessSource {
    /// stdout is exhausted: reap the child normally unless reading failed.
    fn finish(&mut self) {
        if !self.lines.failed() {
            if let Some(process) = self.child.get_mut() {
                match process.reap() {
                    Ok(status) if !status.success() => {
                        tracing::warn!(
                            command = %process.command,
                            %status,
                            "child process exited unsuccessfully"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(
                            command = %process.command,
                            error = %e,
                            "failed to wait for child process"
                        );
                    }
                }
            }
        }
        self.child.close_logged();
    }
}

impl Source<String> for ProcessSource {
    fn pull(&mut self) -> Option<String> {
        match self.lines.pull() {
            Some(line) => Some(line),
            None => {
                self.finish();
                None
            }
        }
    }

    fn close(&mut self) {
        self.lines.close();
        self.child.close_logged();
    }
}

/// Build a `sh -c <command>` invocation. Empty commands are rejected.
pub fn shell_command(command: &str) -> Result<Command> {
    if command.trim().is_empty() {
        return Err(SeqError::InvalidArgument(
            "command must not be empty".to_string(),
        ));
    }
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c").arg(command);
    Ok(cmd)
}

fn describe(command: &Command) -> String {
    let mut text = command.get_program().to_string_lossy().into_owned();
    for arg in command.get_args() {
        text.push(' ');
        text.push_str(&arg.to_string_lossy());
    }
    text
}

/// Spawn `command` with piped stdout, returning the owned child handle and
/// the output sequence pieces.
fn launch(
    mut command: Command,
    stdin: Stdio,
) -> Result<(ResourceHandle<ChildProcess>, ChildStdout, Option<ChildStdin>, ProcessMonitor)> {
    let label = describe(&command);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let mut child = command
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| SeqError::Spawn {
            command: label.clone(),
            source,
        })?;

    let stdout = child.stdout.take();
    let input = child.stdin.take();
    let status = Arc::new(OnceLock::new());
    let monitor = ProcessMonitor {
        pid: child.id(),
        command: label.clone(),
        status: Arc::clone(&status),
    };
    let handle = ResourceHandle::new(
        ChildProcess {
            child,
            command: label.clone(),
            status,
            writer: None,
        },
        label,
    );

    // Dropping `handle` on this error path kills the child.
    let stdout = stdout.ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    Ok((handle, stdout, input, monitor))
}

fn output_sequence(
    handle: ResourceHandle<ChildProcess>,
    stdout: ChildStdout,
) -> Sequence<String> {
    let label = format!("{} (stdout)", handle.label());
    let lines = LineSource::new(ResourceHandle::new(BufReader::new(stdout), label));
    Sequence::from_source(ProcessSource {
        lines,
        child: handle,
    })
}

/// Write every element of `input` to the child's stdin, then close it.
fn feed<T>(mut input: Sequence<T>, stdin: ChildStdin, command: String)
where
    T: ToLine + Send + 'static,
{
    let mut out = BufWriter::with_capacity(PIPE_BUFFER, stdin);
    let result = write_to(&mut input, &mut out).and_then(|n| {
        out.flush()?;
        Ok(n)
    });
    match result {
        Ok(lines) => tracing::debug!(%command, lines, "finished feeding child process"),
        Err(SeqError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!(%command, "child process closed its input");
        }
        Err(e) => tracing::warn!(%command, error = %e, "failed to feed child process"),
    }
    input.close();
    // `out` drops here, closing the child's stdin.
}

/// Lines printed by a prepared command that reads no input.
pub fn spawn_lines(command: Command) -> Result<(Sequence<String>, ProcessMonitor)> {
    let (handle, stdout, _, monitor) = launch(command, Stdio::null())?;
    Ok((output_sequence(handle, stdout), monitor))
}

/// Lines printed by a shell command that reads no input.
///
/// # Example
///
/// ```rust,no_run
/// use pullseq::process::command_lines;
///
/// let files = command_lines("ls /tmp").unwrap().to_list();
/// ```
pub fn command_lines(command: &str) -> Result<Sequence<String>> {
    spawn_lines(shell_command(command)?).map(|(lines, _)| lines)
}

impl<T: ToLine + Send + 'static> Sequence<T> {
    /// Stream this sequence through a shell command and return its output.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use pullseq::Sequence;
    ///
    /// let sorted = Sequence::from_vec(vec!["b", "a"]).pipe("sort").unwrap().to_list();
    /// assert_eq!(sorted, vec!["a", "b"]);
    /// ```
    pub fn pipe(self, command: &str) -> Result<Sequence<String>> {
        self.pipe_monitored(command).map(|(lines, _)| lines)
    }

    /// Like [`Sequence::pipe`], also returning a monitor for the child.
    pub fn pipe_monitored(self, command: &str) -> Result<(Sequence<String>, ProcessMonitor)> {
        let command = shell_command(command)?;
        self.pipe_command(command)
    }

    /// Stream this sequence through a prepared command.
    pub fn pipe_command(self, command: Command) -> Result<(Sequence<String>, ProcessMonitor)> {
        let (mut handle, stdout, stdin, monitor) = launch(command, Stdio::piped())?;
        let stdin = stdin.ok_or_else(|| io::Error::other("child stdin was not captured"))?;

        let command_label = handle.label().to_string();
        let writer = thread::Builder::new()
            .name("pullseq-pipe-writer".to_string())
            .spawn(move || feed(self, stdin, command_label))?;
        if let Some(process) = handle.get_mut() {
            process.writer = Some(writer);
        }

        Ok((output_sequence(handle, stdout), monitor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_rejected_before_spawn() {
        let err = Sequence::from_vec(vec![1, 2]).pipe("   ").unwrap_err();
        assert!(matches!(err, SeqError::InvalidArgument(_)));
    }

    #[test]
    fn test_spawn_failure() {
        let err = Sequence::from_vec(vec!["x"])
            .pipe_command(Command::new("/nonexistent/pullseq-test-binary"))
            .unwrap_err();
        assert!(matches!(err, SeqError::Spawn { .. }));
    }

    #[test]
    fn test_pipe_cat_preserves_order() {
        let out = Sequence::from_iter(0..100u32).pipe("cat").unwrap().to_list();
        let expected: Vec<String> = (0..100).map(|n| n.to_string()).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_command_lines() {
        let lines = command_lines("printf 'a\\nb\\n'").unwrap().to_list();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_monitor_records_exit() {
        let (seq, monitor) = Sequence::from_vec(vec!["x"]).pipe_monitored("cat").unwrap();
        assert!(!monitor.command().is_empty());
        assert_eq!(seq.to_list(), vec!["x"]);
        assert!(monitor.is_terminated());
        assert!(monitor.exit_status().unwrap().success());
    }

    #[test]
    fn test_failed_command_ends_sequence() {
        let (seq, monitor) = Sequence::from_vec(vec!["x"])
            .pipe_monitored("cat >/dev/null; exit 3")
            .unwrap();
        assert!(seq.to_list().is_empty());
        assert_eq!(monitor.exit_status().unwrap().code(), Some(3));
    }

    #[test]
    fn test_early_drop_kills_child() {
        let (mut seq, monitor) = Sequence::iterate(0u64, |n| n + 1)
            .pipe_monitored("cat")
            .unwrap();
        assert_eq!(seq.next().as_deref(), Some("0"));
        assert!(!monitor.is_terminated());
        drop(seq);
        assert!(monitor.is_terminated());
        assert!(!monitor.exit_status().unwrap().success());
    }

    /// Alive and not a zombie.
    #[cfg(target_os = "linux")]
    fn is_running(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .is_some_and(|state| !state.trim_start().starts_with('Z')),
            Err(_) => false,
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_early_drop_kills_every_pipeline_stage() {
        use std::time::{Duration, Instant};

        let (mut seq, monitor) = Sequence::<String>::empty()
            .pipe_monitored("sh -c 'echo $$; exec sleep 30' | cat")
            .unwrap();
        let stage = seq.next().unwrap();
        assert!(is_running(&stage));

        drop(seq);
        assert!(monitor.is_terminated());

        let deadline = Instant::now() + Duration::from_secs(5);
        while is_running(&stage) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!is_running(&stage), "pipeline stage {} outlived the bridge", stage);
    }
}
