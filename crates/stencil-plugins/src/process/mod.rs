//! The process-spawning seam used by the invoker.
//!
//! [`ProcessSpawner`] starts a program and hands back a [`PluginChild`]
//! exposing exactly what the invoker needs: the standard streams and a way to
//! wait for (or force) termination. [`OsProcessSpawner`] binds the seam to
//! real operating system processes; tests substitute in-process stand-ins.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

/// Exit outcome reported by a finished plugin process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    code: Option<i32>,
}

impl ExitOutcome {
    /// Builds an outcome from a raw exit code. `None` means the process was
    /// terminated without reporting one (for example by a signal).
    #[must_use]
    pub const fn new(code: Option<i32>) -> Self {
        Self { code }
    }

    /// Returns the exit code, if the process reported one.
    #[must_use]
    pub const fn code(self) -> Option<i32> {
        self.code
    }

    /// Returns `true` when the process exited with status zero.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Returns the exit code, mapping a missing code to `-1`.
    #[must_use]
    pub const fn status(self) -> i32 {
        match self.code {
            Some(code) => code,
            None => -1,
        }
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        Self::new(status.code())
    }
}

/// A started plugin process.
///
/// Each stream can be taken at most once; later calls return `None`.
pub trait PluginChild: Send {
    /// Takes the writable end of the process's standard input.
    fn take_stdin(&mut self) -> Option<Box<dyn Write + Send>>;

    /// Takes the readable end of the process's standard output.
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Takes the readable end of the process's standard error, when captured.
    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        None
    }

    /// Blocks until the process exits.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the exit status cannot be collected.
    fn wait(&mut self) -> io::Result<ExitOutcome>;

    /// Reports the exit outcome if the process has already finished,
    /// without blocking.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the process state cannot be queried.
    fn try_wait(&mut self) -> io::Result<Option<ExitOutcome>>;

    /// Forces the process to terminate.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the termination request fails.
    fn kill(&mut self) -> io::Result<()>;
}

/// Starts plugin processes.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use stencil_plugins::process::{OsProcessSpawner, ProcessSpawner};
///
/// let mut child = OsProcessSpawner
///     .spawn(Path::new("/usr/lib/stencil/nix"), &["echo".to_owned()])
///     .expect("spawn");
/// let status = child.wait().expect("wait");
/// assert!(status.success());
/// ```
pub trait ProcessSpawner: Send + Sync {
    /// Starts `program` with `args`, with standard input and output piped.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the program is missing or cannot be executed.
    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<Box<dyn PluginChild>>;
}

/// Spawns plugins as operating system processes with all streams piped.
///
/// On Unix each plugin leads a fresh process group, and killing it signals
/// the whole group so helpers it started cannot keep its pipes open.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessSpawner;

impl ProcessSpawner for OsProcessSpawner {
    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<Box<dyn PluginChild>> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let child = command.spawn()?;
        Ok(Box::new(OsChild { child }))
    }
}

/// [`PluginChild`] backed by [`std::process::Child`].
struct OsChild {
    child: Child,
}

impl PluginChild for OsChild {
    fn take_stdin(&mut self) -> Option<Box<dyn Write + Send>> {
        self.child
            .stdin
            .take()
            .map(|stdin| Box::new(stdin) as Box<dyn Write + Send>)
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as Box<dyn Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stderr
            .take()
            .map(|stderr| Box::new(stderr) as Box<dyn Read + Send>)
    }

    fn wait(&mut self) -> io::Result<ExitOutcome> {
        self.child.wait().map(ExitOutcome::from)
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitOutcome>> {
        self.child
            .try_wait()
            .map(|status| status.map(ExitOutcome::from))
    }

    fn kill(&mut self) -> io::Result<()> {
        if kill_group(&self.child) {
            return Ok(());
        }
        self.child.kill()
    }
}

/// Sends `SIGKILL` to the process group led by `child`.
#[cfg(unix)]
fn kill_group(child: &Child) -> bool {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    i32::try_from(child.id())
        .is_ok_and(|pgid| killpg(Pid::from_raw(pgid), Signal::SIGKILL).is_ok())
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) -> bool {
    false
}
