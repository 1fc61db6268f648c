//! Single-shot plugin invocation over standard I/O.
//!
//! One call spawns exactly one process with the function name as its sole
//! argument, writes the request bytes to its stdin, closes stdin, reads
//! stdout until end of stream, and waits for the process to exit. Stdin,
//! stdout, and stderr are each serviced on their own thread, so no side can
//! stall on a full pipe buffer. Every handle and buffer lives only for the
//! duration of one call.
//!
//! With a timeout configured, the deadline covers both the output and the
//! exit: a plugin that closes stdout and then hangs is killed just like one
//! that never answers.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::envelope::{self, RawResponse};
use crate::error::PluginError;
use crate::process::{ExitOutcome, PluginChild, ProcessSpawner};

/// Tracing target for plugin invocation.
const INVOKER_TARGET: &str = "stencil_plugins::invoker";

/// How often a plugin with a deadline is polled for exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Per-invoker call settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvokeOptions {
    timeout: Option<Duration>,
}

impl InvokeOptions {
    /// Options with no timeout: calls block until the plugin exits.
    #[must_use]
    pub const fn new() -> Self {
        Self { timeout: None }
    }

    /// Kills the plugin and fails the call once `timeout` has elapsed
    /// without the plugin both closing its output and exiting.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the configured timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Drives plugin calls through a [`ProcessSpawner`].
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use stencil_plugins::envelope;
/// use stencil_plugins::invoker::PluginInvoker;
/// use stencil_plugins::process::OsProcessSpawner;
///
/// let invoker = PluginInvoker::new(OsProcessSpawner);
/// let request = envelope::encode("hello,world")?;
/// let response = invoker.call(Path::new("/usr/lib/stencil/nix"), "echo", &request)?;
/// assert_eq!(response["data"], "hello,world");
/// # Ok::<(), stencil_plugins::PluginError>(())
/// ```
#[derive(Debug, Default)]
pub struct PluginInvoker<S> {
    spawner: S,
    options: InvokeOptions,
}

impl<S> PluginInvoker<S> {
    /// Creates an invoker that blocks until each plugin exits.
    #[must_use]
    pub const fn new(spawner: S) -> Self {
        Self {
            spawner,
            options: InvokeOptions::new(),
        }
    }

    /// Replaces the call options.
    #[must_use]
    pub const fn with_options(mut self, options: InvokeOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the call options.
    #[must_use]
    pub const fn options(&self) -> &InvokeOptions {
        &self.options
    }

    /// Returns the underlying spawner.
    #[must_use]
    pub const fn spawner(&self) -> &S {
        &self.spawner
    }
}

impl<S: ProcessSpawner> PluginInvoker<S> {
    /// Runs `function` of `plugin` and decodes its output as an envelope-style
    /// JSON object.
    ///
    /// # Errors
    ///
    /// Returns any error from [`call_raw`](Self::call_raw), or
    /// [`PluginError::Decode`] if the output is not a JSON object.
    pub fn call(
        &self,
        plugin: &Path,
        function: &str,
        request: &[u8],
    ) -> Result<RawResponse, PluginError> {
        let output = self.call_raw(plugin, function, request)?;
        envelope::decode_from(&plugin.display().to_string(), &output)
    }

    /// Runs `function` of `plugin` and returns everything it wrote to stdout.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Spawn`] if the process cannot be started,
    /// [`PluginError::Timeout`] if a configured timeout elapses,
    /// [`PluginError::NonZeroExit`] if the plugin reports failure,
    /// [`PluginError::Io`] if its output cannot be read, or
    /// [`PluginError::Write`] if the request could not be delivered.
    pub fn call_raw(
        &self,
        plugin: &Path,
        function: &str,
        request: &[u8],
    ) -> Result<Vec<u8>, PluginError> {
        let name = plugin.display().to_string();
        let args = [function.to_owned()];

        debug!(
            target: INVOKER_TARGET,
            plugin = %name,
            function,
            "spawning plugin process"
        );

        let mut child = self
            .spawner
            .spawn(plugin, &args)
            .map_err(|err| PluginError::spawn(&name, err))?;
        let deadline = self.options.timeout.map(|timeout| Instant::now() + timeout);

        let streams = child.take_stdin().zip(child.take_stdout());
        let Some((stdin, stdout)) = streams else {
            abandon(child.as_mut());
            return Err(PluginError::spawn(
                &name,
                io::Error::other("plugin standard streams were not captured"),
            ));
        };

        // Stream threads are detached so a timeout never waits on a pipe that
        // something outside our control still holds open.
        let writer = {
            let name = name.clone();
            let request = request.to_vec();
            thread::spawn(move || write_request(&name, stdin, &request))
        };
        if let Some(stderr) = child.take_stderr() {
            let name = name.clone();
            thread::spawn(move || drain_stderr(&name, stderr));
        }
        let (sender, receiver) = mpsc::channel();
        {
            let name = name.clone();
            thread::spawn(move || drop(sender.send(read_response(&name, stdout))));
        }

        let output = match self.await_output(&name, &receiver, child.as_mut(), deadline) {
            Err(timeout @ PluginError::Timeout { .. }) => return Err(timeout),
            other => other,
        };

        let outcome = self.await_exit(&name, child.as_mut(), deadline)?;
        debug!(
            target: INVOKER_TARGET,
            plugin = %name,
            status = outcome.status(),
            "plugin process exited"
        );
        if !outcome.success() {
            return Err(PluginError::NonZeroExit {
                name,
                status: outcome.status(),
            });
        }

        let output = output?;
        writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("request writer panicked")))
            .map_err(|err| PluginError::write(&name, err))?;
        Ok(output)
    }

    /// Waits for the stdout reader, enforcing the optional deadline.
    fn await_output(
        &self,
        name: &str,
        receiver: &Receiver<Result<Vec<u8>, PluginError>>,
        child: &mut dyn PluginChild,
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>, PluginError> {
        let disconnected = || PluginError::io(name, io::Error::other("stdout reader exited early"));

        let Some(deadline) = deadline else {
            return receiver.recv().map_err(|_| disconnected())?;
        };

        match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(self.time_out(name, child)),
            Err(RecvTimeoutError::Disconnected) => Err(disconnected()),
        }
    }

    /// Waits for the plugin to exit, polling against the optional deadline.
    fn await_exit(
        &self,
        name: &str,
        child: &mut dyn PluginChild,
        deadline: Option<Instant>,
    ) -> Result<ExitOutcome, PluginError> {
        let Some(deadline) = deadline else {
            return child.wait().map_err(|err| PluginError::io(name, err));
        };

        loop {
            if let Some(outcome) = child.try_wait().map_err(|err| PluginError::io(name, err))? {
                return Ok(outcome);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.time_out(name, child));
            }
            thread::sleep(remaining.min(EXIT_POLL_INTERVAL));
        }
    }

    /// Kills a plugin that outlived its deadline and builds the error.
    fn time_out(&self, name: &str, child: &mut dyn PluginChild) -> PluginError {
        let timeout_ms = self.options.timeout.map_or(0, millis);
        warn!(
            target: INVOKER_TARGET,
            plugin = name,
            timeout_ms,
            "plugin timed out, killing process"
        );
        abandon(child);
        PluginError::Timeout {
            name: name.to_owned(),
            timeout_ms,
        }
    }
}

/// Writes the request to the plugin's stdin and closes it.
fn write_request(name: &str, mut stdin: Box<dyn Write + Send>, request: &[u8]) -> io::Result<()> {
    debug!(
        target: INVOKER_TARGET,
        plugin = name,
        request_bytes = request.len(),
        "writing request to plugin stdin"
    );
    stdin.write_all(request)?;
    // Stdin is dropped on return, closing the pipe to signal end of input.
    stdin.flush()
}

/// Reads the plugin's stdout until end of stream.
fn read_response(name: &str, mut stdout: Box<dyn Read + Send>) -> Result<Vec<u8>, PluginError> {
    let start = Instant::now();
    let mut output = Vec::new();
    stdout
        .read_to_end(&mut output)
        .map_err(|err| PluginError::io(name, err))?;
    debug!(
        target: INVOKER_TARGET,
        plugin = name,
        bytes_read = output.len(),
        elapsed_ms = millis(start.elapsed()),
        "read response from plugin stdout"
    );
    Ok(output)
}

/// Forwards plugin stderr to the log so the child never blocks on it.
fn drain_stderr(name: &str, stderr: Box<dyn Read + Send>) {
    for line in BufReader::new(stderr).lines() {
        match line {
            Ok(line) if !line.trim().is_empty() => debug!(
                target: INVOKER_TARGET,
                plugin = name,
                stderr = %line.trim_end(),
                "plugin stderr output"
            ),
            Ok(_) => {}
            Err(_) => break,
        }
    }
}

/// Kills and reaps a child whose call cannot continue.
fn abandon(child: &mut dyn PluginChild) {
    drop(child.kill());
    drop(child.wait());
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
