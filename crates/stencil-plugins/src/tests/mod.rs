//! Shared test doubles and crate-level behaviour tests.
//!
//! [`StubSpawner`] runs a plugin behaviour on a thread connected through real
//! OS pipes, so the invoker sees exactly the stream contract a child process
//! would present without any external executable.

use std::io::{self, Read, Write};
use std::path::Path;
use std::thread::{self, JoinHandle};

use mockall::mock;
use serde_json::Value;

use crate::envelope;
use crate::process::{ExitOutcome, PluginChild, ProcessSpawner};


/// Signature of an in-process plugin: `(plugin, function, stdin, stdout) -> exit code`.
pub(crate) type StubBehaviour = fn(&str, &str, &mut dyn Read, &mut dyn Write) -> i32;

mock! {
    pub Spawner {}

    impl ProcessSpawner for Spawner {
        fn spawn(&self, program: &Path, args: &[String]) -> io::Result<Box<dyn PluginChild>>;
    }
}

/// Spawner that runs a [`StubBehaviour`] instead of a process.
#[derive(Clone, Copy)]
pub(crate) struct StubSpawner {
    behaviour: StubBehaviour,
}

impl StubSpawner {
    pub(crate) const fn new(behaviour: StubBehaviour) -> Self {
        Self { behaviour }
    }
}

impl Default for StubSpawner {
    fn default() -> Self {
        Self::new(nix_plugin)
    }
}

impl ProcessSpawner for StubSpawner {
    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<Box<dyn PluginChild>> {
        let (mut stdin_reader, stdin_writer) = io::pipe()?;
        let (stdout_reader, mut stdout_writer) = io::pipe()?;
        let plugin = program.display().to_string();
        let function = args.first().cloned().unwrap_or_default();
        let behaviour = self.behaviour;

        let handle = thread::spawn(move || {
            behaviour(&plugin, &function, &mut stdin_reader, &mut stdout_writer)
        });

        Ok(Box::new(StubChild {
            stdin: Some(Box::new(stdin_writer)),
            stdout: Some(Box::new(stdout_reader)),
            handle: Some(handle),
            outcome: None,
        }))
    }
}

struct StubChild {
    stdin: Option<Box<dyn Write + Send>>,
    stdout: Option<Box<dyn Read + Send>>,
    handle: Option<JoinHandle<i32>>,
    outcome: Option<ExitOutcome>,
}

impl PluginChild for StubChild {
    fn take_stdin(&mut self) -> Option<Box<dyn Write + Send>> {
        self.stdin.take()
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.stdout.take()
    }

    fn wait(&mut self) -> io::Result<ExitOutcome> {
        if let Some(handle) = self.handle.take() {
            let code = handle
                .join()
                .map_err(|_| io::Error::other("stub plugin panicked"))?;
            self.outcome = Some(ExitOutcome::new(Some(code)));
        }
        self.outcome
            .ok_or_else(|| io::Error::other("stub plugin was never started"))
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitOutcome>> {
        if self.handle.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(None);
        }
        self.wait().map(Some)
    }

    fn kill(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reads a whole request, the way most plugins do before answering.
fn read_all(stdin: &mut dyn Read) -> Option<Vec<u8>> {
    let mut buffer = Vec::new();
    stdin.read_to_end(&mut buffer).ok().map(|_| buffer)
}

fn reply(stdout: &mut dyn Write, data: &Value) -> i32 {
    let Ok(bytes) = envelope::encode(data) else {
        return 1;
    };
    match stdout.write_all(&bytes).and_then(|()| stdout.write_all(b"\n")) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// The `nix` test plugin.
///
/// * `echo` copies stdin to stdout followed by a newline.
/// * `echoPlugin` appends `"<plugin> <function>"` to a text `data` value.
/// * `list` and `mixed` ignore the argument and answer with fixed sequences.
/// * `stream` copies stdin to stdout incrementally.
/// * `deaf` answers without reading its input.
/// * `garbage`, `nodata`, and `fail` misbehave in the ways their names say.
pub(crate) fn nix_plugin(
    plugin: &str,
    function: &str,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
) -> i32 {
    match function {
        "stream" => return i32::from(io::copy(stdin, stdout).is_err()),
        "deaf" => return reply(stdout, &Value::from(1)),
        _ => {}
    }

    let Some(input) = read_all(stdin) else {
        return 1;
    };

    match function {
        "echo" => {
            let written = stdout.write_all(&input).and_then(|()| stdout.write_all(b"\n"));
            i32::from(written.is_err())
        }
        "echoPlugin" => {
            let data = envelope::decode(&input).and_then(envelope::into_data);
            match data {
                Ok(Value::String(text)) => {
                    reply(stdout, &Value::from(format!("{text}{plugin} {function}")))
                }
                _ => 1,
            }
        }
        "list" => reply(stdout, &serde_json::json!(["things", "and", "stuff"])),
        "mixed" => reply(stdout, &serde_json::json!(["things", null, "stuff"])),
        "nodata" => i32::from(stdout.write_all(br#"{"result":1}"#).is_err()),
        "garbage" => i32::from(stdout.write_all(b"not json at all").is_err()),
        "fail" => {
            drop(stdout.write_all(br#"{"data":"partial"}"#));
            3
        }
        _ => 127,
    }
}
