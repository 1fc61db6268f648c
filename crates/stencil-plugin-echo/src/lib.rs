//! Reference plugin speaking the Stencil envelope protocol.
//!
//! The plugin reads its whole standard input, runs the function named by its
//! first argument, and writes the answer to standard output. Every function
//! except `echo` expects and produces `{"data": value}`.
//!
//! | Function   | Behaviour                                             |
//! |------------|-------------------------------------------------------|
//! | `echo`     | copies stdin to stdout verbatim                       |
//! | `identity` | decodes the envelope and re-encodes its `data`        |
//! | `upper`    | uppercases text, recursing into sequences             |
//! | `split`    | splits text on commas into a sequence of trimmed text |


use std::io::{Read, Write};

use serde_json::Value;
use stencil_plugins::{PluginError, envelope};
use thiserror::Error;

/// Errors raised while dispatching a plugin function.
#[derive(Debug, Error)]
pub enum PluginDispatchError {
    /// Reading the request from stdin failed.
    #[error("failed to read plugin request: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The request was not a valid envelope.
    #[error("invalid plugin request: {source}")]
    Request {
        /// Decoding failure.
        #[source]
        source: PluginError,
    },
    /// The function name is not one this plugin provides.
    #[error("unknown function '{name}'")]
    UnknownFunction {
        /// Requested function name.
        name: String,
    },
    /// The request data had a shape the function cannot handle.
    #[error("function '{function}' cannot handle {found}")]
    UnsupportedInput {
        /// Function that rejected the input.
        function: &'static str,
        /// Description of the rejected value.
        found: &'static str,
    },
    /// Encoding the response failed.
    #[error("failed to encode plugin response: {source}")]
    Encode {
        /// Encoding failure.
        #[source]
        source: PluginError,
    },
    /// Writing the response to stdout failed.
    #[error("failed to write plugin response: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Runs `function` against the request on `stdin`, answering on `stdout`.
///
/// # Errors
///
/// Returns an error if the function is unknown, the request cannot be read
/// or decoded, or the response cannot be written.
pub fn run(
    function: &str,
    stdin: &mut impl Read,
    stdout: &mut impl Write,
) -> Result<(), PluginDispatchError> {
    let mut request = Vec::new();
    stdin
        .read_to_end(&mut request)
        .map_err(|source| PluginDispatchError::Read { source })?;

    let response = match function {
        "echo" => request,
        "identity" | "upper" | "split" => {
            let data = envelope::decode(&request)
                .and_then(envelope::into_data)
                .map_err(|source| PluginDispatchError::Request { source })?;
            let answer = transform(function, data)?;
            envelope::encode(&answer).map_err(|source| PluginDispatchError::Encode { source })?
        }
        other => {
            return Err(PluginDispatchError::UnknownFunction {
                name: other.to_owned(),
            });
        }
    };

    stdout
        .write_all(&response)
        .and_then(|()| stdout.flush())
        .map_err(|source| PluginDispatchError::Write { source })
}

fn transform(function: &str, data: Value) -> Result<Value, PluginDispatchError> {
    match function {
        "upper" => Ok(uppercase(data)),
        "split" => split(data),
        _ => Ok(data),
    }
}

fn uppercase(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(text.to_uppercase()),
        Value::Array(items) => Value::Array(items.into_iter().map(uppercase).collect()),
        other => other,
    }
}

fn split(value: Value) -> Result<Value, PluginDispatchError> {
    let text = match value {
        Value::String(text) => text,
        other => {
            return Err(PluginDispatchError::UnsupportedInput {
                function: "split",
                found: describe(&other),
            });
        }
    };
    Ok(text
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Value::from)
        .collect())
}

const fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
