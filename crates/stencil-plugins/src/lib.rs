//! Out-of-process plugin calls for template evaluation.
//!
//! The `stencil-plugins` crate lets a template invoke arbitrary executables
//! ("plugins") and use their answers for substitution or iteration. Every
//! call is a fresh, single-shot process: the plugin is started with the
//! function name as its only argument, receives `{"data": value}` as JSON on
//! stdin, and answers with the same envelope shape on stdout before exiting.
//!
//! # Architecture
//!
//! * [`envelope`] wraps and unwraps the `{"data": value}` container.
//! * [`locator`] resolves bare plugin names against ordered directories.
//! * [`process`] is the spawning seam; [`OsProcessSpawner`] is the real one.
//! * [`invoker`] drives one spawn/write/read/wait cycle.
//! * [`normalize`] turns uniform sequences into concretely typed ones.
//! * [`template`] exposes everything as `plugin(name, function, value)` in
//!   a `minijinja` environment.
//!
//! # Example
//!
//! ```rust,no_run
//! use minijinja::{Environment, context};
//! use stencil_plugins::{OsProcessSpawner, PluginFunction, PluginInvoker};
//!
//! let mut env = Environment::new();
//! PluginFunction::new(PluginInvoker::new(OsProcessSpawner), vec!["plugins".into()])
//!     .register(&mut env);
//! let rendered = env.render_str(
//!     r#"{% for line in plugin("nix", "echoPlugin", data) %}{{ line }}{% endfor %}"#,
//!     context! { data => "Hello,World" },
//! );
//! ```

pub mod envelope;
pub mod error;
pub mod invoker;
pub mod locator;
pub mod normalize;
pub mod process;
pub mod template;

#[cfg(test)]
mod tests;

pub use self::envelope::{Envelope, RawResponse};
pub use self::error::PluginError;
pub use self::invoker::{InvokeOptions, PluginInvoker};
pub use self::normalize::Normalized;
pub use self::process::{ExitOutcome, OsProcessSpawner, PluginChild, ProcessSpawner};
pub use self::template::PluginFunction;
