//! Template-side entry point for plugin calls.
//!
//! [`PluginFunction`] composes the envelope codec, the invoker, and the
//! normaliser into one `plugin(name, function, value)` operation and
//! registers it with a `minijinja` environment. Scalar results are wrapped
//! into one-element sequences so `{% for %}` loops always have something to
//! iterate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::{Environment, ErrorKind};
use serde_json::Value;
use tracing::debug;

use crate::envelope;
use crate::error::PluginError;
use crate::invoker::PluginInvoker;
use crate::locator;
use crate::normalize::{self, Normalized};
use crate::process::ProcessSpawner;

/// Tracing target for template plugin calls.
const TEMPLATE_TARGET: &str = "stencil_plugins::template";

/// Name under which the function is registered in templates.
pub const FUNCTION_NAME: &str = "plugin";

/// The `plugin(name, function, value)` template function.
///
/// Cloning is cheap; clones share the invoker and search directories.
///
/// # Example
///
/// ```no_run
/// use minijinja::{Environment, context};
/// use stencil_plugins::invoker::PluginInvoker;
/// use stencil_plugins::process::OsProcessSpawner;
/// use stencil_plugins::template::PluginFunction;
///
/// let mut env = Environment::new();
/// PluginFunction::new(PluginInvoker::new(OsProcessSpawner), vec!["/usr/lib/stencil".into()])
///     .register(&mut env);
/// let out = env
///     .render_str(
///         r#"{% for item in plugin("nix", "split", data) %}{{ item }};{% endfor %}"#,
///         context! { data => "a,b" },
///     )
///     .unwrap();
/// assert_eq!(out, "a;b;");
/// ```
#[derive(Debug)]
pub struct PluginFunction<S> {
    invoker: Arc<PluginInvoker<S>>,
    search_dirs: Arc<[PathBuf]>,
}

impl<S> Clone for PluginFunction<S> {
    fn clone(&self) -> Self {
        Self {
            invoker: Arc::clone(&self.invoker),
            search_dirs: Arc::clone(&self.search_dirs),
        }
    }
}

impl<S> PluginFunction<S> {
    /// Creates the function over an invoker and ordered search directories.
    #[must_use]
    pub fn new(invoker: PluginInvoker<S>, search_dirs: Vec<PathBuf>) -> Self {
        Self::from_shared(Arc::new(invoker), search_dirs)
    }

    /// Creates the function over an invoker shared with other callers.
    #[must_use]
    pub fn from_shared(invoker: Arc<PluginInvoker<S>>, search_dirs: Vec<PathBuf>) -> Self {
        Self {
            invoker,
            search_dirs: search_dirs.into(),
        }
    }

    /// Returns the shared invoker.
    #[must_use]
    pub fn invoker(&self) -> &PluginInvoker<S> {
        &self.invoker
    }

    /// Returns the search directories in lookup order.
    #[must_use]
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Maps a template-supplied plugin identifier to the program to spawn.
    ///
    /// Identifiers that look like paths are used verbatim. Bare names are
    /// resolved against the search directories, or handed to the spawner
    /// unchanged when no directories are configured.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when directories are configured and
    /// none of them contains `name`.
    pub fn locate(&self, name: &str) -> Result<PathBuf, PluginError> {
        if !locator::is_bare_name(name) || self.search_dirs.is_empty() {
            return Ok(PathBuf::from(name));
        }
        locator::resolve(self.search_dirs(), name)
    }
}

impl<S: ProcessSpawner> PluginFunction<S> {
    /// Calls `function` of plugin `name` with `argument` and normalises the
    /// returned `data` value.
    ///
    /// # Errors
    ///
    /// Returns any [`PluginError`] raised while encoding, locating, invoking,
    /// or decoding; including [`PluginError::MissingData`] when the response
    /// has no `data` field.
    pub fn call(
        &self,
        name: &str,
        function: &str,
        argument: &Value,
    ) -> Result<Normalized, PluginError> {
        let request = envelope::encode(argument)?;
        let program = self.locate(name)?;
        debug!(
            target: TEMPLATE_TARGET,
            plugin = name,
            program = %program.display(),
            function,
            "calling plugin from template"
        );
        let response = self.invoker.call(&program, function, &request)?;
        let data = envelope::into_data_from(&display(&program), response)?;
        Ok(normalize::normalize(normalize::into_sequence(data)))
    }
}

impl<S: ProcessSpawner + 'static> PluginFunction<S> {
    /// Registers the function as `plugin` in `env`.
    ///
    /// Failures abort evaluation of the enclosing expression with an
    /// [`ErrorKind::InvalidOperation`] error whose source is the
    /// [`PluginError`].
    pub fn register(self, env: &mut Environment<'_>) {
        env.add_function(
            FUNCTION_NAME,
            move |name: String, function: String, argument: minijinja::Value| {
                self.call_template(&name, &function, &argument)
            },
        );
    }

    fn call_template(
        &self,
        name: &str,
        function: &str,
        argument: &minijinja::Value,
    ) -> Result<minijinja::Value, minijinja::Error> {
        let argument = serde_json::to_value(argument).map_err(|err| {
            minijinja::Error::new(ErrorKind::BadSerialization, "plugin argument is not JSON")
                .with_source(err)
        })?;
        self.call(name, function, &argument)
            .map(to_template_value)
            .map_err(|err| {
                minijinja::Error::new(ErrorKind::InvalidOperation, err.to_string())
                    .with_source(err)
            })
    }
}

/// Converts a normalised result into a template value.
#[must_use]
pub fn to_template_value(result: Normalized) -> minijinja::Value {
    match result {
        Normalized::Strings(items) => minijinja::Value::from(items),
        Normalized::Integers(items) => minijinja::Value::from(items),
        Normalized::Floats(items) => minijinja::Value::from(items),
        Normalized::Booleans(items) => minijinja::Value::from(items),
        Normalized::Untyped(items) => minijinja::Value::from_serialize(&items),
    }
}

fn display(program: &Path) -> String {
    program.display().to_string()
}

#[cfg(test)]
mod tests;
