//! Resolution of bare plugin names against an ordered directory list.
//!
//! Lookup is a pure filesystem check: directories are tried in order, the
//! first one holding a regular file with the exact name wins, and nothing
//! process-wide (such as `PATH`) is consulted or modified.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace};

use crate::error::PluginError;

/// Tracing target for plugin resolution.
const LOCATOR_TARGET: &str = "stencil_plugins::locator";

/// Resolves `name` to the absolute path of the first matching file.
///
/// Earlier directories shadow later ones. Subdirectories are not searched
/// and no extension is inferred.
///
/// # Errors
///
/// Returns [`PluginError::NotFound`] when no directory contains a file
/// named `name`, or when `name` is not a single plain path component.
///
/// # Example
///
/// ```no_run
/// use stencil_plugins::locator::resolve;
///
/// let path = resolve(&["/opt/stencil/plugins", "/usr/lib/stencil"], "nix")?;
/// assert!(path.is_absolute());
/// # Ok::<(), stencil_plugins::PluginError>(())
/// ```
pub fn resolve<P: AsRef<Path>>(search_dirs: &[P], name: &str) -> Result<PathBuf, PluginError> {
    let not_found = || PluginError::NotFound {
        name: name.to_owned(),
        searched: search_dirs.len(),
    };

    if !is_bare_name(name) {
        debug!(target: LOCATOR_TARGET, plugin = name, "rejecting non-bare plugin name");
        return Err(not_found());
    }

    for dir in search_dirs {
        let candidate = dir.as_ref().join(name);
        trace!(
            target: LOCATOR_TARGET,
            plugin = name,
            candidate = %candidate.display(),
            "probing plugin candidate"
        );
        if candidate.is_file() {
            let resolved = std::path::absolute(&candidate)
                .map_err(|source| PluginError::io(name, source))?;
            debug!(
                target: LOCATOR_TARGET,
                plugin = name,
                path = %resolved.display(),
                "resolved plugin"
            );
            return Ok(resolved);
        }
    }

    Err(not_found())
}

/// Returns `true` when `name` is a single normal path component.
pub(crate) fn is_bare_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}
