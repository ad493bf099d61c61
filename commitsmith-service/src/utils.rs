// Utility Functions
// Repository discovery for option providers that read from git

use crate::form::FieldValues;
use crate::options::OptionsContext;

use std::path::{Path, PathBuf};

/// Walk up from `start` to the nearest directory holding `.git`.
///
/// `.git` may be a directory or, for worktrees and submodules, a file.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .find(|ancestor| ancestor.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Build the context handed to option providers.
///
/// The repository path is the enclosing repository of `start`, if any.
pub fn options_context(start: &Path, token_values: FieldValues) -> OptionsContext {
    let repository_path = find_repo_root(start);
    tracing::debug!(repository = ?repository_path, "resolved options context");
    OptionsContext {
        repository_path,
        token_values,
    }
}
