use std::path::{Path, PathBuf};

/// Resolves an `#include` path against the including file.
///
/// Absolute paths are taken as-is. Relative paths are tried against the
/// including file's directory first, then each configured include path
/// (itself resolved against the workspace root when relative), then the
/// workspace root.
pub fn resolve_include_path(
    current_file: &Path,
    include_paths: &[String],
    workspace_root: Option<&Path>,
    include: &str,
) -> Option<PathBuf> {
    let candidate = PathBuf::from(include);
    if candidate.is_absolute() {
        return Some(candidate);
    }

    if let Some(current_dir) = current_file.parent() {
        let from_current = current_dir.join(include);
        if from_current.exists() {
            return Some(from_current);
        }
    }

    for entry in include_paths {
        let Some(base) = resolve_config_path(workspace_root, entry) else {
            continue;
        };
        let from_entry = base.join(include);
        if from_entry.exists() {
            return Some(from_entry);
        }
    }

    if let Some(root) = workspace_root {
        let from_root = root.join(include);
        if from_root.exists() {
            return Some(from_root);
        }
    }

    None
}

fn resolve_config_path(workspace_root: Option<&Path>, value: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(value);
    if candidate.is_absolute() {
        return Some(candidate);
    }
    workspace_root.map(|root| root.join(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_includes_resolve_as_is() {
        let resolved = resolve_include_path(
            Path::new("/scripts/town.ssl"),
            &[],
            None,
            "/scripts/headers/define.h",
        );
        assert_eq!(resolved, Some(PathBuf::from("/scripts/headers/define.h")));
    }

    #[test]
    fn missing_relative_include_is_none() {
        let resolved = resolve_include_path(
            Path::new("/nonexistent/town.ssl"),
            &["also/nonexistent".to_string()],
            Some(Path::new("/nonexistent")),
            "headers/define.h",
        );
        assert_eq!(resolved, None);
    }
}
