//! File enumeration for module version computation.
//!
//! Candidate files are the intersection of VCS-tracked (approximated by
//! respecting `.gitignore`/`.ignore` and any module-declared dotignore
//! files) and `include`, minus `exclude`.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::error::HasherError;

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, HasherError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| HasherError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| HasherError::InvalidGlob {
        pattern: patterns.join(","),
        source,
    })
}

/// Enumerates files under `root` that should participate in a module's
/// version, relative to `root`, in no particular order (callers sort before
/// hashing).
///
/// `include` empty means "no sources" per the module config invariant: an
/// empty include list yields an empty file set rather than "everything".
pub fn enumerate_files(
    root: &Path,
    include: &[String],
    exclude: &[String],
    dotignore_files: &[String],
) -> Result<Vec<PathBuf>, HasherError> {
    if include.is_empty() {
        return Ok(Vec::new());
    }

    let include_set = build_glob_set(include)?;
    let exclude_set = build_glob_set(exclude)?;

    let mut walker = WalkBuilder::new(root);
    walker.git_ignore(true).git_exclude(true).hidden(false);
    for name in dotignore_files {
        walker.add_custom_ignore_filename(name);
    }

    let mut files = Vec::new();
    for entry in walker.build() {
        let entry = entry.map_err(|source| HasherError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_some_and(|ft| !ft.is_file()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        if !include_set.is_match(relative) || exclude_set.is_match(relative) {
            continue;
        }
        files.push(relative.to_path_buf());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn empty_include_yields_no_sources() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), b"export {}").unwrap();
        let found = enumerate_files(dir.path(), &[], &[], &[]).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn include_and_exclude_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), b"export {}").unwrap();
        fs::write(dir.path().join("a.test.ts"), b"test").unwrap();
        let found = enumerate_files(
            dir.path(),
            &["**/*.ts".to_string()],
            &["**/*.test.ts".to_string()],
            &[],
        )
        .unwrap();
        assert_eq!(found, vec![PathBuf::from("a.ts")]);
    }

    #[test]
    fn respects_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), b"ignored.ts\n").unwrap();
        fs::write(dir.path().join("a.ts"), b"export {}").unwrap();
        fs::write(dir.path().join("ignored.ts"), b"export {}").unwrap();
        let mut found = enumerate_files(dir.path(), &["**/*.ts".to_string()], &[], &[]).unwrap();
        found.sort();
        assert_eq!(found, vec![PathBuf::from("a.ts")]);
    }
}
