//! Scans a project root for `garden.yml` / `garden.yaml` files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::error::ModuleError;

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ModuleError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ModuleError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ModuleError::InvalidGlob {
        pattern: patterns.join(","),
        source,
    })
}

/// Recursively scans `root` for `garden.yml`/`garden.yaml` files, honoring
/// VCS ignore files, `dotignore_files`, and the project's `modules.include` /
/// `modules.exclude` globs (an empty `include` matches everything at this
/// stage, unlike a module's own `include`).
///
/// Returns the matching config file paths, sorted. Fails with
/// [`ModuleError::DuplicateExtension`] if a single directory has both a
/// `garden.yml` and a `garden.yaml`.
pub fn discover_config_files(
    root: &Path,
    modules_include: &[String],
    modules_exclude: &[String],
    dotignore_files: &[String],
) -> Result<Vec<PathBuf>, ModuleError> {
    let include_set = if modules_include.is_empty() { None } else { Some(build_glob_set(modules_include)?) };
    let exclude_set = build_glob_set(modules_exclude)?;

    let mut walker = WalkBuilder::new(root);
    walker.git_ignore(true).git_exclude(true).hidden(false);
    for name in dotignore_files {
        walker.add_custom_ignore_filename(name);
    }

    let mut found = Vec::new();
    for entry in walker.build() {
        let entry = entry.map_err(|source| ModuleError::Walk {
            path: root.display().to_string(),
            source,
        })?;
        if entry.file_type().is_some_and(|ft| !ft.is_file()) {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if file_name != "garden.yml" && file_name != "garden.yaml" {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if let Some(include_set) = &include_set
            && !include_set.is_match(relative)
        {
            continue;
        }
        if exclude_set.is_match(relative) {
            continue;
        }
        found.push(entry.path().to_path_buf());
    }

    check_no_duplicate_extensions(&found)?;
    found.sort();
    Ok(found)
}

fn check_no_duplicate_extensions(paths: &[PathBuf]) -> Result<(), ModuleError> {
    let mut yml_dirs = BTreeSet::new();
    let mut yaml_dirs = BTreeSet::new();
    for path in paths {
        let Some(dir) = path.parent() else { continue };
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml") => {
                yml_dirs.insert(dir.to_path_buf());
            }
            Some("yaml") => {
                yaml_dirs.insert(dir.to_path_buf());
            }
            _ => {}
        }
    }
    if let Some(both) = yml_dirs.intersection(&yaml_dirs).next() {
        return Err(ModuleError::DuplicateExtension {
            directory: both.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_both_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("garden.yml"), b"kind: Project\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/garden.yaml"), b"kind: Module\n").unwrap();

        let found = discover_config_files(dir.path(), &[], &[], &[]).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn rejects_both_extensions_in_same_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("garden.yml"), b"kind: Project\n").unwrap();
        fs::write(dir.path().join("garden.yaml"), b"kind: Module\n").unwrap();

        let err = discover_config_files(dir.path(), &[], &[], &[]).unwrap_err();
        assert!(matches!(err, ModuleError::DuplicateExtension { .. }));
    }

    #[test]
    fn respects_modules_exclude() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("garden.yml"), b"kind: Project\n").unwrap();
        fs::create_dir(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/garden.yml"), b"kind: Module\n").unwrap();

        let found = discover_config_files(dir.path(), &[], &["vendor/**".to_string()], &[]).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn respects_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), b"ignored/\n").unwrap();
        fs::write(dir.path().join("garden.yml"), b"kind: Project\n").unwrap();
        fs::create_dir(dir.path().join("ignored")).unwrap();
        fs::write(dir.path().join("ignored/garden.yml"), b"kind: Module\n").unwrap();

        let found = discover_config_files(dir.path(), &[], &[], &[]).unwrap();
        assert_eq!(found.len(), 1);
    }
}
