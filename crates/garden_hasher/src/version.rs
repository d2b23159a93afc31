//! Deterministic content-addressed module versions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::HasherError;
use crate::files::enumerate_files;

/// A module's (or test's, or task's) computed version.
///
/// Round-trips exactly through JSON: the build-metadata file on disk is
/// this struct serialized with sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleVersion {
    /// The short, stable, human-recognizable version string, e.g. `v-a1b2c3d4e5`.
    pub version_string: String,
    /// Resolved versions of each build dependency, by name.
    pub dependency_versions: BTreeMap<String, String>,
    /// Relative paths of every file that participated in the hash, sorted.
    pub files: Vec<String>,
}

/// Computes a module's version.
///
/// `dependency_versions` must already be resolved (recursively, by the
/// caller) for every build dependency. The hasher itself is pure: given the
/// same `(root, include, exclude, dotignore_files, dependency_versions)` and
/// an unchanged file set, it always returns the same [`ModuleVersion`].
pub fn compute_version(
    root: &Path,
    include: &[String],
    exclude: &[String],
    dotignore_files: &[String],
    dependency_versions: BTreeMap<String, String>,
) -> Result<ModuleVersion, HasherError> {
    let mut files = enumerate_files(root, include, exclude, dotignore_files)?;
    files.sort();

    let mut file_hashes = Vec::with_capacity(files.len());
    for relative in &files {
        let bytes = std::fs::read(root.join(relative)).map_err(|source| HasherError::ReadFile {
            path: root.join(relative),
            source,
        })?;
        file_hashes.push((path_string(relative), hash_bytes(&bytes)));
    }

    let version_string = fold_digest(&file_hashes, &dependency_versions);

    Ok(ModuleVersion {
        version_string,
        dependency_versions,
        files: file_hashes.into_iter().map(|(path, _)| path).collect(),
    })
}

/// Extends a module version with the versions of a test's or task's own
/// declared dependencies, which are not part of the module's build
/// dependencies and so were not folded into `module_version`.
#[must_use]
pub fn extend_version(module_version: &ModuleVersion, extra_dependency_versions: &BTreeMap<String, String>) -> String {
    let anchor = vec![("module".to_string(), module_version.version_string.clone())];
    fold_digest(&anchor, extra_dependency_versions)
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn fold_digest(file_hashes: &[(String, String)], dependency_versions: &BTreeMap<String, String>) -> String {
    let mut sorted_files = file_hashes.to_vec();
    sorted_files.sort_by(|a, b| a.0.cmp(&b.0));
    let file_section = sorted_files
        .iter()
        .map(|(path, hash)| format!("{path}:{hash}"))
        .collect::<Vec<_>>()
        .join("\n");

    let dep_section = dependency_versions
        .iter()
        .map(|(name, version)| format!("{name}:{version}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut hasher = Sha256::new();
    hasher.update(file_section.as_bytes());
    hasher.update([0u8]);
    hasher.update(dep_section.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("v-{}", &digest[..10])
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn version_determinism() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), b"content-a").unwrap();
        fs::write(dir.path().join("b.ts"), b"content-b").unwrap();

        let deps = BTreeMap::from([("dep-a".to_string(), "v-1111111111".to_string())]);
        let first = compute_version(dir.path(), &["**/*.ts".to_string()], &[], &[], deps.clone()).unwrap();
        let second = compute_version(dir.path(), &["**/*.ts".to_string()], &[], &[], deps).unwrap();
        assert_eq!(first.version_string, second.version_string);
    }

    #[test]
    fn version_sensitivity_to_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), b"content-a").unwrap();
        let before = compute_version(dir.path(), &["**/*.ts".to_string()], &[], &[], BTreeMap::new()).unwrap();

        fs::write(dir.path().join("a.ts"), b"content-a-changed").unwrap();
        let after = compute_version(dir.path(), &["**/*.ts".to_string()], &[], &[], BTreeMap::new()).unwrap();

        assert_ne!(before.version_string, after.version_string);
    }

    #[test]
    fn version_sensitivity_to_dependency_versions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), b"content-a").unwrap();

        let deps_v1 = BTreeMap::from([("dep-a".to_string(), "v-1111111111".to_string())]);
        let deps_v2 = BTreeMap::from([("dep-a".to_string(), "v-2222222222".to_string())]);

        let v1 = compute_version(dir.path(), &["**/*.ts".to_string()], &[], &[], deps_v1).unwrap();
        let v2 = compute_version(dir.path(), &["**/*.ts".to_string()], &[], &[], deps_v2).unwrap();

        assert_ne!(v1.version_string, v2.version_string);
    }

    #[test]
    fn build_version_file_round_trips() {
        let version = ModuleVersion {
            version_string: "v-a1b2c3d4e5".to_string(),
            dependency_versions: BTreeMap::from([("dep-a".to_string(), "v-1111111111".to_string())]),
            files: vec!["a.ts".to_string(), "b.ts".to_string()],
        };
        let json = serde_json::to_string(&version).unwrap();
        let round_tripped: ModuleVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(version, round_tripped);
    }
}
