//! Module discovery and configuration.
//!
//! Scans a project for `garden.yml`/`garden.yaml` files, splits them into the
//! project document and module documents, then resolves each module's static
//! templates, validates its `spec` against its type's schema chain, invokes
//! the creating plugin's `configure` handler, and computes its
//! content-addressed version.

mod discovery;
mod document;
mod error;
mod module;
mod remote;
mod resolver;

pub use discovery::discover_config_files;
pub use document::{
    BuildDependency, BuildSpec, CopySpec, EnvironmentDef, GardenDocument, ModuleDiscoveryConfig, ModuleDocument,
    ProjectDocument, RawProviderDeclaration, parse_documents,
};
pub use error::ModuleError;
pub use module::ModuleConfig;
pub use remote::{RepositoryCheckout, resolve_remote_root};
pub use resolver::configure_modules;

use std::fs;
use std::path::{Path, PathBuf};

/// A project's parsed `garden.yml` documents, before module configuration.
#[derive(Debug, Clone, Default)]
pub struct LoadedProject {
    /// The project document, if one was found.
    pub document: Option<ProjectDocument>,
    /// The file the project document was found in.
    pub project_path: Option<PathBuf>,
    /// Every module document found, paired with the directory containing it.
    pub modules: Vec<(PathBuf, ModuleDocument)>,
}

/// Discovers and parses every `garden.yml`/`garden.yaml` under `root`.
///
/// Discovery happens in two passes: an unfiltered scan locates the project
/// document (if any), then a second scan applies that document's
/// `dotIgnoreFiles` and `modules.include`/`modules.exclude` before parsing
/// module documents.
pub fn load_project(root: &Path) -> Result<LoadedProject, Vec<ModuleError>> {
    let mut errors = Vec::new();

    let initial_files = match discover_config_files(root, &[], &[], &[]) {
        Ok(files) => files,
        Err(err) => return Err(vec![err]),
    };

    let mut project: Option<(PathBuf, ProjectDocument)> = None;
    for path in &initial_files {
        for document in parse_file(path, &mut errors) {
            if let GardenDocument::Project(doc) = document {
                match &project {
                    None => project = Some((path.clone(), doc)),
                    Some((first_path, _)) => errors.push(ModuleError::MultipleProjectDocuments {
                        first_path: first_path.display().to_string(),
                        second_path: path.display().to_string(),
                    }),
                }
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let (dotignore_files, include, exclude) = match &project {
        Some((_, doc)) => (doc.dot_ignore_files.clone(), doc.modules.include.clone(), doc.modules.exclude.clone()),
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    let final_files = if dotignore_files.is_empty() && include.is_empty() && exclude.is_empty() {
        initial_files
    } else {
        match discover_config_files(root, &include, &exclude, &dotignore_files) {
            Ok(files) => files,
            Err(err) => return Err(vec![err]),
        }
    };

    let mut modules = Vec::new();
    for path in &final_files {
        let dir = path.parent().unwrap_or(root).to_path_buf();
        for document in parse_file(path, &mut errors) {
            if let GardenDocument::Module(doc) = document {
                modules.push((dir.clone(), doc));
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(LoadedProject {
        document: project.as_ref().map(|(_, doc)| doc.clone()),
        project_path: project.map(|(path, _)| path),
        modules,
    })
}

fn parse_file(path: &Path, errors: &mut Vec<ModuleError>) -> Vec<GardenDocument> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(source) => {
            errors.push(ModuleError::Io { path: path.to_path_buf(), source });
            return Vec::new();
        }
    };
    match parse_documents(&contents) {
        Ok(documents) => documents,
        Err(source) => {
            errors.push(ModuleError::Yaml { path: path.display().to_string(), source });
            Vec::new()
        }
    }
}
