//! Remote module source resolution.
//!
//! The core does not speak any VCS protocol itself; actual fetching is
//! delegated to a caller-supplied [`RepositoryCheckout`]. This crate is only
//! responsible for deciding *where* a remote module's source should live: a
//! user-linked local path recorded in the config store, or else a cache
//! directory keyed by a hash of the repository URL.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::ModuleError;
use garden_config_store::ConfigStore;

/// Fetches a remote module's source into `target_dir`, or confirms it is
/// already present there. Implemented outside this crate, against whatever
/// VCS tooling the embedding application uses.
pub trait RepositoryCheckout: Send + Sync {
    /// Ensures `url`'s contents are present at `target_dir`, fetching or
    /// updating as needed.
    fn checkout(&self, url: &str, target_dir: &Path) -> Result<(), ModuleError>;
}

/// Returns the directory a remote module's source should be read from:
/// a config-store-linked local path if one is recorded for `module_name`,
/// otherwise a cache directory keyed by `hash(url)`, fetched via `checkout`
/// when supplied.
pub fn resolve_remote_root(
    module_name: &str,
    url: &str,
    cache_root: &Path,
    config_store: &ConfigStore,
    checkout: Option<&dyn RepositoryCheckout>,
) -> Result<PathBuf, ModuleError> {
    let link_key = format!("linked.module.{module_name}");
    if let Some(linked) = config_store.get::<String>(&link_key)? {
        return Ok(PathBuf::from(linked));
    }

    let target_dir = cache_root.join("sources").join("module").join(format!("{module_name}--{}", url_hash(url)));
    if let Some(checkout) = checkout {
        checkout.checkout(url, &target_dir)?;
    }
    Ok(target_dir)
}

fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())[..10].to_string()
}
