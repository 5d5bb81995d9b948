//! Layout recipes: ordered mutation sequences per deployment topology.
//!
//! Recipes run strictly sequentially — later mutations assume earlier
//! ones already landed (datasource blocks anchor each other, and the
//! traffic-manager file substitution must precede any mutation of those
//! artifacts). Individual mutation failures are logged and the recipe
//! moves on (best-effort, matching the artifact functions' contract);
//! filesystem failures — template copy, renames — abort the recipe, and
//! a multi-node loop halts at the first failed node rather than
//! proceeding with partially configured later nodes.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub mod distributed;
pub mod iskm;
pub mod multiple_gateway;
pub mod single;

/// Directory multi-node layouts are materialized under.
pub const DEPLOYMENT_DIR: &str = "deployment";

/// Run one recipe step best-effort: log the failure, keep going.
pub(crate) fn step(name: &str, result: Result<()>) {
    if let Err(err) = result {
        warn!("{} failed: {:#}", name, err);
    }
}

/// Locate the unpacked server distribution under `working_dir` by its
/// directory name prefix (e.g. `wso2am`).
pub fn find_server_pack(working_dir: &Path, prefix: &str) -> Result<PathBuf> {
    let entries = fs::read_dir(working_dir)
        .with_context(|| format!("reading working directory '{}'", working_dir.display()))?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(prefix))
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect();
    candidates.sort();
    match candidates.into_iter().next() {
        Some(path) => Ok(path),
        None => bail!(
            "no server pack matching '{}*' under '{}'",
            prefix,
            working_dir.display()
        ),
    }
}

/// Copy a template pack into a node directory.
///
/// The copy completes before any mutation is allowed to begin; callers
/// must not configure a node out of a partially copied tree.
pub fn copy_pack(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry =
            entry.with_context(|| format!("walking template pack '{}'", source.display()))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .context("walked entry escapes the template pack")?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("creating '{}'", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating '{}'", parent.display()))?;
            }
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "copying '{}' to '{}'",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn find_server_pack_prefers_matching_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("wso2am-2.6.0")).unwrap();
        fs::create_dir(temp.path().join("logs")).unwrap();
        fs::write(temp.path().join("wso2am-2.6.0.zip"), b"not a dir").unwrap();

        let pack = find_server_pack(temp.path(), "wso2am").unwrap();
        assert!(pack.ends_with("wso2am-2.6.0"));
    }

    #[test]
    fn find_server_pack_fails_without_candidates() {
        let temp = TempDir::new().unwrap();
        assert!(find_server_pack(temp.path(), "wso2am").is_err());
    }

    #[test]
    fn copy_pack_replicates_nested_tree() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("pack");
        fs::create_dir_all(source.join("repository/conf/axis2")).unwrap();
        fs::write(source.join("repository/conf/carbon.xml"), "<Server/>").unwrap();
        fs::write(source.join("repository/conf/axis2/axis2.xml"), "<axisconfig/>").unwrap();

        let dest = temp.path().join("node");
        copy_pack(&source, &dest).unwrap();

        assert!(dest.join("repository/conf/carbon.xml").exists());
        assert_eq!(
            fs::read_to_string(dest.join("repository/conf/axis2/axis2.xml")).unwrap(),
            "<axisconfig/>"
        );
    }
}
