//! Project materialization and package-layout normalization for the
//! native and container compile backends (spec §4.6 step 1).

use std::path::{Path, PathBuf};

use wasmforge_core::project::SourceFile;
use wasmforge_core::{Error, Result};

/// Write `files` into a fresh directory under `root`, keyed by `job_id`.
/// Each job owns a unique ephemeral directory; no cross-job sharing
/// (spec §5 "Shared-resource discipline").
pub fn materialize(root: &Path, job_id: &str, files: &[SourceFile]) -> Result<PathBuf> {
    let dir = root.join(format!("wasmforge-compile-{job_id}"));
    std::fs::create_dir_all(&dir).map_err(|e| Error::Internal(e.to_string()))?;

    for file in files {
        let path = dir.join(&file.name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Internal(e.to_string()))?;
        }
        std::fs::write(&path, &file.content).map_err(|e| Error::Internal(e.to_string()))?;
    }

    Ok(dir)
}

/// Locate the build root: the top level if it's a single package, or the
/// first package found under `contracts/` if the top level declares a
/// workspace (spec §4.6 step 1).
pub fn find_build_root(project_dir: &Path) -> Result<PathBuf> {
    let top_manifest = project_dir.join("Cargo.toml");
    let top_contents = std::fs::read_to_string(&top_manifest)
        .map_err(|_| Error::InvalidInput("project has no top-level Cargo.toml".into()))?;

    if !top_contents.contains("[workspace]") {
        return Ok(project_dir.to_path_buf());
    }

    let contracts_dir = project_dir.join("contracts");
    let mut entries = std::fs::read_dir(&contracts_dir)
        .map_err(|_| Error::InvalidInput("workspace declared but no contracts/ directory".into()))?;

    entries
        .find_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if path.join("Cargo.toml").is_file() {
                Some(path)
            } else {
                None
            }
        })
        .ok_or_else(|| Error::InvalidInput("no package found under contracts/".into()))
}

/// Normalize the package layout: rename `main.rs` to `lib.rs` when only
/// the former exists, and write a `[lib] path = "src/lib.rs"` stanza if
/// absent. This mutates the materialized copy only, never the caller's
/// source bundle.
pub fn normalize_package_layout(build_root: &Path) -> Result<()> {
    let src_dir = build_root.join("src");
    let main_rs = src_dir.join("main.rs");
    let lib_rs = src_dir.join("lib.rs");

    if main_rs.is_file() && !lib_rs.is_file() {
        std::fs::rename(&main_rs, &lib_rs).map_err(|e| Error::Internal(e.to_string()))?;
    }

    let manifest_path = build_root.join("Cargo.toml");
    let manifest = std::fs::read_to_string(&manifest_path).map_err(|e| Error::Internal(e.to_string()))?;
    if !manifest.contains("[lib]") {
        let patched = format!("{manifest}\n[lib]\npath = \"src/lib.rs\"\ncrate-type = [\"cdylib\", \"rlib\"]\n");
        std::fs::write(&manifest_path, patched).map_err(|e| Error::Internal(e.to_string()))?;
    }

    Ok(())
}

/// Scan `output_dir` recursively for a single `.wasm` artifact, excluding
/// anything under a `deps/` path component (spec §4.6 step 1).
pub fn find_wasm_artifact(output_dir: &Path) -> Result<PathBuf> {
    fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                if path.file_name().and_then(|n| n.to_str()) == Some("deps") {
                    continue;
                }
                walk(&path, found)?;
            } else if path.extension().and_then(|e| e.to_str()) == Some("wasm") {
                found.push(path);
            }
        }
        Ok(())
    }

    let mut found = Vec::new();
    walk(output_dir, &mut found).map_err(|e| Error::Internal(e.to_string()))?;

    found
        .into_iter()
        .next()
        .ok_or(Error::CompilerDidNotProduceArtifact)
}

pub fn cleanup(dir: &Path) {
    let _ = std::fs::remove_dir_all(dir);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content: &str) -> SourceFile {
        SourceFile {
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn materialize_writes_nested_files_under_a_job_scoped_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let files = vec![
            file("Cargo.toml", "[package]\nname = \"c\""),
            file("src/lib.rs", "pub fn f() {}"),
        ];

        let dir = materialize(tmp.path(), "job-1", &files).unwrap();

        assert_eq!(dir, tmp.path().join("wasmforge-compile-job-1"));
        assert_eq!(
            std::fs::read_to_string(dir.join("Cargo.toml")).unwrap(),
            "[package]\nname = \"c\""
        );
        assert!(dir.join("src/lib.rs").is_file());
    }

    #[test]
    fn find_build_root_returns_top_level_for_a_single_package() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), "[package]\nname = \"c\"").unwrap();

        let root = find_build_root(tmp.path()).unwrap();

        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_build_root_descends_into_contracts_for_a_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), "[workspace]\nmembers = [\"contracts/*\"]").unwrap();
        let pkg_dir = tmp.path().join("contracts").join("hello");
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(pkg_dir.join("Cargo.toml"), "[package]\nname = \"hello\"").unwrap();

        let root = find_build_root(tmp.path()).unwrap();

        assert_eq!(root, pkg_dir);
    }

    #[test]
    fn find_build_root_rejects_a_workspace_with_no_contracts_package() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), "[workspace]\nmembers = []").unwrap();
        std::fs::create_dir_all(tmp.path().join("contracts")).unwrap();

        assert!(matches!(
            find_build_root(tmp.path()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn normalize_renames_main_rs_to_lib_rs_and_patches_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), "[package]\nname = \"c\"").unwrap();

        normalize_package_layout(tmp.path()).unwrap();

        assert!(!tmp.path().join("src/main.rs").exists());
        assert!(tmp.path().join("src/lib.rs").is_file());
        let manifest = std::fs::read_to_string(tmp.path().join("Cargo.toml")).unwrap();
        assert!(manifest.contains("[lib]"));
        assert!(manifest.contains("src/lib.rs"));
    }

    #[test]
    fn normalize_leaves_an_existing_lib_rs_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(tmp.path().join("src/lib.rs"), "pub fn f() {}").unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), "[package]\nname = \"c\"\n[lib]\npath = \"src/lib.rs\"").unwrap();

        normalize_package_layout(tmp.path()).unwrap();

        assert!(tmp.path().join("src/main.rs").is_file());
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("src/lib.rs")).unwrap(),
            "pub fn f() {}"
        );
    }

    #[test]
    fn find_wasm_artifact_ignores_deps_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let deps = tmp.path().join("deps");
        std::fs::create_dir_all(&deps).unwrap();
        std::fs::write(deps.join("decoy.wasm"), b"decoy").unwrap();
        std::fs::write(tmp.path().join("contract.wasm"), b"real").unwrap();

        let found = find_wasm_artifact(tmp.path()).unwrap();

        assert_eq!(found, tmp.path().join("contract.wasm"));
    }

    #[test]
    fn find_wasm_artifact_errors_when_nothing_found() {
        let tmp = tempfile::tempdir().unwrap();

        assert!(matches!(
            find_wasm_artifact(tmp.path()),
            Err(Error::CompilerDidNotProduceArtifact)
        ));
    }
}
