//! Ensures all workspace crates use `version.workspace = true` and that
//! the workspace version matches what Cargo compiled this crate with.

use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .expect("crate lives two levels below the workspace root")
        .to_path_buf()
}

fn read_toml(path: &Path) -> toml::Value {
    let raw = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
    raw.parse()
        .unwrap_or_else(|e| panic!("parse {}: {e}", path.display()))
}

/// "workspace" when the manifest inherits its version, else the literal.
fn crate_version(manifest_dir: &Path) -> String {
    let doc = read_toml(&manifest_dir.join("Cargo.toml"));
    let version = doc
        .get("package")
        .and_then(|pkg| pkg.get("version"))
        .unwrap_or_else(|| panic!("{} has no package.version", manifest_dir.display()));

    if version
        .as_table()
        .and_then(|t| t.get("workspace"))
        .and_then(toml::Value::as_bool)
        == Some(true)
    {
        return "workspace".to_string();
    }
    version
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| panic!("unreadable version in {}", manifest_dir.display()))
}

#[test]
fn all_crates_use_workspace_version() {
    let root = workspace_root();
    for krate in ["crates/parl-motion-core", "crates/parl-motion-cli"] {
        let version = crate_version(&root.join(krate));
        assert_eq!(
            version, "workspace",
            "{krate} should use version.workspace = true, got {version:?}"
        );
    }
}

#[test]
fn workspace_version_matches_cargo_pkg() {
    let doc = read_toml(&workspace_root().join("Cargo.toml"));
    let ws_version = doc["workspace"]["package"]["version"]
        .as_str()
        .expect("workspace.package.version is a string");
    assert_eq!(ws_version, env!("CARGO_PKG_VERSION"));
    assert_eq!(ws_version, parl_motion_core::VERSION);
}
