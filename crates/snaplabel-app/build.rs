use std::fs;
use std::path::{Path, PathBuf};

fn read_workspace_version(manifest_dir: &Path) -> (PathBuf, String) {
    let version_path = manifest_dir
        .ancestors()
        .nth(2)
        .expect("workspace root above crates/<name>")
        .join("VERSION");
    let raw = fs::read_to_string(&version_path).expect("read VERSION file");
    (version_path, raw.trim().to_string())
}

fn main() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let (version_path, version) = read_workspace_version(&manifest_dir);

    println!("cargo:rerun-if-changed={}", version_path.display());
    assert!(!version.is_empty(), "VERSION must not be empty");
    println!("cargo:rustc-env=SNAPLABEL_VERSION={version}");
}
