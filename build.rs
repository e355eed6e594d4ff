use std::fmt::Write as _;
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let prebuilt_dir = manifest_dir.join("prebuilt");

    println!("cargo:rerun-if-changed={}", prebuilt_dir.display());

    // Collect prebuilt documents, sorted by file name for a stable bundle
    let mut documents: Vec<(String, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(&prebuilt_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let kind = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| format!("non UTF-8 file name: {}", path.display()))?
            .to_string();
        println!("cargo:rerun-if-changed={}", path.display());
        documents.push((kind, path));
    }
    documents.sort();

    let mut out = String::new();
    writeln!(
        out,
        "pub(crate) const BUNDLE_VERSION: &str = {:?};",
        std::env::var("CARGO_PKG_VERSION")?
    )?;
    writeln!(out, "pub(crate) static BUNDLE: &[(&str, &[u8])] = &[")?;
    for (kind, path) in &documents {
        writeln!(out, "    ({:?}, include_bytes!({:?})),", kind, path_str(path)?)?;
    }
    writeln!(out, "];")?;

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    std::fs::write(out_dir.join("prebuilt_bundle.rs"), out)?;

    Ok(())
}

fn path_str(path: &Path) -> Result<&str, Box<dyn std::error::Error>> {
    path.to_str()
        .ok_or_else(|| format!("non UTF-8 path: {}", path.display()).into())
}
