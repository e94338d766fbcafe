use crate::utils::names::png_stem;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Create every missing directory in `dirs`, parents included
pub fn ensure_directories(dirs: &[PathBuf]) -> io::Result<()> {
    for dir in dirs.iter().filter(|dir| !dir.exists()) {
        fs::create_dir_all(dir)?;
        tracing::info!("Created directory: {}", dir.display());
    }
    Ok(())
}

/// Expand a leading `~` in a user supplied output path
pub fn expand_output_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Make `folder` absolute and require it to be an existing directory
pub fn resolve_folder(folder: &Path) -> io::Result<PathBuf> {
    let folder = std::path::absolute(folder)?;
    if !folder.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Folder not found: {}", folder.display()),
        ));
    }
    Ok(folder)
}

/// Non-directory entries directly under `folder` whose name ends in `.png`,
/// sorted by name
pub fn png_entries(folder: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            if entry.file_type().ok()?.is_dir() {
                return None;
            }
            let name = entry.file_name();
            png_stem(name.to_str()?)?;
            Some(entry.path())
        })
        .collect();

    entries.sort();
    Ok(entries)
}
