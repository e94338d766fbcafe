use crate::utils::files::{ensure_directories, png_entries};
use crate::utils::images::{load_rgba, size_folders, write_variants};
use crate::utils::names::{is_resized_name, is_resized_stem, png_stem};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// What the resize command does with the folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResizeMode {
    /// Create 1024/512/256 variants of every original
    Resize,
    /// Delete previously generated variants
    Cleanup,
    /// Resize first, then clean up
    Both,
}

impl ResizeMode {
    fn resizes(self) -> bool {
        matches!(self, Self::Resize | Self::Both)
    }

    fn cleans_up(self) -> bool {
        matches!(self, Self::Cleanup | Self::Both)
    }
}

/// Statistics for a resize pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResizeReport {
    /// Originals opened and resized
    pub processed: usize,
    /// Files skipped because they already are variants
    pub skipped: usize,
    /// Originals that failed to open or save
    pub failed: usize,
    /// Variant files written
    pub created: usize,
}

/// Statistics for a cleanup pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub scanned: usize,
    /// Every file classified as a variant, deleted or not
    pub matched: Vec<PathBuf>,
    pub deleted: usize,
    pub failed: usize,
}

/// Run `mode` against `folder`. Resize always completes before cleanup starts.
pub fn run(folder: &Path, mode: ResizeMode, dry_run: bool) -> io::Result<()> {
    println!("Folder: {}", folder.display());
    println!("Mode: {:?}", mode);

    if mode.resizes() {
        resize_images(folder)?;
    }

    if mode.cleans_up() {
        cleanup_resized_files(folder, dry_run);
    }

    Ok(())
}

/// Write 1024/512/256 variants of every `.png` original directly in `folder`.
///
/// Existing variants are kept as they are, so running twice creates nothing
/// new. A file that fails to open or save is reported and skipped.
pub fn resize_images(folder: &Path) -> io::Result<ResizeReport> {
    ensure_directories(&size_folders(folder))?;

    let entries = png_entries(folder)?;
    let mut report = ResizeReport::default();

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    for entry in &entries {
        pb.inc(1);

        // png_entries only returns UTF-8 `.png` names
        let Some(file_name) = entry.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(stem) = png_stem(file_name) else {
            continue;
        };

        if is_resized_stem(stem) {
            pb.suspend(|| println!("Skipped (already a variant): {}", file_name));
            report.skipped += 1;
            continue;
        }

        match load_rgba(entry).and_then(|img| write_variants(&img, stem, folder)) {
            Ok(created) => {
                report.processed += 1;
                report.created += created;
                pb.suspend(|| println!("Processed: {}", file_name));
            }
            Err(e) => {
                report.failed += 1;
                warn!("Failed to resize {}: {:?}", entry.display(), e);
                pb.suspend(|| println!("Error: {} - {}", file_name, e));
            }
        }
    }

    pb.finish_and_clear();
    println!(
        "\nResize finished. Processed: {}, skipped: {}, failed: {}, variants created: {}",
        report.processed, report.skipped, report.failed, report.created
    );

    Ok(report)
}

/// Delete every generated variant under `root`, subfolders included.
///
/// With `dry_run` nothing is removed; the report lists the same files a real
/// run would delete.
pub fn cleanup_resized_files(root: &Path, dry_run: bool) -> CleanupReport {
    cleanup_with(root, dry_run, |path| fs::remove_file(path))
}

fn cleanup_with(
    root: &Path,
    dry_run: bool,
    mut remove: impl FnMut(&Path) -> io::Result<()>,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry under {}: {}", root.display(), e);
                continue;
            }
        };
        // Links are not followed, so a link to a folder must be checked by target
        if entry.file_type().is_dir() || entry.path().is_dir() {
            continue;
        }

        report.scanned += 1;
        let is_variant = entry.file_name().to_str().is_some_and(is_resized_name);
        if !is_variant {
            continue;
        }

        let path = entry.path();
        report.matched.push(path.to_path_buf());

        if dry_run {
            println!("[DRY-RUN] Would delete: {}", path.display());
            continue;
        }

        match remove(path) {
            Ok(()) => {
                println!("Deleted: {}", path.display());
                report.deleted += 1;
            }
            Err(e) => {
                println!("Failed to delete: {} - {}", path.display(), e);
                report.failed += 1;
            }
        }
    }

    if dry_run {
        println!(
            "\nDone (dry run). Scanned {} files, {} would be deleted.",
            report.scanned,
            report.matched.len()
        );
    } else {
        println!(
            "\nDone. Scanned {} files. Deleted {}, failed {}.",
            report.scanned, report.deleted, report.failed
        );
    }

    report
}
