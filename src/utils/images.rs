use crate::utils::names::variant_file_name;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, ImageReader, ImageResult, RgbaImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Target edge lengths, in the order variants are written
pub const SIZES: [u32; 3] = [1024, 512, 256];

/// `<root>/<size>` for every target size
pub fn size_folders(root: &Path) -> Vec<PathBuf> {
    SIZES
        .iter()
        .map(|size| root.join(size.to_string()))
        .collect()
}

/// Where the `size` variant of `stem` lives under `root`
pub fn variant_path(root: &Path, stem: &str, size: u32) -> PathBuf {
    root.join(size.to_string())
        .join(variant_file_name(stem, size))
}

/// Open an image and normalize it to 8-bit RGBA.
///
/// The decoder is picked from the file contents, not the extension: the
/// fetcher saves extension-less downloads as `.png` whatever they hold.
pub fn load_rgba(path: &Path) -> ImageResult<RgbaImage> {
    Ok(ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .into_rgba8())
}

/// Save as PNG with maximum compression and adaptive row filtering
pub fn save_optimized_png(img: &RgbaImage, path: &Path) -> ImageResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    PngEncoder::new_with_quality(&mut writer, CompressionType::Best, PngFilterType::Adaptive)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgba8,
        )?;
    writer.flush()?;
    Ok(())
}

/// Write every missing `size x size` variant of `img` under `root`.
///
/// Variants that already exist are never touched. Returns how many files were
/// created.
pub fn write_variants(img: &RgbaImage, stem: &str, root: &Path) -> ImageResult<usize> {
    let mut created = 0;

    for size in SIZES {
        let out_path = variant_path(root, stem, size);
        if out_path.exists() {
            tracing::debug!("Variant exists, leaving it: {}", out_path.display());
            continue;
        }

        let resized = image::imageops::resize(img, size, size, FilterType::Lanczos3);
        if let Err(e) = save_optimized_png(&resized, &out_path) {
            // A half written file would otherwise block regeneration forever
            if out_path.exists() {
                if let Err(cleanup_err) = fs::remove_file(&out_path) {
                    tracing::warn!(
                        "Failed to remove partial variant {}: {}",
                        out_path.display(),
                        cleanup_err
                    );
                }
            }
            return Err(e);
        }
        created += 1;
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage, Rgba};
    use tempfile::tempdir;

    fn sample_image() -> RgbaImage {
        RgbaImage::from_fn(40, 30, |x, y| Rgba([x as u8 * 6, y as u8 * 8, 128, 200]))
    }

    fn prepare(root: &Path) {
        for dir in size_folders(root) {
            fs::create_dir_all(dir).unwrap();
        }
    }

    #[test]
    fn variant_paths_use_size_folders() {
        let root = Path::new("/cards");
        assert_eq!(
            variant_path(root, "Goblin", 512),
            PathBuf::from("/cards/512/Goblin 512.png")
        );
        assert_eq!(
            size_folders(root),
            vec![
                PathBuf::from("/cards/1024"),
                PathBuf::from("/cards/512"),
                PathBuf::from("/cards/256")
            ]
        );
    }

    #[test]
    fn write_variants_produces_square_rgba_pngs() {
        let root = tempdir().unwrap();
        prepare(root.path());

        let created = write_variants(&sample_image(), "Goblin", root.path()).unwrap();
        assert_eq!(created, 3);

        for size in SIZES {
            let out = image::open(variant_path(root.path(), "Goblin", size)).unwrap();
            assert_eq!(out.dimensions(), (size, size));
            assert!(out.color().has_alpha());
        }
    }

    #[test]
    fn write_variants_never_overwrites() {
        let root = tempdir().unwrap();
        prepare(root.path());
        let existing = variant_path(root.path(), "Goblin", 512);
        fs::write(&existing, b"keep me").unwrap();

        let created = write_variants(&sample_image(), "Goblin", root.path()).unwrap();

        assert_eq!(created, 2);
        assert_eq!(fs::read(&existing).unwrap(), b"keep me");
    }

    #[test]
    fn write_variants_fails_without_size_folders() {
        let root = tempdir().unwrap();
        assert!(write_variants(&sample_image(), "Goblin", root.path()).is_err());
    }

    #[test]
    fn load_rgba_detects_format_from_contents() {
        let root = tempdir().unwrap();
        let path = root.path().join("Goblin.png");
        RgbImage::from_pixel(16, 12, Rgb([30, 60, 90]))
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();

        let img = load_rgba(&path).unwrap();
        assert_eq!(img.dimensions(), (16, 12));
    }

    #[test]
    fn load_rgba_rejects_corrupt_files() {
        let root = tempdir().unwrap();
        let path = root.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();
        assert!(load_rgba(&path).is_err());
    }
}
