//! Filename rules shared by the fetcher and the resizer.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Fallback used when a card name sanitizes to nothing
pub const UNTITLED: &str = "untitled";

/// Extension used when the image URL path carries none
pub const DEFAULT_EXTENSION: &str = ".png";

/// The only extension the resizer reads and writes
pub const IMAGE_EXTENSION: &str = ".png";

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]+"#).expect("unsafe character pattern is valid"));

// "<base> 1024", "<base> 512" or "<base> 256", extension already stripped
static RESIZED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<base>.+)\s(?P<size>1024|512|256)$")
        .expect("resized suffix pattern is valid")
});

/// Replace runs of characters that are illegal in filenames with `_` and trim
/// surrounding whitespace.
pub fn sanitize_filename(name: &str) -> String {
    let safe = UNSAFE_CHARS.replace_all(name, "_");
    let safe = safe.trim();
    if safe.is_empty() {
        UNTITLED.to_string()
    } else {
        safe.to_string()
    }
}

/// Extension (with leading dot, case preserved) of the last segment of the
/// percent-decoded URL path, or [`DEFAULT_EXTENSION`].
pub fn extension_from_url(image_url: &str) -> String {
    let Ok(url) = Url::parse(image_url) else {
        return DEFAULT_EXTENSION.to_string();
    };

    // Storage URLs encode the object path, e.g. `/o/cards%2Fdragon.png`
    let decoded = urlencoding::decode_binary(url.path().as_bytes());
    let path = String::from_utf8_lossy(&decoded);
    let file_name = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    match file_name.rfind('.') {
        Some(dot) if dot > 0 && dot < file_name.len() - 1 => file_name[dot..].to_string(),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Stem of a `.png` filename (case-insensitive), or `None` for anything else.
pub fn png_stem(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(IMAGE_EXTENSION.len())?;
    let extension = file_name.get(split..)?;
    if !extension.eq_ignore_ascii_case(IMAGE_EXTENSION) {
        return None;
    }

    let stem = &file_name[..split];
    // A name made only of leading dots has no extension to strip
    if stem.chars().all(|c| c == '.') {
        Some(file_name)
    } else {
        Some(stem)
    }
}

/// Whether an extension-less stem looks like a generated variant.
pub fn is_resized_stem(stem: &str) -> bool {
    RESIZED_SUFFIX.is_match(stem)
}

/// Whether a filename is a generated `.png` variant, wherever it lives.
pub fn is_resized_name(file_name: &str) -> bool {
    png_stem(file_name).is_some_and(is_resized_stem)
}

/// Output filename of the `size` variant of `stem`.
pub fn variant_file_name(stem: &str, size: u32) -> String {
    format!("{stem} {size}{IMAGE_EXTENSION}")
}

/// Tracks the filenames handed out during one fetch run.
#[derive(Debug, Default)]
pub struct NameRegistry {
    seen: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `<base><ext>`, falling back to `<base>_<id><ext>` when that
    /// name was already handed out in this run.
    pub fn claim(&mut self, base: &str, extension: &str, id: &str) -> String {
        let mut file_name = format!("{base}{extension}");
        if self.seen.contains(&file_name) {
            file_name = format!("{base}_{id}{extension}");
        }
        self.seen.insert(file_name.clone());
        file_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_runs_of_unsafe_characters() {
        assert_eq!(sanitize_filename("Fire/Dragon"), "Fire_Dragon");
        assert_eq!(sanitize_filename(r#"a\/:*?"<>|b"#), "a_b");
        assert_eq!(sanitize_filename("Who? What: <Me>"), "Who_ What_ _Me_");
    }

    #[test]
    fn sanitize_trims_and_falls_back_to_placeholder() {
        assert_eq!(sanitize_filename("  Fire Dragon \t"), "Fire Dragon");
        assert_eq!(sanitize_filename(""), UNTITLED);
        assert_eq!(sanitize_filename("   "), UNTITLED);
        assert_eq!(sanitize_filename(" | "), "_");
    }

    #[test]
    fn sanitized_names_never_contain_unsafe_characters() {
        let names = [
            "a\\b", "c/d", "e:f", "g*h", "i?j", "k\"l", "m<n", "o>p", "q|r", "???", "//x//",
        ];
        for name in names {
            let safe = sanitize_filename(name);
            assert!(!safe.is_empty());
            assert!(
                !safe.contains(['\\', '/', ':', '*', '?', '"', '<', '>', '|']),
                "{name:?} sanitized to {safe:?}"
            );
        }
    }

    #[test]
    fn sanitize_keeps_other_punctuation() {
        assert_eq!(sanitize_filename("Fire Dragon!!"), "Fire Dragon!!");
    }

    #[test]
    fn extension_follows_url_path_suffix() {
        assert_eq!(extension_from_url("https://x/img.jpg"), ".jpg");
        assert_eq!(extension_from_url("https://x/IMG.JPG"), ".JPG");
        assert_eq!(extension_from_url("https://x/a/b/card.webp?token=abc.def"), ".webp");
        assert_eq!(extension_from_url("https://x/archive.tar.gz"), ".gz");
    }

    #[test]
    fn extension_decodes_storage_object_paths() {
        let url = "https://firebasestorage.googleapis.com/v0/b/game.appspot.com/o/cards%2Ffire%20dragon.jpeg?alt=media&token=1";
        assert_eq!(extension_from_url(url), ".jpeg");
    }

    #[test]
    fn extension_defaults_to_png() {
        assert_eq!(extension_from_url("https://x/image"), DEFAULT_EXTENSION);
        assert_eq!(extension_from_url("https://x/"), DEFAULT_EXTENSION);
        assert_eq!(extension_from_url("https://x/.hidden"), DEFAULT_EXTENSION);
        assert_eq!(extension_from_url("https://x/trailing."), DEFAULT_EXTENSION);
        assert_eq!(extension_from_url("not a url"), DEFAULT_EXTENSION);
    }

    #[test]
    fn registry_disambiguates_repeated_names_with_document_id() {
        let mut names = NameRegistry::new();
        let first = names.claim(&sanitize_filename("Fire Dragon"), ".jpg", "abc123");
        let second = names.claim(&sanitize_filename(" Fire Dragon "), ".jpg", "def456");

        assert_eq!(first, "Fire Dragon.jpg");
        assert_eq!(second, "Fire Dragon_def456.jpg");
        assert_ne!(first, second);
    }

    #[test]
    fn registry_treats_extensions_as_part_of_the_name() {
        let mut names = NameRegistry::new();
        assert_eq!(names.claim("Goblin", ".png", "a"), "Goblin.png");
        assert_eq!(names.claim("Goblin", ".jpg", "b"), "Goblin.jpg");
        assert_eq!(names.claim("Goblin", ".png", "c"), "Goblin_c.png");
    }

    #[test]
    fn png_stem_strips_extension_case_insensitively() {
        assert_eq!(png_stem("Goblin.png"), Some("Goblin"));
        assert_eq!(png_stem("Goblin.PNG"), Some("Goblin"));
        assert_eq!(png_stem("Goblin.jpg"), None);
        assert_eq!(png_stem("png"), None);
        assert_eq!(png_stem(".png"), Some(".png"));
        assert_eq!(png_stem("Drachenü.png"), Some("Drachenü"));
    }

    #[test]
    fn resized_names_match_only_the_three_sizes() {
        assert!(is_resized_name("Goblin 256.png"));
        assert!(is_resized_name("Goblin 512.PNG"));
        assert!(is_resized_name("Fire Dragon 1024.png"));
        assert!(is_resized_name("Goblin\t512.png"));

        assert!(!is_resized_name("Goblin.png"));
        assert!(!is_resized_name("Goblin256.png"));
        assert!(!is_resized_name("Goblin 2560.png"));
        assert!(!is_resized_name("Goblin 128.png"));
        assert!(!is_resized_name(" 256.png"));
        assert!(!is_resized_name("Goblin 256.jpg"));
        assert!(!is_resized_name("Goblin 256 copy.png"));
    }

    #[test]
    fn resized_pattern_is_a_naming_convention_only() {
        // An original legitimately named this way is indistinguishable
        assert!(is_resized_name("Card 512.png"));
    }

    #[test]
    fn variant_names_round_trip_through_the_pattern() {
        for size in [1024, 512, 256] {
            let name = variant_file_name("Goblin", size);
            assert!(is_resized_name(&name), "{name}");
        }
        assert_eq!(variant_file_name("Goblin", 256), "Goblin 256.png");
    }
}
