use std::path::Path;

pub const DEFAULT_FRAME_PREFIX: &str = "Image";

/// Frame number encoded in an image file name such as `Image0042.jpg`.
///
/// Leading characters belonging to `prefix` are stripped, the part before the first dot
/// is parsed. An empty remainder is frame 0; anything that is not a number yields `None`.
///
pub fn strip_frame_number(prefix: &str, file_name: &str) -> Option<u64> {
    let stem = file_name
        .trim_start_matches(|c| prefix.contains(c))
        .split('.')
        .next()
        .unwrap_or("");
    if stem.is_empty() {
        Some(0)
    } else {
        stem.parse().ok()
    }
}

/// Image extensions accepted as sequence frames
///
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            matches!(
                e.to_string_lossy().to_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "bmp"
            )
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use crate::utils::frames::{is_image_file, strip_frame_number};
    use std::path::Path;

    #[test]
    fn frame_numbers() {
        assert_eq!(strip_frame_number("Image", "Image0042.jpg"), Some(42));
        assert_eq!(strip_frame_number("Image", "Image.jpg"), Some(0));
        assert_eq!(strip_frame_number("Image", "17.png"), Some(17));
        assert_eq!(strip_frame_number("Image", "frame3.png"), None);
    }

    #[test]
    fn extensions() {
        assert!(is_image_file(Path::new("a/Image1.JPG")));
        assert!(!is_image_file(Path::new("a/notes.txt")));
    }
}
