//! Object keys and upload checks for note images.
//!
//! Keys are `notes/{note_id}/{uuid_v7}-{file_name}`. The per-upload UUID
//! means two uploads of the same file name never overwrite each other, and
//! every reference appended to a note points at its own object.

use crate::error::CoreError;

/// Top-level prefix for note images.
pub const IMAGE_KEY_PREFIX: &str = "notes";

/// Longest file-name component kept in a key.
const MAX_FILE_NAME_CHARS: usize = 100;

/// Largest accepted image upload (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Build a fresh, unique object key for an image attached to `note_id`.
pub fn image_object_key(note_id: &str, file_name: &str) -> Result<String, CoreError> {
    if note_id.trim().is_empty() || note_id.contains('/') {
        return Err(CoreError::Validation(format!("Invalid note id '{note_id}'")));
    }
    let name = sanitize_file_name(file_name)?;
    Ok(format!(
        "{IMAGE_KEY_PREFIX}/{note_id}/{}-{name}",
        uuid::Uuid::now_v7()
    ))
}

/// Reduce a user-supplied file name to a safe key segment.
///
/// Path components are dropped, characters outside `[A-Za-z0-9._-]` become
/// `_`, leading dots are stripped and the result is capped in length.
pub fn sanitize_file_name(file_name: &str) -> Result<String, CoreError> {
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned: String = cleaned
        .trim_start_matches('.')
        .chars()
        .take(MAX_FILE_NAME_CHARS)
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        return Err(CoreError::Validation(format!(
            "File name '{file_name}' has no usable characters"
        )));
    }
    Ok(cleaned)
}

/// Sniff the image format of an upload and return its MIME type.
///
/// Only PNG, JPEG and WebP are accepted.
pub fn detect_image_mime(bytes: &[u8]) -> Result<&'static str, CoreError> {
    if bytes.is_empty() {
        return Err(CoreError::Validation("Image upload is empty".into()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(CoreError::Validation(format!(
            "Image upload exceeds {MAX_IMAGE_BYTES} bytes"
        )));
    }
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => Ok("image/png"),
        Ok(image::ImageFormat::Jpeg) => Ok("image/jpeg"),
        Ok(image::ImageFormat::WebP) => Ok("image/webp"),
        Ok(other) => Err(CoreError::Validation(format!(
            "Unsupported image format {other:?}"
        ))),
        Err(_) => Err(CoreError::Validation("Upload is not a recognised image".into())),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    /// The 8-byte PNG signature followed by an IHDR chunk header.
    const PNG_HEADER: &[u8] = &[
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
    ];

    #[test]
    fn same_file_name_yields_distinct_keys() {
        let a = image_object_key("n1", "a.png").unwrap();
        let b = image_object_key("n1", "a.png").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("notes/n1/"));
        assert!(a.ends_with("-a.png"));
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_file_name("C:\\pics\\my cat.png").unwrap(), "my_cat.png");
        assert_eq!(sanitize_file_name(".hidden.jpg").unwrap(), "hidden.jpg");
    }

    #[test]
    fn sanitize_rejects_empty_names() {
        assert_matches!(sanitize_file_name(""), Err(CoreError::Validation(_)));
        assert_matches!(sanitize_file_name("..."), Err(CoreError::Validation(_)));
        assert_matches!(sanitize_file_name("???"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn key_rejects_note_ids_with_slashes() {
        assert_matches!(
            image_object_key("a/b", "x.png"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn detects_png() {
        assert_eq!(detect_image_mime(PNG_HEADER).unwrap(), "image/png");
    }

    #[test]
    fn rejects_non_images() {
        assert_matches!(
            detect_image_mime(b"plain text, not an image"),
            Err(CoreError::Validation(_))
        );
        assert_matches!(detect_image_mime(&[]), Err(CoreError::Validation(_)));
    }
}
