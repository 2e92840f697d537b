//! Input discovery: list the image files directly inside a folder.
//!
//! Only regular files whose name ends in `.png`, `.jpg` or `.jpeg`
//! (any case) are picked up. Subdirectories are skipped, never descended.

use crate::error::ContactsError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Recognised image file-name suffixes (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Whether `path` has one of the recognised image suffixes.
pub fn is_image_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| {
            let name = name.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        })
        .unwrap_or(false)
}

/// List image files in `folder`.
///
/// With `sort`, paths come back ordered by file name; without it, in
/// directory-listing order.
pub fn list_images(folder: &Path, sort: bool) -> Result<Vec<PathBuf>, ContactsError> {
    let entries = std::fs::read_dir(folder).map_err(|e| folder_error(folder, e))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| folder_error(folder, e))?;
        let path = entry.path();
        if !is_image_file(&path) {
            continue;
        }
        if !path.is_file() {
            debug!("Skipping non-file entry {}", path.display());
            continue;
        }
        images.push(path);
    }

    if sort {
        images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }
    debug!("Found {} images in {}", images.len(), folder.display());
    Ok(images)
}

fn folder_error(folder: &Path, e: std::io::Error) -> ContactsError {
    let path = folder.to_path_buf();
    match e.kind() {
        ErrorKind::NotFound => ContactsError::FolderNotFound { path },
        ErrorKind::PermissionDenied => ContactsError::PermissionDenied { path },
        ErrorKind::NotADirectory => ContactsError::NotADirectory { path },
        _ if folder.is_file() => ContactsError::NotADirectory { path },
        _ => ContactsError::FolderReadFailed { path, source: e },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a.png")));
        assert!(is_image_file(Path::new("dir/B.JPG")));
        assert!(is_image_file(Path::new("scan.Jpeg")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("photo.png.bak")));
        assert!(!is_image_file(Path::new("gif.gif")));
        assert!(!is_image_file(Path::new("")));
    }

    #[test]
    fn lists_only_images_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.jpeg", "a.PNG", "b.jpg", "readme.md", "data.csv"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/d.png"), b"x").unwrap();

        let images = list_images(dir.path(), true).unwrap();
        let names: Vec<String> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg", "c.jpeg"]);
    }

    #[test]
    fn unsorted_listing_has_same_members() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["z.png", "y.jpg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let mut images = list_images(dir.path(), false).unwrap();
        images.sort();
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn missing_folder() {
        let err = list_images(Path::new("/no/such/folder/anywhere"), true).unwrap_err();
        assert!(matches!(err, ContactsError::FolderNotFound { .. }), "{err}");
    }

    #[test]
    fn file_instead_of_folder() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.png");
        std::fs::write(&file, b"x").unwrap();
        let err = list_images(&file, true).unwrap_err();
        assert!(matches!(err, ContactsError::NotADirectory { .. }), "{err}");
    }
}
