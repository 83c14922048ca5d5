// ============================================================
// Layer 4: Image Folder Scanner
// ============================================================
// Lists images laid out one directory per class:
//
//   data/17_flowers/train/
//     Daffodil/   image_0001.jpg  image_0002.jpg ...
//     Snowdrop/   image_0081.jpg  ...
//     ...
//
// Class directories are looked up by the names from the class-name
// file, so the label of a sample is the index of its class in that
// file, not the alphabetical position of its directory.
//
// Only the image header is probed here (cheap); pixels are decoded
// later by the batcher on the DataLoader worker threads.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::class_names::ClassNames;
use crate::domain::sample::ImageSample;
use crate::domain::traits::SampleSource;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Scans a directory-per-class image tree.
/// Implements the SampleSource trait from Layer 3.
pub struct ImageFolder {
    root: PathBuf,
}

impl ImageFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SampleSource for ImageFolder {
    fn load_samples(&self, classes: &ClassNames) -> Result<Vec<ImageSample>> {
        if !self.root.is_dir() {
            bail!("Image folder '{}' does not exist", self.root.display());
        }
        if classes.is_empty() {
            bail!("No class names to look up in '{}'", self.root.display());
        }

        let mut samples = Vec::new();

        for (label, class_name) in classes.iter().enumerate() {
            let class_dir = self.root.join(class_name);
            if !class_dir.is_dir() {
                tracing::warn!(
                    "Class directory '{}' is missing, no samples for '{}'",
                    class_dir.display(),
                    class_name
                );
                continue;
            }

            let before = samples.len();
            for path in list_images(&class_dir)? {
                // Probe the header so broken files never reach a worker
                match image::image_dimensions(&path) {
                    Ok(_)  => samples.push(ImageSample::new(path, label)),
                    Err(e) => tracing::warn!("Skipping '{}': {}", path.display(), e),
                }
            }
            tracing::debug!(
                "Class {} '{}': {} images",
                label,
                class_name,
                samples.len() - before
            );
        }

        tracing::info!(
            "Found {} images in '{}'",
            samples.len(),
            self.root.display()
        );
        Ok(samples)
    }
}

/// Image files directly inside `dir`, sorted by path.
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path) {
        image::RgbImage::new(4, 4).save(path).unwrap();
    }

    #[test]
    fn test_labels_follow_class_file_order() {
        let dir = tempfile::tempdir().unwrap();
        for class in ["Tulip", "Daffodil"] {
            fs::create_dir(dir.path().join(class)).unwrap();
        }
        write_png(&dir.path().join("Tulip").join("a.png"));
        write_png(&dir.path().join("Daffodil").join("b.png"));
        write_png(&dir.path().join("Daffodil").join("a.png"));

        // Class file order is Tulip, Daffodil, not alphabetical
        let classes = ClassNames::parse("Tulip\nDaffodil\n", 2).unwrap();
        let samples = ImageFolder::new(dir.path()).load_samples(&classes).unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].label, 0);
        assert!(samples[0].path.ends_with("Tulip/a.png"));
        // Sorted within the class directory
        assert_eq!(samples[1].label, 1);
        assert!(samples[1].path.ends_with("Daffodil/a.png"));
        assert!(samples[2].path.ends_with("Daffodil/b.png"));
    }

    #[test]
    fn test_skips_non_images_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let class_dir = dir.path().join("Iris");
        fs::create_dir(&class_dir).unwrap();
        write_png(&class_dir.join("good.PNG"));
        fs::write(class_dir.join("notes.txt"), "hello").unwrap();
        fs::write(class_dir.join("broken.jpg"), b"not a jpeg").unwrap();

        let classes = ClassNames::parse("Iris\n", 1).unwrap();
        let samples = ImageFolder::new(dir.path()).load_samples(&classes).unwrap();

        assert_eq!(samples.len(), 1);
        assert!(samples[0].path.ends_with("good.PNG"));
    }

    #[test]
    fn test_missing_class_directory_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Iris")).unwrap();
        write_png(&dir.path().join("Iris").join("x.png"));

        let classes = ClassNames::parse("Iris\nPansy\n", 2).unwrap();
        let samples = ImageFolder::new(dir.path()).load_samples(&classes).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label, 0);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let classes = ClassNames::parse("Iris\n", 1).unwrap();
        let result = ImageFolder::new(dir.path().join("nope")).load_samples(&classes);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_class_names_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let classes = ClassNames::parse("", 0).unwrap();
        assert!(ImageFolder::new(dir.path()).load_samples(&classes).is_err());
    }
}
