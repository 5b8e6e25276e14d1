use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Standard image containers read through the EXIF reader
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic", "heif", "png", "tif", "tiff"];

/// RAW formats read through the RAW decoder
pub const RAW_EXTENSIONS: &[&str] = &["dng", "raw", "nef", "cr2", "arw"];

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// 360° camera footage (Insta360)
pub const VIDEO360_EXTENSIONS: &[&str] = &["insv"];

/// Which strategy chain a file goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    RawPhoto,
    Video,
    Video360,
}

impl MediaKind {
    /// Label used in reports: RAW files are reported as photos.
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Photo | MediaKind::RawPhoto => "Photo",
            MediaKind::Video => "Video",
            MediaKind::Video360 => "Video360",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowercased final extension, without the dot
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Classify a file by extension. `None` means unsupported.
pub fn classify(path: &Path) -> Option<MediaKind> {
    let ext = extension_of(path)?;
    let ext = ext.as_str();

    if IMAGE_EXTENSIONS.contains(&ext) {
        Some(MediaKind::Photo)
    } else if RAW_EXTENSIONS.contains(&ext) {
        Some(MediaKind::RawPhoto)
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        Some(MediaKind::Video)
    } else if VIDEO360_EXTENSIONS.contains(&ext) {
        Some(MediaKind::Video360)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(Path::new("a.jpg")), Some(MediaKind::Photo));
        assert_eq!(classify(Path::new("dir/IMG_0001.HEIC")), Some(MediaKind::Photo));
        assert_eq!(classify(Path::new("c.dng")), Some(MediaKind::RawPhoto));
        assert_eq!(classify(Path::new("x.CR2")), Some(MediaKind::RawPhoto));
        assert_eq!(classify(Path::new("b.mp4")), Some(MediaKind::Video));
        assert_eq!(classify(Path::new("VID_20230501.insv")), Some(MediaKind::Video360));
        assert_eq!(classify(Path::new("notes.txt")), None);
        assert_eq!(classify(Path::new("no_extension")), None);
    }

    #[test]
    fn test_raw_reported_as_photo() {
        assert_eq!(MediaKind::RawPhoto.label(), "Photo");
        assert_eq!(MediaKind::Video360.to_string(), "Video360");
    }
}
