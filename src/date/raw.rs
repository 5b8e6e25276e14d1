use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use exif::{Exif, In, Tag};

use super::exif::{ascii_fields, read_container, PHOTO_DATE_TAGS, TAG_DATE_TIME};
use crate::error::ResolveError;

/// Embedded preview of a RAW file and the metadata it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thumbnail {
    pub datetime: Option<String>,
}

/// An opened RAW file. Dropping it releases the file.
pub trait RawImage {
    /// `Ok(None)` when the file has no embedded thumbnail.
    fn extract_thumbnail(&self) -> Result<Option<Thumbnail>, ResolveError>;
}

pub trait RawDecoder: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn RawImage>, ResolveError>;
}

/// Decoder for TIFF-structured RAW formats (DNG, NEF, CR2, ARW).
/// The thumbnail is IFD1.
#[derive(Debug, Default, Clone, Copy)]
pub struct TiffRawDecoder;

impl RawDecoder for TiffRawDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn RawImage>, ResolveError> {
        let file = File::open(path)
            .map_err(|e| ResolveError::unavailable(format!("cannot open RAW file: {}", e)))?;
        let exif = read_container(&mut BufReader::new(file))?;
        Ok(Box::new(TiffRaw { exif }))
    }
}

struct TiffRaw {
    exif: Exif,
}

impl TiffRaw {
    /// JPEG bytes referenced by IFD1, if the offsets point inside the TIFF data.
    fn embedded_jpeg(&self) -> Option<&[u8]> {
        let offset = self
            .exif
            .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
            .value
            .get_uint(0)? as usize;
        let len = self
            .exif
            .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
            .value
            .get_uint(0)? as usize;
        self.exif.buf().get(offset..offset.checked_add(len)?)
    }
}

impl RawImage for TiffRaw {
    fn extract_thumbnail(&self) -> Result<Option<Thumbnail>, ResolveError> {
        if !self.exif.fields().any(|f| f.ifd_num == In::THUMBNAIL) {
            return Ok(None);
        }

        // Prefer the preview's own EXIF, then the IFD1 tags describing it
        let datetime = self
            .embedded_jpeg()
            .and_then(jpeg_datetime)
            .or_else(|| ascii_fields(&self.exif, In::THUMBNAIL).remove(&TAG_DATE_TIME));

        Ok(Some(Thumbnail { datetime }))
    }
}

fn jpeg_datetime(jpeg: &[u8]) -> Option<String> {
    let exif = read_container(&mut Cursor::new(jpeg)).ok()?;
    let mut tags = ascii_fields(&exif, In::PRIMARY);
    PHOTO_DATE_TAGS.iter().find_map(|t| tags.remove(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::fixtures::{jpeg_with, raw_with, tiff_with};

    #[test]
    fn test_thumbnail_jpeg_datetime() {
        let jpeg = jpeg_with(&[(Tag::DateTimeOriginal, "2021:08:15 09:10:11")]);
        assert_eq!(jpeg_datetime(&jpeg).as_deref(), Some("2021:08:15 09:10:11"));
        assert_eq!(jpeg_datetime(b"\xFF\xD8\xFF\xD9"), None);
    }

    #[test]
    fn test_no_ifd1_means_no_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.dng");
        std::fs::write(&path, tiff_with(&[(Tag::Make, "ACME")])).unwrap();

        let raw = TiffRawDecoder.open(&path).unwrap();
        assert_eq!(raw.extract_thumbnail().unwrap(), None);
    }

    fn open_raw(bytes: &[u8]) -> Option<Thumbnail> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.nef");
        std::fs::write(&path, bytes).unwrap();
        TiffRawDecoder.open(&path).unwrap().extract_thumbnail().unwrap()
    }

    #[test]
    fn test_preview_jpeg_datetime() {
        let preview = jpeg_with(&[(Tag::DateTimeOriginal, "2021:08:15 09:10:11")]);
        let raw = raw_with(
            &[(Tag::Make, "ACME"), (Tag::DateTime, "1999:09:09 09:09:09")],
            &[(Tag::DateTime, "2000:01:01 00:00:00")],
            Some(&preview),
        );
        let thumb = open_raw(&raw).unwrap();
        assert_eq!(thumb.datetime.as_deref(), Some("2021:08:15 09:10:11"));
    }

    #[test]
    fn test_ifd1_datetime_without_preview() {
        let raw = raw_with(&[(Tag::Make, "ACME")], &[(Tag::DateTime, "2020:02:02 20:20:20")], None);
        let thumb = open_raw(&raw).unwrap();
        assert_eq!(thumb.datetime.as_deref(), Some("2020:02:02 20:20:20"));
    }

    #[test]
    fn test_preview_without_dates_falls_back_to_ifd1() {
        let preview = jpeg_with(&[(Tag::Make, "ACME")]);
        let raw = raw_with(&[(Tag::Make, "ACME")], &[(Tag::DateTime, "2020:02:02 20:20:20")], Some(&preview));
        let thumb = open_raw(&raw).unwrap();
        assert_eq!(thumb.datetime.as_deref(), Some("2020:02:02 20:20:20"));
    }

    #[test]
    fn test_thumbnail_without_datetime() {
        let raw = raw_with(&[(Tag::Make, "ACME")], &[(Tag::ImageDescription, "preview")], None);
        assert_eq!(open_raw(&raw), Some(Thumbnail { datetime: None }));
    }

    #[test]
    fn test_unreadable_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.dng");
        std::fs::write(&path, b"definitely not a tiff").unwrap();
        assert!(TiffRawDecoder.open(&path).is_err());
        assert!(TiffRawDecoder.open(&dir.path().join("missing.nef")).is_err());
    }
}
