use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Value};

use crate::error::ResolveError;

pub const TAG_DATE_TIME: u16 = 306;
pub const TAG_DATE_TIME_ORIGINAL: u16 = 36867;
pub const TAG_DATE_TIME_DIGITIZED: u16 = 36868;

/// Photo date tags in priority order: the first one present decides.
pub const PHOTO_DATE_TAGS: [u16; 3] = [TAG_DATE_TIME, TAG_DATE_TIME_ORIGINAL, TAG_DATE_TIME_DIGITIZED];

pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Reads the embedded tag set of a standard image.
pub trait ImageMetadataReader: Send + Sync {
    /// Tag number -> string value for the primary image.
    fn read_tags(&self, path: &Path) -> Result<HashMap<u16, String>, ResolveError>;
}

/// EXIF reader for JPEG, TIFF, HEIF and PNG containers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifReader;

impl ImageMetadataReader for ExifReader {
    fn read_tags(&self, path: &Path) -> Result<HashMap<u16, String>, ResolveError> {
        let file = File::open(path)
            .map_err(|e| ResolveError::unavailable(format!("cannot open image: {}", e)))?;
        let exif = read_container(&mut BufReader::new(file))?;
        Ok(ascii_fields(&exif, In::PRIMARY))
    }
}

pub(crate) fn read_container<R: std::io::BufRead + std::io::Seek>(
    reader: &mut R,
) -> Result<Exif, ResolveError> {
    Reader::new().read_from_container(reader).map_err(|e| match e {
        exif::Error::NotFound(_) => ResolveError::unavailable("no EXIF block"),
        other => ResolveError::malformed(other.to_string()),
    })
}

/// ASCII fields of one IFD, keyed by tag number.
/// Values are trimmed; empty values are dropped.
pub(crate) fn ascii_fields(exif: &Exif, ifd: In) -> HashMap<u16, String> {
    exif.fields()
        .filter(|f| f.ifd_num == ifd)
        .filter_map(|f| match &f.value {
            Value::Ascii(parts) => {
                let raw = parts.iter().find(|p| !p.is_empty())?;
                let s = String::from_utf8_lossy(raw)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string();
                (!s.is_empty()).then(|| (f.tag.number(), s))
            }
            _ => None,
        })
        .collect()
}

/// Strict EXIF datetime: `YYYY:MM:DD HH:MM:SS`
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), EXIF_DATETIME_FORMAT).ok()
}

/// The first of [`PHOTO_DATE_TAGS`] present in `tags` decides the date.
/// If that value does not parse the strategy fails; later tags are not consulted.
pub fn pick_photo_date(tags: &HashMap<u16, String>) -> Result<NaiveDateTime, ResolveError> {
    let value = PHOTO_DATE_TAGS
        .iter()
        .find_map(|tag| tags.get(tag))
        .ok_or_else(|| ResolveError::unavailable("no date tags"))?;

    parse_exif_datetime(value)
        .ok_or_else(|| ResolveError::malformed(format!("date tag {:?}", value)))
}
