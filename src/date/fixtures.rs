//! EXIF byte builders shared by the unit tests and the integration tests.

use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};

fn ascii(fields: &[(Tag, &str)], ifd: In) -> Vec<Field> {
    fields
        .iter()
        .map(|(tag, v)| Field {
            tag: *tag,
            ifd_num: ifd,
            value: Value::Ascii(vec![v.as_bytes().to_vec()]),
        })
        .collect()
}

/// TIFF-structured RAW: primary ASCII fields, IFD1 ASCII fields and an
/// optional JPEG preview referenced from IFD1. `primary` must not be empty.
pub fn raw_with(primary: &[(Tag, &str)], thumbnail: &[(Tag, &str)], preview: Option<&[u8]>) -> Vec<u8> {
    let mut fields = ascii(primary, In::PRIMARY);
    fields.extend(ascii(thumbnail, In::THUMBNAIL));

    let mut writer = Writer::new();
    for f in &fields {
        writer.push_field(f);
    }
    if let Some(jpeg) = preview {
        writer.set_jpeg(jpeg, In::THUMBNAIL);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).unwrap();
    buf.into_inner()
}

/// TIFF stream carrying the given primary-IFD ASCII fields.
pub fn tiff_with(fields: &[(Tag, &str)]) -> Vec<u8> {
    raw_with(fields, &[], None)
}

/// Minimal JPEG: SOI, APP1 Exif segment, EOI.
pub fn jpeg_with(fields: &[(Tag, &str)]) -> Vec<u8> {
    let tiff = tiff_with(fields);
    let len = (2 + 6 + tiff.len()) as u16;
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}
