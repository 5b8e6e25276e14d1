use std::io::{self, Write};

use serde::Serialize;

use crate::date::{Provenance, Source};
use crate::scan::Record;

pub const CSV_HEADER: [&str; 4] = ["Filename", "Type", "Date", "Method"];

/// One row of the JSON report
#[derive(Debug, Serialize)]
pub struct ReportRow<'a> {
    pub filename: &'a str,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub date: Option<String>,
    pub source: Option<Source>,
    pub status: &'static str,
}

impl<'a> From<&'a Record> for ReportRow<'a> {
    fn from(r: &'a Record) -> Self {
        Self {
            filename: &r.filename,
            path: r.path.display().to_string(),
            kind: kind_label(r),
            date: r.resolved.as_ref().map(|t| t.datetime.to_rfc3339()),
            source: r.resolved.as_ref().map(|t| t.source),
            status: r.status(),
        }
    }
}

fn kind_label(r: &Record) -> &'static str {
    r.kind.map_or("Unknown", |k| k.label())
}

fn method_label(r: &Record) -> &'static str {
    match (&r.kind, &r.resolved) {
        (None, _) => "Unsupported",
        (Some(_), Some(t)) => t.source.label(),
        (Some(_), None) => "None",
    }
}

/// Quote a CSV field when it contains a separator, quote or line break
fn csv_field(s: &str) -> std::borrow::Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\"")).into()
    } else {
        s.into()
    }
}

fn csv_line<W: Write>(out: &mut W, fields: &[&str]) -> io::Result<()> {
    let line: Vec<_> = fields.iter().map(|f| csv_field(f)).collect();
    writeln!(out, "{}", line.join(","))
}

/// `Filename,Type,Date,Method`
pub fn write_csv<W: Write>(records: &[Record], mut out: W) -> io::Result<()> {
    csv_line(&mut out, &CSV_HEADER)?;
    for r in records {
        let date = r
            .resolved
            .as_ref()
            .map(|t| t.datetime.to_rfc3339())
            .unwrap_or_default();
        csv_line(&mut out, &[r.filename.as_str(), kind_label(r), date.as_str(), method_label(r)])?;
    }
    out.flush()
}

pub fn write_json<W: Write>(records: &[Record], out: W) -> serde_json::Result<()> {
    let rows: Vec<ReportRow> = records.iter().map(ReportRow::from).collect();
    serde_json::to_writer_pretty(out, &rows)
}

/// One `[filename] ...` line per record, in the order given
pub fn write_ledger<W: Write>(records: &[Record], mut out: W) -> io::Result<()> {
    for r in records {
        match (&r.kind, &r.resolved) {
            (None, _) => writeln!(out, "[{}] Unsupported format", r.filename)?,
            (Some(_), Some(t)) if t.source.provenance() == Provenance::Fallback => writeln!(
                out,
                "[{}] {} | No metadata | fallback time {}",
                r.filename,
                kind_label(r),
                t.datetime.to_rfc3339()
            )?,
            (Some(_), Some(t)) => writeln!(
                out,
                "[{}] {} | OK | {} ({})",
                r.filename,
                kind_label(r),
                t.datetime.to_rfc3339(),
                t.source.label()
            )?,
            (Some(_), None) => writeln!(out, "[{}] {} | ERROR: no timestamp", r.filename, kind_label(r))?,
        }
    }
    out.flush()
}

/// Human-readable line for the console
pub fn console_line(r: &Record) -> String {
    match (&r.kind, &r.resolved) {
        (None, _) => format!("{}: unsupported format", r.filename),
        (Some(kind), Some(t)) => format!(
            "{} [{}] {} ({})",
            r.filename,
            kind,
            t.datetime.to_rfc3339(),
            t.source.label()
        ),
        (Some(kind), None) => format!("{} [{}] no timestamp", r.filename, kind),
    }
}
