// ffprobe wrapper for container-level format tags

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDateTime};
use serde::Deserialize;

use crate::error::ResolveError;

/// Container tag keys in priority order
pub const VIDEO_DATE_KEYS: [&str; 2] = ["creation_time", "com.apple.quicktime.creationdate"];

pub const CONTAINER_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Year written by muxers that had no real date to record
pub const SENTINEL_YEAR: i32 = 1970;

const TOOL: &str = "ffprobe";

/// Dumps container format tags for a video file.
pub trait VideoProber: Send + Sync {
    fn format_tags(&self, path: &Path) -> Result<HashMap<String, String>, ResolveError>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    tags: Option<HashMap<String, serde_json::Value>>,
}

/// Runs `ffprobe -show_format` as a blocking subprocess.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    path: PathBuf,
    timeout: Option<Duration>,
}

impl Ffprobe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: None,
        }
    }

    /// Kill the probe if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn command(&self, file: &Path) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(file)
            .stdin(Stdio::null());
        cmd
    }

    fn spawn_error(&self, e: io::Error) -> ResolveError {
        match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => ResolveError::ToolUnavailable {
                tool: TOOL,
                path: self.path.clone(),
                reason: e.to_string(),
            },
            _ => failed(format!("failed to run: {}", e)),
        }
    }

    fn run(&self, file: &Path) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), ResolveError> {
        let mut cmd = self.command(file);
        let Some(limit) = self.timeout else {
            let output = cmd.output().map_err(|e| self.spawn_error(e))?;
            return Ok((output.status, output.stdout, output.stderr));
        };

        let mut child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Drain stdout on a separate thread so a chatty probe cannot block on a full pipe
        let mut stdout = child.stdout.take().ok_or_else(|| failed("stdout not captured"))?;
        let reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= limit => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(failed(format!("timed out after {:.1}s", limit.as_secs_f64())));
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(20)),
                Err(e) => return Err(failed(format!("wait failed: {}", e))),
            }
        };

        let stdout = reader
            .join()
            .map_err(|_| failed("stdout reader panicked"))?
            .map_err(|e| failed(format!("reading stdout: {}", e)))?;
        Ok((status, stdout, Vec::new()))
    }
}

impl VideoProber for Ffprobe {
    fn format_tags(&self, path: &Path) -> Result<HashMap<String, String>, ResolveError> {
        let (status, stdout, stderr) = self.run(path)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let stderr = stderr.trim();
            return Err(failed(if stderr.is_empty() {
                format!("exited with {}", status)
            } else {
                format!("exited with {}: {}", status, stderr)
            }));
        }

        parse_format_tags(&stdout)
    }
}

fn failed(reason: impl Into<String>) -> ResolveError {
    ResolveError::ToolFailed {
        tool: TOOL,
        reason: reason.into(),
    }
}

/// Extract `format.tags` from ffprobe JSON. Non-string tag values are ignored.
pub fn parse_format_tags(json: &[u8]) -> Result<HashMap<String, String>, ResolveError> {
    let output: FfprobeOutput = serde_json::from_slice(json)
        .map_err(|e| failed(format!("unparseable output: {}", e)))?;

    let tags = output
        .format
        .and_then(|f| f.tags)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect();
    Ok(tags)
}

/// Parse the first 19 characters of a container tag as `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_container_datetime(value: &str) -> Option<NaiveDateTime> {
    let head = value.get(..19)?;
    NaiveDateTime::parse_from_str(head, CONTAINER_DATETIME_FORMAT).ok()
}

/// Outcome of walking [`VIDEO_DATE_KEYS`].
#[derive(Debug)]
pub struct ContainerDate {
    pub date: Result<NaiveDateTime, ResolveError>,
    /// Sentinel values skipped on the way, in key order
    pub sentinels: Vec<(&'static str, String)>,
}

/// First key whose value parses to a non-1970 date wins.
/// Unparseable values are skipped silently; sentinel values are reported back.
pub fn pick_container_date(tags: &HashMap<String, String>) -> ContainerDate {
    let mut sentinels = Vec::new();

    for key in VIDEO_DATE_KEYS {
        let Some(value) = tags.get(key) else {
            continue;
        };
        let Some(dt) = parse_container_datetime(value) else {
            continue;
        };
        if dt.year() == SENTINEL_YEAR {
            sentinels.push((key, value.clone()));
            continue;
        }
        return ContainerDate {
            date: Ok(dt),
            sentinels,
        };
    }

    let date = match sentinels.first() {
        Some((_, value)) => Err(ResolveError::SentinelEpoch {
            value: value.clone(),
        }),
        None => Err(ResolveError::unavailable("no creation date tags")),
    };
    ContainerDate { date, sentinels }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parse_container_datetime() {
        let dt = parse_container_datetime("2022-11-03T18:04:05.000000Z").unwrap();
        assert_eq!(dt.to_string(), "2022-11-03 18:04:05");
        let dt = parse_container_datetime("2022-11-03T18:04:05+0300").unwrap();
        assert_eq!(dt.to_string(), "2022-11-03 18:04:05");
        assert!(parse_container_datetime("2022-11-03").is_none());
        assert!(parse_container_datetime("2022:11:03 18:04:05").is_none());
    }

    #[test]
    fn test_parse_format_tags() {
        let json = br#"{
            "format": {
                "filename": "b.mp4",
                "tags": {
                    "major_brand": "isom",
                    "creation_time": "2022-11-03T18:04:05.000000Z",
                    "track": 3
                }
            }
        }"#;
        let tags = parse_format_tags(json).unwrap();
        assert_eq!(tags.get("creation_time").map(String::as_str), Some("2022-11-03T18:04:05.000000Z"));
        assert!(!tags.contains_key("track"));

        assert!(parse_format_tags(br#"{"format": {}}"#).unwrap().is_empty());
        assert!(parse_format_tags(b"{}").unwrap().is_empty());
        assert!(matches!(parse_format_tags(b"not json"), Err(ResolveError::ToolFailed { .. })));
    }

    #[test]
    fn test_key_priority() {
        let t = tags(&[
            ("com.apple.quicktime.creationdate", "2021-06-01T10:00:00+0200"),
            ("creation_time", "2021-06-01T08:00:00.000000Z"),
        ]);
        let picked = pick_container_date(&t);
        assert_eq!(picked.date.unwrap().to_string(), "2021-06-01 08:00:00");
        assert!(picked.sentinels.is_empty());
    }

    #[test]
    fn test_sentinel_skipped_for_next_key() {
        let t = tags(&[
            ("creation_time", "1970-01-01T00:00:00.000000Z"),
            ("com.apple.quicktime.creationdate", "2021-06-01T10:00:00+0200"),
        ]);
        let picked = pick_container_date(&t);
        assert_eq!(picked.date.unwrap().to_string(), "2021-06-01 10:00:00");
        assert_eq!(picked.sentinels.len(), 1);
        assert_eq!(picked.sentinels[0].0, "creation_time");
    }

    #[test]
    fn test_only_sentinel() {
        let t = tags(&[("creation_time", "1970-01-01T00:00:00.000000Z")]);
        let picked = pick_container_date(&t);
        assert!(matches!(picked.date, Err(ResolveError::SentinelEpoch { .. })));
    }

    #[test]
    fn test_garbage_value_skipped_silently() {
        let t = tags(&[("creation_time", "yesterday")]);
        let picked = pick_container_date(&t);
        assert!(picked.date.unwrap_err().is_routine());
        assert!(picked.sentinels.is_empty());
    }

    #[test]
    fn test_missing_tool() {
        let probe = Ffprobe::new("/nonexistent/dir/ffprobe");
        let err = probe.format_tags(Path::new("b.mp4")).unwrap_err();
        assert!(matches!(err, ResolveError::ToolUnavailable { .. }));
    }
}
