#![allow(dead_code)]

use std::path::{Path, PathBuf};

use filetime::FileTime;

#[path = "../../src/date/fixtures.rs"]
mod fixtures;

pub use fixtures::{jpeg_with, raw_with, tiff_with};

/// 2022-04-15T05:20:00Z
pub const MTIME: i64 = 1_650_000_000;

/// Write `bytes` to `dir/name` and pin its modification time to [`MTIME`].
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    filetime::set_file_mtime(&path, FileTime::from_unix_time(MTIME, 0)).unwrap();
    path
}

/// Shell script standing in for ffprobe: prints `stdout` and exits with `code`.
#[cfg(unix)]
pub fn fake_ffprobe(dir: &Path, stdout: &str, code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffprobe");
    let script = format!("#!/bin/sh\ncat <<'JSON'\n{}\nJSON\nexit {}\n", stdout, code);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn ffprobe_json(tags: &[(&str, &str)]) -> String {
    let tags: serde_json::Map<String, serde_json::Value> = tags
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    serde_json::json!({ "format": { "format_name": "mov,mp4", "tags": tags } }).to_string()
}
