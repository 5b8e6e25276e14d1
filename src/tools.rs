use std::env;
use std::path::{Path, PathBuf};

/// Environment override for the ffprobe executable
pub const FFPROBE_ENV: &str = "MEDIASTAMP_FFPROBE";

/// Where ffprobe usually lives when it is not on PATH
#[cfg(target_os = "macos")]
const FFPROBE_FALLBACK: &str = "/opt/homebrew/bin/ffprobe";
#[cfg(all(unix, not(target_os = "macos")))]
const FFPROBE_FALLBACK: &str = "/usr/bin/ffprobe";
#[cfg(windows)]
const FFPROBE_FALLBACK: &str = "ffprobe.exe";

/// Resolve the ffprobe executable once.
/// Order: explicit path, `MEDIASTAMP_FFPROBE`, PATH search, platform fallback.
/// Never fails; a missing tool only shows up when the probe is run.
pub fn ffprobe_path(explicit: Option<&Path>) -> PathBuf {
    resolve_tool(explicit, FFPROBE_ENV, "ffprobe", FFPROBE_FALLBACK)
}

fn resolve_tool(explicit: Option<&Path>, env_key: &str, name: &str, fallback: &str) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    if let Ok(v) = env::var(env_key) {
        let p = PathBuf::from(&v);
        if p.is_file() {
            return p;
        }
        log::warn!("{} points at {}, which does not exist; ignoring", env_key, v);
    }

    match which::which(name) {
        Ok(p) => p,
        Err(_) => {
            log::debug!("{} not found on PATH, assuming {}", name, fallback);
            PathBuf::from(fallback)
        }
    }
}
