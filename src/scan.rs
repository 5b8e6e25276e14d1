use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use rayon::prelude::*;

use crate::date::{Provenance, ResolvedTimestamp, Resolver};
use crate::media::{self, MediaKind};

/// Called once per finished file: (done, total, path)
pub type ProgressCallback<'a> = dyn Fn(u64, u64, &Path) + Send + Sync + 'a;

/// Outcome for one input file
#[derive(Debug, Clone)]
pub struct Record {
    pub path: PathBuf,
    /// Just the filename
    pub filename: String,
    /// None for unsupported extensions
    pub kind: Option<MediaKind>,
    pub resolved: Option<ResolvedTimestamp>,
}

impl Record {
    pub fn is_supported(&self) -> bool {
        self.kind.is_some()
    }

    pub fn provenance(&self) -> Provenance {
        Provenance::of(self.resolved.as_ref())
    }

    /// "metadata", "fallback", "unresolved" or "unsupported"
    pub fn status(&self) -> &'static str {
        if !self.is_supported() {
            return "unsupported";
        }
        match self.provenance() {
            Provenance::Metadata => "metadata",
            Provenance::Fallback => "fallback",
            Provenance::Unresolved => "unresolved",
        }
    }
}

/// Expand inputs into regular files.
/// Directories contribute their files sorted by path; nested directories only when `recursive`.
pub fn collect_files(inputs: &[PathBuf], recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            collect_dir(input, recursive, &mut found)
                .with_context(|| format!("cannot read directory {}", input.display()))?;
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn collect_dir(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if recursive {
                collect_dir(&path, recursive, files)?;
            }
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// Classify and resolve every file. Files are resolved in parallel; the
/// result keeps input order.
pub fn resolve_all(resolver: &Resolver, files: &[PathBuf], progress: &ProgressCallback<'_>) -> Vec<Record> {
    let total = files.len() as u64;
    let done = AtomicU64::new(0);

    files
        .par_iter()
        .map(|path| {
            let record = resolve_one(resolver, path);
            let current = done.fetch_add(1, Ordering::Relaxed) + 1;
            progress(current, total, path);
            record
        })
        .collect()
}

pub fn resolve_one(resolver: &Resolver, path: &Path) -> Record {
    let kind = media::classify(path);
    let resolved = match kind {
        Some(kind) => resolver.resolve(path, kind),
        None => {
            log::warn!("{}: unsupported format", path.display());
            None
        }
    };

    Record {
        path: path.to_path_buf(),
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        kind,
        resolved,
    }
}
