pub mod exif;
pub mod raw;
pub mod video;

#[cfg(test)]
pub(crate) mod fixtures;

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ResolveError};
use crate::media::{self, MediaKind};

use self::exif::{ExifReader, ImageMetadataReader};
use self::raw::{RawDecoder, TiffRawDecoder};
use self::video::{Ffprobe, VideoProber};

/// Which strategy produced a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// EXIF tags of a standard image
    Exif,
    /// Metadata of a RAW file's embedded thumbnail
    RawThumbnail,
    /// Container format tags reported by ffprobe
    ContainerTag,
    /// Filesystem modification time
    FileModified,
}

impl Source {
    pub fn provenance(self) -> Provenance {
        match self {
            Source::Exif | Source::RawThumbnail | Source::ContainerTag => Provenance::Metadata,
            Source::FileModified => Provenance::Fallback,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Source::Exif => "EXIF",
            Source::RawThumbnail => "RAW thumbnail",
            Source::ContainerTag => "container tag",
            Source::FileModified => "file time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Metadata,
    Fallback,
    Unresolved,
}

impl Provenance {
    pub fn of(resolved: Option<&ResolvedTimestamp>) -> Self {
        resolved.map_or(Provenance::Unresolved, |r| r.source.provenance())
    }
}

/// A timestamp localized to the resolver's zone, plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    pub datetime: DateTime<Tz>,
    pub source: Source,
}

impl ResolvedTimestamp {
    pub fn provenance(&self) -> Provenance {
        self.source.provenance()
    }
}

/// Last-modified time of a file.
pub trait FileClock: Send + Sync {
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsClock;

impl FileClock for FsClock {
    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// IANA zone name all results are expressed in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Explicit ffprobe executable; looked up when absent
    #[serde(default)]
    pub ffprobe: Option<PathBuf>,
    /// Upper bound for one ffprobe run, in seconds
    #[serde(default)]
    pub probe_timeout_secs: Option<u64>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            ffprobe: None,
            probe_timeout_secs: None,
        }
    }
}

/// One metadata source in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Exif,
    RawThumbnail,
    ContainerTags,
}

const IMAGE_CHAIN: &[Strategy] = &[Strategy::Exif];
const RAW_CHAIN: &[Strategy] = &[Strategy::RawThumbnail];
const VIDEO_CHAIN: &[Strategy] = &[Strategy::ContainerTags];

/// Resolves one creation timestamp per file.
///
/// Built once per run and shared; it holds no per-call state. Every metadata
/// failure advances to the next strategy and finally to the file's
/// modification time. `None` only when that is unreadable too.
pub struct Resolver {
    tz: Tz,
    ffprobe: PathBuf,
    images: Box<dyn ImageMetadataReader>,
    raw: Box<dyn RawDecoder>,
    video: Box<dyn VideoProber>,
    clock: Box<dyn FileClock>,
}

impl Resolver {
    pub fn new(options: &ResolverOptions) -> Result<Self, ConfigError> {
        let tz = Tz::from_str(&options.timezone)
            .map_err(|_| ConfigError::UnknownTimezone(options.timezone.clone()))?;
        let ffprobe = crate::tools::ffprobe_path(options.ffprobe.as_deref());
        log::debug!("Using ffprobe at {}", ffprobe.display());

        let prober = Ffprobe::new(&ffprobe)
            .with_timeout(options.probe_timeout_secs.map(Duration::from_secs));

        Ok(Self {
            tz,
            ffprobe,
            images: Box::new(ExifReader),
            raw: Box::new(TiffRawDecoder),
            video: Box::new(prober),
            clock: Box::new(FsClock),
        })
    }

    /// Resolver with default options and the given zone.
    pub fn with_timezone(timezone: &str) -> Result<Self, ConfigError> {
        Self::new(&ResolverOptions {
            timezone: timezone.to_string(),
            ..Default::default()
        })
    }

    pub fn with_image_reader(mut self, reader: impl ImageMetadataReader + 'static) -> Self {
        self.images = Box::new(reader);
        self
    }

    pub fn with_raw_decoder(mut self, decoder: impl RawDecoder + 'static) -> Self {
        self.raw = Box::new(decoder);
        self
    }

    pub fn with_video_prober(mut self, prober: impl VideoProber + 'static) -> Self {
        self.video = Box::new(prober);
        self
    }

    pub fn with_clock(mut self, clock: impl FileClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// ffprobe path resolved at construction
    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe
    }

    /// Dispatch on media kind.
    pub fn resolve(&self, path: &Path, kind: MediaKind) -> Option<ResolvedTimestamp> {
        match kind {
            MediaKind::Photo | MediaKind::RawPhoto => self.resolve_photo(path),
            MediaKind::Video => self.resolve_video(path, false),
            MediaKind::Video360 => self.resolve_video360(path),
        }
    }

    /// EXIF (standard images) or embedded thumbnail (RAW), then file time.
    /// The sub-strategy is picked by extension.
    pub fn resolve_photo(&self, path: &Path) -> Option<ResolvedTimestamp> {
        let chain: &[Strategy] = match media::classify(path) {
            Some(MediaKind::Photo) => IMAGE_CHAIN,
            Some(MediaKind::RawPhoto) => RAW_CHAIN,
            _ => &[],
        };
        self.run_chain(path, chain, false)
            .or_else(|| self.file_time(path))
    }

    /// Container tags via ffprobe, then file time.
    /// `suppress_errors` turns per-file warnings into debug output.
    pub fn resolve_video(&self, path: &Path, suppress_errors: bool) -> Option<ResolvedTimestamp> {
        self.run_chain(path, VIDEO_CHAIN, suppress_errors)
            .or_else(|| self.file_time(path))
    }

    /// 360° footage: container tags without warnings, then file time.
    /// These containers rarely carry a usable date, so falling back is only noted at info level.
    pub fn resolve_video360(&self, path: &Path) -> Option<ResolvedTimestamp> {
        if let Some(hit) = self.run_chain(path, VIDEO_CHAIN, true) {
            return Some(hit);
        }
        let resolved = self.file_time(path)?;
        log::info!("{}: 360° video, date taken from file time", display_name(path));
        Some(resolved)
    }

    fn run_chain(&self, path: &Path, chain: &[Strategy], quiet: bool) -> Option<ResolvedTimestamp> {
        for &strategy in chain {
            match self.run_strategy(strategy, path, quiet) {
                Ok((naive, source)) => {
                    return Some(ResolvedTimestamp {
                        datetime: self.localize(naive),
                        source,
                    })
                }
                Err(e) => report_failure(strategy, path, &e, quiet),
            }
        }
        None
    }

    fn run_strategy(
        &self,
        strategy: Strategy,
        path: &Path,
        quiet: bool,
    ) -> Result<(NaiveDateTime, Source), ResolveError> {
        match strategy {
            Strategy::Exif => {
                let tags = self.images.read_tags(path)?;
                Ok((exif::pick_photo_date(&tags)?, Source::Exif))
            }
            Strategy::RawThumbnail => {
                let raw = self.raw.open(path)?;
                let thumb = raw
                    .extract_thumbnail()?
                    .ok_or_else(|| ResolveError::unavailable("no embedded thumbnail"))?;
                let value = thumb
                    .datetime
                    .ok_or_else(|| ResolveError::unavailable("thumbnail has no datetime"))?;
                let dt = exif::parse_exif_datetime(&value)
                    .ok_or_else(|| ResolveError::malformed(format!("thumbnail date {:?}", value)))?;
                Ok((dt, Source::RawThumbnail))
            }
            Strategy::ContainerTags => {
                let tags = self.video.format_tags(path)?;
                let picked = video::pick_container_date(&tags);
                if !quiet {
                    for (key, value) in &picked.sentinels {
                        log::warn!(
                            "{}: {} is {}, the date is probably missing",
                            display_name(path),
                            key,
                            value
                        );
                    }
                }
                Ok((picked.date?, Source::ContainerTag))
            }
        }
    }

    /// Modification time in the configured zone; the terminal fallback.
    fn file_time(&self, path: &Path) -> Option<ResolvedTimestamp> {
        match self.clock.modified(path) {
            Ok(mtime) => Some(ResolvedTimestamp {
                datetime: DateTime::<Utc>::from(mtime).with_timezone(&self.tz),
                source: Source::FileModified,
            }),
            Err(e) => {
                log::debug!("{}: {}", display_name(path), ResolveError::from(e));
                None
            }
        }
    }

    /// Attach the configured zone to a wall-clock time.
    /// DST folds take the standard-time (later) instant; times inside a DST gap are pushed past it.
    pub fn localize(&self, naive: NaiveDateTime) -> DateTime<Tz> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(_, latest) => latest,
            LocalResult::None => self
                .tz
                .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
                .unwrap_or_else(|| self.tz.from_utc_datetime(&naive)),
        }
    }
}

fn report_failure(strategy: Strategy, path: &Path, err: &ResolveError, quiet: bool) {
    let name = display_name(path);
    if quiet || err.is_routine() {
        log::debug!("{}: {:?} gave nothing: {}", name, strategy, err);
        return;
    }
    match (strategy, err) {
        // already warned per key
        (_, ResolveError::SentinelEpoch { .. }) => {}
        (Strategy::Exif, e) => log::warn!("{}: error parsing photo EXIF: {}", name, e),
        (Strategy::RawThumbnail, e) => log::warn!("{}: RAW thumbnail fallback failed: {}", name, e),
        (Strategy::ContainerTags, e) => {
            log::warn!("{}: ffprobe could not read the file, using file time: {}", name, e)
        }
    }
}

fn display_name(path: &Path) -> std::borrow::Cow<'_, str> {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy())
}
