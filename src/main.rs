use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use mediastamp::{report, scan, Provenance, Resolver, ResolverOptions};

#[derive(Parser)]
#[command(name = "mediastamp", version, about = "Resolve creation timestamps for photos, RAW images and videos")]
struct Cli {
    /// Files or directories to inspect
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// IANA timezone results are expressed in
    #[arg(short, long, default_value = "UTC")]
    timezone: String,

    /// ffprobe executable (default: $MEDIASTAMP_FFPROBE, then PATH)
    #[arg(long)]
    ffprobe: Option<PathBuf>,

    /// Kill ffprobe after this many seconds
    #[arg(long)]
    probe_timeout: Option<u64>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Write a Filename,Type,Date,Method CSV report
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write a per-file text ledger
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Write a JSON report ("-" for stdout)
    #[arg(long)]
    json: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only errors, no progress bar
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    let t_total = std::time::Instant::now();

    let options = ResolverOptions {
        timezone: cli.timezone.clone(),
        ffprobe: cli.ffprobe.clone(),
        probe_timeout_secs: cli.probe_timeout,
    };
    let resolver = Resolver::new(&options)?;
    log::debug!("ffprobe: {}", resolver.ffprobe_path().display());

    let files = scan::collect_files(&cli.inputs, cli.recursive)?;
    if files.is_empty() {
        log::warn!("No files found. Nothing to do.");
        return Ok(());
    }
    log::info!("Analyzing {} file(s) in {}", files.len(), resolver.timezone());

    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(files.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} {msg}")
            .context("progress template")?,
    );

    let records = scan::resolve_all(&resolver, &files, &|_, _, path| {
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        pb.inc(1);
    });
    pb.finish_and_clear();

    for r in &records {
        println!("{}", report::console_line(r));
    }

    if let Some(path) = &cli.csv {
        let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        report::write_csv(&records, BufWriter::new(file))?;
        log::info!("CSV report written to {}", path.display());
    }

    if let Some(path) = &cli.ledger {
        let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        report::write_ledger(&records, BufWriter::new(file))?;
        log::info!("Ledger written to {}", path.display());
    }

    if let Some(path) = &cli.json {
        if path.as_os_str() == "-" {
            report::write_json(&records, io::stdout().lock())?;
            println!();
        } else {
            let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
            report::write_json(&records, BufWriter::new(file))?;
            log::info!("JSON report written to {}", path.display());
        }
    }

    let count = |p: Provenance| records.iter().filter(|r| r.is_supported() && r.provenance() == p).count();
    log::info!(
        "Done! {} from metadata, {} from file time, {} unresolved, {} unsupported ({:.2}s)",
        count(Provenance::Metadata),
        count(Provenance::Fallback),
        count(Provenance::Unresolved),
        records.iter().filter(|r| !r.is_supported()).count(),
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
