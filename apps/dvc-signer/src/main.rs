//! DVC Auto-Signer
//!
//! Fills ENERGY STAR Data Verification Checklist PDFs: marks checkbox "Yes"
//! answers with a red X, writes "NA" in the IEQ notes, and signs and dates the
//! verifier's attestation.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use dvc_annotator::{AnnotateOptions, AnnotatorConfig, SignerInfo};
use dvc_signer::{bundle_bytes, bundle_name, process_batch};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_NAME: &str = "Mohammed Alsailani";

/// Command-line arguments for the DVC signer
#[derive(Parser, Debug)]
#[command(name = "dvc-signer")]
#[command(about = "Auto fill and sign ENERGY STAR DVC checklist PDFs")]
struct Args {
    /// PDF files to process
    files: Vec<PathBuf>,

    /// Signer name
    #[arg(short, long, default_value = DEFAULT_NAME)]
    name: String,

    /// Date written next to the signature (defaults to today, YYYY-MM-DD)
    #[arg(short, long)]
    date: Option<String>,

    /// Do not mark "Yes" answers
    #[arg(long)]
    no_yes: bool,

    /// Do not fill the paragraph or sign/date
    #[arg(long)]
    no_sign: bool,

    /// Do not write "NA" in the IEQ notes
    #[arg(long)]
    no_ieq: bool,

    /// Directory for the signed PDFs
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Also bundle every output into one zip
    #[arg(long)]
    zip: bool,

    /// TOML file overriding the layout tuning
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the mark jitter, for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(log_level.into())
                .add_directive("lopdf=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => AnnotatorConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnnotatorConfig::default(),
    };

    let date = args
        .date
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let options = AnnotateOptions {
        mark_yes: !args.no_yes,
        sign: !args.no_sign,
        ieq_notes: !args.no_ieq,
        signer: SignerInfo::new(args.name.clone(), date),
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let report = process_batch(&args.files, &options, &config, &mut rng)?;
    let written = report.write_to_dir(&args.out_dir)?;
    for path in &written {
        info!("Wrote {}", path.display());
    }

    if args.zip && !report.results.is_empty() {
        let name = bundle_name(chrono::Local::now().naive_local());
        let path = args.out_dir.join(name);
        let bytes = bundle_bytes(&report.results)?;
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
    }

    for failure in &report.failures {
        warn!("{}: {}", failure.filename, failure.reason);
    }
    if report.all_failed() {
        bail!("No files could be processed");
    }
    Ok(())
}
