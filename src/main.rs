use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use duplex_barcodes::{
    run_pipeline, Canonicalizer, CanonicalizerConfig, OutputWriter, PairedFastqReader,
    PipelineOptions,
};
use env_logger::Env;
use log::{error, info};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "duplex-barcodes", version, disable_version_flag = true)]
#[command(about = "Extract duplex barcodes from paired FASTQ files, trim them off, and group read pairs by barcode")]
struct Args {
    #[arg(value_name = "READS_1.FASTQ", help = "Input read 1 FASTQ file (plain or gzipped)")]
    r1_input: PathBuf,

    #[arg(value_name = "READS_2.FASTQ", help = "Input read 2 FASTQ file (plain or gzipped)")]
    r2_input: PathBuf,

    #[arg(short = 't', long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..), help = "Length of each barcode half")]
    tag_len: u32,

    #[arg(short = 'i', long, default_value = "5", help = "Length of the invariant spacer after the barcode")]
    invariant_len: u32,

    #[arg(short = 'o', long, help = "Output file (default: stdout); a .gz suffix compresses the output")]
    output: Option<PathBuf>,

    #[arg(short = 'j', long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..), help = "Number of worker threads")]
    threads: u32,

    #[arg(short = 'b', long, default_value = "10000", value_parser = clap::value_parser!(u32).range(1..), help = "Read pairs per batch")]
    batch_size: u32,

    #[arg(long, help = "Write records in input order instead of grouping them by barcode")]
    no_sort: bool,

    #[arg(long = "sort-memory", value_name = "MB", default_value = "512", value_parser = clap::value_parser!(u32).range(1..), help = "Memory for sorting before spilling chunks to disk, in MB")]
    sort_memory_mb: u32,

    #[arg(long, value_name = "DIR", help = "Directory for temporary sort chunks (default: system temp dir)")]
    tmp_dir: Option<PathBuf>,

    #[arg(long, conflicts_with = "quiet", help = "Verbose output showing progress")]
    verbose: bool,

    #[arg(short = 'q', long, help = "Only log errors")]
    quiet: bool,

    #[arg(short = 'v', long = "version", action = ArgAction::Version, help = "Print version")]
    version: Option<bool>,
}

fn run(args: Args) -> Result<()> {
    let start = Instant::now();

    let config = CanonicalizerConfig {
        tag_len: args.tag_len as usize,
        invariant_len: args.invariant_len as usize,
    };
    let canonicalizer = Canonicalizer::new(config)?;
    let options = PipelineOptions {
        threads: args.threads as usize,
        batch_size: args.batch_size as usize,
        sort: !args.no_sort,
        sort_memory: (args.sort_memory_mb as usize).saturating_mul(1024 * 1024),
        temp_dir: args.tmp_dir.clone(),
    };

    info!(
        "Reading {} and {} (tag length {}, spacer length {}, {} threads)",
        args.r1_input.display(),
        args.r2_input.display(),
        config.tag_len,
        config.invariant_len,
        options.threads
    );

    let pairs = PairedFastqReader::open(&args.r1_input, &args.r2_input)
        .context("Failed to open input FASTQ files")?;
    let mut writer = OutputWriter::create(args.output.as_deref())
        .context("Failed to create output file")?;

    let stats = run_pipeline(pairs, &canonicalizer, &options, &mut writer)?;
    writer.finish().context("Failed to finish writing output")?;

    info!("Processing complete in {:.1}s", start.elapsed().as_secs_f64());
    info!("Read pairs: {}", stats.pairs_read);
    info!("Retained read pairs: {}", stats.pairs_retained);
    info!("Skipped (too short): {}", stats.pairs_too_short);
    if let Some(output) = &args.output {
        info!("Output file: {}", output.display());
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    if let Err(e) = run(args) {
        error!("{e:#}");
        std::process::exit(1);
    }
}
