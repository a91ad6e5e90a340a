//! CLI binary for genome map tracks only (join and binning, no simulation)

use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use tnseq_rs::{
    chromosome::ChromosomeMap,
    output::{OutputLayout, FIXED_BINS_TABLE},
    pipeline::build_tracks,
    tables::{InputConfig, InputTables},
    AnalysisConfig, TnseqError, UnmappedPolicy,
};

#[derive(Parser)]
#[command(name = "tn_bins")]
#[command(about = "Bin TnSeq insertions and reads for genome map tracks")]
struct Args {
    /// Pool file with barcode, scaffold, pos and nTot columns
    #[arg(long, value_name = "FILE")]
    pool_file: PathBuf,

    /// Gene table with scaffoldId, locusId, begin, end, strand, desc and GC columns
    #[arg(long, value_name = "FILE")]
    genes_file: PathBuf,

    /// Hit table with sysName, scaffoldId, desc, nStrains and nReads columns
    #[arg(long, value_name = "FILE")]
    hit_file: PathBuf,

    /// Chromosome map (rawId, name, length)
    #[arg(long, value_name = "FILE")]
    chromosome_map: PathBuf,

    /// Directory for the result tables
    #[arg(long, value_name = "DIR")]
    output_dir: PathBuf,

    /// Width of the fixed genome map bins in bp
    #[arg(long, default_value_t = 20_000)]
    bin_width: u32,

    /// Handling of rows on chromosomes missing from the chromosome map
    #[arg(long, value_enum, default_value_t = UnmappedPolicy::Drop)]
    unmapped: UnmappedPolicy,

    /// Also write the annotated insertion table
    #[arg(long)]
    annotated: bool,

    /// Gzip-compress all output tables
    #[arg(long)]
    gzip: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Force overwrite of existing output tables
    #[arg(short, long)]
    force: bool,
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    let config = AnalysisConfig {
        bin_width: args.bin_width,
        ..AnalysisConfig::default()
    };
    config.validate()?;

    let layout = OutputLayout {
        gzip: args.gzip,
        write_annotated: args.annotated,
        ..OutputLayout::new(args.output_dir)
    };
    layout.check_overwrite(FIXED_BINS_TABLE, args.force)?;

    let input = InputConfig {
        pool_file: args.pool_file,
        genes_file: args.genes_file,
        hit_file: args.hit_file,
        chromosome_map: ChromosomeMap::from_path(&args.chromosome_map)?,
        unmapped_policy: args.unmapped,
    };

    let tables = InputTables::load(&input)?;
    let tracks = build_tracks(tables, &input.chromosome_map, &config)?;
    layout.write_tracks(&tracks)?;

    log::info!(
        "Wrote {} fixed-width and {} gene-width bins to {:?}",
        tracks.fixed_bins.len(),
        tracks.gene_bins.len(),
        layout.dir
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<TnseqError>() {
            Some(TnseqError::UnmappedChromosome(id)) => {
                eprintln!("Error: Chromosome {} is missing from the chromosome map", id);
                eprintln!("Add it to the map or rerun with --unmapped drop.");
            }
            Some(err) => eprintln!("Error: {}", err),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}
