//! Combined CLI binary - joins, bins and runs the essentiality simulation sweep in one step

use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use tnseq_rs::{
    chromosome::ChromosomeMap,
    output::{OutputLayout, STATS_TABLE},
    pipeline::run_analysis,
    tables::{InputConfig, InputTables},
    utils::{get_num_cpus, Timer},
    AnalysisConfig, TnseqError, UnmappedPolicy,
};

#[derive(Parser)]
#[command(name = "tnseq")]
#[command(about = "TnSeq insertion density and essentiality simulation")]
#[command(long_about = "
Analyzes a transposon insertion library against a genome annotation:
1. Reads the pool file, the gene table and the hit table
2. Maps every insertion to the gene containing it
3. Builds fixed-width and gene-width bins for genome map tracks
4. Simulates libraries of each requested size, once drawing positions in
   proportion to the observed insertion density and once uniformly, and
   reports the fraction of gene-scale windows left without insertions

The chromosome map is a TSV file with the columns rawId, name and length.
Rows on chromosomes missing from it are dropped with a warning unless
--unmapped reject is given.

All tables are written as TSV files into the output directory.
")]
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

    /// Width of the fine density window in bp
    #[arg(long, default_value_t = 200)]
    fine_window: usize,

    /// Width of the gene-scale window in bp
    #[arg(long, default_value_t = 385)]
    coarse_window: usize,

    /// Stride of the gene-scale window in bp
    #[arg(long, default_value_t = 192)]
    coarse_stride: usize,

    /// Width of the fixed genome map bins in bp
    #[arg(long, default_value_t = 20_000)]
    bin_width: u32,

    /// Simulated library sizes
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "10000,20000,30000,40000,50000,60000,70000,80000,90000,100000"
    )]
    library_sizes: Vec<usize>,

    /// Handling of rows on chromosomes missing from the chromosome map
    #[arg(long, value_enum, default_value_t = UnmappedPolicy::Drop)]
    unmapped: UnmappedPolicy,

    /// Seed for reproducible simulations
    #[arg(long)]
    seed: Option<u64>,

    /// Number of threads for the simulation sweep
    #[arg(long, default_value_t = get_num_cpus())]
    num_threads: usize,

    /// Also write the fine density profile of every simulated library
    #[arg(long)]
    profiles: bool,

    /// Write every n-th position of the simulated profiles
    #[arg(long, default_value_t = 100)]
    profile_step: usize,

    /// Also write the annotated insertion table
    #[arg(long)]
    annotated: bool,

    /// Gzip-compress all output tables
    #[arg(long)]
    gzip: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Force overwrite of existing output tables
    #[arg(short, long)]
    force: bool,
}

/// Returns false when some simulations failed
fn run() -> anyhow::Result<bool> {
    let args = Args::parse();

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    log::info!("Starting TnSeq analysis");
    log::info!("Pool file: {:?}", args.pool_file);
    log::info!("Genes file: {:?}", args.genes_file);
    log::info!("Hit file: {:?}", args.hit_file);
    log::info!("Output directory: {:?}", args.output_dir);

    let config = AnalysisConfig {
        fine_window: args.fine_window,
        coarse_window: args.coarse_window,
        coarse_stride: args.coarse_stride,
        bin_width: args.bin_width,
        library_sizes: args.library_sizes,
        seed: args.seed,
        num_threads: args.num_threads,
        retain_profiles: args.profiles,
        profile_step: args.profile_step,
    };
    config.validate()?;
    log::info!(
        "Configuration: fine window={}, gene-scale window={} stride={}, library sizes={:?}",
        config.fine_window,
        config.coarse_window,
        config.coarse_stride,
        config.library_sizes
    );

    let layout = OutputLayout {
        gzip: args.gzip,
        write_annotated: args.annotated,
        ..OutputLayout::new(args.output_dir)
    };
    layout.check_overwrite(STATS_TABLE, args.force)?;

    let input = InputConfig {
        pool_file: args.pool_file,
        genes_file: args.genes_file,
        hit_file: args.hit_file,
        chromosome_map: ChromosomeMap::from_path(&args.chromosome_map)?,
        unmapped_policy: args.unmapped,
    };

    let tables = {
        let _timer = Timer::new("Reading input tables");
        InputTables::load(&input)?
    };

    let report = run_analysis(tables, &input.chromosome_map, &config)?;
    layout.write_report(&report)?;

    let dropped = report.tracks.dropped;
    if dropped.total() > 0 {
        log::info!(
            "Rows on unmapped chromosomes: {} insertions, {} genes, {} hits",
            dropped.insertions,
            dropped.genes,
            dropped.hits
        );
    }

    log::info!("Simulation summary:");
    for stat in &report.sweep.stats {
        log::info!(
            "  {} {:>7} {:<7} {:.1}% windows without insertions",
            stat.chromosome,
            stat.library_size,
            stat.sampling_mode,
            stat.zero_density_probability * 100.0
        );
    }

    if report.sweep.failures.is_empty() {
        log::info!("Analysis completed successfully");
        return Ok(true);
    }

    eprintln!(
        "{} of {} simulations failed:",
        report.sweep.failures.len(),
        report.sweep.failures.len() + report.sweep.stats.len()
    );
    for failure in &report.sweep.failures {
        eprintln!(
            "  {}\t{}\t{}\t{}",
            failure.chromosome, failure.library_size, failure.sampling_mode, failure.reason
        );
    }
    Ok(false)
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: anyhow::Error) -> ! {
    match error.downcast_ref::<TnseqError>() {
        Some(TnseqError::FileNotFound(path)) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        Some(TnseqError::MalformedInputTable(msg)) => {
            eprintln!("Error: Malformed input table: {}", msg);
            eprintln!("Please check the required columns and numeric fields.");
        }
        Some(TnseqError::UnmappedChromosome(id)) => {
            eprintln!("Error: Chromosome {} is missing from the chromosome map", id);
            eprintln!("Add it to the map or rerun with --unmapped drop.");
        }
        Some(TnseqError::InvalidConfig(msg)) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Please check window widths, stride and library sizes.");
        }
        Some(TnseqError::Io(e)) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
        Some(other) => {
            eprintln!("Error: {}", other);
        }
        None => {
            eprintln!("Error: {:#}", error);
        }
    }
    std::process::exit(1);
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => handle_error(e),
    }
}
