//! # tnseq-rs - Transposon insertion library analysis
//!
//! Joins TnSeq insertion-site counts against a genome annotation, builds
//! per-chromosome insertion density profiles and estimates how many genes
//! would look essential by chance by resampling insertion libraries under a
//! bias-aware and a uniform null model.

pub mod binning;
pub mod chromosome;
pub mod density;
pub mod ecdf;
pub mod join;
pub mod output;
pub mod pipeline;
pub mod simulate;
pub mod sweep;
pub mod tables;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A barcode-mapped insertion locus from the pool file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InsertionRecord {
    pub chromosome: String,
    pub position: u32,
    pub total_reads: u64,
}

impl InsertionRecord {
    pub fn new(chromosome: String, position: u32, total_reads: u64) -> Self {
        Self {
            chromosome,
            position,
            total_reads,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Reverse),
            _ => None,
        }
    }
}

/// One annotated gene. `begin` and `end` are kept as written in the
/// annotation; use [`GeneAnnotation::start`] and [`GeneAnnotation::stop`]
/// for ordered bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneAnnotation {
    pub chromosome: String,
    pub locus_id: String,
    pub begin: u32,
    pub end: u32,
    pub strand: Strand,
    pub description: String,
    pub gc_content: f64,
}

impl GeneAnnotation {
    pub fn start(&self) -> u32 {
        self.begin.min(self.end)
    }

    pub fn stop(&self) -> u32 {
        self.begin.max(self.end)
    }

    pub fn length(&self) -> u32 {
        self.begin.abs_diff(self.end)
    }
}

/// A gene from the hit file: genes with at least one central insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitRecord {
    pub sys_name: String,
    pub chromosome: String,
    pub description: String,
    pub n_strains: u64,
    pub n_reads: u64,
}

/// Result of joining one insertion against the gene annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedInsertion {
    pub chromosome: String,
    pub position: u32,
    pub total_reads: u64,
    /// Bounds of the gene's interval after overlap resolution
    pub gene_begin: Option<u64>,
    pub gene_end: Option<u64>,
    pub description: Option<String>,
}

impl AnnotatedInsertion {
    pub fn is_genic(&self) -> bool {
        self.description.is_some()
    }
}

/// How simulated insertion positions are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    Biased,
    Uniform,
}

impl SamplingMode {
    pub const ALL: [SamplingMode; 2] = [SamplingMode::Biased, SamplingMode::Uniform];
}

impl fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingMode::Biased => write!(f, "biased"),
            SamplingMode::Uniform => write!(f, "uniform"),
        }
    }
}

/// Fraction of gene-scale windows with zero insertions in one simulated library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssentialityStat {
    pub chromosome: String,
    pub library_size: usize,
    pub sampling_mode: SamplingMode,
    pub zero_density_probability: f64,
}

/// What to do with rows whose chromosome is missing from the chromosome map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum UnmappedPolicy {
    /// Abort the run
    Reject,
    /// Skip the rows and report how many were skipped
    #[default]
    Drop,
}

/// Parameters of the density model and the simulation sweep
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub fine_window: usize,
    pub coarse_window: usize,
    pub coarse_stride: usize,
    pub bin_width: u32,
    pub library_sizes: Vec<usize>,
    pub seed: Option<u64>,
    pub num_threads: usize,
    pub retain_profiles: bool,
    /// Keep every n-th position of retained profiles
    pub profile_step: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fine_window: 200,
            coarse_window: 385,
            coarse_stride: 192,
            bin_width: 20_000,
            library_sizes: (1..=10).map(|i| i * 10_000).collect(),
            seed: None,
            num_threads: utils::get_num_cpus(),
            retain_profiles: false,
            profile_step: 100,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> TnseqResult<()> {
        if self.fine_window == 0 {
            return Err(TnseqError::InvalidConfig(
                "fine window width must be at least 1".to_string(),
            ));
        }

        if self.coarse_window == 0 || self.coarse_stride == 0 {
            return Err(TnseqError::InvalidConfig(
                "gene-scale window width and stride must be at least 1".to_string(),
            ));
        }

        if self.bin_width == 0 {
            return Err(TnseqError::InvalidConfig(
                "bin width must be at least 1".to_string(),
            ));
        }

        if self.library_sizes.is_empty() {
            return Err(TnseqError::InvalidConfig(
                "at least one library size is required".to_string(),
            ));
        }

        if self.library_sizes.contains(&0) {
            return Err(TnseqError::InvalidConfig(
                "library sizes must be positive".to_string(),
            ));
        }

        if self.profile_step == 0 {
            return Err(TnseqError::InvalidConfig(
                "profile step must be at least 1".to_string(),
            ));
        }

        if self.num_threads == 0 {
            return Err(TnseqError::InvalidConfig(
                "number of threads must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Error types for the tnseq library
#[derive(Debug, thiserror::Error)]
pub enum TnseqError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed input table: {0}")]
    MalformedInputTable(String),

    #[error("Chromosome {0} has no entry in the chromosome map")]
    UnmappedChromosome(String),

    #[error("Chromosome {chromosome} (length {length}) is shorter than the gene-scale window of {width} bp")]
    InsufficientWindows {
        chromosome: String,
        length: usize,
        width: usize,
    },

    #[error("Sampling weights are all zero: {0}")]
    DegenerateSamplingWeights(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type TnseqResult<T> = Result<T, TnseqError>;
