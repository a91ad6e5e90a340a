//! Typed loading of the pool, gene and hit tables

use crate::{
    chromosome::ChromosomeMap, utils::is_gzipped, utils::validate_file_readable, GeneAnnotation,
    HitRecord, InsertionRecord, Strand, TnseqError, TnseqResult, UnmappedPolicy,
};
use flate2::read::MultiGzDecoder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Scaffold marker used by pool files for barcodes that map past the end of
/// a scaffold
const PAST_END: &str = "pastEnd";

/// Where the three input tables live and how to name their chromosomes
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub pool_file: PathBuf,
    pub genes_file: PathBuf,
    pub hit_file: PathBuf,
    pub chromosome_map: ChromosomeMap,
    pub unmapped_policy: UnmappedPolicy,
}

/// Rows removed from each table because their chromosome is not in the map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DroppedRows {
    pub insertions: usize,
    pub genes: usize,
    pub hits: usize,
}

impl DroppedRows {
    pub fn total(&self) -> usize {
        self.insertions + self.genes + self.hits
    }
}

/// Input tables. After `load` or `relabel` all chromosome names are
/// canonical.
#[derive(Debug, Clone, Default)]
pub struct InputTables {
    pub insertions: Vec<InsertionRecord>,
    pub genes: Vec<GeneAnnotation>,
    pub hits: Vec<HitRecord>,
    pub dropped: DroppedRows,
}

impl InputTables {
    /// Read all three tables and rename their chromosomes through the map
    pub fn load(config: &InputConfig) -> TnseqResult<Self> {
        let insertions = read_pool_file(&config.pool_file)?;
        log::info!(
            "Read {} insertions from {:?}",
            insertions.len(),
            config.pool_file
        );

        let genes = read_genes_file(&config.genes_file)?;
        log::info!("Read {} genes from {:?}", genes.len(), config.genes_file);

        let hits = read_hit_file(&config.hit_file)?;
        log::info!("Read {} hit genes from {:?}", hits.len(), config.hit_file);

        let raw = Self {
            insertions,
            genes,
            hits,
            dropped: DroppedRows::default(),
        };
        raw.relabel(&config.chromosome_map, config.unmapped_policy)
    }

    /// Replace raw chromosome identifiers with canonical names, counting the
    /// rows dropped under `policy`
    pub fn relabel(self, chromosome_map: &ChromosomeMap, policy: UnmappedPolicy) -> TnseqResult<Self> {
        let (insertions, dropped_insertions) = chromosome_map.relabel(self.insertions, policy, "pool")?;
        let (genes, dropped_genes) = chromosome_map.relabel(self.genes, policy, "gene")?;
        let (hits, dropped_hits) = chromosome_map.relabel(self.hits, policy, "hit")?;

        Ok(Self {
            insertions,
            genes,
            hits,
            dropped: DroppedRows {
                insertions: self.dropped.insertions + dropped_insertions,
                genes: self.dropped.genes + dropped_genes,
                hits: self.dropped.hits + dropped_hits,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct PoolRow {
    #[allow(dead_code)]
    barcode: String,
    scaffold: String,
    pos: String,
    #[serde(rename = "nTot")]
    n_tot: u64,
}

#[derive(Debug, Deserialize)]
struct GeneRow {
    #[serde(rename = "scaffoldId")]
    scaffold_id: String,
    #[serde(rename = "locusId")]
    locus_id: String,
    begin: u32,
    end: u32,
    strand: String,
    desc: String,
    #[serde(rename = "GC")]
    gc: f64,
}

#[derive(Debug, Deserialize)]
struct HitRow {
    #[serde(rename = "sysName")]
    sys_name: String,
    #[serde(rename = "scaffoldId")]
    scaffold_id: String,
    desc: String,
    #[serde(rename = "nStrains")]
    n_strains: u64,
    #[serde(rename = "nReads")]
    n_reads: u64,
}

/// Open a tab-separated table with a header row, plain or gzip-compressed
pub fn open_table<P: AsRef<Path>>(path: P) -> TnseqResult<csv::Reader<Box<dyn Read>>> {
    let path = path.as_ref();
    validate_file_readable(path)?;
    let file = File::open(path)?;

    let reader: Box<dyn Read> = if is_gzipped(path)? {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };

    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(false)
        .from_reader(reader))
}

fn malformed(path: &Path, error: csv::Error) -> TnseqError {
    match error.position() {
        Some(pos) => TnseqError::MalformedInputTable(format!(
            "{} line {}: {}",
            path.display(),
            pos.line(),
            error
        )),
        None => TnseqError::MalformedInputTable(format!("{}: {}", path.display(), error)),
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> TnseqResult<Vec<T>> {
    let mut reader = open_table(path)?;
    reader
        .deserialize::<T>()
        .map(|row| row.map_err(|e| malformed(path, e)))
        .collect()
}

/// Read insertion loci from a pool file. Barcodes without a usable locus
/// are skipped.
pub fn read_pool_file<P: AsRef<Path>>(path: P) -> TnseqResult<Vec<InsertionRecord>> {
    let path = path.as_ref();
    let rows: Vec<PoolRow> = read_rows(path)?;
    let mut insertions = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for (idx, row) in rows.into_iter().enumerate() {
        if row.scaffold.is_empty() || row.scaffold == PAST_END || row.pos.is_empty() {
            skipped += 1;
            continue;
        }

        let position = row.pos.parse::<u32>().map_err(|_| {
            TnseqError::MalformedInputTable(format!(
                "{} line {}: invalid position {:?}",
                path.display(),
                idx + 2,
                row.pos
            ))
        })?;

        insertions.push(InsertionRecord::new(row.scaffold, position, row.n_tot));
    }

    if skipped > 0 {
        log::debug!("Skipped {} pool rows without an insertion locus", skipped);
    }

    Ok(insertions)
}

pub fn read_genes_file<P: AsRef<Path>>(path: P) -> TnseqResult<Vec<GeneAnnotation>> {
    let path = path.as_ref();
    let rows: Vec<GeneRow> = read_rows(path)?;

    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            let strand = Strand::from_symbol(&row.strand).ok_or_else(|| {
                TnseqError::MalformedInputTable(format!(
                    "{} line {}: invalid strand {:?}",
                    path.display(),
                    idx + 2,
                    row.strand
                ))
            })?;

            Ok(GeneAnnotation {
                chromosome: row.scaffold_id,
                locus_id: row.locus_id,
                begin: row.begin,
                end: row.end,
                strand,
                description: row.desc,
                gc_content: row.gc,
            })
        })
        .collect()
}

pub fn read_hit_file<P: AsRef<Path>>(path: P) -> TnseqResult<Vec<HitRecord>> {
    let path = path.as_ref();
    let rows: Vec<HitRow> = read_rows(path)?;

    Ok(rows
        .into_iter()
        .map(|row| HitRecord {
            sys_name: row.sys_name,
            chromosome: row.scaffold_id,
            description: row.desc,
            n_strains: row.n_strains,
            n_reads: row.n_reads,
        })
        .collect())
}
