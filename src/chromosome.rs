//! Chromosome accession to canonical name mapping

use crate::{
    tables::open_table, GeneAnnotation, HitRecord, InsertionRecord, TnseqError, TnseqResult,
    UnmappedPolicy,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// A named chromosome or plasmid of known length
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChromosomeEntry {
    #[serde(rename = "rawId")]
    pub raw_id: String,
    pub name: String,
    pub length: u32,
}

/// Fixed raw accession to canonical name lookup. Entry order is the output
/// order of every per-chromosome table.
#[derive(Debug, Clone, Default)]
pub struct ChromosomeMap {
    entries: Vec<ChromosomeEntry>,
    by_raw_id: HashMap<String, usize>,
}

impl ChromosomeMap {
    pub fn new(entries: Vec<ChromosomeEntry>) -> TnseqResult<Self> {
        let mut by_raw_id = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            if by_raw_id.insert(entry.raw_id.clone(), idx).is_some() {
                return Err(TnseqError::InvalidConfig(format!(
                    "duplicate chromosome map entry for {}",
                    entry.raw_id
                )));
            }
        }

        let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(TnseqError::InvalidConfig(
                "canonical chromosome names must be unique".to_string(),
            ));
        }

        Ok(Self { entries, by_raw_id })
    }

    /// Read a `rawId<TAB>name<TAB>length` table
    pub fn from_path<P: AsRef<Path>>(path: P) -> TnseqResult<Self> {
        let path = path.as_ref();
        let mut reader = open_table(path)?;
        let mut entries = Vec::new();

        for (idx, row) in reader.deserialize::<ChromosomeEntry>().enumerate() {
            let entry = row.map_err(|e| {
                TnseqError::MalformedInputTable(format!(
                    "{} line {}: {}",
                    path.display(),
                    idx + 2,
                    e
                ))
            })?;
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(TnseqError::InvalidConfig(format!(
                "chromosome map {} has no entries",
                path.display()
            )));
        }

        Self::new(entries)
    }

    pub fn canonical_name(&self, raw_id: &str) -> Option<&str> {
        self.by_raw_id
            .get(raw_id)
            .map(|&idx| self.entries[idx].name.as_str())
    }

    /// Genome length of a canonical chromosome name
    pub fn length_of(&self, name: &str) -> Option<u32> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.length)
    }

    pub fn entries(&self) -> &[ChromosomeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace raw chromosome identifiers with canonical names.
    ///
    /// Rows on unmapped chromosomes either fail the call or are dropped with a
    /// warning, depending on `policy`. Returns the kept rows and the number of
    /// dropped rows.
    pub fn relabel<T: Chromosomal>(
        &self,
        records: Vec<T>,
        policy: UnmappedPolicy,
        table: &str,
    ) -> TnseqResult<(Vec<T>, usize)> {
        let mut kept = Vec::with_capacity(records.len());
        let mut dropped: HashMap<String, usize> = HashMap::new();

        for mut record in records {
            match self.canonical_name(record.chromosome()) {
                Some(name) => {
                    let name = name.to_string();
                    record.set_chromosome(name);
                    kept.push(record);
                }
                None => match policy {
                    UnmappedPolicy::Reject => {
                        return Err(TnseqError::UnmappedChromosome(
                            record.chromosome().to_string(),
                        ))
                    }
                    UnmappedPolicy::Drop => {
                        *dropped.entry(record.chromosome().to_string()).or_insert(0) += 1;
                    }
                },
            }
        }

        let total: usize = dropped.values().sum();
        if total > 0 {
            let mut ids: Vec<&String> = dropped.keys().collect();
            ids.sort();
            log::warn!(
                "Dropped {} {} rows on unmapped chromosomes: {:?}",
                total,
                table,
                ids
            );
        }

        Ok((kept, total))
    }
}

/// Records that carry a chromosome identifier
pub trait Chromosomal {
    fn chromosome(&self) -> &str;
    fn set_chromosome(&mut self, name: String);
}

impl Chromosomal for InsertionRecord {
    fn chromosome(&self) -> &str {
        &self.chromosome
    }

    fn set_chromosome(&mut self, name: String) {
        self.chromosome = name;
    }
}

impl Chromosomal for GeneAnnotation {
    fn chromosome(&self) -> &str {
        &self.chromosome
    }

    fn set_chromosome(&mut self, name: String) {
        self.chromosome = name;
    }
}

impl Chromosomal for HitRecord {
    fn chromosome(&self) -> &str {
        &self.chromosome
    }

    fn set_chromosome(&mut self, name: String) {
        self.chromosome = name;
    }
}
