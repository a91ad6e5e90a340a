//! TSV writers for result tables

use crate::{
    pipeline::{AnalysisReport, Tracks},
    sweep::SimulatedProfile,
    utils::ensure_parent_dirs,
    TnseqError, TnseqResult,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Output file, gzip-compressed when the path ends in `.gz`. Must be closed
/// with `finish` so the gzip trailer is written and errors surface.
enum OutputFile {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputFile {
    fn create(output_path: &Path) -> TnseqResult<Self> {
        let file = BufWriter::new(File::create(output_path)?);
        if output_path.extension().and_then(|s| s.to_str()) == Some("gz") {
            Ok(OutputFile::Gzip(GzEncoder::new(file, Compression::default())))
        } else {
            Ok(OutputFile::Plain(file))
        }
    }

    fn finish(self) -> TnseqResult<()> {
        let mut inner = match self {
            OutputFile::Plain(file) => file,
            OutputFile::Gzip(encoder) => encoder.finish()?,
        };
        inner.flush()?;
        Ok(())
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            OutputFile::Plain(file) => file.write(buf),
            OutputFile::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            OutputFile::Plain(file) => file.flush(),
            OutputFile::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Write rows as a tab-separated table with a header taken from the row
/// type's field names
pub fn write_table<T: Serialize>(rows: &[T], output_path: &Path) -> TnseqResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_writer(OutputFile::create(output_path)?);

    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| TnseqError::Io(e.into_error()))?
        .finish()?;

    log::info!("Wrote {} rows to {:?}", rows.len(), output_path);
    Ok(())
}

/// Write retained simulated density profiles in long format
pub fn write_profiles(profiles: &[SimulatedProfile], output_path: &Path) -> TnseqResult<()> {
    let mut writer = OutputFile::create(output_path)?;

    writeln!(writer, "chromosome\tlibrarySize\tsamplingMode\tposition\tdensity")?;
    for simulated in profiles {
        for (position, density) in simulated.points() {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}",
                simulated.chromosome,
                simulated.library_size,
                simulated.sampling_mode,
                position,
                density,
            )?;
        }
    }
    writer.finish()?;

    Ok(())
}

pub const STATS_TABLE: &str = "essentiality_stats";
pub const OBSERVED_TABLE: &str = "observed_stats";
pub const FAILURES_TABLE: &str = "simulation_failures";
pub const FIXED_BINS_TABLE: &str = "fixed_bins";
pub const GENE_BINS_TABLE: &str = "gene_bins";
pub const HIT_SUMMARY_TABLE: &str = "hit_summary";
pub const ANNOTATED_TABLE: &str = "annotated_insertions";
pub const PROFILES_TABLE: &str = "simulated_profiles";

/// Where each result table goes inside an output directory
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub dir: PathBuf,
    pub gzip: bool,
    pub write_annotated: bool,
}

impl OutputLayout {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            gzip: false,
            write_annotated: false,
        }
    }

    pub fn path(&self, table: &str) -> PathBuf {
        let suffix = if self.gzip { "tsv.gz" } else { "tsv" };
        self.dir.join(format!("{}.{}", table, suffix))
    }

    /// Fail if `table` already exists, unless `force` is set
    pub fn check_overwrite(&self, table: &str, force: bool) -> TnseqResult<()> {
        let path = self.path(table);
        if path.exists() && !force {
            return Err(TnseqError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("Output file {:?} already exists. Use --force to overwrite.", path),
            )));
        }
        Ok(())
    }

    pub fn write_tracks(&self, tracks: &Tracks) -> TnseqResult<()> {
        ensure_parent_dirs(self.path(FIXED_BINS_TABLE))?;
        write_table(&tracks.fixed_bins, &self.path(FIXED_BINS_TABLE))?;
        write_table(&tracks.gene_bins, &self.path(GENE_BINS_TABLE))?;
        write_table(&tracks.hit_summary, &self.path(HIT_SUMMARY_TABLE))?;
        if self.write_annotated {
            write_table(&tracks.annotated, &self.path(ANNOTATED_TABLE))?;
        }
        Ok(())
    }

    /// Write every table of a report. Completed statistics are written even
    /// when some simulations failed.
    pub fn write_report(&self, report: &AnalysisReport) -> TnseqResult<()> {
        self.write_tracks(&report.tracks)?;
        write_table(&report.sweep.stats, &self.path(STATS_TABLE))?;
        write_table(&report.observed, &self.path(OBSERVED_TABLE))?;
        if !report.sweep.failures.is_empty() {
            write_table(&report.sweep.failures, &self.path(FAILURES_TABLE))?;
        }
        if !report.sweep.profiles.is_empty() {
            write_profiles(&report.sweep.profiles, &self.path(PROFILES_TABLE))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        binning::BinAggregate,
        density::{DensityProfile, PositionSeries},
        utils::is_gzipped,
        EssentialityStat, SamplingMode,
    };
    use flate2::read::MultiGzDecoder;
    use std::io::Read;
    use tempfile::{Builder, NamedTempFile, TempDir};

    fn stats() -> Vec<EssentialityStat> {
        vec![
            EssentialityStat {
                chromosome: "Ch1".to_string(),
                library_size: 10_000,
                sampling_mode: SamplingMode::Biased,
                zero_density_probability: 0.25,
            },
            EssentialityStat {
                chromosome: "Ch1".to_string(),
                library_size: 10_000,
                sampling_mode: SamplingMode::Uniform,
                zero_density_probability: 0.5,
            },
        ]
    }

    #[test]
    fn test_write_stats_table() {
        let output_file = NamedTempFile::new().unwrap();
        write_table(&stats(), output_file.path()).unwrap();

        let content = std::fs::read_to_string(output_file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "chromosome\tlibrarySize\tsamplingMode\tzeroDensityProbability"
        );
        assert_eq!(lines[1], "Ch1\t10000\tbiased\t0.25");
        assert_eq!(lines[2], "Ch1\t10000\tuniform\t0.5");
    }

    #[test]
    fn test_write_gzipped_table() {
        let output_file = Builder::new().suffix(".tsv.gz").tempfile().unwrap();
        write_table(&stats(), output_file.path()).unwrap();

        assert!(is_gzipped(output_file.path()).unwrap());
        let mut content = String::new();
        MultiGzDecoder::new(File::open(output_file.path()).unwrap())
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.ends_with("Ch1\t10000\tuniform\t0.5\n"));
    }

    #[test]
    fn test_gzip_profiles_complete() {
        let series = PositionSeries::from_counts("Ch1", vec![2; 1001]);
        let profile = DensityProfile::from_series(&series, 3);
        let profiles = vec![SimulatedProfile::from_profile(2002, SamplingMode::Biased, &profile, 1)];

        let output_file = Builder::new().suffix(".tsv.gz").tempfile().unwrap();
        write_profiles(&profiles, output_file.path()).unwrap();

        // a missing trailer makes the decoder fail with UnexpectedEof
        let mut content = String::new();
        MultiGzDecoder::new(File::open(output_file.path()).unwrap())
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content.lines().count(), 1002);
        assert_eq!(content.lines().last(), Some("Ch1\t2002\tbiased\t1000\t2"));
    }

    #[test]
    fn test_write_profiles() {
        let series = PositionSeries::from_counts("Ch1", vec![1; 11]);
        let profile = DensityProfile::from_series(&series, 3);
        let profiles = vec![SimulatedProfile::from_profile(11, SamplingMode::Uniform, &profile, 5)];

        let output_file = NamedTempFile::new().unwrap();
        write_profiles(&profiles, output_file.path()).unwrap();

        let content = std::fs::read_to_string(output_file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        // header plus positions 0, 5, 10
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "Ch1\t11\tuniform\t5\t1");
    }

    #[test]
    fn test_output_layout() {
        let dir = TempDir::new().unwrap();
        let mut layout = OutputLayout::new(dir.path().join("run1"));
        assert_eq!(layout.path(STATS_TABLE), dir.path().join("run1/essentiality_stats.tsv"));

        let report = AnalysisReport {
            tracks: Tracks {
                fixed_bins: vec![BinAggregate {
                    chromosome: "Ch1".to_string(),
                    bin_start: 0,
                    bin_end: 999,
                    label: None,
                    insertion_count: 3,
                    total_reads: 12,
                }],
                ..Tracks::default()
            },
            ..AnalysisReport::default()
        };
        layout.write_report(&report).unwrap();

        let bins = std::fs::read_to_string(layout.path(FIXED_BINS_TABLE)).unwrap();
        assert_eq!(
            bins.lines().next(),
            Some("chromosome\tbinStart\tbinEnd\tlabel\tinsertionCount\ttotalReads")
        );
        assert_eq!(bins.lines().nth(1), Some("Ch1\t0\t999\t\t3\t12"));
        assert!(layout.path(STATS_TABLE).exists());
        assert!(!layout.path(FAILURES_TABLE).exists());
        assert!(!layout.path(ANNOTATED_TABLE).exists());

        assert!(layout.check_overwrite(STATS_TABLE, false).is_err());
        assert!(layout.check_overwrite(STATS_TABLE, true).is_ok());

        layout.gzip = true;
        assert!(layout.check_overwrite(STATS_TABLE, false).is_ok());
    }
}
