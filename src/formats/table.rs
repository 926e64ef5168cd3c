//! Tab-separated output tables
//!
//! Writes the annotated, summary and combined tables of a run, and reads
//! summary tables back from a results directory.

use crate::core::aggregate::{summarize_sample, CombinedDataset, CombinedSummary, SummaryRow};
use crate::core::error::{AnnomicsError, Result};
use crate::core::join::{AnnotatedRow, SampleDataset};
use crate::core::GenomicInterval;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const COMBINED_ANNOTATED: &str = "combined_annotated.tsv";
pub const COMBINED_SUMMARY: &str = "combined_summary.tsv";
pub const COMBINED_SAMPLE_STATS: &str = "combined_sample_stats.tsv";

const SUMMARY_HEADER: [&str; 4] = ["annotation_type", "count", "mean_width", "median_width"];

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer)
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(|f| BufWriter::with_capacity(128 * 1024, f))
        .map_err(|e| AnnomicsError::io(path, e))
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "NA".to_string())
}

/// Metadata column names across regions, in first-seen order
fn metadata_columns<'a, I>(regions: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a GenomicInterval>,
{
    let mut columns: Vec<String> = Vec::new();
    for region in regions {
        for (key, _) in &region.metadata {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Column names written by the tables themselves
const FIXED_COLUMNS: [&str; 9] = [
    "sample",
    "chrom",
    "start",
    "end",
    "strand",
    "annotation_type",
    "feature_id",
    "width",
    "overlap_width",
];

/// Output name of a metadata column; names taken by a fixed column get a
/// `meta_` prefix, e.g. the `width` column of a GRanges export
fn metadata_header(key: &str) -> String {
    if FIXED_COLUMNS.contains(&key) {
        format!("meta_{}", key)
    } else {
        key.to_string()
    }
}

fn annotated_header(metadata: &[String]) -> Vec<String> {
    let mut header: Vec<String> = ["chrom", "start", "end", "strand"].iter().map(|s| s.to_string()).collect();
    header.extend(metadata.iter().map(|key| metadata_header(key)));
    header.extend(
        ["annotation_type", "feature_id", "width", "overlap_width"]
            .iter()
            .map(|s| s.to_string()),
    );
    header
}

fn annotated_record(row: &AnnotatedRow<'_>, metadata: &[String]) -> Vec<String> {
    let region = row.region;
    let mut record = Vec::with_capacity(8 + metadata.len());
    record.push(region.chrom.clone());
    record.push(region.start.to_string());
    record.push(region.end.to_string());
    record.push(region.strand.to_string());
    for key in metadata {
        record.push(region.meta(key).unwrap_or_default().to_string());
    }
    match row.hit {
        Some(hit) => {
            record.push(hit.annotation_type.clone());
            record.push(hit.feature_id.clone());
            record.push(row.width().to_string());
            record.push(hit.overlap_width.to_string());
        }
        None => {
            record.push(String::new());
            record.push(String::new());
            record.push(row.width().to_string());
            record.push(String::new());
        }
    }
    record
}

/// Write one sample's annotated table
pub fn write_annotated_table<W: Write>(writer: W, dataset: &SampleDataset) -> std::io::Result<()> {
    let metadata = metadata_columns(&dataset.regions);
    let mut wtr = tsv_writer(writer);
    wtr.write_record(annotated_header(&metadata))?;
    for row in dataset.annotated_rows() {
        wtr.write_record(annotated_record(&row, &metadata))?;
    }
    wtr.flush()
}

/// Write a summary table
pub fn write_summary_table<W: Write>(writer: W, summary: &[SummaryRow]) -> std::io::Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record(SUMMARY_HEADER)?;
    for row in summary {
        wtr.write_record([
            row.annotation_type.clone(),
            row.count.to_string(),
            row.mean_width.to_string(),
            row.median_width.to_string(),
        ])?;
    }
    wtr.flush()
}

/// Write the union of all samples' annotated rows, tagged with `sample`
pub fn write_combined_annotated_table<W: Write>(writer: W, dataset: &CombinedDataset) -> std::io::Result<()> {
    let metadata = metadata_columns(dataset.samples().flat_map(|s| s.regions.iter()));
    let mut wtr = tsv_writer(writer);

    let mut header = vec!["sample".to_string()];
    header.extend(annotated_header(&metadata));
    wtr.write_record(&header)?;

    for (sample, row) in dataset.annotated_rows() {
        let mut record = vec![sample.to_string()];
        record.extend(annotated_record(&row, &metadata));
        wtr.write_record(&record)?;
    }
    wtr.flush()
}

/// Write per-(sample, annotation type) counts
pub fn write_combined_summary_table<W: Write>(writer: W, summary: &CombinedSummary) -> std::io::Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record(["sample", "annotation_type", "count", "mean_width", "median_width"])?;
    for row in &summary.by_type {
        wtr.write_record([
            row.sample.clone(),
            row.annotation_type.clone(),
            row.count.to_string(),
            row.mean_width.to_string(),
            row.median_width.to_string(),
        ])?;
    }
    wtr.flush()
}

/// Write the per-sample scalar table
pub fn write_sample_stats_table<W: Write>(writer: W, summary: &CombinedSummary) -> std::io::Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record(["sample", "total_regions", "annotation_types", "mean_width", "median_width"])?;
    for stats in &summary.sample_stats {
        wtr.write_record([
            stats.sample.clone(),
            stats.total_regions.to_string(),
            stats.annotation_types.to_string(),
            optional_number(stats.mean_width),
            optional_number(stats.median_width),
        ])?;
    }
    wtr.flush()
}

/// Write `<sample>_annotated.tsv` and `<sample>_summary.tsv`
pub fn write_sample_outputs(dir: &Path, dataset: &SampleDataset) -> Result<Vec<PathBuf>> {
    let annotated = dir.join(format!("{}_annotated.tsv", dataset.sample_name));
    write_annotated_table(create_file(&annotated)?, dataset).map_err(|e| AnnomicsError::io(&annotated, e))?;

    let summary = dir.join(format!("{}_summary.tsv", dataset.sample_name));
    write_summary_table(create_file(&summary)?, &summarize_sample(dataset))
        .map_err(|e| AnnomicsError::io(&summary, e))?;

    Ok(vec![annotated, summary])
}

/// Write the three combined tables
pub fn write_combined_outputs(dir: &Path, dataset: &CombinedDataset, summary: &CombinedSummary) -> Result<Vec<PathBuf>> {
    let annotated = dir.join(COMBINED_ANNOTATED);
    write_combined_annotated_table(create_file(&annotated)?, dataset).map_err(|e| AnnomicsError::io(&annotated, e))?;

    let by_type = dir.join(COMBINED_SUMMARY);
    write_combined_summary_table(create_file(&by_type)?, summary).map_err(|e| AnnomicsError::io(&by_type, e))?;

    let stats = dir.join(COMBINED_SAMPLE_STATS);
    write_sample_stats_table(create_file(&stats)?, summary).map_err(|e| AnnomicsError::io(&stats, e))?;

    Ok(vec![annotated, by_type, stats])
}

/// Read a per-sample summary table written by [`write_summary_table`]
pub fn read_summary_table(path: &Path) -> Result<Vec<SummaryRow>> {
    let invalid = |message: String| AnnomicsError::Format {
        path: path.to_path_buf(),
        line: 0,
        message,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| AnnomicsError::io(path, e.into()))?;

    let headers = rdr.headers().map_err(|e| AnnomicsError::io(path, e.into()))?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| invalid(format!("missing column '{}'", name)))
    };
    let type_col = column("annotation_type")?;
    let count_col = column("count")?;
    let mean_col = column("mean_width")?;
    let median_col = column("median_width")?;

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| AnnomicsError::io(path, e.into()))?;
        let line = i + 2;
        let get = |col: usize| record.get(col).unwrap_or_default();
        let parse_err = |field: &str, col: usize| AnnomicsError::Parse {
            path: path.to_path_buf(),
            line,
            message: format!("invalid {} '{}'", field, get(col)),
        };
        rows.push(SummaryRow {
            annotation_type: get(type_col).to_string(),
            count: get(count_col).parse().map_err(|_| parse_err("count", count_col))?,
            mean_width: get(mean_col).parse().map_err(|_| parse_err("mean_width", mean_col))?,
            median_width: get(median_col).parse().map_err(|_| parse_err("median_width", median_col))?,
        });
    }
    Ok(rows)
}

/// Output tables found in a results directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputFiles {
    pub annotation_files: Vec<PathBuf>,
    pub summary_files: Vec<PathBuf>,
    pub combined_files: Vec<PathBuf>,
}

impl OutputFiles {
    pub fn total(&self) -> usize {
        self.annotation_files.len() + self.summary_files.len() + self.combined_files.len()
    }
}

/// Recursively list `.tsv` outputs under `dir`, relative to it
pub fn scan_output_files(dir: &Path) -> Result<OutputFiles> {
    if !dir.is_dir() {
        return Err(AnnomicsError::not_found(dir, "results directory not found"));
    }

    let pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join("**").join("*.tsv");
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern).map_err(|e| AnnomicsError::Configuration(
        crate::core::ConfigurationError::InvalidOption {
            option: "results directory",
            message: e.to_string(),
        },
    ))?;

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).filter(|p| p.is_file()).collect();
    paths.sort();

    let mut files = OutputFiles::default();
    for path in paths {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        let relative = path.strip_prefix(dir).map(Path::to_path_buf).unwrap_or(path);
        if name.starts_with("combined_") {
            files.combined_files.push(relative);
        } else if name.contains("_summary") {
            files.summary_files.push(relative);
        } else {
            files.annotation_files.push(relative);
        }
    }
    Ok(files)
}

/// Files and one summary table from a results directory
#[derive(Debug, Clone)]
pub struct ResultsOverview {
    pub directory: PathBuf,
    pub files: OutputFiles,
    /// Summary file the rows were read from
    pub summary_file: Option<PathBuf>,
    pub summary: Vec<SummaryRow>,
}

/// Scan a results directory and load the summary of `sample`, or of the
/// first summary table found
pub fn summarize_results(dir: &Path, sample: Option<&str>) -> Result<ResultsOverview> {
    let files = scan_output_files(dir)?;

    let summary_file = match sample {
        Some(name) => {
            let wanted = format!("{}_summary.tsv", name);
            let found = files
                .summary_files
                .iter()
                .find(|p| p.file_name().and_then(|n| n.to_str()) == Some(wanted.as_str()))
                .cloned();
            match found {
                Some(p) => Some(p),
                None => return Err(AnnomicsError::not_found(dir.join(&wanted), "summary table not found")),
            }
        }
        None => files.summary_files.first().cloned(),
    };

    let summary = match &summary_file {
        Some(relative) => read_summary_table(&dir.join(relative))?,
        None => Vec::new(),
    };

    Ok(ResultsOverview {
        directory: dir.to_path_buf(),
        files,
        summary_file,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::join::AnnotationHit;
    use crate::core::Strand;

    fn sample() -> SampleDataset {
        SampleDataset {
            sample_name: "s1".to_string(),
            regions: vec![
                GenomicInterval::new("chr1", 1000, 2000, Strand::Plus)
                    .with_metadata(vec![("name".into(), "r1".into())]),
                GenomicInterval::new("chr1", 3000, 4000, Strand::Minus)
                    .with_metadata(vec![("name".into(), "r2".into())]),
            ],
            hits: vec![
                AnnotationHit {
                    region_id: 0,
                    annotation_type: "hg19_cpg_islands".into(),
                    feature_id: "island:1".into(),
                    feature_start: 1500,
                    feature_end: 1800,
                    overlap_width: 300,
                },
                AnnotationHit {
                    region_id: 1,
                    annotation_type: "hg19_cpg_islands".into(),
                    feature_id: "island:2".into(),
                    feature_start: 3500,
                    feature_end: 3600,
                    overlap_width: 100,
                },
            ],
            keep_unmatched: false,
        }
    }

    #[test]
    fn test_annotated_table_layout() {
        let mut out = Vec::new();
        write_annotated_table(&mut out, &sample()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "chrom\tstart\tend\tstrand\tname\tannotation_type\tfeature_id\twidth\toverlap_width"
        );
        assert_eq!(lines[1], "chr1\t1000\t2000\t+\tr1\thg19_cpg_islands\tisland:1\t1000\t300");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_summary_table_numbers() {
        let mut out = Vec::new();
        write_summary_table(&mut out, &summarize_sample(&sample())).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "annotation_type\tcount\tmean_width\tmedian_width\nhg19_cpg_islands\t2\t1000\t1000\n"
        );
    }

    #[test]
    fn test_write_and_summarize_results() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_sample_outputs(dir.path(), &sample()).unwrap();
        assert_eq!(written.len(), 2);

        let files = scan_output_files(dir.path()).unwrap();
        assert_eq!(files.annotation_files, vec![PathBuf::from("s1_annotated.tsv")]);
        assert_eq!(files.summary_files, vec![PathBuf::from("s1_summary.tsv")]);

        let overview = summarize_results(dir.path(), Some("s1")).unwrap();
        assert_eq!(overview.summary.len(), 1);
        assert_eq!(overview.summary[0].count, 2);
        assert_eq!(overview.summary[0].mean_width, 1000.0);

        assert!(summarize_results(dir.path(), Some("other")).is_err());
    }

    #[test]
    fn test_metadata_clashing_with_output_columns() {
        let mut dataset = sample();
        dataset.regions[0].metadata = vec![("width".into(), "1000".into()), ("name".into(), "r1".into())];

        let mut out = Vec::new();
        write_annotated_table(&mut out, &dataset).unwrap();
        let text = String::from_utf8(out).unwrap();
        let header: Vec<&str> = text.lines().next().unwrap().split('\t').collect();
        assert_eq!(
            header,
            vec![
                "chrom", "start", "end", "strand", "meta_width", "name", "annotation_type", "feature_id", "width",
                "overlap_width"
            ]
        );
        assert_eq!(header.iter().filter(|h| **h == "width").count(), 1);
        assert!(text.lines().nth(1).unwrap().contains("\t1000\tr1\t"));
    }

    #[test]
    fn test_scan_directory_with_glob_metacharacters() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("run[1]");
        std::fs::create_dir(&dir).unwrap();
        write_sample_outputs(&dir, &sample()).unwrap();

        let files = scan_output_files(&dir).unwrap();
        assert_eq!(files.total(), 2);
        assert_eq!(files.summary_files, vec![PathBuf::from("s1_summary.tsv")]);
    }

    #[test]
    fn test_scan_missing_directory() {
        assert!(scan_output_files(Path::new("/nonexistent/results/dir")).is_err());
    }
}
