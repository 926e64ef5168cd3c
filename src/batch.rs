//! Batch orchestration
//!
//! Resolves the requested inputs into an ordered file list, runs the
//! parse → join → summarize pipeline for every file and optionally
//! combines the successful samples.
//!
//! Samples are parsed and joined on a rayon pool; outputs are written and
//! errors handled afterwards in input order, so a parallel run produces the
//! same files and the same failure as a sequential one.

use crate::core::aggregate::{combine, CombinedDataset};
use crate::core::catalog::CatalogProvider;
use crate::core::error::{AnnomicsError, ConfigurationError, Result};
use crate::core::io::strip_known_extensions;
use crate::core::join::{AnnotateOptions, Annotator, SampleDataset};
use crate::formats::bed::read_bed_file;
use crate::formats::table;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default pattern for directory inputs
pub const DEFAULT_PATTERN: &str = "*.bed";

/// Name of the JSON run report written to the output directory
pub const REPORT_FILE: &str = "run_report.json";

/// Where the input files come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    /// One BED file
    File(PathBuf),
    /// Explicit list of BED files
    List(Vec<PathBuf>),
    /// Every file in a directory matching the glob pattern
    Directory(PathBuf),
}

impl InputSpec {
    /// Interpret a command-line input: a comma-separated list, a directory
    /// or a single file
    pub fn parse(input: &str) -> Self {
        if input.contains(',') {
            let files = input
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
            return InputSpec::List(files);
        }
        let path = PathBuf::from(input.trim());
        if path.is_dir() {
            InputSpec::Directory(path)
        } else {
            InputSpec::File(path)
        }
    }

    /// Ordered list of input files
    ///
    /// A named file that does not exist, or a directory pattern matching
    /// nothing, is an I/O error.
    pub fn resolve(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        match self {
            InputSpec::File(path) => {
                require_file(path)?;
                Ok(vec![path.clone()])
            }
            InputSpec::List(paths) => {
                for path in paths {
                    require_file(path)?;
                }
                Ok(paths.clone())
            }
            InputSpec::Directory(dir) => expand_pattern(dir, pattern),
        }
    }
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(AnnomicsError::not_found(path, "input file not found"))
    }
}

fn expand_pattern(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AnnomicsError::not_found(dir, "input directory not found"));
    }
    let full = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join(pattern);
    let entries = glob::glob(&full.to_string_lossy()).map_err(|e| ConfigurationError::InvalidOption {
        option: "pattern",
        message: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = entries.filter_map(|e| e.ok()).filter(|p| p.is_file()).collect();
    files.sort();

    if files.is_empty() {
        return Err(AnnomicsError::not_found(
            dir,
            &format!("no files match pattern '{}'", pattern),
        ));
    }
    Ok(files)
}

/// Sample name of an input file: its base name without BED and
/// compression extensions, prefixed by `label_` when a label is given
pub fn sample_name(path: &Path, label: Option<&str>) -> String {
    let stem = strip_known_extensions(path);
    match label {
        Some(label) if !label.is_empty() => format!("{}_{}", label, stem),
        _ => stem,
    }
}

/// Pair every file with its sample name, rejecting duplicates
pub fn assign_sample_names(files: &[PathBuf], label: Option<&str>) -> Result<Vec<(String, PathBuf)>> {
    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    let mut named = Vec::with_capacity(files.len());

    for path in files {
        let name = sample_name(path, label);
        if let Some(first) = seen.get(&name) {
            warn!("Inputs {:?} and {:?} share sample name {}", first, path, name);
            return Err(ConfigurationError::DuplicateSampleName {
                name,
                first: first.to_path_buf(),
                second: path.clone(),
            }
            .into());
        }
        seen.insert(name.clone(), path);
        named.push((name, path.clone()));
    }
    Ok(named)
}

/// What to do when one input file fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the batch on the first failing file, in input order
    #[default]
    FailFast,
    /// Record the failure and keep going
    Continue,
}

/// Configuration of a batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input: InputSpec,
    /// Glob pattern applied to directory inputs
    pub pattern: String,
    /// Prefix for sample names
    pub label: Option<String>,
    pub output_dir: PathBuf,
    /// Combine samples when at least two succeed
    pub combine: bool,
    pub failure_policy: FailurePolicy,
    pub annotate: AnnotateOptions,
}

impl BatchOptions {
    pub fn new(input: InputSpec, output_dir: impl Into<PathBuf>, annotate: AnnotateOptions) -> Self {
        Self {
            input,
            pattern: DEFAULT_PATTERN.to_string(),
            label: None,
            output_dir: output_dir.into(),
            combine: false,
            failure_policy: FailurePolicy::default(),
            annotate,
        }
    }
}

/// Outcome of one successful sample
#[derive(Debug, Clone, Serialize)]
pub struct SampleReport {
    pub sample: String,
    pub input: PathBuf,
    pub regions: usize,
    /// Regions with at least one hit
    pub matched_regions: usize,
    /// Rows of the annotated table
    pub annotated_rows: usize,
    /// Distinct annotation types hit
    pub annotation_types: usize,
    pub outputs: Vec<PathBuf>,
}

/// A file that failed under [`FailurePolicy::Continue`]
#[derive(Debug, Clone, Serialize)]
pub struct SampleFailure {
    pub sample: String,
    pub input: PathBuf,
    pub error: String,
}

/// Summary of a batch run, also written as `run_report.json`
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub genome: String,
    /// Provider keys of the tracks that loaded
    pub annotation_types: Vec<String>,
    pub failure_policy: FailurePolicy,
    pub samples: Vec<SampleReport>,
    pub failures: Vec<SampleFailure>,
    pub warnings: Vec<String>,
    /// Whether combined tables were written
    pub combined: bool,
    pub combined_outputs: Vec<PathBuf>,
}

impl BatchReport {
    pub fn total_rows(&self) -> usize {
        self.samples.iter().map(|s| s.annotated_rows).sum()
    }
}

fn load_sample(annotator: &Annotator, name: &str, path: &Path) -> Result<SampleDataset> {
    debug!("Reading {:?} as sample {}", path, name);
    let regions = read_bed_file(path)?;
    info!("Sample {}: {} regions", name, regions.len());
    Ok(annotator.annotate(name, regions))
}

fn sample_report(dataset: &SampleDataset, input: &Path, outputs: Vec<PathBuf>) -> SampleReport {
    let rows = dataset.annotated_rows();
    let mut types: Vec<&str> = rows.iter().filter_map(|r| r.annotation_type()).collect();
    types.sort_unstable();
    types.dedup();

    SampleReport {
        sample: dataset.sample_name.clone(),
        input: input.to_path_buf(),
        regions: dataset.regions.len(),
        matched_regions: dataset.matched_regions(),
        annotated_rows: rows.len(),
        annotation_types: types.len(),
        outputs,
    }
}

/// Write the run report as pretty-printed JSON
pub fn write_report(path: &Path, report: &BatchReport) -> Result<()> {
    let file = File::create(path).map_err(|e| AnnomicsError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).map_err(|e| AnnomicsError::io(path, e.into()))?;
    writer.flush().map_err(|e| AnnomicsError::io(path, e))
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| {
            ConfigurationError::InvalidOption {
                option: "threads",
                message: format!("failed to create thread pool: {}", e),
            }
            .into()
        })
}

/// Run the whole batch against a catalog provider
///
/// Configuration (annotation selection, thread count, genome support,
/// input resolution and sample names) is checked before any track or
/// input file is read.
pub fn run_batch(provider: &dyn CatalogProvider, options: &BatchOptions) -> Result<BatchReport> {
    options.annotate.selection.resolve()?;
    let files = options.input.resolve(&options.pattern)?;
    let samples = assign_sample_names(&files, options.label.as_deref())?;
    info!("Resolved {} input files", samples.len());

    let pool = build_pool(options.annotate.threads)?;
    // tracks load on the run's pool, not the global one
    let annotator = pool.install(|| Annotator::new(provider, options.annotate.clone()))?;
    run_samples_on(&pool, &annotator, &samples, options)
}

/// Run already-named samples with a prepared annotator
pub fn run_samples(annotator: &Annotator, samples: &[(String, PathBuf)], options: &BatchOptions) -> Result<BatchReport> {
    let pool = build_pool(options.annotate.threads)?;
    run_samples_on(&pool, annotator, samples, options)
}

fn run_samples_on(
    pool: &rayon::ThreadPool,
    annotator: &Annotator,
    samples: &[(String, PathBuf)],
    options: &BatchOptions,
) -> Result<BatchReport> {
    let output_dir = &options.output_dir;
    fs::create_dir_all(output_dir).map_err(|e| AnnomicsError::io(output_dir, e))?;

    let results: Vec<Result<SampleDataset>> = pool.install(|| {
        samples
            .par_iter()
            .map(|(name, path)| load_sample(annotator, name, path))
            .collect()
    });

    let mut report = BatchReport {
        genome: options.annotate.genome.to_string(),
        annotation_types: annotator.tracks().tracks().iter().map(|t| t.key().to_string()).collect(),
        failure_policy: options.failure_policy,
        samples: Vec::with_capacity(samples.len()),
        failures: Vec::new(),
        warnings: annotator.tracks().warnings().to_vec(),
        combined: false,
        combined_outputs: Vec::new(),
    };
    let mut datasets = Vec::new();

    for ((name, path), result) in samples.iter().zip(results) {
        let written = result.and_then(|dataset| {
            let outputs = table::write_sample_outputs(output_dir, &dataset)?;
            Ok((dataset, outputs))
        });

        match written {
            Ok((dataset, outputs)) => {
                if dataset.hits.is_empty() {
                    report.warnings.push(format!("sample {} produced no annotated rows", name));
                }
                report.samples.push(sample_report(&dataset, path, outputs));
                if options.combine {
                    datasets.push(dataset);
                }
            }
            Err(e) => match options.failure_policy {
                FailurePolicy::FailFast => return Err(e),
                FailurePolicy::Continue => {
                    warn!("Skipping sample {}: {}", name, e);
                    report.failures.push(SampleFailure {
                        sample: name.clone(),
                        input: path.clone(),
                        error: e.to_string(),
                    });
                }
            },
        }
    }

    if options.combine {
        let combined = CombinedDataset::from_samples(datasets)?;
        match combine(&combined) {
            Some(summary) => {
                info!("Combining {} samples", combined.len());
                report.combined_outputs = table::write_combined_outputs(output_dir, &combined, &summary)?;
                report.combined = true;
            }
            None => {
                let message = format!(
                    "combine requested but only {} sample(s) succeeded; skipped",
                    combined.len()
                );
                warn!("{}", message);
                report.warnings.push(message);
            }
        }
    }

    write_report(&output_dir.join(REPORT_FILE), &report)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_name() {
        assert_eq!(sample_name(Path::new("/data/sample1.bed"), None), "sample1");
        assert_eq!(sample_name(Path::new("/data/sample1.bed.gz"), None), "sample1");
        assert_eq!(sample_name(Path::new("peaks.bed"), Some("exp")), "exp_peaks");
        assert_eq!(sample_name(Path::new("peaks.bed"), Some("")), "peaks");
    }

    #[test]
    fn test_input_spec_parse() {
        assert_eq!(
            InputSpec::parse("a.bed, b.bed"),
            InputSpec::List(vec![PathBuf::from("a.bed"), PathBuf::from("b.bed")])
        );
        assert_eq!(InputSpec::parse("a.bed"), InputSpec::File(PathBuf::from("a.bed")));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let spec = InputSpec::File(PathBuf::from("/nonexistent/input.bed"));
        assert!(matches!(spec.resolve(DEFAULT_PATTERN), Err(AnnomicsError::Io { .. })));
    }

    #[test]
    fn test_directory_pattern() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.bed"), "chr1\t1\t2\n").unwrap();
        fs::write(dir.path().join("a.bed"), "chr1\t1\t2\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = InputSpec::Directory(dir.path().to_path_buf()).resolve("*.bed").unwrap();
        let names: Vec<String> = files.iter().map(|p| sample_name(p, None)).collect();
        assert_eq!(names, vec!["a", "b"]);

        let none = InputSpec::Directory(dir.path().to_path_buf()).resolve("*.bedgraph");
        assert!(matches!(none, Err(AnnomicsError::Io { .. })));
    }

    #[test]
    fn test_directory_with_glob_metacharacters() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("run[1]");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.bed"), "chr1\t1\t2\n").unwrap();

        let files = InputSpec::Directory(dir.clone()).resolve("*.bed").unwrap();
        assert_eq!(files, vec![dir.join("a.bed")]);
    }

    #[test]
    fn test_duplicate_sample_names() {
        let files = vec![PathBuf::from("x/s.bed"), PathBuf::from("y/s.bed.gz")];
        let result = assign_sample_names(&files, None);
        assert!(matches!(
            result,
            Err(AnnomicsError::Configuration(ConfigurationError::DuplicateSampleName { .. }))
        ));
    }
}
