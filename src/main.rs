//! Annomics CLI entry point
//!
//! Genomic region annotation against CpG and gene-structure tracks.

use annomics::batch::{run_batch, BatchOptions, FailurePolicy, InputSpec, DEFAULT_PATTERN};
use annomics::core::{AnnotateOptions, AnnotationSelection, AnnotationType, DirectoryCatalog, GenomeBuild};
use annomics::formats::{summarize_results, validate_bed_file};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "annomics")]
#[command(about = "Annotate genomic regions with CpG and gene-structure context")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate one BED file, a comma-separated list or a directory
    Annotate {
        /// Input BED file, comma-separated list, or directory
        #[arg(short = 'i', long)]
        input: String,
        /// Genome build (hg19, hg38, mm9, mm10, dm3, dm6, rn4, rn5, rn6)
        #[arg(short = 'g', long, default_value = "hg19")]
        genome: String,
        /// Output directory
        #[arg(short = 'o', long, default_value = "annomics_results")]
        output: PathBuf,
        /// Label prefixed to every sample name
        #[arg(short = 'n', long)]
        label: Option<String>,
        /// Glob pattern for directory inputs
        #[arg(long, default_value = DEFAULT_PATTERN)]
        pattern: String,
        /// Annotation catalog directory (<root>/<build>/<key>.bed)
        #[arg(long, env = "ANNOMICS_CATALOG")]
        catalog: PathBuf,
        /// Skip CpG annotations
        #[arg(long)]
        no_cpg: bool,
        /// Skip genic annotations
        #[arg(long)]
        no_genic: bool,
        /// Explicit comma-separated annotation types (overrides --no-cpg/--no-genic)
        #[arg(long)]
        annotations: Option<String>,
        /// Write combined tables when two or more samples succeed
        #[arg(long)]
        combine: bool,
        /// Also emit regions without any overlap
        #[arg(long)]
        keep_unmatched: bool,
        /// Keep going when a file fails instead of aborting the batch
        #[arg(long)]
        continue_on_error: bool,
        /// Number of threads
        #[arg(short = 't', long, default_value = "1")]
        threads: usize,
    },
    /// List supported genome builds
    Genomes,
    /// List annotation types
    Types,
    /// Check a BED file and preview its first lines
    Validate {
        /// BED file to check
        file: PathBuf,
    },
    /// Summarize a results directory
    Summary {
        /// Results directory written by `annotate`
        dir: PathBuf,
        /// Sample whose summary table to show
        #[arg(short = 's', long)]
        sample: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Annotate {
            input,
            genome,
            output,
            label,
            pattern,
            catalog,
            no_cpg,
            no_genic,
            annotations,
            combine,
            keep_unmatched,
            continue_on_error,
            threads,
        } => {
            let genome: GenomeBuild = genome.parse()?;
            let selection = match annotations {
                Some(names) => AnnotationSelection::from_names(&names)?,
                None => AnnotationSelection::new(!no_cpg, !no_genic),
            };

            let mut annotate = AnnotateOptions::new(genome);
            annotate.selection = selection;
            annotate.keep_unmatched = keep_unmatched;
            annotate.threads = threads;

            let mut options = BatchOptions::new(InputSpec::parse(&input), output, annotate);
            options.pattern = pattern;
            options.label = label;
            options.combine = combine;
            if continue_on_error {
                options.failure_policy = FailurePolicy::Continue;
            }

            eprintln!("Annotating {} against {} (catalog {:?})", input, genome, catalog);
            let provider = DirectoryCatalog::new(&catalog);
            let report = run_batch(&provider, &options)?;

            eprintln!("\n=== Annotation Statistics ===");
            eprintln!("Samples:         {}", report.samples.len());
            eprintln!("Failed:          {}", report.failures.len());
            eprintln!("Annotated rows:  {}", report.total_rows());
            eprintln!("Tracks:          {}", report.annotation_types.len());
            eprintln!("Combined:        {}", if report.combined { "yes" } else { "no" });
            eprintln!("Warnings:        {}", report.warnings.len());
            eprintln!("Output:          {:?}", options.output_dir);
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Genomes => {
            println!("build\tdescription\tspecies\tassembly\tchromosomes");
            for build in GenomeBuild::ALL {
                let info = build.info();
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    build, info.description, info.species, info.assembly, info.chromosome_style
                );
            }
        }

        Commands::Types => {
            println!("name\tgroup\tkey_suffix");
            for annotation in AnnotationType::ALL {
                println!("{}\t{:?}\t{}", annotation, annotation.group(), annotation.suffix());
            }
        }

        Commands::Validate { file } => {
            let validation = validate_bed_file(&file)?;

            println!("File:     {}", validation.path.display());
            println!("Format:   {}", validation.format);
            println!("Records:  {}", validation.records);
            match &validation.first_error {
                Some(err) => println!("Status:   invalid ({})", err),
                None if validation.is_valid() => println!("Status:   valid"),
                None => println!("Status:   invalid (unrecognised format)"),
            }
            println!("Preview:");
            for line in &validation.preview {
                println!("  {}", line);
            }

            if !validation.is_valid() {
                std::process::exit(1);
            }
        }

        Commands::Summary { dir, sample } => {
            let overview = summarize_results(&dir, sample.as_deref())?;

            println!("Directory:        {}", overview.directory.display());
            println!("Annotation files: {}", overview.files.annotation_files.len());
            println!("Summary files:    {}", overview.files.summary_files.len());
            println!("Combined files:   {}", overview.files.combined_files.len());
            for path in overview
                .files
                .annotation_files
                .iter()
                .chain(&overview.files.summary_files)
                .chain(&overview.files.combined_files)
            {
                println!("  {}", path.display());
            }

            if let Some(file) = &overview.summary_file {
                println!("\nSummary ({}):", file.display());
                println!("annotation_type\tcount\tmean_width\tmedian_width");
                for row in &overview.summary {
                    println!(
                        "{}\t{}\t{:.1}\t{:.1}",
                        row.annotation_type, row.count, row.mean_width, row.median_width
                    );
                }
            }
        }
    }

    Ok(())
}
