//! Annomics - genomic region annotation engine
//!
//! Annotates BED regions with overlapping CpG and gene-structure features
//! for a genome build, per sample or in batches, with per-sample and
//! cross-sample summary statistics.
//!
//! # Features
//!
//! - Per-chromosome interval index over every annotation track
//! - Fan-out joins with a deterministic row order
//! - Parallel per-sample processing with rayon
//! - Support for compressed inputs and tracks (gzip, bzip2)
//!
//! # Example
//!
//! ```
//! use annomics::core::{
//!     AnnotateOptions, AnnotationType, Annotator, GenomeBuild, GenomicInterval, InMemoryCatalog,
//!     Strand, TrackRecord,
//! };
//!
//! let catalog = InMemoryCatalog::new().with_track(
//!     GenomeBuild::Hg19,
//!     AnnotationType::CpgIslands,
//!     vec![TrackRecord::new("chr1", 1500, 1800, "island:1")],
//! );
//! let annotator = Annotator::new(&catalog, AnnotateOptions::new(GenomeBuild::Hg19)).unwrap();
//!
//! let regions = vec![GenomicInterval::new("chr1", 1000, 2000, Strand::Plus)];
//! let dataset = annotator.annotate("sample1", regions);
//! assert_eq!(dataset.hits.len(), 1);
//! assert_eq!(dataset.hits[0].annotation_type, "hg19_cpg_islands");
//! ```

pub mod batch;
pub mod core;
pub mod formats;

// Re-export commonly used types
pub use batch::{run_batch, BatchOptions, BatchReport, FailurePolicy, InputSpec};
pub use core::{
    AnnomicsError, AnnotateOptions, AnnotationSelection, AnnotationType, Annotator, CatalogProvider,
    ConfigurationError, DirectoryCatalog, GenomeBuild, GenomicInterval, InMemoryCatalog, SampleDataset, Strand,
};
pub use formats::{bed, table};
