//! Core annotation functionality
//!
//! This module contains the genomic interval model, the genome and
//! annotation registries, the catalog and track index, the overlap join
//! and the summary aggregation.

pub mod aggregate;
pub mod annotation;
pub mod catalog;
pub mod error;
pub mod genome;
pub mod interval;
pub mod io;
pub mod join;

pub use aggregate::{
    combine, summarize, summarize_sample, CombinedDataset, CombinedSummary, SampleStats, SampleTypeSummary,
    SummaryRow, WidthStats,
};
pub use annotation::{AnnotationGroup, AnnotationSelection, AnnotationType};
pub use catalog::{CatalogProvider, DirectoryCatalog, InMemoryCatalog, TrackIndex, TrackInterval, TrackRecord, TrackSet};
pub use error::{AnnomicsError, CatalogError, CatalogResult, ConfigurationError, Result};
pub use genome::{GenomeBuild, GenomeInfo};
pub use interval::{GenomicInterval, Strand};
pub use io::{detect_compression, open_text_reader, CompressionFormat, LineIterator, DEFAULT_BUFFER_SIZE};
pub use join::{
    join_regions, join_regions_parallel, AnnotateOptions, AnnotatedRow, AnnotationHit, Annotator, SampleDataset,
};
