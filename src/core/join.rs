//! Overlap join engine
//!
//! Intersects query regions with every requested track:
//! 1. For each region, in input order
//! 2. For each track, in lexical order of its provider key
//! 3. Query the track index for features overlapping the region (strand ignored)
//! 4. Emit one hit per overlapping feature, ordered by feature start
//!
//! Fan-out is kept: a region overlapping k features yields k hits.
//! Regions with no overlaps produce no rows unless keep-unmatched is set.

use crate::core::annotation::{AnnotationSelection, AnnotationType};
use crate::core::catalog::{CatalogProvider, TrackSet};
use crate::core::error::{ConfigurationError, Result};
use crate::core::genome::GenomeBuild;
use crate::core::interval::GenomicInterval;
use log::{info, warn};
use rayon::prelude::*;

/// Regions per parallel work unit
const CHUNK_SIZE: usize = 10000;

/// One overlap between a region and a track feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationHit {
    /// Index of the region in its sample's input order
    pub region_id: usize,
    /// Provider key of the matched track, e.g. `hg19_cpg_islands`
    pub annotation_type: String,
    pub feature_id: String,
    pub feature_start: u64,
    pub feature_end: u64,
    /// Width of the intersection, `min(ends) - max(starts)`
    pub overlap_width: u64,
}

/// Options for annotating one or more samples
#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub genome: GenomeBuild,
    pub selection: AnnotationSelection,
    /// Emit regions without hits as rows with no annotation
    pub keep_unmatched: bool,
    /// Worker threads; 1 runs sequentially
    pub threads: usize,
}

impl AnnotateOptions {
    pub fn new(genome: GenomeBuild) -> Self {
        Self {
            genome,
            selection: AnnotationSelection::default(),
            keep_unmatched: false,
            threads: 1,
        }
    }
}

/// A sample's regions and the hits found for them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDataset {
    pub sample_name: String,
    pub regions: Vec<GenomicInterval>,
    pub hits: Vec<AnnotationHit>,
    /// Whether regions without hits appear in the annotated rows
    pub keep_unmatched: bool,
}

/// Row of the annotated table: a region joined with one of its hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotatedRow<'a> {
    pub region: &'a GenomicInterval,
    /// `None` only for unmatched regions in keep-unmatched mode
    pub hit: Option<&'a AnnotationHit>,
}

impl<'a> AnnotatedRow<'a> {
    /// Reported width: the region's own width, not the intersection width
    pub fn width(&self) -> u64 {
        self.region.width()
    }

    pub fn annotation_type(&self) -> Option<&'a str> {
        self.hit.map(|h| h.annotation_type.as_str())
    }
}

impl SampleDataset {
    /// Annotated rows in output order
    pub fn annotated_rows(&self) -> Vec<AnnotatedRow<'_>> {
        let mut rows = Vec::with_capacity(self.hits.len());
        let mut hits = self.hits.iter().peekable();

        for (region_id, region) in self.regions.iter().enumerate() {
            let mut matched = false;
            while let Some(hit) = hits.next_if(|h| h.region_id == region_id) {
                rows.push(AnnotatedRow { region, hit: Some(hit) });
                matched = true;
            }
            if !matched && self.keep_unmatched {
                rows.push(AnnotatedRow { region, hit: None });
            }
        }

        rows
    }

    /// Number of regions with at least one hit
    pub fn matched_regions(&self) -> usize {
        let mut count = 0;
        let mut last = None;
        for hit in &self.hits {
            if last != Some(hit.region_id) {
                count += 1;
                last = Some(hit.region_id);
            }
        }
        count
    }
}

/// Join every region against every track in `tracks`
///
/// Hits are ordered by region input order, then annotation type, then
/// feature start; the same input always gives the same output.
pub fn join_regions(regions: &[GenomicInterval], tracks: &TrackSet) -> Vec<AnnotationHit> {
    let mut hits = Vec::new();
    for (region_id, region) in regions.iter().enumerate() {
        join_region(region_id, region, tracks, &mut hits);
    }
    hits
}

/// Parallel variant of [`join_regions`]; output is identical
pub fn join_regions_parallel(regions: &[GenomicInterval], tracks: &TrackSet) -> Vec<AnnotationHit> {
    let chunks: Vec<Vec<AnnotationHit>> = regions
        .par_chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(chunk_idx, chunk)| {
            let mut hits = Vec::new();
            for (offset, region) in chunk.iter().enumerate() {
                join_region(chunk_idx * CHUNK_SIZE + offset, region, tracks, &mut hits);
            }
            hits
        })
        .collect();

    chunks.into_iter().flatten().collect()
}

fn join_region(region_id: usize, region: &GenomicInterval, tracks: &TrackSet, out: &mut Vec<AnnotationHit>) {
    // tracks() is already in lexical key order
    for track in tracks.tracks() {
        for feature in track.query(&region.chrom, region.start, region.end) {
            out.push(AnnotationHit {
                region_id,
                annotation_type: track.key().to_string(),
                feature_id: feature.val.clone(),
                feature_start: feature.start,
                feature_end: feature.stop,
                overlap_width: region.overlap_width(feature.start, feature.stop),
            });
        }
    }
}

/// Validated configuration plus the loaded tracks for one run
pub struct Annotator {
    options: AnnotateOptions,
    types: Vec<AnnotationType>,
    tracks: TrackSet,
}

impl Annotator {
    /// Validate the configuration, then load the requested tracks
    ///
    /// Fails with a configuration error before any track is read if the
    /// selection is empty or the provider has nothing for the build.
    pub fn new(provider: &dyn CatalogProvider, options: AnnotateOptions) -> Result<Self> {
        let types = options.selection.resolve()?;
        if options.threads == 0 {
            return Err(ConfigurationError::InvalidOption {
                option: "threads",
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        if !provider.supports(options.genome) {
            let available: Vec<&str> = GenomeBuild::ALL
                .iter()
                .filter(|b| provider.supports(**b))
                .map(|b| b.as_str())
                .collect();
            return Err(ConfigurationError::UnsupportedGenome {
                build: options.genome.to_string(),
                available: available.join(", "),
            }
            .into());
        }

        info!(
            "Loading {} annotation tracks for {}",
            types.len(),
            options.genome
        );
        let tracks = TrackSet::load(provider, options.genome, &types);

        Ok(Self { options, types, tracks })
    }

    /// Build from already-indexed tracks, skipping the provider
    pub fn with_tracks(options: AnnotateOptions, tracks: TrackSet) -> Result<Self> {
        let types = options.selection.resolve()?;
        Ok(Self { options, types, tracks })
    }

    pub fn options(&self) -> &AnnotateOptions {
        &self.options
    }

    /// Concrete annotation categories requested
    pub fn annotation_types(&self) -> &[AnnotationType] {
        &self.types
    }

    pub fn tracks(&self) -> &TrackSet {
        &self.tracks
    }

    /// Annotate one sample's regions
    pub fn annotate(&self, sample_name: impl Into<String>, regions: Vec<GenomicInterval>) -> SampleDataset {
        let sample_name = sample_name.into();
        let hits = if self.options.threads > 1 && regions.len() > CHUNK_SIZE {
            join_regions_parallel(&regions, &self.tracks)
        } else {
            join_regions(&regions, &self.tracks)
        };

        if hits.is_empty() {
            warn!("Sample {}: no region overlaps any requested annotation", sample_name);
        }

        SampleDataset {
            sample_name,
            regions,
            hits,
            keep_unmatched: self.options.keep_unmatched,
        }
    }
}
