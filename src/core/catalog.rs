//! Annotation catalog
//!
//! Track data comes from an external [`CatalogProvider`]. Each returned
//! track is organised into a per-chromosome interval index (rust-lapper)
//! for O(log n + k) overlap queries. A [`TrackSet`] is loaded once per run
//! and is immutable afterwards, so it can be shared across samples and
//! worker threads by reference.

use crate::core::annotation::AnnotationType;
use crate::core::error::{CatalogError, CatalogResult};
use crate::core::genome::GenomeBuild;
use crate::core::io::{open_text_reader, LineIterator};
use crate::formats::bed::BedRecordView;
use log::{debug, warn};
use rayon::prelude::*;
use rust_lapper::{Interval, Lapper};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One reference feature as returned by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub feature_id: String,
}

impl TrackRecord {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64, feature_id: impl Into<String>) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            feature_id: feature_id.into(),
        }
    }
}

/// Source of annotation tracks
///
/// Implementations must be shareable across threads; lookups are made once
/// per requested track at the start of a run.
pub trait CatalogProvider: Send + Sync {
    /// Whether any data exists for this build
    fn supports(&self, _build: GenomeBuild) -> bool {
        true
    }

    /// All features of one concrete track
    fn lookup(&self, build: GenomeBuild, annotation: AnnotationType) -> CatalogResult<Vec<TrackRecord>>;
}

/// Provider holding synthetic tracks in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    tracks: HashMap<(GenomeBuild, AnnotationType), Vec<TrackRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, build: GenomeBuild, annotation: AnnotationType, records: Vec<TrackRecord>) {
        self.tracks.insert((build, annotation), records);
    }

    pub fn with_track(mut self, build: GenomeBuild, annotation: AnnotationType, records: Vec<TrackRecord>) -> Self {
        self.insert(build, annotation, records);
        self
    }
}

impl CatalogProvider for InMemoryCatalog {
    fn supports(&self, build: GenomeBuild) -> bool {
        self.tracks.keys().any(|(b, _)| *b == build)
    }

    fn lookup(&self, build: GenomeBuild, annotation: AnnotationType) -> CatalogResult<Vec<TrackRecord>> {
        if annotation.is_shorthand() {
            return Err(CatalogError::UnknownAnnotationType(annotation.provider_key(build)));
        }
        if !self.supports(build) {
            return Err(CatalogError::UnsupportedGenome(build.to_string()));
        }
        self.tracks
            .get(&(build, annotation))
            .cloned()
            .ok_or_else(|| CatalogError::TrackUnavailable {
                key: annotation.provider_key(build),
                reason: "no such track in catalog".to_string(),
            })
    }
}

/// Provider reading BED tracks from `<root>/<build>/<key>.bed[.gz|.bz2]`
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn track_path(&self, build: GenomeBuild, key: &str) -> Option<PathBuf> {
        let dir = self.root.join(build.as_str());
        ["bed", "bed.gz", "bed.bz2"]
            .iter()
            .map(|ext| dir.join(format!("{}.{}", key, ext)))
            .find(|p| p.is_file())
    }
}

impl CatalogProvider for DirectoryCatalog {
    fn supports(&self, build: GenomeBuild) -> bool {
        self.root.join(build.as_str()).is_dir()
    }

    fn lookup(&self, build: GenomeBuild, annotation: AnnotationType) -> CatalogResult<Vec<TrackRecord>> {
        let key = annotation.provider_key(build);
        if annotation.is_shorthand() {
            return Err(CatalogError::UnknownAnnotationType(key));
        }
        if !self.supports(build) {
            return Err(CatalogError::UnsupportedGenome(build.to_string()));
        }
        let path = self
            .track_path(build, &key)
            .ok_or_else(|| CatalogError::TrackUnavailable {
                key: key.clone(),
                reason: format!("no track file under {}", self.root.join(build.as_str()).display()),
            })?;
        read_track_file(&path, &key, annotation)
    }
}

/// Parse a BED track file; column 4, when present, is the feature id
fn read_track_file(path: &Path, key: &str, annotation: AnnotationType) -> CatalogResult<Vec<TrackRecord>> {
    let reader = open_text_reader(path)?;
    let mut lines = LineIterator::new(reader);
    let mut records = Vec::new();

    while let Some(line) = lines.next_line() {
        let line = line?.to_string();
        let line_no = lines.line_number();
        if line.is_empty() || line.starts_with('#') || line.starts_with("track") || line.starts_with("browser") {
            continue;
        }
        let view = BedRecordView::parse(line.as_bytes()).map_err(|e| CatalogError::InvalidTrackRecord {
            key: key.to_string(),
            line: line_no,
            message: e.to_string(),
        })?;
        let feature_id = match view.name() {
            Some(name) if !name.is_empty() && name != "." => name.to_string(),
            _ => format!("{}:{}", annotation.id_prefix(), records.len() + 1),
        };
        records.push(TrackRecord {
            chrom: view.chrom.to_string(),
            start: view.start,
            end: view.end,
            feature_id,
        });
    }

    Ok(records)
}

/// Type alias for track intervals; the value is the feature id
pub type TrackInterval = Interval<u64, String>;

/// Interval index of one track, organised by chromosome
pub struct TrackIndex {
    annotation: AnnotationType,
    key: String,
    /// Chromosome -> interval tree (using Lapper)
    maps: HashMap<String, Lapper<u64, String>>,
    /// Normalized chromosome name mapping (lowercase, no `chr`) -> original
    chrom_aliases: HashMap<String, String>,
}

impl TrackIndex {
    /// Build the index; records with `start >= end` are skipped
    pub fn from_records(key: impl Into<String>, annotation: AnnotationType, records: Vec<TrackRecord>) -> Self {
        let key = key.into();
        let mut by_chrom: HashMap<String, Vec<TrackInterval>> = HashMap::new();
        let mut skipped = 0usize;

        for record in records {
            if record.start >= record.end || record.chrom.is_empty() {
                skipped += 1;
                continue;
            }
            by_chrom.entry(record.chrom).or_default().push(Interval {
                start: record.start,
                stop: record.end,
                val: record.feature_id,
            });
        }
        if skipped > 0 {
            warn!("Track {}: skipped {} empty or inverted features", key, skipped);
        }

        let mut maps = HashMap::new();
        let mut chrom_aliases = HashMap::new();
        for (chrom, intervals) in by_chrom {
            chrom_aliases.insert(normalize_chrom_key(&chrom), chrom.clone());
            maps.insert(chrom, Lapper::new(intervals));
        }

        Self {
            annotation,
            key,
            maps,
            chrom_aliases,
        }
    }

    pub fn annotation(&self) -> AnnotationType {
        self.annotation
    }

    /// Provider key, reported as the hit's annotation type
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Features overlapping `[start, end)`, ordered by start, end, then id
    pub fn query(&self, chrom: &str, start: u64, end: u64) -> Vec<&TrackInterval> {
        let mut hits: Vec<&TrackInterval> = match self.find_lapper(chrom) {
            Some(l) => l.find(start, end).collect(),
            None => vec![],
        };
        hits.sort_by(|a, b| (a.start, a.stop, &a.val).cmp(&(b.start, b.stop, &b.val)));
        hits
    }

    /// Find the Lapper for a chromosome, tolerating `chr` prefix differences
    fn find_lapper(&self, chrom: &str) -> Option<&Lapper<u64, String>> {
        if let Some(l) = self.maps.get(chrom) {
            return Some(l);
        }
        self.chrom_aliases
            .get(&normalize_chrom_key(chrom))
            .and_then(|original| self.maps.get(original))
    }

    pub fn has_chrom(&self, chrom: &str) -> bool {
        self.find_lapper(chrom).is_some()
    }

    /// Total number of features across all chromosomes
    pub fn len(&self) -> usize {
        self.maps.values().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalize chromosome name for flexible matching
fn normalize_chrom_key(chrom: &str) -> String {
    let lower = chrom.to_lowercase();
    match lower.strip_prefix("chr") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// All tracks requested for a run, ordered by provider key
pub struct TrackSet {
    build: GenomeBuild,
    tracks: Vec<TrackIndex>,
    warnings: Vec<String>,
}

impl TrackSet {
    /// Look up and index every requested track
    ///
    /// A track the provider cannot deliver, or one that is empty, degrades
    /// to zero hits for that category and is recorded as a warning.
    pub fn load(provider: &dyn CatalogProvider, build: GenomeBuild, types: &[AnnotationType]) -> Self {
        let loaded: Vec<Result<TrackIndex, String>> = types
            .par_iter()
            .map(|&annotation| {
                let key = annotation.provider_key(build);
                match provider.lookup(build, annotation) {
                    Ok(records) => {
                        let index = TrackIndex::from_records(key.clone(), annotation, records);
                        debug!("Indexed track {} ({} features)", key, index.len());
                        if index.is_empty() {
                            Err(format!("Track {} is empty; it will produce no hits", key))
                        } else {
                            Ok(index)
                        }
                    }
                    Err(e) => Err(format!("{}; it will produce no hits", e)),
                }
            })
            .collect();

        let mut tracks = Vec::new();
        let mut warnings = Vec::new();
        for result in loaded {
            match result {
                Ok(index) => tracks.push(index),
                Err(message) => {
                    warn!("{}", message);
                    warnings.push(message);
                }
            }
        }
        tracks.sort_by(|a, b| a.key.cmp(&b.key));

        Self { build, tracks, warnings }
    }

    /// Build directly from indexed tracks
    pub fn from_tracks(build: GenomeBuild, mut tracks: Vec<TrackIndex>) -> Self {
        tracks.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            build,
            tracks,
            warnings: Vec::new(),
        }
    }

    pub fn build(&self) -> GenomeBuild {
        self.build
    }

    /// Tracks in lexical order of their provider keys
    pub fn tracks(&self) -> &[TrackIndex] {
        &self.tracks
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn islands() -> Vec<TrackRecord> {
        vec![
            TrackRecord::new("chr1", 3500, 3600, "island:2"),
            TrackRecord::new("chr1", 1500, 1800, "island:1"),
            TrackRecord::new("chr2", 100, 200, "island:3"),
        ]
    }

    #[test]
    fn test_index_query() {
        let index = TrackIndex::from_records("hg19_cpg_islands", AnnotationType::CpgIslands, islands());
        assert_eq!(index.len(), 3);

        let hits = index.query("chr1", 1000, 4000);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].val, "island:1");
        assert_eq!(hits[1].val, "island:2");

        assert!(index.query("chr1", 1800, 3500).is_empty());
        assert!(index.query("chr3", 0, 1_000_000).is_empty());
    }

    #[test]
    fn test_index_chrom_aliases() {
        let index = TrackIndex::from_records("k", AnnotationType::CpgIslands, islands());
        assert!(index.has_chrom("1"));
        assert!(index.has_chrom("CHR2"));
        assert_eq!(index.query("1", 1600, 1700).len(), 1);
    }

    #[test]
    fn test_index_skips_invalid_records() {
        let records = vec![
            TrackRecord::new("chr1", 10, 10, "a"),
            TrackRecord::new("chr1", 20, 10, "b"),
            TrackRecord::new("chr1", 10, 20, "c"),
        ];
        let index = TrackIndex::from_records("k", AnnotationType::Exons, records);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_in_memory_lookup() {
        let catalog = InMemoryCatalog::new().with_track(GenomeBuild::Hg19, AnnotationType::CpgIslands, islands());
        assert!(catalog.supports(GenomeBuild::Hg19));
        assert!(!catalog.supports(GenomeBuild::Hg38));
        assert_eq!(catalog.lookup(GenomeBuild::Hg19, AnnotationType::CpgIslands).unwrap().len(), 3);
        assert!(matches!(
            catalog.lookup(GenomeBuild::Hg19, AnnotationType::Exons),
            Err(CatalogError::TrackUnavailable { .. })
        ));
        assert!(matches!(
            catalog.lookup(GenomeBuild::Hg38, AnnotationType::CpgIslands),
            Err(CatalogError::UnsupportedGenome(_))
        ));
        assert!(matches!(
            catalog.lookup(GenomeBuild::Hg19, AnnotationType::Cpgs),
            Err(CatalogError::UnknownAnnotationType(_))
        ));
    }

    #[test]
    fn test_track_set_degrades_missing_and_empty_tracks() {
        let catalog = InMemoryCatalog::new()
            .with_track(GenomeBuild::Hg19, AnnotationType::CpgIslands, islands())
            .with_track(GenomeBuild::Hg19, AnnotationType::CpgShores, vec![]);
        let set = TrackSet::load(
            &catalog,
            GenomeBuild::Hg19,
            &[AnnotationType::CpgShores, AnnotationType::CpgIslands, AnnotationType::Exons],
        );
        assert_eq!(set.tracks().len(), 1);
        assert_eq!(set.tracks()[0].key(), "hg19_cpg_islands");
        assert_eq!(set.warnings().len(), 2);
    }

    #[test]
    fn test_directory_catalog() -> std::io::Result<()> {
        let root = tempfile::tempdir()?;
        let build_dir = root.path().join("hg38");
        std::fs::create_dir(&build_dir)?;
        let mut file = std::fs::File::create(build_dir.join("hg38_genes_promoters.bed"))?;
        writeln!(file, "track name=promoters")?;
        writeln!(file, "chr1\t100\t200\tpromoter:ENST1")?;
        writeln!(file, "chr1\t300\t400")?;
        drop(file);

        let catalog = DirectoryCatalog::new(root.path());
        assert!(catalog.supports(GenomeBuild::Hg38));
        assert!(!catalog.supports(GenomeBuild::Hg19));

        let records = catalog.lookup(GenomeBuild::Hg38, AnnotationType::Promoters).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].feature_id, "promoter:ENST1");
        assert_eq!(records[1].feature_id, "promoter:2");

        assert!(matches!(
            catalog.lookup(GenomeBuild::Hg38, AnnotationType::Exons),
            Err(CatalogError::TrackUnavailable { .. })
        ));
        Ok(())
    }
}
