//! Per-sample and combined summary statistics
//!
//! All widths are region widths (see [`AnnotatedRow::width`]), so a region
//! that fans out to several hits contributes its width once per hit.
//! Rows without an annotation (keep-unmatched mode) are not counted.

use crate::core::error::ConfigurationError;
use crate::core::join::{AnnotatedRow, SampleDataset};
use std::collections::{BTreeMap, BTreeSet};

/// Mean and median of a set of widths
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthStats {
    pub mean: f64,
    pub median: f64,
}

impl WidthStats {
    /// `None` for an empty set
    pub fn compute(widths: &mut [u64]) -> Option<Self> {
        if widths.is_empty() {
            return None;
        }
        widths.sort_unstable();
        let n = widths.len();
        let mean = widths.iter().map(|&w| w as f64).sum::<f64>() / n as f64;
        let median = if n % 2 == 1 {
            widths[n / 2] as f64
        } else {
            (widths[n / 2 - 1] as f64 + widths[n / 2] as f64) / 2.0
        };
        Some(Self { mean, median })
    }
}

/// One line of a sample's summary table
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub annotation_type: String,
    pub count: usize,
    pub mean_width: f64,
    pub median_width: f64,
}

/// Summary per annotation type, sorted by count descending then type name
pub fn summarize(rows: &[AnnotatedRow<'_>]) -> Vec<SummaryRow> {
    let mut widths_by_type: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
    for row in rows {
        if let Some(annotation_type) = row.annotation_type() {
            widths_by_type.entry(annotation_type).or_default().push(row.width());
        }
    }

    let mut summary: Vec<SummaryRow> = widths_by_type
        .into_iter()
        .filter_map(|(annotation_type, mut widths)| {
            let count = widths.len();
            WidthStats::compute(&mut widths).map(|stats| SummaryRow {
                annotation_type: annotation_type.to_string(),
                count,
                mean_width: stats.mean,
                median_width: stats.median,
            })
        })
        .collect();

    // stable: ties stay in name order
    summary.sort_by(|a, b| b.count.cmp(&a.count));
    summary
}

/// Summary table of one sample
pub fn summarize_sample(dataset: &SampleDataset) -> Vec<SummaryRow> {
    summarize(&dataset.annotated_rows())
}

/// Samples to be combined, keyed by sample name
#[derive(Debug, Clone, Default)]
pub struct CombinedDataset {
    samples: BTreeMap<String, SampleDataset>,
}

impl CombinedDataset {
    /// Collect samples; two samples with the same name are rejected
    pub fn from_samples<I>(samples: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = SampleDataset>,
    {
        let mut combined = Self::default();
        for sample in samples {
            if combined.samples.contains_key(&sample.sample_name) {
                return Err(ConfigurationError::DuplicateSample(sample.sample_name));
            }
            combined.samples.insert(sample.sample_name.clone(), sample);
        }
        Ok(combined)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in name order
    pub fn samples(&self) -> impl Iterator<Item = &SampleDataset> {
        self.samples.values()
    }

    /// Union of all annotated rows, tagged with their sample, ordered by
    /// sample name then per-sample row order
    pub fn annotated_rows(&self) -> Vec<(&str, AnnotatedRow<'_>)> {
        self.samples
            .iter()
            .flat_map(|(name, ds)| {
                ds.annotated_rows()
                    .into_iter()
                    .map(move |row| (name.as_str(), row))
            })
            .collect()
    }
}

/// Count and widths of one annotation type within one sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTypeSummary {
    pub sample: String,
    pub annotation_type: String,
    pub count: usize,
    pub mean_width: f64,
    pub median_width: f64,
}

/// Per-sample scalars of the combined analysis
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStats {
    pub sample: String,
    /// Annotated rows, counting each fan-out hit
    pub total_regions: usize,
    /// Distinct annotation types hit
    pub annotation_types: usize,
    /// `None` when the sample has no annotated rows
    pub mean_width: Option<f64>,
    pub median_width: Option<f64>,
}

/// Result of combining two or more samples
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedSummary {
    /// Sorted by sample, then count descending, then type name
    pub by_type: Vec<SampleTypeSummary>,
    /// Sorted by sample
    pub sample_stats: Vec<SampleStats>,
}

/// Combine samples; fewer than two samples is a no-op
pub fn combine(dataset: &CombinedDataset) -> Option<CombinedSummary> {
    if dataset.len() < 2 {
        return None;
    }

    let mut by_type = Vec::new();
    let mut sample_stats = Vec::with_capacity(dataset.len());

    for sample in dataset.samples() {
        let rows = sample.annotated_rows();
        for summary in summarize(&rows) {
            by_type.push(SampleTypeSummary {
                sample: sample.sample_name.clone(),
                annotation_type: summary.annotation_type,
                count: summary.count,
                mean_width: summary.mean_width,
                median_width: summary.median_width,
            });
        }

        let annotated: Vec<&AnnotatedRow<'_>> = rows.iter().filter(|r| r.hit.is_some()).collect();
        let types: BTreeSet<&str> = annotated.iter().filter_map(|r| r.annotation_type()).collect();
        let mut widths: Vec<u64> = annotated.iter().map(|r| r.width()).collect();
        let stats = WidthStats::compute(&mut widths);

        sample_stats.push(SampleStats {
            sample: sample.sample_name.clone(),
            total_regions: annotated.len(),
            annotation_types: types.len(),
            mean_width: stats.map(|s| s.mean),
            median_width: stats.map(|s| s.median),
        });
    }

    Some(CombinedSummary { by_type, sample_stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interval::{GenomicInterval, Strand};
    use crate::core::join::AnnotationHit;

    fn hit(region_id: usize, annotation_type: &str, feature_start: u64) -> AnnotationHit {
        AnnotationHit {
            region_id,
            annotation_type: annotation_type.to_string(),
            feature_id: format!("f{}", feature_start),
            feature_start,
            feature_end: feature_start + 10,
            overlap_width: 10,
        }
    }

    fn dataset(name: &str, widths: &[u64], hits: Vec<AnnotationHit>) -> SampleDataset {
        SampleDataset {
            sample_name: name.to_string(),
            regions: widths
                .iter()
                .enumerate()
                .map(|(i, w)| GenomicInterval::new("chr1", i as u64 * 10_000, i as u64 * 10_000 + w, Strand::Plus))
                .collect(),
            hits,
            keep_unmatched: false,
        }
    }

    #[test]
    fn test_width_stats() {
        assert!(WidthStats::compute(&mut []).is_none());
        let stats = WidthStats::compute(&mut [300, 100, 200]).unwrap();
        assert_eq!(stats.mean, 200.0);
        assert_eq!(stats.median, 200.0);
        let stats = WidthStats::compute(&mut [100, 400]).unwrap();
        assert_eq!(stats.median, 250.0);
    }

    #[test]
    fn test_summary_uses_region_width_and_sorts_by_count() {
        let ds = dataset(
            "s1",
            &[1000, 1000, 500],
            vec![
                hit(0, "hg19_cpg_islands", 1),
                hit(0, "hg19_genes_exons", 1),
                hit(1, "hg19_cpg_islands", 1),
                hit(2, "hg19_genes_exons", 1),
                hit(2, "hg19_genes_exons", 50),
                hit(2, "hg19_genes_introns", 1),
            ],
        );
        let summary = summarize_sample(&ds);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].annotation_type, "hg19_genes_exons");
        assert_eq!(summary[0].count, 3);
        assert_eq!(summary[0].median_width, 500.0);
        assert_eq!(summary[1].annotation_type, "hg19_cpg_islands");
        assert_eq!(summary[1].mean_width, 1000.0);
        assert_eq!(summary.iter().map(|s| s.count).sum::<usize>(), 6);
    }

    #[test]
    fn test_summary_ignores_unmatched_rows() {
        let mut ds = dataset("s1", &[100, 200], vec![hit(1, "hg19_cpg_inter", 1)]);
        ds.keep_unmatched = true;
        assert_eq!(ds.annotated_rows().len(), 2);
        let summary = summarize_sample(&ds);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].count, 1);
    }

    #[test]
    fn test_combine_requires_two_samples() {
        let single = CombinedDataset::from_samples(vec![dataset("a", &[10], vec![])]).unwrap();
        assert!(combine(&single).is_none());
    }

    #[test]
    fn test_combine_disjoint_types() {
        let a = dataset("a", &[100, 200], vec![hit(0, "hg19_cpg_islands", 1), hit(1, "hg19_cpg_shores", 1)]);
        let b = dataset("b", &[300], vec![hit(0, "hg19_genes_cds", 1)]);
        let standalone_a: usize = summarize_sample(&a).iter().map(|s| s.count).sum();

        let combined = CombinedDataset::from_samples(vec![b, a]).unwrap();
        let summary = combine(&combined).unwrap();

        assert_eq!(summary.by_type.len(), 3);
        assert_eq!(summary.by_type[0].sample, "a");
        assert_eq!(summary.sample_stats[0].sample, "a");
        assert_eq!(summary.sample_stats[0].total_regions, standalone_a);
        assert_eq!(summary.sample_stats[0].annotation_types, 2);
        assert_eq!(summary.sample_stats[0].mean_width, Some(150.0));
        assert_eq!(summary.sample_stats[1].total_regions, 1);

        let rows = combined.annotated_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "a");
        assert_eq!(rows[2].0, "b");
    }

    #[test]
    fn test_combined_rejects_duplicate_names() {
        let result = CombinedDataset::from_samples(vec![dataset("x", &[1], vec![]), dataset("x", &[2], vec![])]);
        match result {
            Err(err @ ConfigurationError::DuplicateSample(_)) => {
                assert_eq!(err.to_string(), "Sample 'x' appears more than once");
            }
            other => panic!("expected duplicate sample error, got {:?}", other.map(|c| c.len())),
        }
    }
}
