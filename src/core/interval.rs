//! Genomic interval model
//!
//! Coordinates are 0-based half-open internally, as in BED.

use std::fmt;

/// Strand orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Strand {
    Plus,
    Minus,
    /// `.` or `*` in the input, or no strand column at all
    #[default]
    Unknown,
}

impl Strand {
    /// Parse strand from a BED field
    ///
    /// # Examples
    /// ```
    /// use annomics::core::Strand;
    /// assert_eq!(Strand::from_field("+"), Some(Strand::Plus));
    /// assert_eq!(Strand::from_field("."), Some(Strand::Unknown));
    /// assert_eq!(Strand::from_field("x"), None);
    /// ```
    pub fn from_field(s: &str) -> Option<Self> {
        match s {
            "+" => Some(Strand::Plus),
            "-" => Some(Strand::Minus),
            "." | "*" => Some(Strand::Unknown),
            _ => None,
        }
    }

    /// Convert to char
    pub fn to_char(&self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
            Strand::Unknown => '*',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A query region, with any extra BED columns carried alongside
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicInterval {
    pub chrom: String,
    /// 0-based start
    pub start: u64,
    /// Exclusive end
    pub end: u64,
    pub strand: Strand,
    /// Extra columns as (column name, raw value), in input order
    pub metadata: Vec<(String, String)>,
}

impl GenomicInterval {
    /// Create an interval without metadata
    ///
    /// Callers are expected to have checked `start < end`; the BED parser
    /// rejects rows that violate it.
    pub fn new(chrom: impl Into<String>, start: u64, end: u64, strand: Strand) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            strand,
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<(String, String)>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Region width; equals the 1-based inclusive width `end - (start + 1) + 1`
    pub fn width(&self) -> u64 {
        self.end - self.start
    }

    /// 1-based start coordinate
    pub fn one_based_start(&self) -> u64 {
        self.start + 1
    }

    /// Half-open overlap test, strand-agnostic
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start < end && start < self.end
    }

    /// Width of the intersection with `[start, end)`, zero if disjoint
    pub fn overlap_width(&self, start: u64, end: u64) -> u64 {
        self.end.min(end).saturating_sub(self.start.max(start))
    }

    /// Metadata value by column name
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}({})", self.chrom, self.start, self.end, self.strand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_and_one_based_start() {
        let iv = GenomicInterval::new("chr1", 1000, 2000, Strand::Unknown);
        assert_eq!(iv.width(), 1000);
        assert_eq!(iv.one_based_start(), 1001);
    }

    #[test]
    fn test_overlap_half_open() {
        let iv = GenomicInterval::new("chr1", 100, 200, Strand::Plus);
        assert!(iv.overlaps(150, 160));
        assert!(iv.overlaps(50, 101));
        assert!(iv.overlaps(199, 300));
        assert!(!iv.overlaps(200, 300));
        assert!(!iv.overlaps(50, 100));
    }

    #[test]
    fn test_overlap_width() {
        let iv = GenomicInterval::new("chr1", 1000, 2000, Strand::Plus);
        assert_eq!(iv.overlap_width(1500, 1800), 300);
        assert_eq!(iv.overlap_width(500, 1200), 200);
        assert_eq!(iv.overlap_width(2000, 2500), 0);
    }

    #[test]
    fn test_meta_lookup() {
        let iv = GenomicInterval::new("chr1", 0, 10, Strand::Minus)
            .with_metadata(vec![("name".into(), "peak1".into())]);
        assert_eq!(iv.meta("name"), Some("peak1"));
        assert_eq!(iv.meta("score"), None);
        assert_eq!(iv.to_string(), "chr1:0-10(-)");
    }
}
