//! Supported genome builds
//!
//! The set of builds is closed; anything else is rejected before the
//! catalog is consulted.

use crate::core::error::ConfigurationError;
use std::fmt;
use std::str::FromStr;

/// Reference coordinate assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GenomeBuild {
    Hg19,
    Hg38,
    Mm9,
    Mm10,
    Dm3,
    Dm6,
    Rn4,
    Rn5,
    Rn6,
}

/// Descriptive metadata for a genome build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenomeInfo {
    pub description: &'static str,
    pub species: &'static str,
    pub assembly: &'static str,
    /// Example of the chromosome naming style used by the build
    pub chromosome_style: &'static str,
}

impl GenomeBuild {
    /// All supported builds, in registry order
    pub const ALL: [GenomeBuild; 9] = [
        GenomeBuild::Hg19,
        GenomeBuild::Hg38,
        GenomeBuild::Mm9,
        GenomeBuild::Mm10,
        GenomeBuild::Dm3,
        GenomeBuild::Dm6,
        GenomeBuild::Rn4,
        GenomeBuild::Rn5,
        GenomeBuild::Rn6,
    ];

    /// Short build name, used as the provider key prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            GenomeBuild::Hg19 => "hg19",
            GenomeBuild::Hg38 => "hg38",
            GenomeBuild::Mm9 => "mm9",
            GenomeBuild::Mm10 => "mm10",
            GenomeBuild::Dm3 => "dm3",
            GenomeBuild::Dm6 => "dm6",
            GenomeBuild::Rn4 => "rn4",
            GenomeBuild::Rn5 => "rn5",
            GenomeBuild::Rn6 => "rn6",
        }
    }

    pub fn info(&self) -> GenomeInfo {
        let (description, species, assembly, chromosome_style) = match self {
            GenomeBuild::Hg19 => ("Human (GRCh37)", "Homo sapiens", "GRCh37", "chr1"),
            GenomeBuild::Hg38 => ("Human (GRCh38)", "Homo sapiens", "GRCh38", "chr1"),
            GenomeBuild::Mm9 => ("Mouse (NCBI37)", "Mus musculus", "NCBI37", "chr1"),
            GenomeBuild::Mm10 => ("Mouse (GRCm38)", "Mus musculus", "GRCm38", "chr1"),
            GenomeBuild::Dm3 => (
                "Drosophila (BDGP Release 5)",
                "Drosophila melanogaster",
                "BDGP Release 5",
                "chr2L",
            ),
            GenomeBuild::Dm6 => (
                "Drosophila (BDGP Release 6)",
                "Drosophila melanogaster",
                "BDGP Release 6",
                "chr2L",
            ),
            GenomeBuild::Rn4 => ("Rat (RGSC 3.4)", "Rattus norvegicus", "RGSC 3.4", "chr1"),
            GenomeBuild::Rn5 => ("Rat (RGSC 5.0)", "Rattus norvegicus", "RGSC 5.0", "chr1"),
            GenomeBuild::Rn6 => ("Rat (RGSC 6.0)", "Rattus norvegicus", "RGSC 6.0", "chr1"),
        };
        GenomeInfo {
            description,
            species,
            assembly,
            chromosome_style,
        }
    }

    /// Comma-separated list of build names, for error messages
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(|b| b.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for GenomeBuild {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnsupportedGenome {
                build: s.to_string(),
                available: Self::available(),
            })
    }
}

impl fmt::Display for GenomeBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_builds() {
        for build in GenomeBuild::ALL {
            assert_eq!(build.as_str().parse::<GenomeBuild>().unwrap(), build);
        }
    }

    #[test]
    fn test_reject_unknown_build() {
        let err = "hg17".parse::<GenomeBuild>().unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedGenome { ref build, .. } if build == "hg17"));
        assert!(err.to_string().contains("hg38"));
    }

    #[test]
    fn test_build_names_are_case_sensitive() {
        assert!("HG38".parse::<GenomeBuild>().is_err());
        assert!("".parse::<GenomeBuild>().is_err());
    }

    #[test]
    fn test_info() {
        let info = GenomeBuild::Mm10.info();
        assert_eq!(info.species, "Mus musculus");
        assert_eq!(info.assembly, "GRCm38");
        assert_eq!(GenomeBuild::Dm6.info().chromosome_style, "chr2L");
    }
}
