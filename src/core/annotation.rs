//! Annotation categories
//!
//! A closed enumeration of the CpG and genic categories, mapped to the
//! `<build>_<suffix>` keys understood by catalog providers.

use crate::core::error::ConfigurationError;
use crate::core::genome::GenomeBuild;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Category group, each toggled independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationGroup {
    Cpg,
    Genic,
}

/// Annotation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnnotationType {
    /// Shorthand for all four CpG classes
    Cpgs,
    CpgIslands,
    CpgShores,
    CpgShelves,
    CpgInter,
    Promoters,
    Utr5,
    Exons,
    Introns,
    Utr3,
    Intergenic,
    Upstream1To5kb,
    Cds,
}

impl AnnotationType {
    pub const ALL: [AnnotationType; 13] = [
        AnnotationType::Cpgs,
        AnnotationType::CpgIslands,
        AnnotationType::CpgShores,
        AnnotationType::CpgShelves,
        AnnotationType::CpgInter,
        AnnotationType::Promoters,
        AnnotationType::Utr5,
        AnnotationType::Exons,
        AnnotationType::Introns,
        AnnotationType::Utr3,
        AnnotationType::Intergenic,
        AnnotationType::Upstream1To5kb,
        AnnotationType::Cds,
    ];

    /// Category name as used on the command line
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationType::Cpgs => "cpgs",
            AnnotationType::CpgIslands => "cpg_islands",
            AnnotationType::CpgShores => "cpg_shores",
            AnnotationType::CpgShelves => "cpg_shelves",
            AnnotationType::CpgInter => "cpg_inter",
            AnnotationType::Promoters => "promoters",
            AnnotationType::Utr5 => "5UTRs",
            AnnotationType::Exons => "exons",
            AnnotationType::Introns => "introns",
            AnnotationType::Utr3 => "3UTRs",
            AnnotationType::Intergenic => "intergenic",
            AnnotationType::Upstream1To5kb => "1to5kb",
            AnnotationType::Cds => "cds",
        }
    }

    pub fn group(&self) -> AnnotationGroup {
        match self {
            AnnotationType::Cpgs
            | AnnotationType::CpgIslands
            | AnnotationType::CpgShores
            | AnnotationType::CpgShelves
            | AnnotationType::CpgInter => AnnotationGroup::Cpg,
            _ => AnnotationGroup::Genic,
        }
    }

    /// Provider key suffix (genic categories live under `genes_`)
    pub fn suffix(&self) -> String {
        match self.group() {
            AnnotationGroup::Cpg => self.name().to_string(),
            AnnotationGroup::Genic => format!("genes_{}", self.name()),
        }
    }

    /// Provider key for a build, e.g. `hg19_cpg_islands`
    pub fn provider_key(&self, build: GenomeBuild) -> String {
        format!("{}_{}", build.as_str(), self.suffix())
    }

    /// Prefix for generated feature ids when a track carries no names
    pub fn id_prefix(&self) -> &'static str {
        match self {
            AnnotationType::Cpgs => "cpg",
            AnnotationType::CpgIslands => "island",
            AnnotationType::CpgShores => "shore",
            AnnotationType::CpgShelves => "shelf",
            AnnotationType::CpgInter => "inter",
            AnnotationType::Promoters => "promoter",
            AnnotationType::Utr5 => "5UTR",
            AnnotationType::Exons => "exon",
            AnnotationType::Introns => "intron",
            AnnotationType::Utr3 => "3UTR",
            AnnotationType::Intergenic => "intergenic",
            AnnotationType::Upstream1To5kb => "1to5kb",
            AnnotationType::Cds => "CDS",
        }
    }

    /// Whether this is a shorthand rather than a concrete track
    pub fn is_shorthand(&self) -> bool {
        matches!(self, AnnotationType::Cpgs)
    }

    /// Concrete tracks this category stands for
    pub fn expand(&self) -> Vec<AnnotationType> {
        match self {
            AnnotationType::Cpgs => vec![
                AnnotationType::CpgIslands,
                AnnotationType::CpgShores,
                AnnotationType::CpgShelves,
                AnnotationType::CpgInter,
            ],
            other => vec![*other],
        }
    }

    /// Concrete categories of a group
    pub fn concrete_in(group: AnnotationGroup) -> Vec<AnnotationType> {
        Self::ALL
            .iter()
            .copied()
            .filter(|t| t.group() == group && !t.is_shorthand())
            .collect()
    }
}

impl FromStr for AnnotationType {
    type Err = ConfigurationError;

    /// Accepts the category name, or the `genes_`-prefixed suffix for genic ones
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let name = trimmed.strip_prefix("genes_").unwrap_or(trimmed);
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == name && (name == trimmed || t.group() == AnnotationGroup::Genic))
            .ok_or_else(|| ConfigurationError::UnknownAnnotationType(s.to_string()))
    }
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which categories a run requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSelection {
    pub include_cpg: bool,
    pub include_genic: bool,
    /// Explicit category list; overrides the group toggles when set
    pub explicit: Option<Vec<AnnotationType>>,
}

impl Default for AnnotationSelection {
    fn default() -> Self {
        Self {
            include_cpg: true,
            include_genic: true,
            explicit: None,
        }
    }
}

impl AnnotationSelection {
    pub fn new(include_cpg: bool, include_genic: bool) -> Self {
        Self {
            include_cpg,
            include_genic,
            explicit: None,
        }
    }

    /// Parse an explicit comma-separated category list
    pub fn from_names(names: &str) -> Result<Self, ConfigurationError> {
        let types = names
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse())
            .collect::<Result<Vec<AnnotationType>, _>>()?;
        Ok(Self {
            include_cpg: false,
            include_genic: false,
            explicit: Some(types),
        })
    }

    /// Resolve to concrete, de-duplicated tracks
    pub fn resolve(&self) -> Result<Vec<AnnotationType>, ConfigurationError> {
        let requested: Vec<AnnotationType> = match &self.explicit {
            Some(types) => types.clone(),
            None => {
                let mut types = Vec::new();
                if self.include_cpg {
                    types.push(AnnotationType::Cpgs);
                }
                if self.include_genic {
                    types.extend(AnnotationType::concrete_in(AnnotationGroup::Genic));
                }
                types
            }
        };

        let resolved: BTreeSet<AnnotationType> =
            requested.iter().flat_map(|t| t.expand()).collect();
        if resolved.is_empty() {
            return Err(ConfigurationError::NoAnnotationsSelected);
        }
        Ok(resolved.into_iter().collect())
    }
}
