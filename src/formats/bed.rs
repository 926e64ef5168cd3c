//! BED format adapter
//!
//! Parses BED3/BED6/BED12 query files into [`GenomicInterval`]s with
//! zero-copy field splitting. Columns beyond the coordinates and strand
//! are kept verbatim as interval metadata.

use crate::core::error::{AnnomicsError, Result};
use crate::core::io::{open_text_reader, LineIterator};
use crate::core::{GenomicInterval, Strand};
use memchr::memchr;
use std::fmt;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Number of data lines shown by [`validate_bed_file`]
const PREVIEW_LINES: usize = 5;

/// Canonical names of the standard BED columns after chrom/start/end
const BED_COLUMN_NAMES: [&str; 12] = [
    "chrom",
    "start",
    "end",
    "name",
    "score",
    "strand",
    "thickStart",
    "thickEnd",
    "itemRgb",
    "blockCount",
    "blockSizes",
    "blockStarts",
];

/// BED flavour, decided by column count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedFormat {
    Bed3,
    Bed6,
    Bed12,
    Unknown,
}

impl BedFormat {
    pub fn from_field_count(count: usize) -> Self {
        if count >= 12 {
            BedFormat::Bed12
        } else if count >= 6 {
            BedFormat::Bed6
        } else if count >= 3 {
            BedFormat::Bed3
        } else {
            BedFormat::Unknown
        }
    }
}

impl fmt::Display for BedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BedFormat::Bed3 => "BED3",
            BedFormat::Bed6 => "BED6",
            BedFormat::Bed12 => "BED12",
            BedFormat::Unknown => "UNKNOWN",
        })
    }
}

/// Where the coordinate columns live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub chrom: usize,
    pub start: usize,
    pub end: usize,
    pub strand: Option<usize>,
    /// Column names from a header row, if one was found
    names: Option<Vec<String>>,
}

impl ColumnLayout {
    /// Standard BED positions; strand is column 6 when present
    pub fn positional() -> Self {
        Self {
            chrom: 0,
            start: 1,
            end: 2,
            strand: Some(5),
            names: None,
        }
    }

    /// Resolve columns from header names; `None` unless chrom, start and
    /// end all match a canonical name
    pub fn from_header(fields: &[&str]) -> Option<Self> {
        let find = |candidates: &[&str]| {
            fields.iter().position(|f| {
                let f = f.trim().trim_start_matches('#').trim();
                candidates.iter().any(|c| c.eq_ignore_ascii_case(f))
            })
        };

        let chrom = find(&["chrom", "chr", "seqnames", "chromosome", "seqname"])?;
        let start = find(&["start", "chromStart"])?;
        let end = find(&["end", "chromEnd", "stop"])?;
        let strand = find(&["strand"]);

        Some(Self {
            chrom,
            start,
            end,
            strand,
            names: Some(
                fields
                    .iter()
                    .map(|f| f.trim().trim_start_matches('#').trim().to_string())
                    .collect(),
            ),
        })
    }

    /// Minimum number of fields a row needs under this layout
    fn required_fields(&self) -> usize {
        self.chrom.max(self.start).max(self.end) + 1
    }

    fn is_coordinate(&self, index: usize) -> bool {
        index == self.chrom || index == self.start || index == self.end || Some(index) == self.strand
    }

    /// Metadata key of a column
    fn column_name(&self, index: usize) -> String {
        if let Some(name) = self.names.as_ref().and_then(|n| n.get(index)) {
            if !name.is_empty() {
                return name.clone();
            }
        }
        if self.names.is_none() {
            if let Some(name) = BED_COLUMN_NAMES.get(index) {
                return name.to_string();
            }
        }
        format!("V{}", index + 1)
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::positional()
    }
}

/// Zero-copy BED record view for parsing
/// Only parses coordinate fields immediately, other fields are kept as byte slices
pub struct BedRecordView<'a> {
    /// Original line bytes
    line: &'a [u8],
    /// Chromosome name
    pub chrom: &'a str,
    /// Start position (0-based)
    pub start: u64,
    /// End position
    pub end: u64,
    /// Field boundaries (start, end) for lazy access
    field_bounds: Vec<(usize, usize)>,
}

impl<'a> BedRecordView<'a> {
    /// Parse a BED line using standard column positions
    pub fn parse(line: &'a [u8]) -> std::result::Result<Self, BedParseError> {
        Self::parse_with(line, &ColumnLayout::positional())
    }

    /// Parse a BED line with the given column layout
    /// Only parses chrom, start, end immediately
    pub fn parse_with(line: &'a [u8], layout: &ColumnLayout) -> std::result::Result<Self, BedParseError> {
        if line.is_empty() {
            return Err(BedParseError::EmptyLine);
        }

        let field_bounds = split_fields(line);

        let required = layout.required_fields().max(3);
        if field_bounds.len() < required {
            return Err(BedParseError::TooFewFields {
                expected: required,
                found: field_bounds.len(),
            });
        }

        let field = |index: usize, name: &'static str| {
            let (s, e) = field_bounds[index];
            std::str::from_utf8(&line[s..e]).map_err(|_| BedParseError::InvalidUtf8(name))
        };

        let chrom = field(layout.chrom, "chrom")?;

        let start_str = field(layout.start, "start")?;
        let start: u64 = start_str
            .trim()
            .parse()
            .map_err(|_| BedParseError::InvalidNumber("start", start_str.to_string()))?;

        let end_str = field(layout.end, "end")?;
        let end: u64 = end_str
            .trim()
            .parse()
            .map_err(|_| BedParseError::InvalidNumber("end", end_str.to_string()))?;

        Ok(Self {
            line,
            chrom,
            start,
            end,
            field_bounds,
        })
    }

    /// Get the number of fields
    pub fn field_count(&self) -> usize {
        self.field_bounds.len()
    }

    /// Get field as string slice (lazy access)
    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.field_bounds
            .get(index)
            .and_then(|(start, end)| std::str::from_utf8(&self.line[*start..*end]).ok())
    }

    /// Get name field (field 3) if present
    pub fn name(&self) -> Option<&'a str> {
        self.field(3)
    }

    /// Get score field (field 4) if present
    pub fn score(&self) -> Option<&'a str> {
        self.field(4)
    }

    /// Get strand field (field 5) if present
    pub fn strand(&self) -> Option<Strand> {
        self.field(5).and_then(Strand::from_field)
    }

    pub fn format(&self) -> BedFormat {
        BedFormat::from_field_count(self.field_count())
    }

    /// Validate and convert to an owned interval, collecting metadata
    pub fn to_interval(&self, layout: &ColumnLayout) -> std::result::Result<GenomicInterval, BedParseError> {
        if self.chrom.trim().is_empty() {
            return Err(BedParseError::EmptyChrom);
        }
        if self.start >= self.end {
            return Err(BedParseError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }

        let strand = match layout.strand.and_then(|i| self.field(i)) {
            Some(raw) => Strand::from_field(raw.trim())
                .ok_or_else(|| BedParseError::InvalidStrand(raw.to_string()))?,
            None => Strand::Unknown,
        };

        let metadata = (0..self.field_count())
            .filter(|&i| !layout.is_coordinate(i))
            .filter_map(|i| self.field(i).map(|v| (layout.column_name(i), v.to_string())))
            .collect();

        Ok(GenomicInterval {
            chrom: self.chrom.to_string(),
            start: self.start,
            end: self.end,
            strand,
            metadata,
        })
    }
}

/// Split a line on tabs, returning field boundaries
fn split_fields(line: &[u8]) -> Vec<(usize, usize)> {
    let mut field_bounds = Vec::with_capacity(12);
    let mut start_pos = 0;

    loop {
        match memchr(b'\t', &line[start_pos..]) {
            Some(tab_pos) => {
                let end_pos = start_pos + tab_pos;
                field_bounds.push((start_pos, end_pos));
                start_pos = end_pos + 1;
            }
            None => {
                // Last field
                field_bounds.push((start_pos, line.len()));
                break;
            }
        }
    }

    field_bounds
}

/// BED parsing error
#[derive(Debug, thiserror::Error)]
pub enum BedParseError {
    #[error("Empty line")]
    EmptyLine,

    #[error("Too few fields: expected at least {expected}, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("Invalid UTF-8 in field: {0}")]
    InvalidUtf8(&'static str),

    #[error("Empty chromosome name")]
    EmptyChrom,

    #[error("Invalid number in field {0}: {1}")]
    InvalidNumber(&'static str, String),

    #[error("Invalid range: start ({start}) must be less than end ({end})")]
    InvalidRange { start: u64, end: u64 },

    #[error("Invalid strand '{0}': expected '+', '-' or '.'")]
    InvalidStrand(String),

    #[error("Cannot resolve coordinate columns from header: {0}")]
    UnresolvedColumns(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BedParseError {
    /// Structural problems, as opposed to bad coordinate values
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            BedParseError::EmptyLine
                | BedParseError::TooFewFields { .. }
                | BedParseError::InvalidUtf8(_)
                | BedParseError::EmptyChrom
                | BedParseError::UnresolvedColumns(_)
        )
    }
}

/// A row-level parse error with its line number
#[derive(Debug, thiserror::Error)]
#[error("line {line}: {source}")]
pub struct BedRowError {
    pub line: usize,
    #[source]
    pub source: BedParseError,
}

impl BedRowError {
    /// Attach the file path, classifying into the crate-wide taxonomy
    pub fn with_path<P: AsRef<Path>>(self, path: P) -> AnnomicsError {
        let path = path.as_ref().to_path_buf();
        match self.source {
            BedParseError::Io(source) => AnnomicsError::Io { path, source },
            ref kind if kind.is_format_error() => AnnomicsError::Format {
                path,
                line: self.line,
                message: kind.to_string(),
            },
            kind => AnnomicsError::Parse {
                path,
                line: self.line,
                message: kind.to_string(),
            },
        }
    }
}

/// Streaming BED reader yielding intervals in input order
///
/// `#` comment lines, `track`/`browser` lines and blank lines are skipped.
/// The column layout is decided at the first data line: a header (the
/// last `#` line, or a first row with non-numeric coordinates) is matched
/// against canonical column names, otherwise standard positions are used.
pub struct BedReader<R: BufRead> {
    lines: LineIterator<R>,
    layout: Option<ColumnLayout>,
    last_comment: Option<String>,
    format: BedFormat,
    finished: bool,
}

impl<R: BufRead> BedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LineIterator::new(reader),
            layout: None,
            last_comment: None,
            format: BedFormat::Unknown,
            finished: false,
        }
    }

    /// Format of the first data row, `Unknown` before any row is read
    pub fn format(&self) -> BedFormat {
        self.format
    }

    pub fn layout(&self) -> Option<&ColumnLayout> {
        self.layout.as_ref()
    }

    fn error(&mut self, source: BedParseError) -> Option<std::result::Result<GenomicInterval, BedRowError>> {
        Some(Err(BedRowError {
            line: self.lines.line_number(),
            source,
        }))
    }

    /// Decide the layout from the first data line
    ///
    /// Returns `Ok(true)` when the line itself was a header and must be skipped.
    fn resolve_layout(&mut self, line: &str) -> std::result::Result<bool, BedParseError> {
        if let Some(layout) = self
            .last_comment
            .as_deref()
            .and_then(|c| ColumnLayout::from_header(&c.split('\t').collect::<Vec<_>>()))
        {
            self.layout = Some(layout);
            return Ok(false);
        }

        let positional = ColumnLayout::positional();
        match BedRecordView::parse_with(line.as_bytes(), &positional) {
            Err(err @ BedParseError::InvalidNumber(..)) => {
                let fields: Vec<&str> = line.split('\t').collect();
                if let Some(layout) = ColumnLayout::from_header(&fields) {
                    self.layout = Some(layout);
                    return Ok(true);
                }
                // A row without digits in its coordinate fields is a header
                // we could not resolve; anything else is just a bad row
                let looks_like_header = fields
                    .iter()
                    .skip(1)
                    .take(2)
                    .all(|f| !f.bytes().any(|b| b.is_ascii_digit()));
                if looks_like_header {
                    Err(BedParseError::UnresolvedColumns(line.to_string()))
                } else {
                    Err(err)
                }
            }
            _ => {
                self.layout = Some(positional);
                Ok(false)
            }
        }
    }
}

impl<R: BufRead> Iterator for BedReader<R> {
    type Item = std::result::Result<GenomicInterval, BedRowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.lines.next_line()? {
                Ok(line) => line.to_string(),
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    // the failed line was not counted by the line iterator
                    self.finished = true;
                    return Some(Err(BedRowError {
                        line: self.lines.line_number() + 1,
                        source: BedParseError::InvalidUtf8("line"),
                    }));
                }
                Err(e) => {
                    self.finished = true;
                    return self.error(BedParseError::Io(e));
                }
            };

            if line.trim().is_empty() || line.starts_with("track") || line.starts_with("browser") {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                self.last_comment = Some(comment.to_string());
                continue;
            }

            if self.layout.is_none() {
                match self.resolve_layout(&line) {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(e) => {
                        self.finished = true;
                        return self.error(e);
                    }
                }
            }
            let positional;
            let layout = match self.layout.as_ref() {
                Some(layout) => layout,
                None => {
                    positional = ColumnLayout::positional();
                    &positional
                }
            };

            let result = BedRecordView::parse_with(line.as_bytes(), layout)
                .and_then(|view| Ok((view.format(), view.to_interval(layout)?)));

            return match result {
                Ok((format, interval)) => {
                    if self.format == BedFormat::Unknown {
                        self.format = format;
                    }
                    Some(Ok(interval))
                }
                Err(e) => self.error(e),
            };
        }
    }
}

/// Parse a whole BED stream, stopping at the first bad row
pub fn parse_bed_reader<R: BufRead>(reader: R) -> std::result::Result<Vec<GenomicInterval>, BedRowError> {
    BedReader::new(reader).collect()
}

/// Read a BED file (plain, gzip or bzip2) into intervals
///
/// Errors name the file and, for row errors, the line.
pub fn read_bed_file<P: AsRef<Path>>(path: P) -> Result<Vec<GenomicInterval>> {
    let path = path.as_ref();
    let reader = open_text_reader(path).map_err(|e| AnnomicsError::io(path, e))?;
    parse_bed_reader(reader).map_err(|e| e.with_path(path))
}

/// Detect the BED flavour from the first data line
///
/// Empty files, comment-only files and files whose first row has fewer
/// than three columns are `Unknown`.
pub fn detect_bed_format<P: AsRef<Path>>(path: P) -> Result<BedFormat> {
    let path = path.as_ref();
    let reader = open_text_reader(path).map_err(|e| AnnomicsError::io(path, e))?;
    let mut lines = LineIterator::new(reader);

    while let Some(line) = lines.next_line() {
        let line = line.map_err(|e| AnnomicsError::io(path, e))?;
        if line.trim().is_empty() || line.starts_with('#') || line.starts_with("track") || line.starts_with("browser") {
            continue;
        }
        return Ok(BedFormat::from_field_count(line.split('\t').count()));
    }

    Ok(BedFormat::Unknown)
}

/// Outcome of validating a BED file
#[derive(Debug, Clone)]
pub struct BedValidation {
    pub path: PathBuf,
    pub format: BedFormat,
    /// First few data lines, verbatim
    pub preview: Vec<String>,
    /// Rows parsed before the first error (or all rows)
    pub records: usize,
    pub first_error: Option<String>,
}

impl BedValidation {
    pub fn is_valid(&self) -> bool {
        self.format != BedFormat::Unknown && self.first_error.is_none()
    }
}

/// Detect the format, preview the file and check every row
pub fn validate_bed_file<P: AsRef<Path>>(path: P) -> Result<BedValidation> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AnnomicsError::not_found(path, "file not found"));
    }
    let format = detect_bed_format(path)?;

    let reader = open_text_reader(path).map_err(|e| AnnomicsError::io(path, e))?;
    let mut lines = LineIterator::new(reader);
    let mut preview = Vec::with_capacity(PREVIEW_LINES);
    while preview.len() < PREVIEW_LINES {
        match lines.next_line() {
            Some(Ok(line)) => {
                if !line.trim().is_empty() && !line.starts_with('#') {
                    preview.push(line.to_string());
                }
            }
            Some(Err(e)) => return Err(AnnomicsError::io(path, e)),
            None => break,
        }
    }

    let reader = open_text_reader(path).map_err(|e| AnnomicsError::io(path, e))?;
    let mut records = 0;
    let mut first_error = None;
    for row in BedReader::new(reader) {
        match row {
            Ok(_) => records += 1,
            Err(e) => {
                first_error = Some(e.to_string());
                break;
            }
        }
    }

    Ok(BedValidation {
        path: path.to_path_buf(),
        format,
        preview,
        records,
        first_error,
    })
}
