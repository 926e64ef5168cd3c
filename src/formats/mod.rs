//! File format adapters
//!
//! BED input parsing and validation, and the tab-separated output tables.

pub mod bed;
pub mod table;

pub use bed::{read_bed_file, validate_bed_file, BedFormat, BedReader, BedValidation, ColumnLayout};
pub use table::{scan_output_files, summarize_results, OutputFiles, ResultsOverview};
