//! Text input helpers
//!
//! Opens plain, gzip or bzip2 compressed text files behind a single
//! buffered reader, and iterates lines without per-line allocation.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Default buffer size for BufReader (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Compression format of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    Plain,
    /// Gzip compressed (.gz)
    Gzip,
    /// Bzip2 compressed (.bz2)
    Bzip2,
}

/// Detect compression format from file path and/or content
pub fn detect_compression(path: &Path) -> io::Result<CompressionFormat> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    if extension == "gz" {
        return Ok(CompressionFormat::Gzip);
    }
    if extension == "bz2" {
        return Ok(CompressionFormat::Bzip2);
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let bytes_read = file.read(&mut magic)?;

    if bytes_read >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
        return Ok(CompressionFormat::Gzip);
    }
    // BZ2 magic: "BZh"
    if bytes_read >= 3 && magic[0] == 0x42 && magic[1] == 0x5a && magic[2] == 0x68 {
        return Ok(CompressionFormat::Bzip2);
    }

    Ok(CompressionFormat::Plain)
}

/// Open a text file, decompressing transparently
pub fn open_text_reader(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let format = detect_compression(path)?;
    let file = File::open(path)?;

    Ok(match format {
        CompressionFormat::Gzip => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            flate2::read::MultiGzDecoder::new(file),
        )),
        CompressionFormat::Bzip2 => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            bzip2::read::BzDecoder::new(file),
        )),
        CompressionFormat::Plain => Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file)),
    })
}

/// File name with known BED and compression extensions removed
///
/// `sample1.bed.gz` → `sample1`, `peaks.narrowPeak` → `peaks`
pub fn strip_known_extensions(path: &Path) -> String {
    let mut name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    for ext in [".gz", ".bz2"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            name = stripped.to_string();
            break;
        }
    }
    match name.rfind('.') {
        Some(pos) if pos > 0 => name[..pos].to_string(),
        _ => name,
    }
}

/// Line iterator that reuses a buffer to avoid allocations
pub struct LineIterator<R: BufRead> {
    reader: R,
    buffer: String,
    line_number: usize,
}

impl<R: BufRead> LineIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::with_capacity(1024),
            line_number: 0,
        }
    }

    /// Read the next line into the internal buffer
    /// Returns None at EOF, Some(Ok(&str)) on success, Some(Err) on error
    pub fn next_line(&mut self) -> Option<io::Result<&str>> {
        self.buffer.clear();
        match self.reader.read_line(&mut self.buffer) {
            Ok(0) => None, // EOF
            Ok(_) => {
                self.line_number += 1;
                if self.buffer.ends_with('\n') {
                    self.buffer.pop();
                    if self.buffer.ends_with('\r') {
                        self.buffer.pop();
                    }
                }
                Some(Ok(&self.buffer))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// 1-based number of the line last returned
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_line_iterator() -> io::Result<()> {
        let data = b"line1\r\nline2\nline3";
        let mut iter = LineIterator::new(&data[..]);

        assert_eq!(iter.next_line().unwrap()?, "line1");
        assert_eq!(iter.next_line().unwrap()?, "line2");
        assert_eq!(iter.next_line().unwrap()?, "line3");
        assert_eq!(iter.line_number(), 3);
        assert!(iter.next_line().is_none());
        Ok(())
    }

    #[test]
    fn test_detect_plain() -> io::Result<()> {
        let mut temp = NamedTempFile::new()?;
        writeln!(temp, "chr1\t1\t2")?;
        assert_eq!(detect_compression(temp.path())?, CompressionFormat::Plain);
        Ok(())
    }

    #[test]
    fn test_gzip_roundtrip_by_magic_bytes() -> io::Result<()> {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut temp = NamedTempFile::new()?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"chr1\t100\t200\n")?;
        temp.write_all(&encoder.finish()?)?;
        temp.flush()?;

        assert_eq!(detect_compression(temp.path())?, CompressionFormat::Gzip);
        let mut reader = open_text_reader(temp.path())?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        assert_eq!(content, "chr1\t100\t200\n");
        Ok(())
    }

    #[test]
    fn test_strip_known_extensions() {
        assert_eq!(strip_known_extensions(Path::new("/data/sample1.bed")), "sample1");
        assert_eq!(strip_known_extensions(Path::new("sample1.bed.gz")), "sample1");
        assert_eq!(strip_known_extensions(Path::new("a.b.bed")), "a.b");
        assert_eq!(strip_known_extensions(Path::new("noext")), "noext");
        assert_eq!(strip_known_extensions(Path::new(".hidden")), ".hidden");
    }
}
