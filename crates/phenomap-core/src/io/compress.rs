//! Buffered text I/O with transparent gzip.
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{PhenoError, Result};

/// Open `path` for line-oriented reading, decompressing when it ends in `.gz`.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).map_err(|e| PhenoError::io(path, e))?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Gzip text writer for `<name>.gz`. The parent folder is created if absent.
/// Call [`GzTextWriter::finish`] to flush; dropping without it may lose data.
pub struct GzTextWriter {
    path: PathBuf,
    inner: BufWriter<GzEncoder<File>>,
}

impl GzTextWriter {
    /// `name` is the uncompressed file name; `.gz` is appended.
    pub fn create(name: &Path) -> Result<Self> {
        let mut path = name.as_os_str().to_owned();
        path.push(".gz");
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PhenoError::io(parent, e))?;
        }
        let file = File::create(&path).map_err(|e| PhenoError::io(&path, e))?;
        Ok(Self {
            inner: BufWriter::new(GzEncoder::new(file, Compression::default())),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.inner.write_all(s.as_bytes()).map_err(|e| PhenoError::io(&self.path, e))
    }

    /// Flush the buffer, close the gzip stream and the file.
    pub fn finish(self) -> Result<PathBuf> {
        let path = self.path;
        let encoder = self.inner.into_inner().map_err(|e| PhenoError::io(&path, e.into_error()))?;
        let mut file = encoder.finish().map_err(|e| PhenoError::io(&path, e))?;
        file.flush().map_err(|e| PhenoError::io(&path, e))?;
        Ok(path)
    }
}

impl Write for GzTextWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn writer_appends_gz_and_reader_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("nested/out.csv");
        let mut w = GzTextWriter::create(&name).unwrap();
        w.write_str("a,b\n1,2\n").unwrap();
        let written = w.finish().unwrap();
        assert_eq!(written, dir.path().join("nested/out.csv.gz"));

        let mut text = String::new();
        open_text(&written).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "a,b\n1,2\n");
    }

    #[test]
    fn plain_files_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.csv");
        fs::write(&path, "x\n").unwrap();
        let lines: Vec<String> = open_text(&path).unwrap().lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["x"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(open_text(Path::new("/no/such/file.gz")), Err(PhenoError::Io { .. })));
    }
}
