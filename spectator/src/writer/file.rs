use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write as _},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use tracing::warn;

use super::{Writer, WriterError};

/// A writer that appends each line to a file.
///
/// The file, and any missing parent directories, are created when the writer is created. Every line is written with a
/// single `write` call, newline included, so lines from different threads never interleave.
#[derive(Debug)]
pub struct FileWriter {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileWriter {
    /// Opens `path` for appending, creating it if necessary.
    ///
    /// # Errors
    ///
    /// If the parent directories or the file itself cannot be created or opened, an error is returned.
    pub fn open<P>(path: P) -> Result<Self, WriterError>
    where
        P: Into<PathBuf>,
    {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file: Mutex::new(Some(file)) })
    }

    /// Path of the file being written to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Writer for FileWriter {
    fn write(&self, line: &str) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(file) = file.as_mut() else {
            return;
        };

        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        if let Err(e) = file.write_all(&buf) {
            warn!(path = %self.path.display(), error = %e, "Failed to write line to file.");
        }
    }

    fn flush(&self) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = file.as_mut() {
            if let Err(e) = file.flush() {
                warn!(path = %self.path.display(), error = %e, "Failed to flush file.");
            }
        }
    }

    fn close(&self) -> Result<(), WriterError> {
        let file = self.file.lock().unwrap_or_else(PoisonError::into_inner).take();
        match file {
            Some(mut file) => {
                let result: io::Result<()> = file.flush().and_then(|()| file.sync_all());
                result.map_err(WriterError::from)
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, fs, sync::Arc, thread};

    use tempfile::TempDir;

    use super::FileWriter;
    use crate::writer::Writer;

    #[test]
    fn appends_lines() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("spectatord.log");

        let writer = FileWriter::open(&path).expect("failed to open file writer");
        writer.write("c:one:1");
        writer.write("g:two:2.000000");
        writer.close().expect("failed to close file writer");

        assert_eq!(fs::read_to_string(&path).unwrap(), "c:one:1\ng:two:2.000000\n");
    }

    #[test]
    fn creates_missing_directories() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("nested").join("deeper").join("out.txt");

        let writer = FileWriter::open(&path).expect("failed to open file writer");
        writer.write("c:nested:1");
        writer.flush();

        assert_eq!(writer.path(), path.as_path());
        assert_eq!(fs::read_to_string(&path).unwrap(), "c:nested:1\n");
    }

    #[test]
    fn appends_to_existing_file() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("existing.txt");
        fs::write(&path, "c:before:1\n").unwrap();

        let writer = FileWriter::open(&path).expect("failed to open file writer");
        writer.write("c:after:1");
        writer.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "c:before:1\nc:after:1\n");
    }

    #[test]
    fn close_is_idempotent_and_drops_later_writes() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("closed.txt");

        let writer = FileWriter::open(&path).expect("failed to open file writer");
        writer.write("c:kept:1");
        assert!(writer.close().is_ok());
        assert!(writer.close().is_ok());
        writer.write("c:dropped:1");

        assert_eq!(fs::read_to_string(&path).unwrap(), "c:kept:1\n");
    }

    #[test]
    fn concurrent_writes_keep_every_line_whole() {
        const THREADS: usize = 8;
        const LINES: usize = 50;

        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("concurrent.txt");
        let writer = Arc::new(FileWriter::open(&path).expect("failed to open file writer"));

        thread::scope(|s| {
            for t in 0..THREADS {
                let writer = Arc::clone(&writer);
                s.spawn(move || {
                    for i in 0..LINES {
                        writer.write(&format!("c:thread_{t}:{i}"));
                    }
                });
            }
        });
        writer.close().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), THREADS * LINES);

        let seen = lines.iter().map(|line| (*line).to_string()).collect::<HashSet<_>>();
        let expected =
            (0..THREADS).flat_map(|t| (0..LINES).map(move |i| format!("c:thread_{t}:{i}"))).collect::<HashSet<_>>();
        assert_eq!(seen, expected);
    }

    #[test]
    fn open_fails_when_parent_is_a_file() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        assert!(FileWriter::open(blocker.join("out.txt")).is_err());
    }
}
