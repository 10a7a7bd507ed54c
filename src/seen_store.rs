use crate::errors::StoreError;
use crate::debug_println;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Plain text file holding one seen listing URL per line.
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SeenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty set. Blank lines are ignored.
    pub fn load(&self) -> Result<HashSet<String>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug_println!("Seen file does not exist: {}", self.path.display());
                return Ok(HashSet::new());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Replace the file contents with `urls`, one per line, in the given order.
    pub fn save<'a, I>(&self, urls: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        let mut writer = BufWriter::new(file);

        let mut count = 0;
        for url in urls {
            writeln!(writer, "{}", url).map_err(|e| self.io_error(e))?;
            count += 1;
        }
        writer.flush().map_err(|e| self.io_error(e))?;

        debug_println!("Saved {} seen URLs to {}", count, self.path.display());
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
