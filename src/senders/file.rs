//! File sender implementation

use crate::core::{Result, Sender};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends every payload, newline-terminated, to a local file
///
/// Writes from concurrent workers are serialised by a mutex; each send is
/// flushed before it returns.
pub struct FileSender {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSender {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sender for FileSender {
    fn send(&self, _job: &str, payload: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(payload)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileSender {
    fn drop(&mut self) {
        let _ = self.writer.lock().flush();
    }
}
