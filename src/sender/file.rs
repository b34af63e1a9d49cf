//! Rotating append-only file sender.
//!
//! Each event is appended as `raw_event + "\n"`. Before every write the
//! active file's size is checked; once it reaches `max_size_mb` the backlog
//! shifts (`path.1` -> `path.2` ... up to `path.<keep>`, the oldest dropped),
//! the active file becomes `path.1` and a fresh file is opened. Missing
//! siblings are skipped.

use super::{Sender, lock};
use crate::config::DestinationConfig;
use crate::error::DeliveryError;
use crate::event::GeneratedEvent;
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

const BYTES_PER_MB: u64 = 1024 * 1024;

pub struct FileSender {
    name: String,
    path: PathBuf,
    /// Rotation threshold in bytes; 0 never rotates
    max_bytes: u64,
    keep: usize,
    /// `None` after close or after a failed reopen; the next call reopens
    file: Mutex<Option<File>>,
}

impl FileSender {
    pub fn new(config: &DestinationConfig) -> Result<Self, DeliveryError> {
        config.validate()?;
        let path = config
            .path
            .clone()
            .ok_or_else(|| DeliveryError::Config("file destination requires `path`".into()))?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| DeliveryError::io(dir.display().to_string(), e))?;
        }
        let file = open_append(&path)?;

        info!(path = %path.display(), max_size_mb = config.max_size_mb, keep = config.rotate_keep, "File sender opened");

        Ok(Self {
            name: config.name.clone(),
            path,
            max_bytes: config.max_size_mb.saturating_mul(BYTES_PER_MB),
            keep: config.rotate_keep.max(1),
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the `n`-th rotated sibling.
    pub fn rotated_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn io_err(&self, e: std::io::Error) -> DeliveryError {
        DeliveryError::io(self.path.display().to_string(), e)
    }

    /// Active handle, reopening it if a previous rotation or close dropped it.
    fn active<'a>(&self, slot: &'a mut Option<File>) -> Result<&'a mut File, DeliveryError> {
        if slot.is_none() {
            *slot = Some(open_append(&self.path)?);
        }
        slot.as_mut().ok_or(DeliveryError::Poisoned)
    }

    fn rotate_if_needed(&self, slot: &mut Option<File>) -> Result<(), DeliveryError> {
        if self.max_bytes == 0 {
            return Ok(());
        }
        let size = self
            .active(slot)?
            .metadata()
            .map_err(|e| self.io_err(e))?
            .len();
        if size >= self.max_bytes {
            self.rotate(slot)?;
        }
        Ok(())
    }

    fn rotate(&self, slot: &mut Option<File>) -> Result<(), DeliveryError> {
        if let Some(mut current) = slot.take() {
            current.flush().map_err(|e| self.io_err(e))?;
        }

        remove_if_exists(&self.rotated_path(self.keep))?;
        for n in (1..self.keep).rev() {
            rename_if_exists(&self.rotated_path(n), &self.rotated_path(n + 1))?;
        }
        rename_if_exists(&self.path, &self.rotated_path(1))?;

        *slot = Some(open_append(&self.path)?);
        info!(path = %self.path.display(), keep = self.keep, "Rotated output file");
        Ok(())
    }
}

impl Sender for FileSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, event: &GeneratedEvent) -> Result<(), DeliveryError> {
        let mut slot = lock(&self.file)?;
        self.rotate_if_needed(&mut slot)?;

        let mut line = String::with_capacity(event.raw_event().len() + 1);
        line.push_str(event.raw_event());
        line.push('\n');

        self.active(&mut slot)?
            .write_all(line.as_bytes())
            .map_err(|e| {
                warn!(path = %self.path.display(), error = %e, "File write failed");
                self.io_err(e)
            })?;
        debug!(path = %self.path.display(), id = %event.id(), "Event appended");
        Ok(())
    }

    fn flush(&self) -> Result<(), DeliveryError> {
        let mut slot = lock(&self.file)?;
        if let Some(file) = slot.as_mut() {
            file.flush().map_err(|e| self.io_err(e))?;
        }
        Ok(())
    }

    fn test(&self) -> Result<(), DeliveryError> {
        let mut slot = lock(&self.file)?;
        let file = self.active(&mut slot)?;
        let marker = format!("# threatgen connectivity test {}\n", Utc::now().to_rfc3339());
        file.write_all(marker.as_bytes()).map_err(|e| self.io_err(e))?;
        file.sync_all().map_err(|e| self.io_err(e))
    }

    fn close(&self) -> Result<(), DeliveryError> {
        let mut slot = lock(&self.file)?;
        if let Some(mut file) = slot.take() {
            file.flush().map_err(|e| self.io_err(e))?;
            file.sync_all().map_err(|e| self.io_err(e))?;
            info!(path = %self.path.display(), "File sender closed");
        }
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File, DeliveryError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| DeliveryError::io(path.display().to_string(), e))
}

fn remove_if_exists(path: &Path) -> Result<(), DeliveryError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            Err(DeliveryError::io(path.display().to_string(), e))
        }
        _ => Ok(()),
    }
}

fn rename_if_exists(from: &Path, to: &Path) -> Result<(), DeliveryError> {
    match fs::rename(from, to) {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            Err(DeliveryError::io(from.display().to_string(), e))
        }
        _ => Ok(()),
    }
}
