use anyhow::{Context, Result, bail};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A photo staged for upload. The staged copy is removed when the item is dropped.
#[derive(Debug)]
pub struct StagedEvidence {
    pub id: String,
    pub source: PathBuf,
    pub caption: String,
    staged: PathBuf,
}

impl StagedEvidence {
    pub fn staged_path(&self) -> &Path {
        &self.staged
    }
}

impl Drop for StagedEvidence {
    fn drop(&mut self) {
        match fs::remove_file(&self.staged) {
            Ok(()) => debug!(path = %self.staged.display(), "staged evidence released"),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => {
                warn!(
                    error = %error,
                    path = %self.staged.display(),
                    "failed to release staged evidence"
                )
            }
        }
    }
}

/// Ordered evidence list for one draft. Order is the upload and report order.
#[derive(Debug)]
pub struct EvidenceTray {
    dir: PathBuf,
    items: Vec<StagedEvidence>,
    next_id: usize,
}

impl EvidenceTray {
    pub fn new() -> Result<Self> {
        let dir = std::env::temp_dir().join(format!(
            "OccurrenceDesk-evidence-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        Self::in_dir(dir)
    }

    pub fn in_dir(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create staging directory: {}", dir.display()))?;

        Ok(Self {
            dir,
            items: Vec::new(),
            next_id: 1,
        })
    }

    /// Copies the file into the staging directory and appends it to the tray.
    pub fn stage(&mut self, source: &Path, caption: &str) -> Result<&StagedEvidence> {
        if !source.is_file() {
            bail!("Evidence file not found: {}", source.display());
        }

        let id = format!("ev-{:03}", self.next_id);
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "evidencia".to_string());
        let staged = self.dir.join(format!("{id}-{file_name}"));

        fs::copy(source, &staged).with_context(|| {
            format!(
                "Failed to stage evidence {} -> {}",
                source.display(),
                staged.display()
            )
        })?;

        self.next_id += 1;
        self.items.push(StagedEvidence {
            id,
            source: source.to_path_buf(),
            caption: caption.trim().to_string(),
            staged,
        });

        Ok(&self.items[self.items.len() - 1])
    }

    /// Removes the item and releases its staged copy.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        before != self.items.len()
    }

    pub fn set_caption(&mut self, id: &str, caption: &str) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.caption = caption.trim().to_string();
                true
            }
            None => false,
        }
    }

    /// Moves the item at `from` to position `to`, shifting the rest.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }

        let item = self.items.remove(from);
        self.items.insert(to, item);
        true
    }

    pub fn items(&self) -> &[StagedEvidence] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn staged_paths(&self) -> Vec<&Path> {
        self.items.iter().map(StagedEvidence::staged_path).collect()
    }
}

impl Drop for EvidenceTray {
    fn drop(&mut self) {
        self.items.clear();

        if let Err(error) = fs::remove_dir_all(&self.dir) {
            if error.kind() != ErrorKind::NotFound {
                warn!(
                    error = %error,
                    dir = %self.dir.display(),
                    "failed to remove staging directory"
                );
            }
        }
    }
}
