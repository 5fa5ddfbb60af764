//! Run checkpoints.
//!
//! A checkpoint sits next to the output (`out.csv.checkpoint.json`) and
//! records the last row whose output was written. It is trusted only when
//! the input bytes, the resolved window, the cache file and the refresh flag
//! are the same as in the run that wrote it.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use phone_enrich_cache::write_atomic;
use serde::{Deserialize, Serialize};

use crate::window::Window;
use crate::{EnrichError, Result};

const CHECKPOINT_SUFFIX: &str = ".checkpoint.json";

/// `<output>.checkpoint.json`
pub fn checkpoint_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(CHECKPOINT_SUFFIX);
    PathBuf::from(name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// 1-based; `window.start - 1` before the first row completes.
    pub last_completed_row: usize,
    pub cache_path: PathBuf,
    pub input_digest: String,
    pub window: Window,
    pub refresh: bool,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn start(window: Window, input_digest: &str, cache_path: &Path, refresh: bool) -> Self {
        Self {
            last_completed_row: window.start - 1,
            cache_path: cache_path.to_path_buf(),
            input_digest: input_digest.to_string(),
            window,
            refresh,
            completed: false,
            updated_at: Utc::now(),
        }
    }

    /// Load the checkpoint at `path`. A missing or unreadable file is
    /// `None`: checkpoints only ever save work, never block a run.
    pub fn load(path: &Path) -> Option<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot read checkpoint, ignoring it");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(checkpoint) => Some(checkpoint),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "corrupt checkpoint, ignoring it");
                None
            }
        }
    }

    /// First row still to process if this checkpoint belongs to an
    /// unfinished run with the same input, window, cache and refresh flag.
    pub fn resume_row(
        &self,
        window: Window,
        input_digest: &str,
        cache_path: &Path,
        refresh: bool,
    ) -> Option<usize> {
        let matches = !self.completed
            && self.input_digest == input_digest
            && self.window == window
            && self.cache_path == cache_path
            && self.refresh == refresh
            && self.last_completed_row >= window.start
            && self.last_completed_row <= window.end;
        matches.then_some(self.last_completed_row + 1)
    }

    pub fn record_row(&mut self, row: usize) {
        self.last_completed_row = row;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.updated_at = Utc::now();
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let checkpoint_error = |message: String| EnrichError::Checkpoint {
            path: path.to_path_buf(),
            message,
        };
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| checkpoint_error(e.to_string()))?;
        write_atomic(path, &bytes).map_err(|e| checkpoint_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "fnv1a64:0123456789abcdef";

    fn window() -> Window {
        Window { start: 1, end: 10 }
    }

    fn cache() -> &'static Path {
        Path::new("c.json")
    }

    #[test]
    fn path_appends_suffix() {
        assert_eq!(
            checkpoint_path(Path::new("data/out.csv")),
            PathBuf::from("data/out.csv.checkpoint.json")
        );
    }

    #[test]
    fn resumes_only_matching_unfinished_runs() {
        let mut cp = Checkpoint::start(window(), DIGEST, Path::new("c.json"), false);
        assert_eq!(cp.resume_row(window(), DIGEST, cache(), false), None, "nothing done yet");

        cp.record_row(4);
        assert_eq!(cp.resume_row(window(), DIGEST, cache(), false), Some(5));
        assert_eq!(cp.resume_row(window(), "fnv1a64:ffffffffffffffff", cache(), false), None);
        assert_eq!(cp.resume_row(Window { start: 1, end: 9 }, DIGEST, cache(), false), None);
        assert_eq!(cp.resume_row(window(), DIGEST, cache(), true), None);
        assert_eq!(cp.resume_row(window(), DIGEST, Path::new("other.json"), false), None);

        cp.mark_completed();
        assert_eq!(cp.resume_row(window(), DIGEST, cache(), false), None);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = checkpoint_path(&dir.path().join("out.csv"));
        let mut cp = Checkpoint::start(window(), DIGEST, Path::new("c.json"), false);
        cp.record_row(3);
        cp.save(&path).expect("save");
        assert_eq!(Checkpoint::load(&path), Some(cp));
    }

    #[test]
    fn corrupt_checkpoint_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.csv.checkpoint.json");
        fs::write(&path, "{ half").expect("write");
        assert_eq!(Checkpoint::load(&path), None);
        assert_eq!(Checkpoint::load(&dir.path().join("missing.json")), None);
    }
}
