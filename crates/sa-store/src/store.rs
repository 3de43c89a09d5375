//! Persistent service-area output with completion memo.
//!
//! A group's output counts as complete only when the store's memo records
//! it under the same configuration fingerprint *and* the output itself is
//! present.  The memo is written after the output is in place, so a crash
//! mid-commit never leaves a group that later runs would skip.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use sa_core::Raster;

use crate::asc::{read_asc, write_asc};
use crate::{StoreError, StoreResult};

// ── RasterStore trait ─────────────────────────────────────────────────────────

/// Output backend of a batch run.
///
/// Shared by every worker, so all methods take `&self` and implementations
/// serialise their own writes.
pub trait RasterStore: Send + Sync {
    /// `true` if `name` was committed under `fingerprint` and is still
    /// present.
    fn is_complete(&self, name: &str, fingerprint: u64) -> StoreResult<bool>;

    /// Persist `raster` as `name` and then record it as complete.
    fn commit(&self, name: &str, fingerprint: u64, raster: &Raster) -> StoreResult<()>;

    /// Read a committed output back, if present.
    fn load(&self, name: &str) -> StoreResult<Option<Raster>>;

    /// Release run-scoped resources.  Idempotent.
    fn finish(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Fingerprints are persisted as fixed-width hex.
pub fn fingerprint_hex(fingerprint: u64) -> String {
    format!("{fingerprint:016x}")
}

// ── Scratch space ─────────────────────────────────────────────────────────────

/// A directory removed when the guard is dropped.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(path: PathBuf) -> StoreResult<Self> {
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove scratch {}: {e}", self.path.display());
            }
        }
    }
}

// ── Manifest ──────────────────────────────────────────────────────────────────

const MANIFEST: &str = "manifest.csv";

#[derive(Serialize, Deserialize)]
struct ManifestRecord {
    name:        String,
    fingerprint: String,
}

fn read_manifest(path: &Path) -> StoreResult<HashMap<String, u64>> {
    let mut done = HashMap::new();
    if !path.exists() {
        return Ok(done);
    }
    let mut rdr = csv::Reader::from_path(path)?;
    for rec in rdr.deserialize::<ManifestRecord>() {
        let rec = rec?;
        let fp = u64::from_str_radix(&rec.fingerprint, 16).map_err(|_| {
            StoreError::format("manifest", format!("bad fingerprint {:?}", rec.fingerprint))
        })?;
        // Later lines supersede earlier ones.
        done.insert(rec.name, fp);
    }
    Ok(done)
}

// ── DirStore ──────────────────────────────────────────────────────────────────

/// One `<name>.asc` per group in a directory, plus `manifest.csv`.
///
/// Commits are staged in a per-commit directory under a run-unique
/// `.scratch-*` root inside the output directory, then renamed into place.
/// The scratch root is removed by [`RasterStore::finish`] or on drop, and
/// re-created if the store commits again afterwards.
pub struct DirStore {
    dir:     PathBuf,
    done:    Mutex<HashMap<String, u64>>,
    scratch: Mutex<Option<ScratchDir>>,
    staged:  AtomicU64,
}

impl DirStore {
    /// Open (or create) the output directory and read its manifest.
    ///
    /// Scratch roots left behind by other processes (killed, or aborted
    /// before their guards ran) are removed; one run per output directory
    /// at a time is assumed.  The new scratch root is created here so an
    /// unwritable output directory fails before any group is computed.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;
        let done = read_manifest(&dir.join(MANIFEST))?;
        remove_stale_scratch(dir)?;
        let scratch = ScratchDir::create(scratch_root_in(dir))?;
        debug!("opened {} ({} completed outputs)", dir.display(), done.len());

        Ok(Self {
            dir:     dir.to_path_buf(),
            done:    Mutex::new(done),
            scratch: Mutex::new(Some(scratch)),
            staged:  AtomicU64::new(0),
        })
    }

    /// Path of the persisted output for `name`.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.asc"))
    }

    /// Path of this run's scratch root, while it exists.
    pub fn scratch_root(&self) -> Option<PathBuf> {
        self.scratch
            .lock()
            .ok()
            .and_then(|g| g.as_ref().map(|s| s.path().to_path_buf()))
    }

    /// A fresh staging directory unique to this commit.  Re-creates the
    /// scratch root if a previous run already finished.
    fn stage(&self, name: &str) -> StoreResult<ScratchDir> {
        let root = {
            let mut scratch = self.scratch.lock().map_err(poisoned)?;
            match scratch.as_ref() {
                Some(s) => s.path().to_path_buf(),
                None => {
                    let fresh = ScratchDir::create(scratch_root_in(&self.dir))?;
                    let path = fresh.path().to_path_buf();
                    *scratch = Some(fresh);
                    path
                }
            }
        };
        let n = self.staged.fetch_add(1, Ordering::Relaxed);
        ScratchDir::create(root.join(format!("{name}-{n}")))
    }

    fn append_manifest(&self, name: &str, fingerprint: u64) -> StoreResult<()> {
        let path = self.dir.join(MANIFEST);
        let new_file = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut w = csv::WriterBuilder::new().has_headers(new_file).from_writer(file);
        w.serialize(ManifestRecord {
            name:        name.to_owned(),
            fingerprint: fingerprint_hex(fingerprint),
        })?;
        w.flush()?;
        Ok(())
    }
}

impl RasterStore for DirStore {
    fn is_complete(&self, name: &str, fingerprint: u64) -> StoreResult<bool> {
        let recorded = self.done.lock().map_err(poisoned)?.get(name).copied();
        Ok(recorded == Some(fingerprint) && self.output_path(name).is_file())
    }

    fn commit(&self, name: &str, fingerprint: u64, raster: &Raster) -> StoreResult<()> {
        // Staging directory is removed on every exit path.
        let staging = self.stage(name)?;
        let staged = staging.path().join(format!("{name}.asc"));
        write_asc(&staged, raster)?;

        let mut done = self.done.lock().map_err(poisoned)?;
        fs::rename(&staged, self.output_path(name))?;
        self.append_manifest(name, fingerprint)?;
        done.insert(name.to_owned(), fingerprint);
        debug!("committed {name} ({} cells with data)", raster.defined_count());
        Ok(())
    }

    fn load(&self, name: &str) -> StoreResult<Option<Raster>> {
        let path = self.output_path(name);
        if !path.is_file() {
            return Ok(None);
        }
        read_asc(&path).map(Some)
    }

    fn finish(&self) -> StoreResult<()> {
        // Dropping the guard removes the scratch root.
        self.scratch.lock().map_err(poisoned)?.take();
        Ok(())
    }
}

const SCRATCH_PREFIX: &str = ".scratch-";

/// Run-unique scratch root inside `dir`.
fn scratch_root_in(dir: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    dir.join(format!("{SCRATCH_PREFIX}{}-{nanos:x}", std::process::id()))
}

/// Process id encoded in a scratch root's file name.
fn scratch_owner(file_name: &str) -> Option<u32> {
    let rest = file_name.strip_prefix(SCRATCH_PREFIX)?;
    let (pid, _) = rest.split_once('-')?;
    pid.parse().ok()
}

/// Delete scratch roots in `dir` owned by any process other than this one.
fn remove_stale_scratch(dir: &Path) -> StoreResult<()> {
    let own = std::process::id();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(owner) = name.to_str().and_then(scratch_owner) else { continue };
        if owner == own || !entry.file_type()?.is_dir() {
            continue;
        }
        warn!("removing stale scratch {}", entry.path().display());
        fs::remove_dir_all(entry.path())?;
    }
    Ok(())
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Io(std::io::Error::other("store lock poisoned"))
}
