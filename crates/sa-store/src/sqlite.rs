//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `service_areas.db` in the output directory with one
//! table, `service_areas`, holding one row per group.  Cells are stored as
//! a little-endian `f64` blob with NaN for no-data.  Each commit is one
//! transaction, so the row and its fingerprint appear together or not at
//! all.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use sa_core::{GridSpec, Raster};

use crate::store::{RasterStore, fingerprint_hex};
use crate::{StoreError, StoreResult};

/// Writes service areas to an SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) `service_areas.db` in `dir` and initialise the schema.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("service_areas.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS service_areas (
                 name        TEXT PRIMARY KEY,
                 fingerprint TEXT NOT NULL,
                 ncols       INTEGER NOT NULL,
                 nrows       INTEGER NOT NULL,
                 xll         REAL NOT NULL,
                 yll         REAL NOT NULL,
                 cell_size   REAL NOT NULL,
                 cells       BLOB NOT NULL
             );",
        )?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("store lock poisoned")))
    }
}

impl RasterStore for SqliteStore {
    fn is_complete(&self, name: &str, fingerprint: u64) -> StoreResult<bool> {
        let conn = self.lock()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT fingerprint FROM service_areas WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stored.as_deref() == Some(fingerprint_hex(fingerprint).as_str()))
    }

    fn commit(&self, name: &str, fingerprint: u64, raster: &Raster) -> StoreResult<()> {
        let s = raster.spec();
        let mut blob = Vec::with_capacity(raster.len() * 8);
        for v in raster.values() {
            blob.extend_from_slice(&v.unwrap_or(f64::NAN).to_le_bytes());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO service_areas \
             (name, fingerprint, ncols, nrows, xll, yll, cell_size, cells) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                name,
                fingerprint_hex(fingerprint),
                s.ncols,
                s.nrows,
                s.xll,
                s.yll,
                s.cell_size,
                blob,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load(&self, name: &str) -> StoreResult<Option<Raster>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT ncols, nrows, xll, yll, cell_size, cells FROM service_areas WHERE name = ?1",
                [name],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((ncols, nrows, xll, yll, cell_size, blob)) = row else {
            return Ok(None);
        };

        let spec = GridSpec::new(ncols, nrows, xll, yll, cell_size);
        let values: Vec<Option<f64>> = blob
            .chunks_exact(8)
            .map(|b| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(b);
                let v = f64::from_le_bytes(bytes);
                (!v.is_nan()).then_some(v)
            })
            .collect();
        Ok(Some(Raster::from_values(spec, values)?))
    }

    fn finish(&self) -> StoreResult<()> {
        self.lock()?.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
