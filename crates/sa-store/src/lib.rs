//! `sa-store` — input loading and output persistence for servarea runs.
//!
//! | Module     | Contents                                                    |
//! |------------|-------------------------------------------------------------|
//! | [`loader`] | `load_origins_csv`, `load_connectors_csv` (+ reader forms)  |
//! | [`asc`]    | `read_asc`, `write_asc` — ESRI ASCII grids                  |
//! | [`store`]  | `RasterStore` trait, `DirStore`, `ScratchDir`               |
//! | `sqlite`   | `SqliteStore` (feature `sqlite`)                            |
//! | [`error`]  | `StoreError`, `StoreResult<T>`                              |
//!
//! # Backends
//!
//! | Feature   | Backend  | Files created                                      |
//! |-----------|----------|----------------------------------------------------|
//! | *(none)*  | Dir      | `<name>.asc` per group, `manifest.csv`             |
//! | `sqlite`  | SQLite   | `service_areas.db`                                 |
//!
//! # Usage
//!
//! ```rust,ignore
//! use sa_store::{DirStore, RasterStore};
//!
//! let store = DirStore::open(Path::new("./service_areas"))?;
//! if !store.is_complete("grp_12_servArea", fingerprint)? {
//!     store.commit("grp_12_servArea", fingerprint, &raster)?;
//! }
//! store.finish()?;
//! ```

pub mod asc;
pub mod error;
pub mod loader;
pub mod store;

#[cfg(feature = "sqlite")]
pub mod sqlite;


pub use asc::{read_asc, read_asc_reader, write_asc, write_asc_writer};
pub use error::{StoreError, StoreResult};
pub use loader::{load_connectors_csv, load_connectors_reader, load_origins_csv, load_origins_reader};
pub use store::{DirStore, RasterStore, ScratchDir};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
