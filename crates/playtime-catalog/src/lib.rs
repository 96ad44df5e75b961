//! Game catalog for steam-playtime
//!
//! Maps lowercase executable filenames to the installed Steam game they
//! belong to. The catalog is built once at startup by scanning Steam's
//! `appmanifest_*.acf` files and is read-only afterwards.

mod catalog;
mod steam;

pub use catalog::*;
pub use steam::*;

use thiserror::Error;

/// Catalog scanning errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest {path} is missing '{key}'")]
    MissingKey { path: String, key: &'static str },
}

pub type CatalogResult<T> = Result<T, CatalogError>;
