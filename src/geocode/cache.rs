//! On-disk cache of raw geocoder responses, keyed by query.

use std::path::Path;

use anyhow::{Context, Result};
use sled::Db;
use tracing::{debug, warn};

/// Persistent query → response body store.
///
/// Read and write failures are logged and behave like a miss.
#[derive(Clone)]
pub struct GeocodeCache {
    db: Db,
}

impl GeocodeCache {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)
            .with_context(|| format!("Failed to open geocode cache at {}", path.display()))?;
        debug!("Opened geocode cache at {} ({} entries)", path.display(), db.len());
        Ok(Self { db })
    }

    pub fn get(&self, query: &str) -> Option<String> {
        match self.db.get(query.as_bytes()) {
            Ok(Some(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(body) => Some(body),
                Err(_) => {
                    warn!("Ignoring non UTF-8 cache entry for '{}'", query);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Geocode cache read failed for '{}': {}", query, e);
                None
            }
        }
    }

    pub fn insert(&self, query: &str, body: &str) {
        let result = self
            .db
            .insert(query.as_bytes(), body.as_bytes())
            .and_then(|_| self.db.flush().map(|_| ()));
        if let Err(e) = result {
            warn!("Geocode cache write failed for '{}': {}", query, e);
        }
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}
