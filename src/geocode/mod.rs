//! Geocoding: turning a place query into a boundary.
//!
//! The pipeline only sees the [`Geocoder`] trait. [`NominatimClient`] is the
//! HTTP implementation used by the binary.

pub mod cache;
pub mod nominatim;

pub use cache::GeocodeCache;
pub use nominatim::{NominatimClient, NominatimSettings};

use std::future::Future;

use geo::{BooleanOps, MultiPolygon};
use thiserror::Error;

use crate::models::Boundary;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("request for '{query}' failed: {source}")]
    Http {
        query: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server answered {status} for '{query}'")]
    Status { query: String, status: u16 },

    #[error("no result for '{0}'")]
    NotFound(String),

    #[error("no polygon boundary among the results for '{0}'")]
    NoPolygon(String),

    #[error("unreadable response for '{query}': {message}")]
    Parse { query: String, message: String },

    #[error("cannot combine boundaries with different coordinate references")]
    MixedCrs,

    #[error("no boundaries to combine")]
    EmptyUnion,
}

/// Resolves place queries to boundaries.
pub trait Geocoder: Send + Sync {
    fn geocode(&self, query: &str) -> impl Future<Output = Result<Boundary, GeocodeError>> + Send;

    /// Resolve several queries in order, stopping at the first failure.
    fn geocode_all(
        &self,
        queries: &[String],
    ) -> impl Future<Output = Result<Vec<Boundary>, GeocodeError>> + Send {
        async move {
            let mut boundaries = Vec::with_capacity(queries.len());
            for query in queries {
                boundaries.push(self.geocode(query).await?);
            }
            Ok(boundaries)
        }
    }
}

/// Union of several boundaries sharing one coordinate reference.
pub fn union_all<'a, I>(boundaries: I) -> Result<Boundary, GeocodeError>
where
    I: IntoIterator<Item = &'a Boundary>,
{
    let mut iter = boundaries.into_iter();
    let first = iter.next().ok_or(GeocodeError::EmptyUnion)?;
    let crs = first.crs;

    let mut merged: MultiPolygon<f64> = first.geometry.clone();
    for boundary in iter {
        if boundary.crs != crs {
            return Err(GeocodeError::MixedCrs);
        }
        merged = merged.union(&boundary.geometry);
    }

    Ok(Boundary {
        geometry: merged,
        crs,
    })
}
