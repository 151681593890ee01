//! Place descriptors consumed by the pipeline.

use super::{Boundary, Catalog};

/// Where a place's outline comes from
#[derive(Debug, Clone)]
pub enum GeometrySource {
    /// Free-text geocoder query
    Query(String),
    /// Outline computed ahead of time (e.g. a union of regions)
    Precomputed(Boundary),
}

/// One emblem to produce.
#[derive(Debug, Clone)]
pub struct PlaceDescriptor {
    /// Place name, also the output file stem
    pub name: String,

    /// Appended to the name in the output file (may be empty)
    pub suffix: String,

    pub source: GeometrySource,
}

impl PlaceDescriptor {
    pub fn new(name: impl Into<String>, source: GeometrySource) -> Self {
        Self {
            name: name.into(),
            suffix: String::new(),
            source,
        }
    }

    /// Descriptor for a catalog entry, with its geocoder query resolved
    pub fn from_catalog(name: &str, catalog: &Catalog) -> Self {
        Self::new(name, GeometrySource::Query(catalog.query_for(name)))
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Name used in logs and reports
    pub fn display_name(&self) -> String {
        format!("{}{}", self.name, self.suffix)
    }

    pub fn output_file_name(&self) -> String {
        format!("{}.png", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Crs;
    use geo::MultiPolygon;

    #[test]
    fn test_from_catalog_resolves_query() {
        let catalog = Catalog::france();
        let place = PlaceDescriptor::from_catalog("Guyane", &catalog);
        assert!(matches!(&place.source, GeometrySource::Query(q) if q == "Guyane française"));
        assert_eq!(place.output_file_name(), "Guyane.png");
    }

    #[test]
    fn test_suffix_in_file_name() {
        let boundary = Boundary::new(MultiPolygon::new(vec![]), Crs::Geographic);
        let place = PlaceDescriptor::new("France", GeometrySource::Precomputed(boundary))
            .with_suffix("_sans_corse");
        assert_eq!(place.display_name(), "France_sans_corse");
        assert_eq!(place.output_file_name(), "France_sans_corse.png");
        assert!(matches!(place.source, GeometrySource::Precomputed(_)));
    }
}
