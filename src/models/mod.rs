//! Core data models for emblem generation.

pub mod boundary;
pub mod catalog;
pub mod place;

pub use boundary::{Boundary, Crs};
pub use catalog::{Aggregate, Catalog};
pub use place::{GeometrySource, PlaceDescriptor};
