//! Shared data model and error types for the GeoCDL workspace.
//!
//! This crate has no knowledge of datasets, HTTP, or the request pipeline;
//! it only defines the value types every other crate builds on: dates and
//! granularity ([`date`]), CRS-tagged subset geometries ([`geom`]), CRS
//! definitions and projection math ([`crs`]), and the workspace-wide error
//! type ([`error`]).

pub mod crs;
pub mod date;
pub mod error;
pub mod geom;
pub mod layer;
pub mod types;

pub use crs::Crs;
pub use date::{Grain, RequestDate};
pub use error::{GeoCdlError, GeoCdlResult};
pub use geom::{GeomKind, SubsetGeom, SubsetMultiPoint, SubsetPolygon};
pub use layer::{CategoricalMeta, DataLayer, PointLayer, PointValue, RasterLayer};
pub use types::{GrainMethod, GridUnit, InterpMethod, OutputFormat, RequestType, Rgba, ValidateMethod, POINT_METHODS, RESAMPLE_METHODS};
