//! The dataset registry (C5), grain negotiation (C6), and date-range
//! validation (C7) components of the request pipeline.
//!
//! This crate owns the [`Dataset`] trait contract and [`DatasetCatalog`]
//! registry; it has no knowledge of HTTP or archive assembly. Concrete
//! reference datasets live in `geocdl-datasets`, one layer up.

pub mod capabilities;
pub mod catalog;
pub mod dataset;
pub mod negotiate;
pub mod validate;

pub use capabilities::{DatasetCapabilities, DatasetSummary};
pub use catalog::DatasetCatalog;
pub use dataset::Dataset;
pub use negotiate::negotiate_grain;
pub use validate::validate_date_ranges;
