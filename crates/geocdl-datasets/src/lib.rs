//! Reference [`Dataset`](geocdl_catalog::Dataset) implementations: PRISM,
//! Daymet V4, GTOPO30, and the NASS Cropland Data Layer. Each stands in
//! for the GDAL/NetCDF-backed original against a deterministic synthetic
//! field, since dataset-specific file decoding is explicitly out of scope
//! (§1 of the original spec).

mod cache;
mod daymet;
mod grid;
mod gtopo;
mod nass_cdl;
mod prism;

pub use cache::{CachedLayer, DatasetCache};
pub use daymet::Daymet;
pub use gtopo::Gtopo;
pub use nass_cdl::NassCdl;
pub use prism::Prism;

use geocdl_catalog::DatasetCatalog;
use std::sync::Arc;

/// Registers every reference dataset into a fresh catalog.
pub fn build_reference_catalog() -> DatasetCatalog {
    let mut catalog = DatasetCatalog::default();
    catalog.register(Arc::new(Prism::new()));
    catalog.register(Arc::new(Daymet::new()));
    catalog.register(Arc::new(Gtopo::new()));
    catalog.register(Arc::new(NassCdl::new()));
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_catalog_registers_all_four_datasets() {
        let catalog = build_reference_catalog();
        assert!(catalog.contains("PRISM"));
        assert!(catalog.contains("DaymetV4"));
        assert!(catalog.contains("GTOPO30"));
        assert!(catalog.contains("NASS_CDL"));
    }
}
