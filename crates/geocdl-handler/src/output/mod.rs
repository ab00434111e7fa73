//! OutputWriter (C10): per-format file writers plus archive assembly.
//! Grounded directly in `api_core/data_request_output.py`'s per-format
//! writer methods — the distilled spec names the categorical-propagation
//! *policy* but the actual writer implementations live here.

pub mod archive;
pub mod geotiff;
pub mod netcdf;
pub mod points;

pub use archive::assemble_archive;
pub use geotiff::write_geotiff;
pub use netcdf::{write_netcdf_points, write_netcdf_raster, RasterSeries};
pub use points::{group_series, write_csv_points, write_shapefile_points, PointColumn, PointSeries};
