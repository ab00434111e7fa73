//! RequestHandler (C9) and OutputWriter (C10): the orchestrator that turns
//! a validated [`geocdl_request::DataRequest`] into a finished output
//! archive, grounded in `data_request_handler.py::fulfillRequestSynchronous`
//! and `data_request_output.py`.

mod handler;
mod harmonize;
mod naming;
mod output;
mod subset_geom;

pub use handler::RequestHandler;
pub use harmonize::{clip_all_touched, reproject_match, reproject_raster, GridSpec};
pub use naming::{aux_xml_filename, netcdf_dataset_filename, points_filename, raster_filename};
pub use output::{
    assemble_archive, group_series, write_csv_points, write_geotiff, write_netcdf_points, write_netcdf_raster,
    write_shapefile_points, PointColumn, PointSeries, RasterSeries,
};
pub use subset_geom::{buffer_width, per_dataset_geoms};
