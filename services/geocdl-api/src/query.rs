//! Common query-parameter grammar shared by `/subset_polygon` and
//! `/subset_points` (§6.1). Everything stays a raw `String`/`f64` here;
//! grammar-specific parsing (dataset specs, coordinate lists, enum
//! strings) is delegated to `geocdl_request`/`geocdl_common` so this
//! struct is just the wire shape.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SubsetQuery {
    pub datasets: String,

    pub dates: Option<String>,
    pub years: Option<String>,
    pub months: Option<String>,
    pub days: Option<String>,

    pub grain_method: Option<String>,
    pub validate_method: Option<String>,

    pub crs: Option<String>,
    pub resolution: Option<f64>,

    pub resample_method: Option<String>,
    pub interp_method: Option<String>,

    pub output_format: Option<String>,

    pub clip: Option<String>,
    pub points: Option<String>,
    pub clip_file_guid: Option<String>,
    pub points_file_guid: Option<String>,
    pub clip_file_crs: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DsInfoQuery {
    pub id: String,
}
