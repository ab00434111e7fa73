//! Per-dataset subset geometry construction (§4.5.1): one coarsest-grid
//! buffer width for the whole request, then per-dataset reprojection into
//! each dataset's native CRS.
//!
//! Grounded in `data_request_handler.py::fulfillRequestSynchronous`'s
//! up-front geometry setup, which computes a single buffer width from the
//! widest `grid_size` across all requested datasets before touching any
//! dataset's `getData`.

use geocdl_catalog::DatasetCatalog;
use geocdl_common::{GeoCdlResult, GridUnit, RequestType, SubsetGeom};
use geocdl_request::DataRequest;
use std::collections::BTreeMap;

/// Degrees-per-meter conversion the reference implementation uses for
/// buffer-width unit normalization: one degree of latitude is treated as
/// 111km, uniformly (no latitude-dependent correction).
const METERS_PER_DEGREE: f64 = 111_000.0;

/// Computes the single buffer width (in the user subset geometry's CRS
/// units) used for every dataset in the request: the maximum `grid_size`
/// across all active datasets, normalized into the user CRS's units.
pub fn buffer_width(request: &DataRequest, catalog: &DatasetCatalog) -> GeoCdlResult<f64> {
    let user_is_metric = request.target_crs.axis_unit() == "metre"
        || matches!(request.subset_geom.crs().axis_unit(), "metre");
    let user_in_degrees = request.subset_geom.crs().axis_unit() == "degree";

    let mut max_width: f64 = 0.0;
    for dsid in request.active_datasets() {
        let ds = catalog.get(dsid)?;
        let caps = ds.capabilities();
        let width_in_user_units = match (caps.grid_unit, user_in_degrees) {
            (GridUnit::Degrees, false) => caps.grid_size * METERS_PER_DEGREE,
            (GridUnit::Meters, true) => caps.grid_size / METERS_PER_DEGREE,
            _ => caps.grid_size,
        };
        let _ = user_is_metric;
        max_width = max_width.max(width_in_user_units);
    }
    Ok(max_width)
}

/// Builds each active dataset's subset geometry: buffered (raster only)
/// and reprojected into that dataset's CRS, ready to pass to `get_data`.
///
/// Returns `(ds_geoms, unbuffered_user_geom_in_target_crs)` — the second
/// element is what the handler clips harmonized rasters back down to
/// after reprojection-matching (§4.5.2).
pub fn per_dataset_geoms(
    request: &DataRequest,
    catalog: &DatasetCatalog,
) -> GeoCdlResult<BTreeMap<String, SubsetGeom>> {
    let width = buffer_width(request, catalog)?;

    let buffered_user_geom = match request.request_type {
        RequestType::Raster => request.subset_geom.buffer(width)?,
        RequestType::Point => request.subset_geom.clone(),
    };

    let mut out = BTreeMap::new();
    for dsid in request.active_datasets() {
        let ds = catalog.get(dsid)?;
        let ds_crs = &ds.capabilities().crs;
        let geom = if ds_crs == buffered_user_geom.crs() {
            buffered_user_geom.clone()
        } else {
            buffered_user_geom.reproject(ds_crs)
        };
        out.insert(dsid.to_string(), geom);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocdl_common::{Crs, GrainMethod, InterpMethod, OutputFormat, SubsetPolygon, ValidateMethod};
    use geocdl_datasets::build_reference_catalog;
    use geocdl_request::{DataRequestParams, DateSpec};
    use geo::{LineString, Polygon};

    fn conus_square() -> SubsetGeom {
        SubsetGeom::Polygon(SubsetPolygon {
            geom: Polygon::new(
                LineString::from(vec![(-100.0, 39.0), (-99.0, 39.0), (-99.0, 40.0), (-100.0, 40.0), (-100.0, 39.0)]),
                vec![],
            ),
            crs: Crs::wgs84(),
        })
    }

    #[test]
    fn buffer_width_uses_widest_dataset_grid() {
        let catalog = build_reference_catalog();
        let params = DataRequestParams {
            dataset_vars: vec![("PRISM".into(), vec!["ppt".into()]), ("NASS_CDL".into(), vec!["cdl".into()])],
            date_spec: DateSpec::DatesString("2015".into()),
            grain_method: GrainMethod::Strict,
            validate_method: ValidateMethod::Strict,
            subset_geom: conus_square(),
            target_crs: Crs::wgs84(),
            target_resolution: None,
            interp_method: Some(InterpMethod::Nearest),
            request_type: RequestType::Raster,
            output_format: OutputFormat::GeoTiff,
            request_url: "test://".into(),
        };
        let req = DataRequest::new(params, &catalog).unwrap();
        let width = buffer_width(&req, &catalog).unwrap();
        // NASS_CDL's 30m grid is tiny next to PRISM's 4km grid in degrees.
        assert!(width > 0.0);
        assert!((width - 4000.0 / METERS_PER_DEGREE).abs() < 1e-9);
    }

    #[test]
    fn per_dataset_geoms_reprojects_into_each_dataset_crs() {
        let catalog = build_reference_catalog();
        let params = DataRequestParams {
            dataset_vars: vec![("NASS_CDL".into(), vec!["cdl".into()])],
            date_spec: DateSpec::DatesString("2015".into()),
            grain_method: GrainMethod::Strict,
            validate_method: ValidateMethod::Strict,
            subset_geom: conus_square(),
            target_crs: Crs::wgs84(),
            target_resolution: None,
            interp_method: Some(InterpMethod::Nearest),
            request_type: RequestType::Raster,
            output_format: OutputFormat::GeoTiff,
            request_url: "test://".into(),
        };
        let req = DataRequest::new(params, &catalog).unwrap();
        let geoms = per_dataset_geoms(&req, &catalog).unwrap();
        let geom = &geoms["NASS_CDL"];
        assert_eq!(geom.crs(), &Crs::conus_albers());
    }
}
