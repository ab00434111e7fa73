//! NetCDF writer (C10), grounded in `data_request_output.py::_writeNetCDF`/
//! `_assignCategories` (the `xr.Dataset`/CF-conventions branch). One file
//! per dataset (§6.4), one data variable per requested variable, stacked
//! along a `time` dimension when the dataset is temporal.

use super::points::PointSeries;
use geocdl_common::{CategoricalMeta, GeoCdlError, GeoCdlResult, RasterLayer, RequestDate};
use std::path::{Path, PathBuf};

/// One requested variable's worth of harmonized raster layers for a
/// dataset, in date order, ready to stack into a `(time, y, x)` NetCDF
/// variable.
pub struct RasterSeries {
    pub name: String,
    pub dates: Vec<Option<RequestDate>>,
    pub layers: Vec<RasterLayer>,
    pub categories: Option<CategoricalMeta>,
}

/// Writes every [`RasterSeries`] for one dataset into a single NetCDF file
/// at `path`. Assumes every layer across every series already shares the
/// harmonized grid (the handler only calls this after §4.5.2's
/// reprojection-matching), so one `x`/`y` dimension pair suffices.
pub fn write_netcdf_raster(series: &[RasterSeries], path: &Path) -> GeoCdlResult<PathBuf> {
    let first_layer = series
        .iter()
        .find_map(|s| s.layers.first())
        .ok_or_else(|| GeoCdlError::Internal("write_netcdf_raster called with no data".into()))?;
    let (width, height) = (first_layer.width, first_layer.height);
    let (px, py) = first_layer.pixel_size();

    let mut file = netcdf::create(path).map_err(nc_err)?;
    file.add_dimension("y", height).map_err(nc_err)?;
    file.add_dimension("x", width).map_err(nc_err)?;

    let xs: Vec<f64> = (0..width).map(|c| first_layer.geotransform[0] + (c as f64 + 0.5) * px).collect();
    let ys: Vec<f64> = (0..height).map(|r| first_layer.geotransform[3] + (r as f64 + 0.5) * py).collect();
    {
        let mut xvar = file.add_variable::<f64>("x", &["x"]).map_err(nc_err)?;
        xvar.put_values(&xs, ..).map_err(nc_err)?;
        xvar.put_attribute("units", first_layer.crs.axis_unit()).map_err(nc_err)?;
    }
    {
        let mut yvar = file.add_variable::<f64>("y", &["y"]).map_err(nc_err)?;
        yvar.put_values(&ys, ..).map_err(nc_err)?;
        yvar.put_attribute("units", first_layer.crs.axis_unit()).map_err(nc_err)?;
    }

    for s in series {
        if s.layers.is_empty() {
            continue;
        }
        let dim_time = format!("time_{}", s.name);
        file.add_dimension(&dim_time, s.layers.len()).map_err(nc_err)?;

        let time_values: Vec<f64> = s.dates.iter().map(|d| d.map(|d| d.year as f64).unwrap_or(0.0)).collect();
        let mut tvar = file.add_variable::<f64>(&format!("{}_time", s.name), &[&dim_time]).map_err(nc_err)?;
        tvar.put_values(&time_values, ..).map_err(nc_err)?;

        let mut stacked = Vec::with_capacity(s.layers.len() * width * height);
        for layer in &s.layers {
            stacked.extend_from_slice(&layer.data);
        }
        let mut dvar = file.add_variable::<f64>(&s.name, &[&dim_time, "y", "x"]).map_err(nc_err)?;
        dvar.put_values(&stacked, ..).map_err(nc_err)?;
        if let Some(nodata) = s.layers[0].nodata {
            dvar.put_attribute("_FillValue", nodata).map_err(nc_err)?;
        }
        dvar.put_attribute("grid_mapping", first_layer.crs.code_string()).map_err(nc_err)?;

        if let Some(categories) = s.categories.as_ref().filter(|c| !c.is_empty()) {
            apply_categorical_attrs(&mut dvar, categories)?;
        }
    }

    Ok(path.to_path_buf())
}

/// `flag_values`/`flag_meanings`/`flag_colors` CF-convention attributes
/// (§4.5.3 NetCDF branch): comma-separated ints, space-separated names
/// (spaces replaced with `_`), space-separated hex colors.
fn apply_categorical_attrs(var: &mut netcdf::VariableMut, categories: &CategoricalMeta) -> GeoCdlResult<()> {
    let flag_values = categories.rat.keys().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
    let flag_meanings =
        categories.rat.values().map(|n| n.replace(' ', "_")).collect::<Vec<_>>().join(" ");
    var.put_attribute("flag_values", flag_values).map_err(nc_err)?;
    var.put_attribute("flag_meanings", flag_meanings).map_err(nc_err)?;

    if !categories.colormap.is_empty() {
        let flag_colors = categories.colormap.values().map(|c| c.to_hex()).collect::<Vec<_>>().join(" ");
        var.put_attribute("flag_colors", flag_colors).map_err(nc_err)?;
    }
    Ok(())
}

/// Writes interpolated point values into a NetCDF file with a `point`
/// dimension, and a `time_<dsid>_<var>` dimension per series when it spans
/// more than one date — the non-`Dataset` branch of `_writeNetCDF` for
/// point requests, mirroring [`write_netcdf_raster`]'s per-series time
/// stacking so a multi-date request keeps every date instead of losing all
/// but the first to an unindexed `point`-only variable.
pub fn write_netcdf_points(series: &[PointSeries], path: &Path) -> GeoCdlResult<PathBuf> {
    let coords: Vec<(f64, f64)> = series
        .iter()
        .find_map(|s| s.by_date.values().next())
        .map(|values| values.iter().map(|p| (p.x, p.y)).collect())
        .unwrap_or_default();
    let n = coords.len();

    let mut file = netcdf::create(path).map_err(nc_err)?;
    file.add_dimension("point", n).map_err(nc_err)?;

    if !coords.is_empty() {
        let xs: Vec<f64> = coords.iter().map(|(x, _)| *x).collect();
        let ys: Vec<f64> = coords.iter().map(|(_, y)| *y).collect();
        file.add_variable::<f64>("x", &["point"]).map_err(nc_err)?.put_values(&xs, ..).map_err(nc_err)?;
        file.add_variable::<f64>("y", &["point"]).map_err(nc_err)?.put_values(&ys, ..).map_err(nc_err)?;
    }

    for s in series {
        if s.by_date.is_empty() {
            continue;
        }
        let name = format!("{}_{}", s.dsid, s.var);
        let dim_time = format!("time_{}", name);
        file.add_dimension(&dim_time, s.by_date.len()).map_err(nc_err)?;

        let time_values: Vec<f64> = s.by_date.keys().map(|d| d.map(|d| d.year as f64).unwrap_or(0.0)).collect();
        let mut tvar = file.add_variable::<f64>(&format!("{}_time", name), &[&dim_time]).map_err(nc_err)?;
        tvar.put_values(&time_values, ..).map_err(nc_err)?;

        let mut stacked = Vec::with_capacity(s.by_date.len() * n);
        for values in s.by_date.values() {
            stacked.extend(values.iter().map(|p| p.value.unwrap_or(f64::NAN)));
        }
        let mut dvar = file.add_variable::<f64>(&name, &[&dim_time, "point"]).map_err(nc_err)?;
        dvar.put_values(&stacked, ..).map_err(nc_err)?;
        dvar.put_attribute("_FillValue", f64::NAN).map_err(nc_err)?;

        if let Some(categories) = s.categories.as_ref().filter(|c| !c.is_empty()) {
            apply_categorical_attrs(&mut dvar, categories)?;
        }
    }

    Ok(path.to_path_buf())
}

fn nc_err(e: netcdf::Error) -> GeoCdlError {
    GeoCdlError::Internal(format!("NetCDF error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocdl_common::{Crs, PointValue};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn layer() -> RasterLayer {
        RasterLayer {
            data: vec![1.0, 2.0, 3.0, 4.0],
            width: 2,
            height: 2,
            crs: Crs::wgs84(),
            geotransform: [0.0, 1.0, 0.0, 10.0, 0.0, -1.0],
            nodata: Some(-9999.0),
        }
    }

    #[test]
    fn write_netcdf_raster_one_series() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("PRISM.nc");
        let series = vec![RasterSeries {
            name: "ppt".to_string(),
            dates: vec![Some(RequestDate::annual(2020))],
            layers: vec![layer()],
            categories: None,
        }];
        let out = write_netcdf_raster(&series, &path).unwrap();
        assert_eq!(out, path);
    }

    #[test]
    fn categorical_attrs_format_matches_spec() {
        let mut rat = BTreeMap::new();
        rat.insert(1, "Corn Field".to_string());
        let mut colormap = BTreeMap::new();
        colormap.insert(1, geocdl_common::Rgba(255, 0, 0, 255));
        let categories = CategoricalMeta { rat, colormap };
        let flag_meanings =
            categories.rat.values().map(|n| n.replace(' ', "_")).collect::<Vec<_>>().join(" ");
        assert_eq!(flag_meanings, "Corn_Field");
    }

    #[test]
    fn write_netcdf_points_one_series() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("PRISM.nc");
        let mut by_date = BTreeMap::new();
        by_date.insert(
            Some(RequestDate::annual(2020)),
            vec![PointValue { x: -100.0, y: 40.0, value: Some(15.0) }, PointValue { x: -99.0, y: 41.0, value: None }],
        );
        let series = vec![PointSeries { dsid: "PRISM".to_string(), var: "tmax".to_string(), categories: None, by_date }];
        let out = write_netcdf_points(&series, &path).unwrap();
        assert_eq!(out, path);
    }

    /// Two dates for the same series must both survive into the file, along
    /// a `time_PRISM_tmax` dimension, rather than the second overwriting or
    /// silently dropping the first.
    #[test]
    fn write_netcdf_points_stacks_multiple_dates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("PRISM.nc");
        let mut by_date = BTreeMap::new();
        by_date.insert(Some(RequestDate::monthly(2001, 5)), vec![PointValue { x: -100.0, y: 40.0, value: Some(20.0) }]);
        by_date.insert(Some(RequestDate::monthly(2001, 6)), vec![PointValue { x: -100.0, y: 40.0, value: Some(25.0) }]);
        let series = vec![PointSeries { dsid: "PRISM".to_string(), var: "tmax".to_string(), categories: None, by_date }];
        write_netcdf_points(&series, &path).unwrap();

        let file = netcdf::open(&path).unwrap();
        let dim = file.dimension("time_PRISM_tmax").unwrap();
        assert_eq!(dim.len(), 2);
        let var = file.variable("PRISM_tmax").unwrap();
        let values: Vec<f64> = var.get_values(..).unwrap();
        assert_eq!(values, vec![20.0, 25.0]);
    }
}
