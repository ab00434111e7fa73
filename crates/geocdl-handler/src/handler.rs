//! RequestHandler (C9): the orchestrator tying subset-geometry
//! construction, per-dataset iteration, harmonization, categorical
//! propagation, and output packaging into one `fulfill` call.
//!
//! Grounded in `data_request_handler.py::fulfillRequestSynchronous`.

use crate::harmonize::{clip_all_touched, reproject_match, reproject_raster, GridSpec};
use crate::naming::{netcdf_dataset_filename, points_filename, raster_filename};
use crate::output::{
    assemble_archive, group_series, write_csv_points, write_geotiff, write_netcdf_points, write_netcdf_raster,
    write_shapefile_points, PointColumn, RasterSeries,
};
use crate::subset_geom::per_dataset_geoms;
use geocdl_catalog::DatasetCatalog;
use geocdl_common::{
    CategoricalMeta, DataLayer, GeoCdlError, GeoCdlResult, Grain, OutputFormat, PointValue, RasterLayer, RequestDate,
    RequestType, SubsetGeom, SubsetPolygon,
};
use geocdl_request::DataRequest;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// One dataset × variable × date cell of the iteration grid (§4.5.2),
/// before `Dataset::get_data` is called.
#[derive(Clone)]
struct Task {
    dsid: String,
    var: String,
    date: Option<RequestDate>,
}

enum TaskOutput {
    Raster {
        dsid: String,
        var: String,
        date: Option<RequestDate>,
        layer: RasterLayer,
        categories: Option<CategoricalMeta>,
    },
    Point {
        dsid: String,
        var: String,
        date: Option<RequestDate>,
        values: Vec<PointValue>,
        categories: Option<CategoricalMeta>,
    },
}

pub struct RequestHandler<'a> {
    catalog: &'a DatasetCatalog,
}

impl<'a> RequestHandler<'a> {
    pub fn new(catalog: &'a DatasetCatalog) -> Self {
        RequestHandler { catalog }
    }

    /// Fulfills `request`, returning the path to the finished output
    /// archive. Equivalent to [`fulfill_sequential`](Self::fulfill_sequential);
    /// call [`fulfill_parallel`](Self::fulfill_parallel) directly to use the
    /// `rayon` fan-out path instead.
    pub fn fulfill(&self, request: &DataRequest) -> GeoCdlResult<PathBuf> {
        self.fulfill_sequential(request)
    }

    pub fn fulfill_sequential(&self, request: &DataRequest) -> GeoCdlResult<PathBuf> {
        let tasks = self.build_tasks(request)?;
        let (geoms, user_polygon_target) = self.subset_geoms(request)?;
        let anchor: OnceLock<GridSpec> = OnceLock::new();

        let mut outputs = Vec::with_capacity(tasks.len());
        for task in &tasks {
            outputs.push(self.execute_task(task, request, &geoms, &user_polygon_target, &anchor)?);
        }
        self.package(request, outputs.into_iter().flatten().collect())
    }

    /// Same result as [`fulfill_sequential`](Self::fulfill_sequential), but
    /// fans `Dataset::get_data` calls out across a `rayon` thread pool.
    ///
    /// The harmonization anchor (§5) must be the same reference grid
    /// [`fulfill_sequential`](Self::fulfill_sequential) would have picked —
    /// whichever raster task happens to finish first on the thread pool is
    /// not guaranteed to be the input-order-first one, so the `OnceLock`
    /// can't just be left for the fan-out to fill in. Instead the anchor is
    /// seeded up front, sequentially, from the first task (in input order)
    /// that actually produces a raster, before any task runs in parallel —
    /// the single-shot latch the spec calls for.
    pub fn fulfill_parallel(&self, request: &DataRequest) -> GeoCdlResult<PathBuf> {
        let tasks = self.build_tasks(request)?;
        let (geoms, user_polygon_target) = self.subset_geoms(request)?;
        let anchor: OnceLock<GridSpec> = OnceLock::new();
        self.seed_harmonization_anchor(&tasks, request, &geoms, &anchor)?;

        let outputs: Vec<Option<TaskOutput>> = tasks
            .par_iter()
            .map(|task| self.execute_task(task, request, &geoms, &user_polygon_target, &anchor))
            .collect::<GeoCdlResult<Vec<_>>>()?;
        self.package(request, outputs.into_iter().flatten().collect())
    }

    /// Walks `tasks` in input order, calling `Dataset::get_data` until one
    /// yields a raster, and sets `anchor` from it. A no-op for point
    /// requests (there is no harmonization grid to anchor) and for raster
    /// requests where no task produces anything, in which case
    /// `execute_task`'s own `get_or_init` during the fan-out is harmless
    /// since there will be nothing left to match against it anyway.
    fn seed_harmonization_anchor(
        &self,
        tasks: &[Task],
        request: &DataRequest,
        geoms: &BTreeMap<String, SubsetGeom>,
        anchor: &OnceLock<GridSpec>,
    ) -> GeoCdlResult<()> {
        if request.request_type != RequestType::Raster {
            return Ok(());
        }
        for task in tasks {
            let ds = self.catalog.get(&task.dsid)?;
            let grain = request.ds_date_grains.get(&task.dsid).copied().flatten().unwrap_or(Grain::None);
            let geom = geoms
                .get(&task.dsid)
                .ok_or_else(|| GeoCdlError::Internal(format!("no subset geometry computed for \"{}\"", task.dsid)))?;

            let Some(layer) = ds.get_data(&task.var, grain, task.date, request.interp_method, geom)? else { continue };
            if let DataLayer::Raster(raw) = layer {
                let reprojected = reproject_raster(&raw, &request.target_crs, request.target_resolution);
                anchor.get_or_init(|| GridSpec::from_raster(&reprojected));
                return Ok(());
            }
        }
        Ok(())
    }

    fn subset_geoms(&self, request: &DataRequest) -> GeoCdlResult<(BTreeMap<String, SubsetGeom>, SubsetPolygon)> {
        let geoms = per_dataset_geoms(request, self.catalog)?;
        let user_polygon_target = match &request.subset_geom {
            SubsetGeom::Polygon(p) => p.reproject(&request.target_crs),
            SubsetGeom::MultiPoint(_) => SubsetPolygon {
                geom: geo::Polygon::new(geo::LineString::new(vec![]), vec![]),
                crs: request.target_crs.clone(),
            },
        };
        Ok((geoms, user_polygon_target))
    }

    fn build_tasks(&self, request: &DataRequest) -> GeoCdlResult<Vec<Task>> {
        let mut tasks = Vec::new();
        for dsid in request.active_datasets() {
            let ds = self.catalog.get(dsid)?;
            let caps = ds.capabilities();
            let dates: Vec<Option<RequestDate>> = if caps.nontemporal {
                vec![None]
            } else {
                request.dates_for(dsid).iter().map(|d| Some(*d)).collect()
            };
            let vars = request.dataset_vars.get(dsid).cloned().unwrap_or_default();
            for var in vars {
                for date in &dates {
                    tasks.push(Task { dsid: dsid.to_string(), var: var.clone(), date: *date });
                }
            }
        }
        Ok(tasks)
    }

    fn execute_task(
        &self,
        task: &Task,
        request: &DataRequest,
        geoms: &BTreeMap<String, SubsetGeom>,
        user_polygon_target: &SubsetPolygon,
        anchor: &OnceLock<GridSpec>,
    ) -> GeoCdlResult<Option<TaskOutput>> {
        let ds = self.catalog.get(&task.dsid)?;
        let caps = ds.capabilities();
        let grain = request.ds_date_grains.get(&task.dsid).copied().flatten().unwrap_or(Grain::None);
        let geom = geoms
            .get(&task.dsid)
            .ok_or_else(|| GeoCdlError::Internal(format!("no subset geometry computed for \"{}\"", task.dsid)))?;

        let Some(layer) = ds.get_data(&task.var, grain, task.date, request.interp_method, geom)? else {
            return Ok(None);
        };
        let categories = caps.categories_for(&task.var).cloned();

        match (request.request_type, layer) {
            (RequestType::Raster, DataLayer::Raster(raw)) => {
                let reprojected = reproject_raster(&raw, &request.target_crs, request.target_resolution);
                let grid = anchor.get_or_init(|| GridSpec::from_raster(&reprojected)).clone();
                let matched = reproject_match(&reprojected, &grid);
                let clipped = clip_all_touched(&matched, user_polygon_target);
                Ok(Some(TaskOutput::Raster {
                    dsid: task.dsid.clone(),
                    var: task.var.clone(),
                    date: task.date,
                    layer: clipped,
                    categories,
                }))
            }
            (RequestType::Point, DataLayer::Point(p)) => Ok(Some(TaskOutput::Point {
                dsid: task.dsid.clone(),
                var: task.var.clone(),
                date: task.date,
                values: p.values,
                categories,
            })),
            (RequestType::Raster, DataLayer::Point(_)) | (RequestType::Point, DataLayer::Raster(_)) => Err(
                GeoCdlError::Internal(format!("dataset \"{}\" returned a layer kind that doesn't match the request type", task.dsid)),
            ),
        }
    }

    fn package(&self, request: &DataRequest, outputs: Vec<TaskOutput>) -> GeoCdlResult<PathBuf> {
        let dir = tempfile::Builder::new().prefix("geocdl_subset_").rand_bytes(8).tempdir()?;
        let archive_name = dir.path().file_name().unwrap().to_string_lossy().into_owned();

        let files = match request.request_type {
            RequestType::Raster => self.write_raster_outputs(request, outputs, dir.path())?,
            RequestType::Point => self.write_point_outputs(request, outputs, dir.path())?,
        };

        let metadata = request.metadata(self.catalog);
        let metadata_json = serde_json::to_value(&metadata)?;
        let out_dir = dir.path().parent().unwrap_or_else(|| Path::new("."));
        assemble_archive(&metadata_json, &files, out_dir, &archive_name)
    }

    fn write_raster_outputs(&self, request: &DataRequest, outputs: Vec<TaskOutput>, dir: &Path) -> GeoCdlResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        match request.output_format {
            OutputFormat::GeoTiff => {
                for output in outputs {
                    let TaskOutput::Raster { dsid, var, date, layer, categories } = output else { continue };
                    let path = dir.join(raster_filename(&dsid, &var, date, "tif"));
                    files.extend(write_geotiff(&layer, categories.as_ref(), &path)?);
                }
            }
            OutputFormat::NetCdf => {
                let mut by_dataset: BTreeMap<String, BTreeMap<String, RasterSeries>> = BTreeMap::new();
                for output in outputs {
                    let TaskOutput::Raster { dsid, var, date, layer, categories } = output else { continue };
                    let series = by_dataset
                        .entry(dsid)
                        .or_default()
                        .entry(var.clone())
                        .or_insert_with(|| RasterSeries { name: var, dates: Vec::new(), layers: Vec::new(), categories });
                    series.dates.push(date);
                    series.layers.push(layer);
                }
                for (dsid, vars) in by_dataset {
                    let series: Vec<RasterSeries> = vars.into_values().collect();
                    let path = dir.join(netcdf_dataset_filename(&dsid));
                    write_netcdf_raster(&series, &path)?;
                    files.push(path);
                }
            }
            OutputFormat::Csv | OutputFormat::Shapefile => {
                return Err(GeoCdlError::InvalidOutputFormat(request.output_format.to_string()));
            }
        }

        Ok(files)
    }

    fn write_point_outputs(&self, request: &DataRequest, outputs: Vec<TaskOutput>, dir: &Path) -> GeoCdlResult<Vec<PathBuf>> {
        let columns: Vec<PointColumn> = outputs
            .into_iter()
            .filter_map(|o| match o {
                TaskOutput::Point { dsid, var, date, values, categories } => Some(PointColumn { dsid, var, date, values, categories }),
                TaskOutput::Raster { .. } => None,
            })
            .collect();
        let dataset_ids: Vec<&str> = request.active_datasets().collect();

        match request.output_format {
            OutputFormat::Csv => Ok(vec![write_csv_points(columns, &dir.join(points_filename(&dataset_ids, "csv")))?]),
            OutputFormat::Shapefile => Ok(vec![write_shapefile_points(columns, &dir.join(points_filename(&dataset_ids, "shp")))?]),
            OutputFormat::NetCdf => {
                let series = group_series(columns);
                Ok(vec![write_netcdf_points(&series, &dir.join(netcdf_dataset_filename(&dataset_ids.join("_"))))?])
            }
            OutputFormat::GeoTiff => Err(GeoCdlError::InvalidOutputFormat(request.output_format.to_string())),
        }
    }
}
