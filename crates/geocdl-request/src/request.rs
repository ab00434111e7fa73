//! DataRequest assembly (C8): validates and freezes a complete request.
//!
//! Construction order mirrors `api_core/data_request.py::DataRequest.__init__`
//! exactly: dataset IDs exist; date spec parses; grain negotiation;
//! range validation; subset-geometry kind check; interp-method
//! validity+default; output-format compatibility; `harmonize` flag.

use crate::metadata::{CrsMeta, DatasetMeta, RequestInfoMeta, RequestMetadata};
use geocdl_catalog::{negotiate_grain, validate_date_ranges, DatasetCatalog};
use geocdl_common::{
    GeoCdlError, GeoCdlResult, Grain, InterpMethod, OutputFormat, RequestDate, RequestType, SubsetGeom, ValidateMethod,
    POINT_METHODS, RESAMPLE_METHODS,
};
use geocdl_datespec::regrain;
use std::collections::BTreeMap;

/// A temporal date specification, in either of the two forms the HTTP
/// surface accepts (§6.1).
#[derive(Debug, Clone)]
pub enum DateSpec {
    DatesString(String),
    Ymd { years: Option<String>, months: Option<String>, days: Option<String> },
    /// No dates given at all — valid only when every requested dataset is
    /// non-temporal.
    None,
}

impl DateSpec {
    /// The string echoed back as `metadata.request.target_dates`.
    fn display(&self) -> String {
        match self {
            DateSpec::DatesString(s) => s.clone(),
            DateSpec::Ymd { years, months, days } => {
                let mut parts = Vec::new();
                if let Some(y) = years {
                    parts.push(format!("years={}", y));
                }
                if let Some(m) = months {
                    parts.push(format!("months={}", m));
                }
                if let Some(d) = days {
                    parts.push(format!("days={}", d));
                }
                parts.join(",")
            }
            DateSpec::None => String::new(),
        }
    }

    fn parse(&self) -> GeoCdlResult<(Vec<RequestDate>, Grain)> {
        match self {
            DateSpec::DatesString(s) => geocdl_datespec::parse_dates_string(s),
            DateSpec::Ymd { years, months, days } => {
                geocdl_datespec::parse_ymd(years.as_deref(), months.as_deref(), days.as_deref())
            }
            DateSpec::None => Ok((Vec::new(), Grain::None)),
        }
    }
}

/// Raw, unvalidated request parameters — what the HTTP layer (or a test)
/// assembles before handing off to [`DataRequest::new`].
pub struct DataRequestParams {
    pub dataset_vars: Vec<(String, Vec<String>)>,
    pub date_spec: DateSpec,
    pub grain_method: geocdl_common::GrainMethod,
    pub validate_method: ValidateMethod,
    pub subset_geom: SubsetGeom,
    pub target_crs: geocdl_common::Crs,
    pub target_resolution: Option<f64>,
    pub interp_method: Option<InterpMethod>,
    pub request_type: RequestType,
    pub output_format: OutputFormat,
    pub request_url: String,
}

/// Immutable, fully-validated request object. Frozen after construction —
/// no method takes `&mut self`.
#[derive(Debug, Clone)]
pub struct DataRequest {
    pub dataset_vars: BTreeMap<String, Vec<String>>,
    pub dataset_order: Vec<String>,
    /// Dates per grain actually in use across the request's datasets
    /// (after any regraining needed for `coarser`/`finer`/`any`).
    pub dates: BTreeMap<Grain, Vec<RequestDate>>,
    pub inferred_grain: Grain,
    /// `None` for nontemporal datasets and datasets dropped by
    /// `grain_method=skip`.
    pub ds_date_grains: BTreeMap<String, Option<Grain>>,
    /// Final, validated date list per temporal dataset that survived
    /// negotiation. Nontemporal/skipped datasets are absent.
    pub ds_dates: BTreeMap<String, Vec<RequestDate>>,
    pub subset_geom: SubsetGeom,
    pub target_crs: geocdl_common::Crs,
    pub target_resolution: Option<f64>,
    pub interp_method: InterpMethod,
    pub request_type: RequestType,
    pub output_format: OutputFormat,
    pub file_extension: &'static str,
    pub harmonize: bool,
    date_spec_display: String,
    request_url: String,
}

impl DataRequest {
    pub fn new(params: DataRequestParams, catalog: &DatasetCatalog) -> GeoCdlResult<DataRequest> {
        let dataset_order: Vec<String> = params.dataset_vars.iter().map(|(id, _)| id.clone()).collect();
        let dataset_vars: BTreeMap<String, Vec<String>> = params.dataset_vars.into_iter().collect();

        // 1. Dataset IDs exist.
        for dsid in dataset_vars.keys() {
            if !catalog.contains(dsid) {
                return Err(GeoCdlError::UnknownDataset(dsid.clone()));
            }
        }

        // 2. Date spec parses.
        let (parsed_dates, inferred_grain) = params.date_spec.parse()?;

        // 3. Grain negotiation, per temporal dataset.
        let mut ds_date_grains: BTreeMap<String, Option<Grain>> = BTreeMap::new();
        for dsid in dataset_vars.keys() {
            let caps = catalog.get(dsid)?.capabilities().clone();
            if caps.nontemporal {
                continue;
            }
            let grain = negotiate_grain(dsid, inferred_grain, &caps.supported_grains, params.grain_method)?;
            ds_date_grains.insert(dsid.clone(), grain);
        }

        // Regrain the parsed date list into every distinct grain a
        // negotiated dataset actually needs.
        let mut dates_by_grain: BTreeMap<Grain, Vec<RequestDate>> = BTreeMap::new();
        dates_by_grain.insert(inferred_grain, parsed_dates.clone());
        for grain in ds_date_grains.values().flatten() {
            dates_by_grain.entry(*grain).or_insert_with(|| regrain(&parsed_dates, *grain).unwrap_or_default());
        }

        // 4. Range validation, only for datasets that weren't skipped.
        let active_grains: BTreeMap<String, Grain> =
            ds_date_grains.iter().filter_map(|(id, g)| g.map(|g| (id.clone(), g))).collect();

        let ds_dates = if active_grains.is_empty() {
            BTreeMap::new()
        } else {
            let capabilities = active_grains
                .keys()
                .map(|id| Ok((id.clone(), catalog.get(id)?.capabilities().clone())))
                .collect::<GeoCdlResult<BTreeMap<_, _>>>()?;
            validate_date_ranges(params.validate_method, &active_grains, &dates_by_grain, &capabilities)?
        };

        // 5. Subset geometry kind check.
        match (params.request_type, &params.subset_geom) {
            (RequestType::Point, SubsetGeom::MultiPoint(_)) => {}
            (RequestType::Point, SubsetGeom::Polygon(_)) => return Err(GeoCdlError::PointRequestRequiresMultiPoint),
            (RequestType::Raster, SubsetGeom::Polygon(_)) => {}
            (RequestType::Raster, SubsetGeom::MultiPoint(_)) => {
                return Err(GeoCdlError::GeomKindMismatch { expected: "Polygon", actual: "MultiPoint" })
            }
        }

        // 6. Interp method validity + default.
        let allowed: &[InterpMethod] = match params.request_type {
            RequestType::Raster => RESAMPLE_METHODS,
            RequestType::Point => POINT_METHODS,
        };
        let interp_method = params.interp_method.unwrap_or(InterpMethod::Nearest);
        if !allowed.contains(&interp_method) {
            return Err(GeoCdlError::InvalidMethod(interp_method.to_string()));
        }

        // 7. Output format compatibility.
        if !params.output_format.compatible_with(params.request_type) {
            return Err(GeoCdlError::InvalidOutputFormat(params.output_format.to_string()));
        }

        // 8. Harmonize flag.
        let harmonize = params.target_resolution.is_some();

        Ok(DataRequest {
            dataset_vars,
            dataset_order,
            dates: dates_by_grain,
            inferred_grain,
            ds_date_grains,
            ds_dates,
            subset_geom: params.subset_geom,
            target_crs: params.target_crs,
            target_resolution: params.target_resolution,
            interp_method,
            request_type: params.request_type,
            output_format: params.output_format,
            file_extension: params.output_format.extension(),
            harmonize,
            date_spec_display: params.date_spec.display(),
            request_url: params.request_url,
        })
    }

    /// Datasets that survived grain negotiation and range validation, in
    /// declaration order — what [`RequestHandler`](../geocdl_handler/index.html)
    /// actually iterates.
    pub fn active_datasets(&self) -> impl Iterator<Item = &str> {
        self.dataset_order.iter().filter(|id| self.includes(id)).map(|s| s.as_str())
    }

    /// Whether dataset `id` is still part of the request (i.e. wasn't
    /// dropped by `grain_method=skip`).
    pub fn includes(&self, id: &str) -> bool {
        match self.ds_date_grains.get(id) {
            Some(Some(_)) => true,
            Some(None) => false,
            None => true, // nontemporal: always included
        }
    }

    pub fn dates_for(&self, id: &str) -> &[RequestDate] {
        self.ds_dates.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn metadata(&self, catalog: &DatasetCatalog) -> RequestMetadata {
        let mut datasets = Vec::new();
        for dsid in &self.dataset_order {
            if !self.includes(dsid) {
                continue;
            }
            if let Ok(ds) = catalog.get(dsid) {
                let caps = ds.capabilities();
                datasets.push(DatasetMeta {
                    id: caps.id.clone(),
                    name: caps.name.clone(),
                    crs: CrsMeta::from(&caps.crs),
                    requested_vars: self.dataset_vars.get(dsid).cloned().unwrap_or_default(),
                });
            }
        }

        let request = RequestInfoMeta {
            url: self.request_url.clone(),
            datetime: chrono::Utc::now().to_rfc3339(),
            target_dates: self.date_spec_display.clone(),
            target_crs: CrsMeta::from(&self.target_crs),
            request_type: match self.request_type {
                RequestType::Raster => "raster".to_string(),
                RequestType::Point => "points".to_string(),
            },
            target_resolution: if self.request_type == RequestType::Raster { self.target_resolution } else { None },
            interpolation_method: if self.request_type == RequestType::Point {
                Some(self.interp_method.to_string())
            } else {
                None
            },
            resample_method: if self.request_type == RequestType::Raster {
                Some(self.interp_method.to_string())
            } else {
                None
            },
        };

        RequestMetadata { request, datasets }
    }
}
